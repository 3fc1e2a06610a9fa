use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::{Currency, Template};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub currency: Currency,
    pub template: Template,
    pub font_family: Option<String>,
    pub font_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            currency: Currency::default(),
            template: Template::default(),
            font_family: None,
            font_path: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    output: Option<OutputSettings>,
    defaults: Option<DefaultsSettings>,
    render: Option<RenderSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputSettings {
    dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DefaultsSettings {
    currency: Option<String>,
    template: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderSettings {
    font_family: Option<String>,
    font_path: Option<String>,
}

/// Later layers win: home directory files first, then the working
/// directory, then an explicit `--read-settings` file.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    merge_files(&ordered_paths)
}

fn merge_files(ordered_paths: &[PathBuf]) -> Result<Settings> {
    let mut settings = Settings::default();
    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed)?;
        }
    }
    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(output) = incoming.output {
            if let Some(dir) = output.dir {
                if !dir.trim().is_empty() {
                    self.output_dir = PathBuf::from(dir);
                }
            }
        }
        if let Some(defaults) = incoming.defaults {
            if let Some(currency) = defaults.currency {
                if !currency.trim().is_empty() {
                    self.currency = currency.parse()?;
                }
            }
            if let Some(template) = defaults.template {
                if !template.trim().is_empty() {
                    self.template = template.parse()?;
                }
            }
        }
        if let Some(render) = incoming.render {
            if let Some(family) = render.font_family {
                if !family.trim().is_empty() {
                    self.font_family = Some(family);
                }
            }
            if let Some(path) = render.font_path {
                if !path.trim().is_empty() {
                    self.font_path = Some(PathBuf::from(path));
                }
            }
        }
        Ok(())
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".invoice-studio"))
        }
    })
}

use anyhow::{Result, anyhow};
use std::path::PathBuf;

pub mod assets;
pub mod export;
pub mod logging;
pub mod model;
pub mod render;
pub mod settings;

pub use assets::ImageAsset;
pub use model::{AssetKind, Currency, Invoice, ItemField, LineItem, Template, Totals};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub load: Option<PathBuf>,
    pub pdf: bool,
    pub save: bool,
    pub out_dir: Option<PathBuf>,
    pub template: Option<Template>,
    pub watermark: Option<bool>,
    pub settings_path: Option<PathBuf>,
}

/// One-shot mode: load (or seed) an invoice, apply overrides, export.
pub fn run(config: Config) -> Result<String> {
    let settings = settings::load_settings(config.settings_path.as_deref())?;

    if !config.pdf && !config.save {
        return Err(anyhow!("nothing to do (pass --pdf and/or --save)"));
    }

    let mut invoice = match config.load.as_deref() {
        Some(path) => export::load_invoice(path)?,
        None => new_invoice(&settings),
    };
    if let Some(template) = config.template {
        invoice.set_template(template);
    }
    if let Some(enabled) = config.watermark {
        invoice.set_watermark(enabled);
    }

    let out_dir = config
        .out_dir
        .clone()
        .unwrap_or_else(|| settings.output_dir.clone());

    let mut lines = Vec::new();
    if config.pdf {
        let path = export::export_pdf(&invoice, &settings, &out_dir)?;
        lines.push(format!("wrote {}", path.display()));
    }
    if config.save {
        let path = export::export_json(&invoice, &out_dir)?;
        lines.push(format!("wrote {}", path.display()));
    }
    Ok(lines.join("\n"))
}

/// A fresh invoice with the configured default currency and template.
pub fn new_invoice(settings: &settings::Settings) -> Invoice {
    let mut invoice = Invoice::new();
    invoice.set_currency(settings.currency);
    invoice.set_template(settings.template);
    invoice
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_invoice_picks_up_settings_defaults() {
        let settings = settings::Settings {
            currency: Currency::Gbp,
            template: Template::Modern,
            ..settings::Settings::default()
        };
        let invoice = new_invoice(&settings);
        assert_eq!(invoice.currency(), Currency::Gbp);
        assert_eq!(invoice.template(), Template::Modern);
        assert_eq!(invoice.items().len(), 1);
    }
}

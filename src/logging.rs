use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// Logging stays off unless `--verbose` is passed or INVOICE_STUDIO_LOG is
/// set; verbose selects debug level so the export stage events show up.
pub fn init(verbose: bool) -> Result<()> {
    let env_enabled = std::env::var_os("INVOICE_STUDIO_LOG").is_some();
    if !verbose && !env_enabled {
        return Ok(());
    }
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = fmt()
        .with_max_level(level)
        .with_target(false)
        .with_level(true)
        .try_init();
    Ok(())
}

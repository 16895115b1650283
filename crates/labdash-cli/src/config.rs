//! Loading and writing the TOML configuration file

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use labdash_core::DashboardConfig;

/// Read and validate a config file; defaults when no path is given
pub fn load(path: Option<&Path>) -> Result<DashboardConfig> {
    let Some(path) = path else {
        debug!("no config file, using defaults");
        return Ok(DashboardConfig::default());
    };

    let text = fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = parse(&text).with_context(|| format!("Invalid config {}", path.display()))?;
    info!(path = %path.display(), "config loaded");
    Ok(config)
}

pub fn parse(text: &str) -> Result<DashboardConfig> {
    let config: DashboardConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// The default configuration as commented TOML
pub fn default_toml() -> Result<String> {
    let body = toml::to_string_pretty(&DashboardConfig::default()).context("Failed to serialize default config")?;
    Ok(format!(
        "# labdash configuration\n\
         #\n\
         # Set [source] sheet_id to the published spreadsheet, or location to a\n\
         # CSV file path or URL. [access] editor_secret unlocks column selection.\n\n{body}"
    ))
}

/// Write the default configuration, refusing to overwrite unless forced
pub fn write_default(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    fs::write(path, default_toml()?).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

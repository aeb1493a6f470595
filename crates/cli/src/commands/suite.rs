use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use stackcheck_core::config::DocumentFormat;
use stackcheck_core::scenario::ScenarioSuite;

/// Serialize a suite in the format implied by `path`.
pub fn render_suite(suite: &ScenarioSuite, path: &Path) -> Result<String> {
    match DocumentFormat::from_path(path) {
        DocumentFormat::Json => {
            serde_json::to_string_pretty(suite).context("Failed to serialize suite to JSON")
        }
        DocumentFormat::Yaml => {
            serde_yaml::to_string(suite).context("Failed to serialize suite to YAML")
        }
    }
}

/// Write the built-in uretprobe suite so it can be edited into a custom one.
pub fn init_suite_command(out: &str, force: bool) -> Result<()> {
    let path = Path::new(out);
    if path.exists() && !force {
        return Err(anyhow!("Refusing to overwrite {} (use --force)", path.display()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let suite = ScenarioSuite::uretprobe_stack();
    let body = render_suite(&suite, path)?;
    fs::write(path, body).with_context(|| format!("Failed to write suite to {}", path.display()))?;

    println!("Wrote suite '{}' ({} probes) to {}", suite.name, suite.probes.len(), path.display());
    Ok(())
}

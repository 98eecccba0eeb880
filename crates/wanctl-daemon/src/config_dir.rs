//! Loads every WAN config file in a directory into validated configs.

use std::path::Path;

use wanctl_common::config::ValidatedWanConfig;
use wanctl_common::error::ConfigError;

/// Read every `*.yaml`/`*.yml` file directly under `dir`, parse and validate
/// each as one WAN's config. File name carries no meaning — `wan_name`
/// inside the file is authoritative — but files are loaded in directory
/// iteration order, which is stable enough for log ordering only.
pub fn load_wan_configs(dir: &Path) -> Result<Vec<ValidatedWanConfig>, ConfigError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut configs = Vec::new();
    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("yaml") | Some("yml")
            )
        })
        .collect();
    paths.sort();

    for path in paths {
        configs.push(ValidatedWanConfig::load_file(&path)?);
    }

    if configs.is_empty() {
        return Err(ConfigError::MissingKey(format!(
            "no WAN config files (*.yaml/*.yml) found under {}",
            dir.display()
        )));
    }

    let primaries = configs.iter().filter(|c| c.primary).count();
    if primaries > 1 {
        return Err(ConfigError::InvalidValue {
            key: "primary".into(),
            reason: format!("{primaries} WANs marked primary; exactly one is required for steering"),
        });
    }

    Ok(configs)
}

use serde::{Deserialize, Serialize};

/// Daemon configuration file (YAML).
///
/// Example `config.yaml`:
/// ```yaml
/// data-dir: /var/lib/sleeper/data
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SleeperConfigFile {
    #[serde(default, alias = "data-dir")]
    pub data_dir: Option<String>,
}

/// Load a YAML config file, returning the default if the file doesn't exist.
pub fn load_config_file<T: serde::de::DeserializeOwned + Default>(path: &str) -> anyhow::Result<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: T = serde_yaml::from_str(&content)?;
    Ok(config)
}

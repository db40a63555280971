use std::{collections::HashMap, path::PathBuf, time::Duration};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_STORAGE_FILE: &str = "uid_storage.json";
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 1;

#[derive(Debug, Default)]
pub struct Config(pub HashMap<Parameter, String>);

#[derive(Debug, Hash, PartialEq, Eq, Clone)]
pub enum Parameter {
    Port,
    StorageFile,
    SweepInterval,
    PanelAddUrl,
    PanelRemoveUrl,
    Unknown,
}

impl Parameter {
    pub fn deserialize(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "port" => Ok(Parameter::Port),
            "storage-file" => Ok(Parameter::StorageFile),
            "sweep-interval" => Ok(Parameter::SweepInterval),
            "panel-add-url" => Ok(Parameter::PanelAddUrl),
            "panel-remove-url" => Ok(Parameter::PanelRemoveUrl),
            _ => Ok(Parameter::Unknown),
        }
    }

    pub fn serialize(&self) -> &'static str {
        match self {
            Parameter::Port => "port",
            Parameter::StorageFile => "storage-file",
            Parameter::SweepInterval => "sweep-interval",
            Parameter::PanelAddUrl => "panel-add-url",
            Parameter::PanelRemoveUrl => "panel-remove-url",
            Parameter::Unknown => unreachable!(),
        }
    }
}

impl Config {
    pub fn port(&self) -> anyhow::Result<u16> {
        match self.0.get(&Parameter::Port) {
            Some(value) => Ok(value.parse()?),
            None => Ok(DEFAULT_PORT),
        }
    }

    pub fn storage_file(&self) -> PathBuf {
        self.0
            .get(&Parameter::StorageFile)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_FILE))
    }

    pub fn sweep_interval(&self) -> anyhow::Result<Duration> {
        match self.0.get(&Parameter::SweepInterval) {
            Some(value) => Ok(Duration::from_secs(value.parse()?)),
            None => Ok(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)),
        }
    }

    pub fn panel_add_url(&self) -> Option<String> {
        self.0.get(&Parameter::PanelAddUrl).cloned()
    }

    pub fn panel_remove_url(&self) -> Option<String> {
        self.0.get(&Parameter::PanelRemoveUrl).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_parameters_parse_case_insensitively() {
        assert_eq!(Parameter::deserialize("port").unwrap(), Parameter::Port);
        assert_eq!(
            Parameter::deserialize("Sweep-Interval").unwrap(),
            Parameter::SweepInterval
        );
        assert_eq!(
            Parameter::deserialize("whatever").unwrap(),
            Parameter::Unknown
        );
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::default();
        assert_eq!(config.port().unwrap(), DEFAULT_PORT);
        assert_eq!(config.storage_file(), PathBuf::from(DEFAULT_STORAGE_FILE));
        assert_eq!(
            config.sweep_interval().unwrap(),
            Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)
        );
        assert_eq!(config.panel_add_url(), None);
        assert_eq!(config.panel_remove_url(), None);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let mut config = Config::default();
        config.0.insert(Parameter::Port, "8080".into());
        config.0.insert(Parameter::SweepInterval, "5".into());
        config
            .0
            .insert(Parameter::PanelAddUrl, "http://panel/add".into());
        assert_eq!(config.port().unwrap(), 8080);
        assert_eq!(config.sweep_interval().unwrap(), Duration::from_secs(5));
        assert_eq!(config.panel_add_url().as_deref(), Some("http://panel/add"));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let mut config = Config::default();
        config.0.insert(Parameter::Port, "not-a-port".into());
        assert!(config.port().is_err());
    }
}

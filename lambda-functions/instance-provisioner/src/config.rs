use thiserror::Error;

pub const INSTANCE_NAME_VAR: &str = "ephemeral_instance_name";
pub const SNAPSHOT_NAME_VAR: &str = "snapshot_name";
pub const STORAGE_TYPE_VAR: &str = "storage_type";
pub const INSTANCE_CLASS_VAR: &str = "ephemeral_instance_db_class";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable: {name}")]
    MissingEnvVar { name: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub instance_name: String,
    pub snapshot_name: String,
    /// Required for compatibility with existing deployments; the restore
    /// request always uses gp2 regardless of this value.
    pub storage_type: String,
    pub instance_class: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::MissingEnvVar { name })
        };

        Ok(Self {
            instance_name: required(INSTANCE_NAME_VAR)?,
            snapshot_name: required(SNAPSHOT_NAME_VAR)?,
            storage_type: required(STORAGE_TYPE_VAR)?,
            instance_class: required(INSTANCE_CLASS_VAR)?,
        })
    }
}

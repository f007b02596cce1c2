use thiserror::Error;

pub const SOURCE_INSTANCE_VAR: &str = "prd_instance_name";
pub const SNAPSHOT_NAME_VAR: &str = "snapshot_name";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable: {name}")]
    MissingEnvVar { name: &'static str },
}

/// Identifiers the snapshot creator reads from its environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Production instance the snapshot is taken from.
    pub source_instance: String,
    /// Name given to the new snapshot.
    pub snapshot_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Absent and blank values are both reported as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            source_instance: required(&lookup, SOURCE_INSTANCE_VAR)?,
            snapshot_name: required(&lookup, SNAPSHOT_NAME_VAR)?,
        })
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::MissingEnvVar { name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_reads_both_identifiers() {
        let config = Config::from_lookup(lookup_from(&[
            ("prd_instance_name", "prod-db"),
            ("snapshot_name", "snap-1"),
        ]))
        .unwrap();

        assert_eq!(config.source_instance, "prod-db");
        assert_eq!(config.snapshot_name, "snap-1");
    }

    #[test]
    fn test_missing_source_instance() {
        let err = Config::from_lookup(lookup_from(&[("snapshot_name", "snap-1")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingEnvVar {
                name: "prd_instance_name"
            }
        );
    }

    #[test]
    fn test_blank_value_is_missing() {
        let err = Config::from_lookup(lookup_from(&[
            ("prd_instance_name", "prod-db"),
            ("snapshot_name", "   "),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "missing required environment variable: snapshot_name");
    }
}

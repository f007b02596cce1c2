use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_rds::error::DisplayErrorContext;
use aws_sdk_rds::operation::restore_db_instance_from_db_snapshot::RestoreDbInstanceFromDbSnapshotOutput;
use aws_sdk_rds::types::Tag;
use aws_sdk_rds::Client as RdsClient;
use bon::Builder;
use lambda_runtime::Error;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

mod config;

pub use config::{
    Config, ConfigError, INSTANCE_CLASS_VAR, INSTANCE_NAME_VAR, SNAPSHOT_NAME_VAR,
    STORAGE_TYPE_VAR,
};

pub const POSTGRES_PORT: i32 = 5432;
pub const ENGINE: &str = "postgres";
/// Sent on every restore; the `storage_type` setting is never forwarded.
pub const STORAGE_TYPE: &str = "gp2";

pub const INSTANCE_TAGS: [(&str, &str); 5] = [
    ("Env", "Ephemeral"),
    ("Service", "Postgres"),
    ("Workspace", "Ephemeral"),
    ("Automation", "true"),
    ("Terraform", "false"),
];

/// Every parameter of the restore-from-snapshot call.
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(on(String, into))]
pub struct RestoreInstanceRequest {
    pub db_snapshot_identifier: String,
    pub db_instance_identifier: String,
    pub db_instance_class: String,
    pub port: i32,
    pub multi_az: bool,
    pub publicly_accessible: bool,
    pub auto_minor_version_upgrade: bool,
    pub storage_type: String,
    pub engine: String,
    pub tags: Vec<Tag>,
    pub copy_tags_to_snapshot: bool,
    pub enable_iam_database_authentication: bool,
    /// Must stay off: the destroyer deletes without lifting protection.
    pub deletion_protection: bool,
}

impl RestoreInstanceRequest {
    /// Applies the fixed ephemeral-instance policy to the configured identifiers.
    pub fn from_config(config: &Config) -> Self {
        Self::builder()
            .db_snapshot_identifier(&config.snapshot_name)
            .db_instance_identifier(&config.instance_name)
            .db_instance_class(&config.instance_class)
            .port(POSTGRES_PORT)
            .multi_az(false)
            .publicly_accessible(false)
            .auto_minor_version_upgrade(false)
            .storage_type(STORAGE_TYPE)
            .engine(ENGINE)
            .tags(instance_tags())
            .copy_tags_to_snapshot(false)
            .enable_iam_database_authentication(false)
            .deletion_protection(false)
            .build()
    }
}

pub fn instance_tags() -> Vec<Tag> {
    INSTANCE_TAGS
        .iter()
        .map(|(key, value)| Tag::builder().key(*key).value(*value).build())
        .collect()
}

#[async_trait]
pub trait InstanceRestoreApi: Send + Sync {
    async fn restore_instance(
        &self,
        request: RestoreInstanceRequest,
    ) -> Result<RestoreDbInstanceFromDbSnapshotOutput, Error>;
}

#[async_trait]
impl InstanceRestoreApi for RdsClient {
    async fn restore_instance(
        &self,
        request: RestoreInstanceRequest,
    ) -> Result<RestoreDbInstanceFromDbSnapshotOutput, Error> {
        let result = self
            .restore_db_instance_from_db_snapshot()
            .db_snapshot_identifier(request.db_snapshot_identifier)
            .db_instance_identifier(request.db_instance_identifier)
            .db_instance_class(request.db_instance_class)
            .port(request.port)
            .multi_az(request.multi_az)
            .publicly_accessible(request.publicly_accessible)
            .auto_minor_version_upgrade(request.auto_minor_version_upgrade)
            .storage_type(request.storage_type)
            .engine(request.engine)
            .set_tags(Some(request.tags))
            .copy_tags_to_snapshot(request.copy_tags_to_snapshot)
            .enable_iam_database_authentication(request.enable_iam_database_authentication)
            .deletion_protection(request.deletion_protection)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output),
            Err(e) => {
                error!(
                    "RestoreDBInstanceFromDBSnapshot failed: {}",
                    DisplayErrorContext(&e)
                );
                Err(Error::from(e))
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Response {
    pub db_instance_identifier: Option<String>,
    pub db_instance_status: Option<String>,
    pub db_instance_class: Option<String>,
    pub engine: Option<String>,
    pub storage_type: Option<String>,
}

impl From<&RestoreDbInstanceFromDbSnapshotOutput> for Response {
    fn from(output: &RestoreDbInstanceFromDbSnapshotOutput) -> Self {
        let instance = output.db_instance();
        let field = |get: fn(&aws_sdk_rds::types::DbInstance) -> Option<&str>| {
            instance.and_then(get).map(str::to_string)
        };

        Self {
            db_instance_identifier: field(|i| i.db_instance_identifier()),
            db_instance_status: field(|i| i.db_instance_status()),
            db_instance_class: field(|i| i.db_instance_class()),
            engine: field(|i| i.engine()),
            storage_type: field(|i| i.storage_type()),
        }
    }
}

pub struct InstanceProvisionerService<C> {
    client: C,
    config: Config,
}

impl InstanceProvisionerService<RdsClient> {
    pub async fn new(config: Config) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::with_client(RdsClient::new(&sdk_config), config)
    }
}

impl<C: InstanceRestoreApi> InstanceProvisionerService<C> {
    pub fn with_client(client: C, config: Config) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Requests the restore and returns the acknowledgement unchanged.
    ///
    /// The source snapshot must already be available; nothing here waits
    /// for it or for the new instance.
    pub async fn run(&self) -> Result<RestoreDbInstanceFromDbSnapshotOutput, Error> {
        if self.config.storage_type != STORAGE_TYPE {
            warn!(
                "Configured storage type {} is ignored, restoring with {}",
                self.config.storage_type, STORAGE_TYPE
            );
        }

        let request = RestoreInstanceRequest::from_config(&self.config);

        info!(
            "Restoring instance {} ({}) from snapshot {}",
            request.db_instance_identifier, request.db_instance_class, request.db_snapshot_identifier
        );

        let output = self.client.restore_instance(request).await?;

        info!(
            "Instance {} accepted with status {}",
            self.config.instance_name,
            output
                .db_instance()
                .and_then(|i| i.db_instance_status())
                .unwrap_or("unknown")
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_rds::types::DbInstance;

    fn config(storage_type: &str) -> Config {
        Config {
            instance_name: "eph-1".to_string(),
            snapshot_name: "snap-1".to_string(),
            storage_type: storage_type.to_string(),
            instance_class: "db.t3.micro".to_string(),
        }
    }

    #[test]
    fn test_request_carries_fixed_policy() {
        let request = RestoreInstanceRequest::from_config(&config("gp2"));

        assert_eq!(request.db_snapshot_identifier, "snap-1");
        assert_eq!(request.db_instance_identifier, "eph-1");
        assert_eq!(request.db_instance_class, "db.t3.micro");
        assert_eq!(request.port, 5432);
        assert!(!request.multi_az);
        assert!(!request.publicly_accessible);
        assert!(!request.auto_minor_version_upgrade);
        assert_eq!(request.engine, "postgres");
        assert!(!request.copy_tags_to_snapshot);
        assert!(!request.enable_iam_database_authentication);
        assert!(!request.deletion_protection);
    }

    #[test]
    fn test_configured_storage_type_is_not_forwarded() {
        for configured in ["gp3", "io1", "standard"] {
            let request = RestoreInstanceRequest::from_config(&config(configured));
            assert_eq!(request.storage_type, "gp2");
        }
    }

    #[test]
    fn test_instance_tags_include_terraform_marker() {
        let tags = instance_tags();
        assert_eq!(tags.len(), 5);
        assert_eq!(tags[4].key(), Some("Terraform"));
        assert_eq!(tags[4].value(), Some("false"));
        assert_eq!(tags[0].key(), Some("Env"));
        assert_eq!(tags[0].value(), Some("Ephemeral"));
    }

    #[test]
    fn test_response_from_output() {
        let output = RestoreDbInstanceFromDbSnapshotOutput::builder()
            .db_instance(
                DbInstance::builder()
                    .db_instance_identifier("eph-1")
                    .db_instance_status("creating")
                    .db_instance_class("db.t3.micro")
                    .engine("postgres")
                    .storage_type("gp2")
                    .build(),
            )
            .build();

        let response = Response::from(&output);
        assert_eq!(
            response,
            Response {
                db_instance_identifier: Some("eph-1".to_string()),
                db_instance_status: Some("creating".to_string()),
                db_instance_class: Some("db.t3.micro".to_string()),
                engine: Some("postgres".to_string()),
                storage_type: Some("gp2".to_string()),
            }
        );
    }
}

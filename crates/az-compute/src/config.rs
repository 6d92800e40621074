use crate::{Error, Result};

const DEFAULT_JOB_POOL_SIZE: usize = 4;

/// Plugin-level settings, read once at construction. Credentials are
/// deliberately not here; they arrive per call.
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Interface attached when an order names no network.
    pub default_network_interface_name: String,
    /// Resource group every managed machine lives in.
    pub resource_group: String,
    /// Region whose size catalog and machines this plugin drives.
    pub region: String,
    /// Workers executing queued create and delete calls.
    pub job_pool_size: usize,
    /// Cloud-init payload handed to every machine, if any.
    pub user_data: Option<String>,
}

impl PluginConfig {
    /// Create from env vars: `AZURE_DEFAULT_NETWORK_INTERFACE_NAME`,
    /// `AZURE_RESOURCE_GROUP`, `AZURE_REGION` (required),
    /// `AZURE_JOB_POOL_SIZE`, `AZURE_USER_DATA` (optional).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            get(key).ok_or_else(|| Error::Config(format!("{key} is not set")))
        };

        let job_pool_size = match get("AZURE_JOB_POOL_SIZE") {
            None => DEFAULT_JOB_POOL_SIZE,
            Some(raw) => match raw.parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(Error::Config(format!(
                        "AZURE_JOB_POOL_SIZE must be a positive integer, got {raw:?}"
                    )));
                }
            },
        };

        Ok(Self {
            default_network_interface_name: required("AZURE_DEFAULT_NETWORK_INTERFACE_NAME")?,
            resource_group: required("AZURE_RESOURCE_GROUP")?,
            region: required("AZURE_REGION")?,
            job_pool_size,
            user_data: get("AZURE_USER_DATA"),
        })
    }
}

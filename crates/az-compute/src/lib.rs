pub mod cache;
pub mod config;
pub mod ident;
pub mod jobs;
pub mod ops;
pub mod plugin;
pub mod provider;
pub mod sizes;
pub mod state;
pub mod types;

#[cfg(test)]
mod testing;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("no vm size with at least {min_memory_mb} MB memory and {min_cores} cores")]
    NoAvailableResources { min_memory_mb: i32, min_cores: i32 },

    #[error("malformed resource id: {0}")]
    MalformedIdentifier(String),

    #[error("invalid vm spec: {0}")]
    InvalidSpec(String),

    #[error("an instance may attach at most one network, got {0}")]
    MultipleNetworks(usize),

    #[error("config error: {0}")]
    Config(String),

    #[error("arm provider error: {0}")]
    Provider(#[from] arm_api::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

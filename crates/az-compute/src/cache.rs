use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::Result;
use crate::provider::{ProviderApi, ProviderAuth};
use crate::types::Credential;

type Entry = Arc<OnceCell<Arc<dyn ProviderApi>>>;

/// Authenticated provider clients, one per distinct credential.
///
/// Entries are created on first use and kept for the process lifetime.
/// Initialization is single-flight: concurrent misses on one credential
/// share a single authentication call, and a failed attempt is not
/// cached, so the next caller retries.
pub struct ClientCache {
    auth: Arc<dyn ProviderAuth>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl ClientCache {
    pub fn new(auth: Arc<dyn ProviderAuth>) -> Self {
        Self {
            auth,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached client for this credential, authenticating on first use.
    pub async fn get(&self, credential: &Credential) -> Result<Arc<dyn ProviderApi>> {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(credential.fingerprint()).or_default().clone()
        };

        let client = cell
            .get_or_try_init(|| async {
                debug!(client_id = %credential.client_id, "authenticating new provider client");
                self.auth.authenticate(credential).await
            })
            .await?;

        Ok(client.clone())
    }
}

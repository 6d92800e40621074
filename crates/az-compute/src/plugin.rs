use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::cache::ClientCache;
use crate::config::PluginConfig;
use crate::ident::{self, ResourceId, ResourceScope};
use crate::jobs::JobPool;
use crate::ops::VmOperations;
use crate::provider::{ArmAuth, ProviderAuth};
use crate::state::map_provisioning_state;
use crate::types::{
    ComputeOrder, CreateVmSpec, Credential, ImageReference, InstanceState, VmSnapshot,
};
use crate::{Error, Result};

/// Floor for the OS disk; orders asking for less are bumped up to it.
const MINIMUM_OS_DISK_GB: i32 = 30;
const VM_NAME_PREFIX: &str = "vm-";

/// Entry point the host orchestrator drives: translates neutral compute
/// orders into provider calls, and provider records back into snapshots.
///
/// The plugin holds no instance state. Credentials arrive with every
/// call; configuration is fixed at construction.
pub struct ComputePlugin {
    config: PluginConfig,
    operations: VmOperations,
}

impl ComputePlugin {
    /// Plugin over the real ARM client, configured from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(PluginConfig::from_env()?, Arc::new(ArmAuth)))
    }

    /// Must be called within a tokio runtime; the job pool spawns its
    /// workers at construction.
    pub fn new(config: PluginConfig, auth: Arc<dyn ProviderAuth>) -> Self {
        let clients = ClientCache::new(auth);
        let pool = JobPool::new(config.job_pool_size);
        let operations = VmOperations::new(clients, pool, config.region.clone());
        Self { config, operations }
    }

    /// `true` when the provider-reported state means the machine is
    /// usable.
    pub fn is_ready(cloud_state: &str) -> bool {
        map_provisioning_state(cloud_state) == InstanceState::Ready
    }

    /// `true` when the provider has given up on the machine.
    pub fn has_failed(cloud_state: &str) -> bool {
        map_provisioning_state(cloud_state) == InstanceState::Failed
    }

    /// Resolve the order into a full create spec, start the asynchronous
    /// create, and return the new instance identifier immediately.
    pub async fn request_instance(
        &self,
        order: &ComputeOrder,
        credential: &Credential,
    ) -> Result<ResourceId> {
        info!(order = %order.id, "requesting instance");

        let network_interface_id = self.network_interface_id(order, credential)?;
        let image: ImageReference = order.image_id.parse()?;
        let size = self
            .operations
            .find_size(order.memory_mb, order.vcpu, &self.config.region, credential)
            .await?;

        let mut builder = CreateVmSpec::builder()
            .with_name(instance_name(order))
            .with_image(image)
            .with_network_interface_id(network_interface_id)
            .with_disk_gb(order.disk_gb.max(MINIMUM_OS_DISK_GB))
            .with_size_name(&size.name)
            .with_os_user_name(&order.id)
            .with_os_user_password(generate_password())
            .with_os_compute_name(&order.id)
            .with_region(&self.config.region)
            .with_resource_group(&self.config.resource_group);
        if let Some(user_data) = &self.config.user_data {
            builder = builder.with_user_data(user_data);
        }
        let spec = builder.build()?;

        self.operations.create(spec, credential).await
    }

    /// Current snapshot of the order's instance.
    pub async fn get_instance(
        &self,
        order: &ComputeOrder,
        credential: &Credential,
    ) -> Result<VmSnapshot> {
        let id = instance_id(order)?;
        info!(instance = %id, "reading instance");
        self.operations.read(&id, credential).await
    }

    /// Start deleting the order's instance; returns without waiting for
    /// the provider to finish tearing it down.
    pub async fn delete_instance(
        &self,
        order: &ComputeOrder,
        credential: &Credential,
    ) -> Result<()> {
        let id = instance_id(order)?;
        info!(instance = %id, "deleting instance");
        self.operations.delete(&id, credential).await
    }

    /// Which interface the machine attaches to: the order's single
    /// network if it names one, the configured default otherwise. More
    /// than one network is refused rather than silently narrowed.
    fn network_interface_id(
        &self,
        order: &ComputeOrder,
        credential: &Credential,
    ) -> Result<ResourceId> {
        match order.network_ids.as_slice() {
            [] => {
                let scope = ResourceScope::new(
                    credential.subscription_id.as_str(),
                    self.config.resource_group.as_str(),
                );
                Ok(ident::build_network_interface_id(
                    &scope,
                    &self.config.default_network_interface_name,
                ))
            }
            [single] => Ok(ResourceId(single.clone())),
            many => Err(Error::MultipleNetworks(many.len())),
        }
    }
}

fn instance_id(order: &ComputeOrder) -> Result<ResourceId> {
    order
        .instance_id
        .as_ref()
        .map(|raw| ResourceId(raw.clone()))
        .ok_or_else(|| Error::MalformedIdentifier("order carries no instance id".into()))
}

/// Deterministic machine name for an order, so the create call and the
/// returned identifier agree without storing anything.
fn instance_name(order: &ComputeOrder) -> String {
    format!("{VM_NAME_PREFIX}{}", order.id)
}

/// Random password satisfying the provider's complexity classes (upper,
/// lower, digit, punctuation).
fn generate_password() -> String {
    format!("Pw9!{}", Uuid::new_v4().simple())
}

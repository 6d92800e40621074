//! Stateless lifecycle operations against the provider. Nothing is
//! tracked between calls; every answer is re-derived by asking the
//! provider.

use tracing::{debug, info};

use crate::cache::ClientCache;
use crate::ident::{self, ResourceId, ResourceKind, ResourceScope};
use crate::jobs::JobPool;
use crate::sizes;
use crate::types::{CreateVmSpec, Credential, VmSizeOffering, VmSnapshot};
use crate::{Error, Result};

pub struct VmOperations {
    clients: ClientCache,
    pool: JobPool,
    region: String,
}

impl VmOperations {
    pub fn new(clients: ClientCache, pool: JobPool, region: impl Into<String>) -> Self {
        Self {
            clients,
            pool,
            region: region.into(),
        }
    }

    /// Validate the network interface, queue the provider-side create,
    /// and hand back the machine's identifier right away. The machine is
    /// usually still provisioning when this returns.
    pub async fn create(&self, spec: CreateVmSpec, credential: &Credential) -> Result<ResourceId> {
        let api = self.clients.get(credential).await?;

        let nic = api
            .get_network_interface(&spec.network_interface_id)
            .await
            .map_err(|e| {
                as_not_found(e, || format!("network interface {}", spec.network_interface_id))
            })?;
        debug!(nic = %nic.name, "resolved network interface");

        let scope = ResourceScope::new(credential.subscription_id.as_str(), spec.resource_group.as_str());
        let id = ident::build_virtual_machine_id(&scope, &spec.name);

        info!(vm = %spec.name, size = %spec.size_name, "queueing virtual machine create");
        let label = format!("create vm {}", spec.name);
        self.pool.submit(label, async move { api.create_vm(&spec).await });

        Ok(id)
    }

    /// Point-in-time snapshot of a machine: the provider record joined
    /// with the size catalog, since the record only carries a size label.
    pub async fn read(&self, id: &ResourceId, credential: &Credential) -> Result<VmSnapshot> {
        let name = require_virtual_machine(id)?;

        let api = self.clients.get(credential).await?;
        let record = api
            .get_vm(id)
            .await
            .map_err(|e| as_not_found(e, || format!("virtual machine {name}")))?;

        let offering = self
            .find_size_by_name(&record.size_name, &self.region, credential)
            .await?;

        debug!(vm = %name, state = %record.provisioning_state, "assembled instance snapshot");

        Ok(VmSnapshot {
            id: record.vm_id,
            name: record.name,
            cloud_state: record.provisioning_state,
            vcpu: offering.cores,
            memory_mb: offering.memory_mb,
            disk_gb: record.os_disk_gb,
            ip_addresses: record.private_ips,
        })
    }

    /// Queue the provider-side delete and return. Failures past this
    /// point are only observable through the job log and later reads.
    pub async fn delete(&self, id: &ResourceId, credential: &Credential) -> Result<()> {
        let name = require_virtual_machine(id)?;

        let api = self.clients.get(credential).await?;

        info!(vm = %name, "queueing virtual machine delete");
        let id = id.clone();
        self.pool
            .submit(format!("delete vm {name}"), async move { api.delete_vm(&id).await });

        Ok(())
    }

    /// Cheapest offering in the region that satisfies both minimums.
    pub async fn find_size(
        &self,
        min_memory_mb: i32,
        min_cores: i32,
        region: &str,
        credential: &Credential,
    ) -> Result<VmSizeOffering> {
        let api = self.clients.get(credential).await?;
        let catalog = sizes::fetch_catalog(api.as_ref(), region).await?;
        let offering = sizes::best_fit(&catalog, min_memory_mb, min_cores)
            .cloned()
            .ok_or(Error::NoAvailableResources {
                min_memory_mb,
                min_cores,
            })?;

        debug!(size = %offering.name, "selected vm size");
        Ok(offering)
    }

    /// Resolve a size label back to its offering. A label the catalog no
    /// longer lists comes back as `ResourceNotFound`.
    pub async fn find_size_by_name(
        &self,
        name: &str,
        region: &str,
        credential: &Credential,
    ) -> Result<VmSizeOffering> {
        let api = self.clients.get(credential).await?;
        let catalog = sizes::fetch_catalog(api.as_ref(), region).await?;
        sizes::by_name(&catalog, name)
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound(format!("vm size {name}")))
    }
}

fn require_virtual_machine(id: &ResourceId) -> Result<String> {
    let (_, kind, name) = ident::parse(id)?;
    if kind != ResourceKind::VirtualMachine {
        return Err(Error::MalformedIdentifier(format!(
            "{id} does not name a virtual machine"
        )));
    }
    Ok(name)
}

/// Lookup failures become `ResourceNotFound` for the caller; the two
/// authorization shapes stay visible as `Unauthorized`.
fn as_not_found(error: Error, what: impl FnOnce() -> String) -> Error {
    match error {
        Error::Unauthorized(_) | Error::ResourceNotFound(_) => error,
        Error::Provider(p) if p.is_unauthorized() => Error::Unauthorized(p.to_string()),
        Error::Provider(p) if p.is_not_found() => Error::ResourceNotFound(what()),
        other => Error::ResourceNotFound(format!("{}: {other}", what())),
    }
}

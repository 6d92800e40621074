use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::info;

use crate::ident::ResourceId;
use crate::types::{CreateVmSpec, Credential, VmSizeOffering};
use crate::{Error, Result};

/// One page of the provider size catalog.
#[derive(Debug, Clone)]
pub struct SizePage {
    pub offerings: Vec<VmSizeOffering>,
    /// Continuation link for the next page, if any.
    pub next: Option<String>,
}

/// Resolved network-interface reference.
#[derive(Debug, Clone)]
pub struct NetworkInterfaceRef {
    pub id: ResourceId,
    pub name: String,
}

/// Provider-side view of a virtual machine, as much of it as the read
/// path needs.
#[derive(Debug, Clone)]
pub struct VmRecord {
    pub vm_id: String,
    pub name: String,
    pub provisioning_state: String,
    pub size_name: String,
    pub os_disk_gb: i32,
    pub private_ips: Vec<String>,
}

/// Compute surface of the cloud provider. Implemented by the real ARM
/// client and by test stubs.
#[async_trait]
pub trait ProviderApi: Send + Sync + 'static {
    /// One page of the size catalog for a region.
    async fn list_vm_sizes(&self, region: &str, next: Option<&str>) -> Result<SizePage>;

    /// Resolve a network interface by id.
    async fn get_network_interface(&self, id: &ResourceId) -> Result<NetworkInterfaceRef>;

    /// Start creating a virtual machine. Returns once the provider has
    /// accepted the request, not once the machine is up.
    async fn create_vm(&self, spec: &CreateVmSpec) -> Result<()>;

    /// Start deleting a virtual machine. Deleting a machine that is
    /// already gone is not an error.
    async fn delete_vm(&self, id: &ResourceId) -> Result<()>;

    /// Fetch the current record of a virtual machine, addresses included.
    async fn get_vm(&self, id: &ResourceId) -> Result<VmRecord>;
}

/// Exchanges a credential for an authenticated provider client.
#[async_trait]
pub trait ProviderAuth: Send + Sync + 'static {
    async fn authenticate(&self, credential: &Credential) -> Result<Arc<dyn ProviderApi>>;
}

/// Production authenticator: OAuth2 client-credentials flow against the
/// ARM token endpoint.
pub struct ArmAuth;

#[async_trait]
impl ProviderAuth for ArmAuth {
    async fn authenticate(&self, credential: &Credential) -> Result<Arc<dyn ProviderApi>> {
        let client = arm_api::ArmClient::authenticate(
            &credential.tenant_id,
            &credential.client_id,
            &credential.client_secret,
            credential.subscription_id.clone(),
        )
        .await
        .map_err(|e| Error::Unauthorized(e.to_string()))?;

        info!(client_id = %credential.client_id, "arm: authenticated provider client");
        Ok(Arc::new(client))
    }
}

#[async_trait]
impl ProviderApi for arm_api::ArmClient {
    async fn list_vm_sizes(&self, region: &str, next: Option<&str>) -> Result<SizePage> {
        let page = arm_api::ArmClient::list_vm_sizes(self, region, next).await?;
        Ok(SizePage {
            offerings: page
                .value
                .into_iter()
                .map(|size| VmSizeOffering {
                    name: size.name,
                    cores: size.number_of_cores,
                    memory_mb: size.memory_in_mb,
                })
                .collect(),
            next: page.next_link,
        })
    }

    async fn get_network_interface(&self, id: &ResourceId) -> Result<NetworkInterfaceRef> {
        let nic = arm_api::ArmClient::get_network_interface(self, id.as_str()).await?;
        Ok(NetworkInterfaceRef {
            id: ResourceId(nic.id),
            name: nic.name,
        })
    }

    async fn create_vm(&self, spec: &CreateVmSpec) -> Result<()> {
        let body = arm_api::VirtualMachineCreate {
            location: spec.region.clone(),
            properties: arm_api::VirtualMachineCreateProperties {
                hardware_profile: arm_api::HardwareProfile {
                    vm_size: spec.size_name.clone(),
                },
                storage_profile: arm_api::StorageProfile {
                    image_reference: arm_api::ImageReference {
                        publisher: spec.image.publisher.clone(),
                        offer: spec.image.offer.clone(),
                        sku: spec.image.sku.clone(),
                        version: spec.image.version.clone(),
                    },
                    os_disk: arm_api::OsDisk {
                        create_option: "FromImage".into(),
                        disk_size_gb: Some(spec.disk_gb),
                        name: None,
                    },
                },
                os_profile: arm_api::OsProfile {
                    computer_name: spec.os_compute_name.clone(),
                    admin_username: spec.os_user_name.clone(),
                    admin_password: spec.os_user_password.clone(),
                    custom_data: spec.user_data.as_ref().map(|data| BASE64.encode(data)),
                },
                network_profile: arm_api::NetworkProfile {
                    network_interfaces: vec![arm_api::NetworkInterfaceReference {
                        id: spec.network_interface_id.as_str().to_string(),
                        properties: Some(arm_api::NetworkInterfaceReferenceProperties {
                            primary: true,
                        }),
                    }],
                },
            },
        };

        let vm =
            arm_api::ArmClient::create_virtual_machine(self, &spec.resource_group, &spec.name, &body)
                .await?;
        info!(vm = %vm.name, state = %vm.properties.provisioning_state, "arm: create accepted");
        Ok(())
    }

    async fn delete_vm(&self, id: &ResourceId) -> Result<()> {
        arm_api::ArmClient::delete_virtual_machine(self, id.as_str()).await?;
        info!(vm = %id.0, "arm: delete accepted");
        Ok(())
    }

    async fn get_vm(&self, id: &ResourceId) -> Result<VmRecord> {
        let vm = arm_api::ArmClient::get_virtual_machine(self, id.as_str()).await?;

        // ARM does not inline addresses in the VM record; they live on
        // the primary network interface.
        let mut private_ips = Vec::new();
        if let Some(profile) = &vm.properties.network_profile {
            if let Some(nic_id) = primary_nic_id(profile) {
                let nic = arm_api::ArmClient::get_network_interface(self, nic_id).await?;
                private_ips = nic_private_ips(&nic);
            }
        }

        let arm_api::VirtualMachineProperties {
            vm_id,
            provisioning_state,
            hardware_profile,
            storage_profile,
            ..
        } = vm.properties;

        Ok(VmRecord {
            vm_id: vm_id.unwrap_or_else(|| vm.name.clone()),
            name: vm.name,
            provisioning_state,
            size_name: hardware_profile.map(|h| h.vm_size).unwrap_or_default(),
            os_disk_gb: storage_profile
                .and_then(|s| s.os_disk.disk_size_gb)
                .unwrap_or_default(),
            private_ips,
        })
    }
}

fn primary_nic_id(profile: &arm_api::NetworkProfile) -> Option<&str> {
    profile
        .network_interfaces
        .iter()
        .find(|nic| nic.properties.as_ref().map(|p| p.primary).unwrap_or(false))
        .or_else(|| profile.network_interfaces.first())
        .map(|nic| nic.id.as_str())
}

/// Private addresses of an interface, primary configuration first.
fn nic_private_ips(nic: &arm_api::NetworkInterface) -> Vec<String> {
    let Some(props) = &nic.properties else {
        return Vec::new();
    };

    let mut configs: Vec<&arm_api::IpConfiguration> = props.ip_configurations.iter().collect();
    configs.sort_by_key(|config| {
        let primary = config
            .properties
            .as_ref()
            .and_then(|p| p.primary)
            .unwrap_or(false);
        !primary
    });

    configs
        .iter()
        .filter_map(|config| {
            config
                .properties
                .as_ref()
                .and_then(|p| p.private_ip_address.clone())
        })
        .collect()
}

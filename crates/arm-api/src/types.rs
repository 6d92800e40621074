use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Auth types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub token_type: String,
}

// ── Virtual machine size types ───────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmSizeList {
    pub value: Vec<VmSize>,
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmSize {
    pub name: String,
    pub number_of_cores: i32,
    #[serde(rename = "memoryInMB")]
    pub memory_in_mb: i32,
    #[serde(rename = "osDiskSizeInMB")]
    pub os_disk_size_in_mb: Option<i64>,
    #[serde(rename = "resourceDiskSizeInMB")]
    pub resource_disk_size_in_mb: Option<i64>,
    pub max_data_disk_count: Option<i32>,
}

// ── Network interface types ──────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub properties: Option<NetworkInterfaceProperties>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceProperties {
    #[serde(default)]
    pub ip_configurations: Vec<IpConfiguration>,
    pub primary: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpConfiguration {
    pub name: String,
    pub properties: Option<IpConfigurationProperties>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpConfigurationProperties {
    #[serde(rename = "privateIPAddress")]
    pub private_ip_address: Option<String>,
    pub primary: Option<bool>,
}

// ── Virtual machine types ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineCreate {
    pub location: String,
    pub properties: VirtualMachineCreateProperties,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineCreateProperties {
    pub hardware_profile: HardwareProfile,
    pub storage_profile: StorageProfile,
    pub os_profile: OsProfile,
    pub network_profile: NetworkProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareProfile {
    pub vm_size: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    pub image_reference: ImageReference,
    pub os_disk: OsDisk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageReference {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsDisk {
    pub create_option: String,
    #[serde(rename = "diskSizeGB", skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// The GET response never echoes the password, so this type is
// request-only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OsProfile {
    pub computer_name: String,
    pub admin_username: String,
    pub admin_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterfaceReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInterfaceReference {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<NetworkInterfaceReferenceProperties>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInterfaceReferenceProperties {
    pub primary: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    pub id: String,
    pub name: String,
    pub location: String,
    pub properties: VirtualMachineProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineProperties {
    pub vm_id: Option<String>,
    pub provisioning_state: String,
    pub time_created: Option<DateTime<Utc>>,
    pub hardware_profile: Option<HardwareProfile>,
    pub storage_profile: Option<StorageProfile>,
    pub network_profile: Option<NetworkProfile>,
}

// ── VM image catalog types ───────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct VmImageResource {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
}

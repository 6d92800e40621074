use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::ident::ResourceId;
use crate::{Error, Result};

const IMAGE_URN_SEPARATOR: char = ':';
const IMAGE_VERSION_LATEST: &str = "latest";

/// Provider-neutral compute request handed down by the host orchestrator.
#[derive(Debug, Clone)]
pub struct ComputeOrder {
    pub id: String,
    /// Encoded instance identifier, set once the instance exists.
    pub instance_id: Option<String>,
    pub vcpu: i32,
    pub memory_mb: i32,
    pub disk_gb: i32,
    /// Image URN, `publisher:offer:sku[:version]`.
    pub image_id: String,
    pub network_ids: Vec<String>,
}

/// Service-principal credentials. One authenticated client is cached per
/// distinct value. Debug output redacts the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub tenant_id: String,
    pub subscription_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("tenant_id", &self.tenant_id)
            .field("subscription_id", &self.subscription_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl Credential {
    /// Create from env vars: `AZURE_TENANT_ID`, `AZURE_SUBSCRIPTION_ID`,
    /// `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET` (all required).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let var = |key: &str| {
            std::env::var(key).map_err(|_| Error::Config(format!("{key} is not set")))
        };

        Ok(Self {
            tenant_id: var("AZURE_TENANT_ID")?,
            subscription_id: var("AZURE_SUBSCRIPTION_ID")?,
            client_id: var("AZURE_CLIENT_ID")?,
            client_secret: var("AZURE_CLIENT_SECRET")?,
        })
    }

    /// Stable cache key over all four fields. Fields are length-prefixed
    /// so their boundaries cannot collide.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for field in [
            &self.tenant_id,
            &self.subscription_id,
            &self.client_id,
            &self.client_secret,
        ] {
            hasher.update(field.len().to_le_bytes());
            hasher.update(field.as_bytes());
        }
        hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Image coordinates in the provider catalog, written
/// `publisher:offer:sku` with an optional `:version` (default `latest`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}{sep}{}",
            self.publisher,
            self.offer,
            self.sku,
            self.version,
            sep = IMAGE_URN_SEPARATOR,
        )
    }
}

impl FromStr for ImageReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(IMAGE_URN_SEPARATOR).collect();
        let (publisher, offer, sku, version) = match parts.as_slice() {
            [p, o, k] => (*p, *o, *k, IMAGE_VERSION_LATEST),
            [p, o, k, v] => (*p, *o, *k, *v),
            _ => {
                return Err(Error::InvalidSpec(format!(
                    "image id must be publisher:offer:sku[:version], got {s:?}"
                )));
            }
        };
        if [publisher, offer, sku, version].iter().any(|part| part.is_empty()) {
            return Err(Error::InvalidSpec(format!(
                "image id {s:?} has an empty segment"
            )));
        }
        Ok(Self {
            publisher: publisher.into(),
            offer: offer.into(),
            sku: sku.into(),
            version: version.into(),
        })
    }
}

/// Fully-resolved parameters for one instance create call. Built once,
/// validated, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct CreateVmSpec {
    pub name: String,
    pub image: ImageReference,
    pub network_interface_id: ResourceId,
    pub disk_gb: i32,
    pub size_name: String,
    pub os_user_name: String,
    pub os_user_password: String,
    pub os_compute_name: String,
    pub user_data: Option<String>,
    pub region: String,
    pub resource_group: String,
}

impl CreateVmSpec {
    pub fn builder() -> CreateVmSpecBuilder {
        CreateVmSpecBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct CreateVmSpecBuilder {
    name: Option<String>,
    image: Option<ImageReference>,
    network_interface_id: Option<ResourceId>,
    disk_gb: Option<i32>,
    size_name: Option<String>,
    os_user_name: Option<String>,
    os_user_password: Option<String>,
    os_compute_name: Option<String>,
    user_data: Option<String>,
    region: Option<String>,
    resource_group: Option<String>,
}

impl CreateVmSpecBuilder {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_image(mut self, image: ImageReference) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_network_interface_id(mut self, id: ResourceId) -> Self {
        self.network_interface_id = Some(id);
        self
    }

    pub fn with_disk_gb(mut self, disk_gb: i32) -> Self {
        self.disk_gb = Some(disk_gb);
        self
    }

    pub fn with_size_name(mut self, size_name: impl Into<String>) -> Self {
        self.size_name = Some(size_name.into());
        self
    }

    pub fn with_os_user_name(mut self, user: impl Into<String>) -> Self {
        self.os_user_name = Some(user.into());
        self
    }

    pub fn with_os_user_password(mut self, password: impl Into<String>) -> Self {
        self.os_user_password = Some(password.into());
        self
    }

    pub fn with_os_compute_name(mut self, name: impl Into<String>) -> Self {
        self.os_compute_name = Some(name.into());
        self
    }

    pub fn with_user_data(mut self, data: impl Into<String>) -> Self {
        self.user_data = Some(data.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_resource_group(mut self, group: impl Into<String>) -> Self {
        self.resource_group = Some(group.into());
        self
    }

    /// Validate and assemble the spec. Fails fast on any missing field or
    /// an unusable disk size, before anything reaches the provider.
    pub fn build(self) -> Result<CreateVmSpec> {
        fn required<T>(value: Option<T>, field: &str) -> Result<T> {
            value.ok_or_else(|| Error::InvalidSpec(format!("{field} is required")))
        }

        let disk_gb = required(self.disk_gb, "disk size")?;
        if disk_gb <= 0 {
            return Err(Error::InvalidSpec(format!(
                "disk size must be positive, got {disk_gb}"
            )));
        }

        Ok(CreateVmSpec {
            name: required(self.name, "name")?,
            image: required(self.image, "image")?,
            network_interface_id: required(self.network_interface_id, "network interface id")?,
            disk_gb,
            size_name: required(self.size_name, "size name")?,
            os_user_name: required(self.os_user_name, "os user name")?,
            os_user_password: required(self.os_user_password, "os user password")?,
            os_compute_name: required(self.os_compute_name, "os compute name")?,
            user_data: self.user_data,
            region: required(self.region, "region")?,
            resource_group: required(self.resource_group, "resource group")?,
        })
    }
}

/// One row of the provider size catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmSizeOffering {
    pub name: String,
    pub cores: i32,
    pub memory_mb: i32,
}

/// Point-in-time view of an instance, re-derived from the provider on
/// every read.
#[derive(Debug, Clone)]
pub struct VmSnapshot {
    /// Provider-side machine id, not the orchestrator-facing resource id.
    pub id: String,
    pub name: String,
    /// Raw provider state label, for callers that want the original.
    pub cloud_state: String,
    pub vcpu: i32,
    pub memory_mb: i32,
    pub disk_gb: i32,
    pub ip_addresses: Vec<String>,
}

/// Neutral lifecycle states the orchestrator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Pending,
    Ready,
    Failed,
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::{self, ResourceScope};

    fn full_builder() -> CreateVmSpecBuilder {
        let scope = ResourceScope::new("sub-1", "rg-main");
        CreateVmSpec::builder()
            .with_name("vm-order-1")
            .with_image("Canonical:UbuntuServer:18.04-LTS".parse().unwrap())
            .with_network_interface_id(ident::build_network_interface_id(&scope, "nic-default"))
            .with_disk_gb(30)
            .with_size_name("Standard_B2s")
            .with_os_user_name("order-1")
            .with_os_user_password("Pw9!abc123def456")
            .with_os_compute_name("order-1")
            .with_region("eastus")
            .with_resource_group("rg-main")
    }

    #[test]
    fn builder_assembles_a_complete_spec() {
        let spec = full_builder().build().unwrap();
        assert_eq!(spec.name, "vm-order-1");
        assert_eq!(spec.image.version, "latest");
        assert_eq!(spec.disk_gb, 30);
        assert!(spec.user_data.is_none());
    }

    #[test]
    fn builder_rejects_missing_fields() {
        let err = CreateVmSpec::builder()
            .with_name("vm-1")
            .with_disk_gb(30)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSpec(_)));
    }

    #[test]
    fn builder_rejects_nonpositive_disk() {
        for disk in [0, -5] {
            let err = full_builder().with_disk_gb(disk).build().unwrap_err();
            assert!(matches!(err, Error::InvalidSpec(_)), "disk {disk}");
        }
    }

    #[test]
    fn fingerprint_depends_on_values_not_identity() {
        let a = Credential {
            tenant_id: "t".into(),
            subscription_id: "s".into(),
            client_id: "c".into(),
            client_secret: "k".into(),
        };
        let b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut c = a.clone();
        c.client_secret = "other".into();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn fingerprint_distinguishes_field_boundaries() {
        let a = Credential {
            tenant_id: "ab".into(),
            subscription_id: "c".into(),
            client_id: "x".into(),
            client_secret: "y".into(),
        };
        let b = Credential {
            tenant_id: "a".into(),
            subscription_id: "bc".into(),
            client_id: "x".into(),
            client_secret: "y".into(),
        };
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn debug_output_redacts_the_client_secret() {
        let credential = Credential {
            tenant_id: "t".into(),
            subscription_id: "s".into(),
            client_id: "c".into(),
            client_secret: "very-private".into(),
        };
        let printed = format!("{credential:?}");
        assert!(!printed.contains("very-private"), "{printed}");
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn image_urn_defaults_to_latest_version() {
        let image: ImageReference = "Canonical:UbuntuServer:18.04-LTS".parse().unwrap();
        assert_eq!(image.publisher, "Canonical");
        assert_eq!(image.offer, "UbuntuServer");
        assert_eq!(image.sku, "18.04-LTS");
        assert_eq!(image.version, "latest");
    }

    #[test]
    fn image_urn_keeps_explicit_version() {
        let image: ImageReference = "Canonical:UbuntuServer:18.04-LTS:18.04.202401".parse().unwrap();
        assert_eq!(image.version, "18.04.202401");
        assert_eq!(
            image.to_string(),
            "Canonical:UbuntuServer:18.04-LTS:18.04.202401"
        );
    }

    #[test]
    fn image_urn_rejects_bad_shapes() {
        for raw in ["", "ubuntu", "a:b", "a:b:c:d:e", "a::c", "a:b:"] {
            let err = raw.parse::<ImageReference>().unwrap_err();
            assert!(matches!(err, Error::InvalidSpec(_)), "urn {raw:?}");
        }
    }
}

//! Shared stubs for exercising the operation core without a provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ident::{self, ResourceId, ResourceScope};
use crate::provider::{NetworkInterfaceRef, ProviderApi, ProviderAuth, SizePage, VmRecord};
use crate::types::{CreateVmSpec, Credential, VmSizeOffering};
use crate::{Error, Result};

pub const SUBSCRIPTION: &str = "sub-1";
pub const RESOURCE_GROUP: &str = "rg-main";
pub const REGION: &str = "eastus";

pub fn credential() -> Credential {
    Credential {
        tenant_id: "tenant-1".into(),
        subscription_id: SUBSCRIPTION.into(),
        client_id: "client-1".into(),
        client_secret: "secret-1".into(),
    }
}

pub fn scope() -> ResourceScope {
    ResourceScope::new(SUBSCRIPTION, RESOURCE_GROUP)
}

pub fn nic_ref(name: &str) -> NetworkInterfaceRef {
    NetworkInterfaceRef {
        id: ident::build_network_interface_id(&scope(), name),
        name: name.into(),
    }
}

pub fn vm_record(name: &str, state: &str, size_name: &str) -> VmRecord {
    VmRecord {
        vm_id: format!("guid-{name}"),
        name: name.into(),
        provisioning_state: state.into(),
        size_name: size_name.into(),
        os_disk_gb: 30,
        private_ips: vec!["10.0.0.4".into()],
    }
}

/// Scriptable provider stand-in: canned pages and records, plus switches
/// for the failure modes the operation core has to translate.
#[derive(Default)]
pub struct StubApi {
    pub pages: Vec<SizePage>,
    pub nic: Option<NetworkInterfaceRef>,
    pub vm: Option<VmRecord>,
    /// When set, `create_vm` never resolves.
    pub hang_create: bool,
    pub fail_delete: bool,
    pub created: Mutex<Vec<CreateVmSpec>>,
    pub deleted: Mutex<Vec<ResourceId>>,
}

impl StubApi {
    /// Catalog split into pages chained by index-valued continuation
    /// links.
    pub fn paged(pages: Vec<Vec<VmSizeOffering>>) -> Self {
        let last = pages.len().saturating_sub(1);
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(index, offerings)| SizePage {
                offerings,
                next: (index < last).then(|| (index + 1).to_string()),
            })
            .collect();
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn one_page(offerings: Vec<VmSizeOffering>) -> Self {
        Self::paged(vec![offerings])
    }
}

#[async_trait]
impl ProviderApi for StubApi {
    async fn list_vm_sizes(&self, _region: &str, next: Option<&str>) -> Result<SizePage> {
        if self.pages.is_empty() {
            return Ok(SizePage {
                offerings: Vec::new(),
                next: None,
            });
        }
        let index: usize = match next {
            None => 0,
            Some(link) => link.parse().expect("stub continuation links are page indexes"),
        };
        Ok(self.pages[index].clone())
    }

    async fn get_network_interface(&self, id: &ResourceId) -> Result<NetworkInterfaceRef> {
        self.nic
            .clone()
            .ok_or_else(|| Error::ResourceNotFound(format!("nic {id}")))
    }

    async fn create_vm(&self, spec: &CreateVmSpec) -> Result<()> {
        if self.hang_create {
            futures_util::future::pending::<()>().await;
        }
        self.created.lock().await.push(spec.clone());
        Ok(())
    }

    async fn delete_vm(&self, id: &ResourceId) -> Result<()> {
        self.deleted.lock().await.push(id.clone());
        if self.fail_delete {
            return Err(Error::ResourceNotFound(format!("vm {id}")));
        }
        Ok(())
    }

    async fn get_vm(&self, id: &ResourceId) -> Result<VmRecord> {
        self.vm
            .clone()
            .ok_or_else(|| Error::ResourceNotFound(format!("vm {id}")))
    }
}

/// Authenticator handing out one fixed client, counting calls and
/// optionally failing the first few.
pub struct StubAuth {
    api: Arc<StubApi>,
    calls: AtomicUsize,
    fail_remaining: AtomicUsize,
}

impl StubAuth {
    pub fn new(api: Arc<StubApi>) -> Self {
        Self::failing_first(api, 0)
    }

    pub fn failing_first(api: Arc<StubApi>, failures: usize) -> Self {
        Self {
            api,
            calls: AtomicUsize::new(0),
            fail_remaining: AtomicUsize::new(failures),
        }
    }

    pub fn auth_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAuth for StubAuth {
    async fn authenticate(&self, _credential: &Credential) -> Result<Arc<dyn ProviderApi>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_remaining.load(Ordering::SeqCst) > 0 {
            self.fail_remaining.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::Unauthorized("stub credential rejected".into()));
        }
        Ok(self.api.clone())
    }
}

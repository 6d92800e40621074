//! Typed Rust client for the Azure Resource Manager REST API.
//!
//! Covers the subset needed for driving compute: OAuth2 client-credentials
//! tokens, VM size catalogs, network interfaces, virtual machines
//! (create, get, delete), and the VM image catalog.

mod types;

pub use types::*;

const BASE_URL: &str = "https://management.azure.com";
const LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";

const COMPUTE_API_VERSION: &str = "2024-07-01";
const NETWORK_API_VERSION: &str = "2024-05-01";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("arm api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("arm api {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
}

impl Error {
    /// True when the provider answered 404 for the addressed resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status, .. } if status.as_u16() == 404)
    }

    /// True when the provider rejected the token or credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api { status, .. } if matches!(status.as_u16(), 401 | 403))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for the ARM REST API, bound to one subscription.
#[derive(Clone)]
pub struct ArmClient {
    token: String,
    subscription_id: String,
    http: reqwest::Client,
}

impl ArmClient {
    /// Exchange service-principal credentials for a bearer token and build
    /// a client around it. The token endpoint rejects bad credentials
    /// here, before any resource call is made.
    pub async fn authenticate(
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        subscription_id: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::new();
        let resp = http
            .post(format!("{LOGIN_BASE_URL}/{tenant_id}/oauth2/v2.0/token"))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("scope", "https://management.azure.com/.default"),
            ])
            .send()
            .await?;

        let token: TokenResponse = Self::check(resp, "token").await?.json().await?;

        Ok(Self {
            token: token.access_token,
            subscription_id: subscription_id.into(),
            http,
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn url(&self, path: &str, api_version: &str) -> String {
        format!("{BASE_URL}{path}?api-version={api_version}")
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.token)
    }

    async fn check(resp: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api { endpoint, status, body });
        }
        Ok(resp)
    }

    /// Like `check` but also treats 404 as success (for delete idempotency).
    async fn check_allow_404(
        resp: reqwest::Response,
        endpoint: &'static str,
    ) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() && status.as_u16() != 404 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api { endpoint, status, body });
        }
        Ok(resp)
    }

    // ── Virtual machine sizes ────────────────────────────────────────

    /// One page of the size catalog for a region. Pass the previous
    /// page's `next_link` to continue; `None` starts from the first page.
    pub async fn list_vm_sizes(
        &self,
        region: &str,
        next_link: Option<&str>,
    ) -> Result<VmSizeList> {
        let url = match next_link {
            Some(link) => link.to_string(),
            None => self.url(
                &format!(
                    "/subscriptions/{}/providers/Microsoft.Compute/locations/{region}/vmSizes",
                    self.subscription_id
                ),
                COMPUTE_API_VERSION,
            ),
        };

        let resp = self
            .http
            .get(url)
            .header("Authorization", self.auth())
            .send()
            .await?;

        Self::check(resp, "list vm sizes")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    // ── Network interfaces ───────────────────────────────────────────

    /// Fetch a network interface by its full ARM resource id
    /// (`/subscriptions/.../networkInterfaces/<name>`).
    pub async fn get_network_interface(&self, resource_id: &str) -> Result<NetworkInterface> {
        let resp = self
            .http
            .get(self.url(resource_id, NETWORK_API_VERSION))
            .header("Authorization", self.auth())
            .send()
            .await?;

        Self::check(resp, "get network interface")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    // ── Virtual machines ─────────────────────────────────────────────

    /// Start creating a virtual machine. ARM answers as soon as the
    /// request is accepted; provisioning continues server-side.
    pub async fn create_virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
        body: &VirtualMachineCreate,
    ) -> Result<VirtualMachine> {
        let path = format!(
            "/subscriptions/{}/resourceGroups/{resource_group}/providers/Microsoft.Compute/virtualMachines/{name}",
            self.subscription_id
        );
        let resp = self
            .http
            .put(self.url(&path, COMPUTE_API_VERSION))
            .header("Authorization", self.auth())
            .json(body)
            .send()
            .await?;

        Self::check(resp, "create virtual machine")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    pub async fn get_virtual_machine(&self, resource_id: &str) -> Result<VirtualMachine> {
        let resp = self
            .http
            .get(self.url(resource_id, COMPUTE_API_VERSION))
            .header("Authorization", self.auth())
            .send()
            .await?;

        Self::check(resp, "get virtual machine")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    pub async fn delete_virtual_machine(&self, resource_id: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.url(resource_id, COMPUTE_API_VERSION))
            .header("Authorization", self.auth())
            .send()
            .await?;

        Self::check_allow_404(resp, "delete virtual machine").await?;
        Ok(())
    }

    // ── VM image catalog ─────────────────────────────────────────────

    pub async fn list_vm_image_publishers(&self, region: &str) -> Result<Vec<VmImageResource>> {
        let path = format!(
            "/subscriptions/{}/providers/Microsoft.Compute/locations/{region}/publishers",
            self.subscription_id
        );
        let resp = self
            .http
            .get(self.url(&path, COMPUTE_API_VERSION))
            .header("Authorization", self.auth())
            .send()
            .await?;

        Self::check(resp, "list image publishers")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    pub async fn list_vm_image_offers(
        &self,
        region: &str,
        publisher: &str,
    ) -> Result<Vec<VmImageResource>> {
        let path = format!(
            "/subscriptions/{}/providers/Microsoft.Compute/locations/{region}/publishers/{publisher}/artifacttypes/vmimage/offers",
            self.subscription_id
        );
        let resp = self
            .http
            .get(self.url(&path, COMPUTE_API_VERSION))
            .header("Authorization", self.auth())
            .send()
            .await?;

        Self::check(resp, "list image offers")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    pub async fn list_vm_image_skus(
        &self,
        region: &str,
        publisher: &str,
        offer: &str,
    ) -> Result<Vec<VmImageResource>> {
        let path = format!(
            "/subscriptions/{}/providers/Microsoft.Compute/locations/{region}/publishers/{publisher}/artifacttypes/vmimage/offers/{offer}/skus",
            self.subscription_id
        );
        let resp = self
            .http
            .get(self.url(&path, COMPUTE_API_VERSION))
            .header("Authorization", self.auth())
            .send()
            .await?;

        Self::check(resp, "list image skus")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }
}

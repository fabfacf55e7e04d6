use crate::errors::{ApiError, HttpError, Result};
use crate::models::{
    DatacenterSummary, HostSummary, MarkAsVmSpec, ResourcePoolSummary, VmInfo, VmSummary,
};
use log::{debug, error, info, trace, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

const SESSION_HEADER: &str = "vmware-api-session-id";

/// Trait for providing connection settings to the vCenter client
/// This allows the CLI to implement config without circular dependencies
pub trait ApiConfig {
    type Error;

    /// vCenter host name or URL
    fn get_server(&self) -> std::result::Result<String, Self::Error>;

    /// Username and password for the session
    fn get_credentials(&self) -> std::result::Result<(String, String), Self::Error>;

    /// Datacenter name; `None` means the only datacenter there is
    fn get_datacenter(&self) -> std::result::Result<Option<String>, Self::Error> {
        Ok(None)
    }

    /// Skip TLS certificate verification
    fn allow_insecure(&self) -> bool {
        true
    }

    fn get_timeout(&self) -> Option<Duration> {
        None
    }
}

/// Everything needed to open a session
#[derive(Clone)]
pub struct ConnectionSettings {
    pub server: String,
    pub username: String,
    pub password: String,
    pub datacenter: Option<String>,
    pub insecure: bool,
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"***")
            .field("datacenter", &self.datacenter)
            .field("insecure", &self.insecure)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ConnectionSettings {
    /// Build settings from any configuration implementing `ApiConfig`
    pub fn from_config<C>(config: &C) -> std::result::Result<Self, C::Error>
    where
        C: ApiConfig,
    {
        let (username, password) = config.get_credentials()?;
        Ok(Self {
            server: config.get_server()?,
            username,
            password,
            datacenter: config.get_datacenter()?,
            insecure: config.allow_insecure(),
            timeout: config.get_timeout(),
        })
    }
}

/// Turn `vc.example.com` or `https://vc.example.com/` into a base URL
pub fn server_base_url(server: &str) -> Result<Url> {
    let server = server.trim().trim_end_matches('/');
    if server.is_empty() {
        return Err(ApiError::Config("vCenter server is empty".to_string()));
    }

    let with_scheme = if server.contains("://") {
        server.to_string()
    } else {
        format!("https://{}", server)
    };

    let url = Url::parse(&with_scheme)?;
    if url.host_str().is_none() {
        return Err(ApiError::Config(format!(
            "vCenter server '{}' has no host",
            server
        )));
    }
    Ok(url)
}

/// Datacenter the session is scoped to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datacenter {
    pub id: String,
    pub name: String,
}

/// Pick the datacenter by name, or the only one when no name is given
pub fn choose_datacenter(
    requested: Option<&str>,
    available: Vec<DatacenterSummary>,
) -> Result<Datacenter> {
    let found = match requested {
        Some(name) => available.into_iter().find(|dc| dc.name == name),
        None => {
            if available.len() > 1 {
                let names: Vec<String> = available.into_iter().map(|dc| dc.name).collect();
                return Err(ApiError::Datacenter(format!(
                    "several datacenters found, choose one of: {}",
                    names.join(", ")
                )));
            }
            available.into_iter().next()
        }
    };

    found
        .map(|dc| Datacenter {
            id: dc.datacenter,
            name: dc.name,
        })
        .ok_or_else(|| {
            ApiError::Datacenter(format!(
                "unable to find vSphere datacenter '{}'",
                requested.unwrap_or_default()
            ))
        })
}

/// HTTP client for the vCenter Automation REST API, bound to one session
/// and one datacenter
#[derive(Debug, Clone)]
pub struct VsphereClient {
    client: Client,
    base_url: Url,
    session_id: String,
    datacenter: Datacenter,
}

impl VsphereClient {
    /// Log in and resolve the datacenter
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self> {
        let base_url = server_base_url(&settings.server)?;
        debug!("Creating VsphereClient");
        debug!("  Server: {}", base_url);
        debug!("  Username: {}", settings.username);
        debug!("  Insecure connection: {}", settings.insecure);

        let mut builder = Client::builder().danger_accept_invalid_certs(settings.insecure);
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let session_id = login(&client, &base_url, settings).await.map_err(|e| {
            error!(
                "Unable to create vSphere session with server='{}', username='{}', insecure_connection='{}'",
                settings.server, settings.username, settings.insecure
            );
            e
        })?;

        let mut vsphere = Self {
            client,
            base_url,
            session_id,
            datacenter: Datacenter {
                id: String::new(),
                name: String::new(),
            },
        };

        let datacenters: Vec<DatacenterSummary> = match settings.datacenter.as_deref() {
            Some(name) => vsphere.get_json("vcenter/datacenter", &[("names", name)]).await?,
            None => vsphere.get_json("vcenter/datacenter", &[]).await?,
        };
        vsphere.datacenter = choose_datacenter(settings.datacenter.as_deref(), datacenters)?;
        info!(
            "Connected to {} (datacenter '{}')",
            vsphere.base_url, vsphere.datacenter.name
        );

        Ok(vsphere)
    }

    pub fn datacenter(&self) -> &Datacenter {
        &self.datacenter
    }

    /// End the session. Failures are logged, the session expires anyway.
    pub async fn logout(&self) {
        debug!("Closing vSphere session");
        match self.request(self.client.delete(self.url("session"))).await {
            Ok(_) => debug!("Session closed"),
            Err(e) => warn!("Unable to close vSphere session: {}", e),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/api/{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    async fn request(&self, builder: RequestBuilder) -> Result<Response> {
        trace!(
            "  {}: {}...",
            SESSION_HEADER,
            self.session_id.chars().take(4).collect::<String>()
        );
        let response = builder
            .header(SESSION_HEADER, &self.session_id)
            .send()
            .await
            .map_err(|e| {
                error!("Request failed: {:?}", e);
                HttpError::Request(e)
            })?;

        debug!("Response status: {}", response.status());
        handle_response(response).await
    }

    /// Make a GET request and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.url(endpoint);
        debug!("HTTP GET request to: {} {:?}", url, query);
        let response = self.request(self.client.get(&url).query(query)).await?;
        let body = response.json::<T>().await.map_err(HttpError::Request)?;
        Ok(body)
    }

    /// Make a POST request
    async fn post(&self, endpoint: &str, body: Option<Value>) -> Result<Response> {
        let url = self.url(endpoint);
        debug!("HTTP POST request to: {}", url);

        let mut builder = self.client.post(&url);
        if let Some(body) = body {
            trace!(
                "Request body: {}",
                serde_json::to_string_pretty(&body).unwrap_or_else(|_| "Invalid JSON".to_string())
            );
            builder = builder.json(&body);
        }
        self.request(builder).await
    }

    /// Make a DELETE request
    async fn delete(&self, endpoint: &str) -> Result<Response> {
        let url = self.url(endpoint);
        debug!("HTTP DELETE request to: {}", url);
        self.request(self.client.delete(&url)).await
    }

    /// All VMs and templates of the datacenter
    pub async fn list_vms(&self) -> Result<Vec<VmSummary>> {
        debug!("Fetching virtual machines");
        let vms: Vec<VmSummary> = self
            .get_json("vcenter/vm", &[("datacenters", self.datacenter.id.as_str())])
            .await?;
        info!("Successfully fetched {} virtual machines", vms.len());
        Ok(vms)
    }

    pub async fn get_vm(&self, vm: &str) -> Result<VmInfo> {
        debug!("Fetching virtual machine {}", vm);
        self.get_json(&format!("vcenter/vm/{}", vm), &[]).await
    }

    pub async fn list_hosts(&self) -> Result<Vec<HostSummary>> {
        debug!("Fetching hosts");
        self.get_json("vcenter/host", &[("datacenters", self.datacenter.id.as_str())])
            .await
    }

    pub async fn get_host(&self, host: &str) -> Result<Option<HostSummary>> {
        debug!("Fetching host {}", host);
        let hosts: Vec<HostSummary> = self.get_json("vcenter/host", &[("hosts", host)]).await?;
        Ok(hosts.into_iter().next())
    }

    pub async fn list_host_pools(&self, host: &str) -> Result<Vec<ResourcePoolSummary>> {
        debug!("Fetching resource pools of host {}", host);
        self.get_json("vcenter/resource-pool", &[("hosts", host)])
            .await
    }

    pub async fn mark_as_vm(&self, vm: &str, spec: &MarkAsVmSpec) -> Result<()> {
        debug!("Marking template {} as virtual machine", vm);
        let body = serde_json::to_value(spec)?;
        self.post(&format!("vcenter/vm/{}?action=mark-as-vm", vm), Some(body))
            .await?;
        info!("Successfully converted {}", vm);
        Ok(())
    }

    pub async fn delete_vm(&self, vm: &str) -> Result<()> {
        debug!("Deleting virtual machine {}", vm);
        self.delete(&format!("vcenter/vm/{}", vm)).await?;
        info!("Successfully deleted {}", vm);
        Ok(())
    }
}

async fn login(client: &Client, base_url: &Url, settings: &ConnectionSettings) -> Result<String> {
    let url = format!("{}/api/session", base_url.as_str().trim_end_matches('/'));
    debug!("HTTP POST request to: {}", url);

    let response = client
        .post(&url)
        .basic_auth(&settings.username, Some(&settings.password))
        .send()
        .await
        .map_err(|e| {
            error!("Login request failed: {:?}", e);
            HttpError::Request(e)
        })?;

    let response = handle_response(response).await?;
    let session_id: String = response.json().await.map_err(HttpError::Request)?;
    debug!("Session established");
    Ok(session_id)
}

/// Handle HTTP response and convert errors
async fn handle_response(response: Response) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        debug!("Request successful with status: {}", status);
        return Ok(response);
    }

    let path = response.url().path().to_string();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    error!("Request failed with status: {}", status);
    debug!("Error response body: {}", error_text);

    Err(ApiError::Http(status_error(status, path, error_text)))
}

fn status_error(status: StatusCode, path: String, message: String) -> HttpError {
    match status {
        StatusCode::UNAUTHORIZED => HttpError::AuthenticationFailed,
        StatusCode::FORBIDDEN => HttpError::Forbidden,
        StatusCode::NOT_FOUND => HttpError::NotFound(path),
        StatusCode::TOO_MANY_REQUESTS => HttpError::RateLimited,
        StatusCode::SERVICE_UNAVAILABLE => HttpError::ServiceUnavailable,
        StatusCode::REQUEST_TIMEOUT => HttpError::Timeout,
        _ => HttpError::HttpError {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dc(id: &str, name: &str) -> DatacenterSummary {
        DatacenterSummary {
            datacenter: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_server_base_url() {
        assert_eq!(
            server_base_url("vc.example.com").unwrap().as_str(),
            "https://vc.example.com/"
        );
        assert_eq!(
            server_base_url("http://vc.lab:8080/").unwrap().as_str(),
            "http://vc.lab:8080/"
        );
        assert!(server_base_url("  ").is_err());
    }

    #[test]
    fn test_choose_datacenter_by_name() {
        let chosen = choose_datacenter(
            Some("DC2"),
            vec![dc("datacenter-1", "DC1"), dc("datacenter-2", "DC2")],
        )
        .unwrap();
        assert_eq!(chosen.id, "datacenter-2");

        assert!(choose_datacenter(Some("DC3"), vec![dc("datacenter-1", "DC1")]).is_err());
    }

    #[test]
    fn test_choose_default_datacenter() {
        let chosen = choose_datacenter(None, vec![dc("datacenter-1", "DC1")]).unwrap();
        assert_eq!(chosen.name, "DC1");

        assert!(choose_datacenter(None, Vec::new()).is_err());
        assert!(choose_datacenter(
            None,
            vec![dc("datacenter-1", "DC1"), dc("datacenter-2", "DC2")]
        )
        .is_err());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, String::new(), String::new()),
            HttpError::AuthenticationFailed
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "/api/vcenter/vm/vm-1".to_string(), String::new()),
            HttpError::NotFound(path) if path == "/api/vcenter/vm/vm-1"
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, String::new(), "bad spec".to_string()),
            HttpError::HttpError { status: 400, .. }
        ));
    }

    #[test]
    fn test_settings_debug_hides_password() {
        let settings = ConnectionSettings {
            server: "vc".to_string(),
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            datacenter: None,
            insecure: true,
            timeout: None,
        };
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }
}

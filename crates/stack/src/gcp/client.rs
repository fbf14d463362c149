//! GCP API client implementation.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::error::StackError;
use crate::gcp::models::{
    ClusterListResponse, CreateClusterBody, CreateServiceAccountBody, Firewall,
    FirewallDefinition, GkeCluster, Operation, Policy, ServiceAccount, SetIamPolicyBody,
};
use crate::gcp::render;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Polling interval when waiting for resources.
const POLL_INTERVAL_SECS: u64 = 15;

const CONTAINER_BASE: &str = "https://container.googleapis.com/v1";
const COMPUTE_BASE: &str = "https://compute.googleapis.com/compute/v1";
const IAM_BASE: &str = "https://iam.googleapis.com/v1";
const RESOURCE_MANAGER_BASE: &str = "https://cloudresourcemanager.googleapis.com/v1";

/// Cluster lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterStatus {
    /// Cluster is being created.
    Creating,
    /// Cluster is active and running.
    Running,
    /// Cluster is being updated.
    Updating,
    /// Cluster is being deleted.
    Deleting,
    /// Cluster is in an error state.
    Error,
    /// Unknown status.
    Unknown,
}

impl ClusterStatus {
    /// Map the Container API status string to a typed status.
    #[must_use]
    pub fn from_api(status: &str) -> Self {
        match status {
            "PROVISIONING" => Self::Creating,
            "RUNNING" => Self::Running,
            "RECONCILING" | "UPDATING" => Self::Updating,
            "STOPPING" | "DEGRADED" => Self::Deleting,
            "ERROR" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Creating => write!(f, "creating"),
            Self::Running => write!(f, "running"),
            Self::Updating => write!(f, "updating"),
            Self::Deleting => write!(f, "deleting"),
            Self::Error => write!(f, "error"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// GCP API client.
///
/// Thin and declarative: every method is a single call against one of the
/// Container, Compute, IAM, or Resource Manager APIs. There is no
/// orchestration here; callers decide ordering and what "ensure" means.
#[derive(Clone)]
pub struct Gcp {
    /// HTTP client.
    client: Client,
    /// Project ID.
    project_id: String,
    /// Access token (from service account or user).
    access_token: String,
    /// Cluster location (region or zone).
    location: String,
    container_base: String,
    compute_base: String,
    iam_base: String,
    resource_manager_base: String,
}

impl Gcp {
    /// Create a new GCP client.
    ///
    /// # Arguments
    /// * `project_id` - GCP project ID
    /// * `access_token` - `OAuth2` access token
    /// * `location` - Cluster location, e.g. "us-central1"
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(
        project_id: impl Into<String>,
        access_token: impl Into<String>,
        location: impl Into<String>,
    ) -> Result<Self, StackError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(StackError::Http)?;

        Ok(Self {
            client,
            project_id: project_id.into(),
            access_token: access_token.into(),
            location: location.into(),
            container_base: CONTAINER_BASE.to_string(),
            compute_base: COMPUTE_BASE.to_string(),
            iam_base: IAM_BASE.to_string(),
            resource_manager_base: RESOURCE_MANAGER_BASE.to_string(),
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base: &str) -> Self {
        self.container_base = base.to_string();
        self.compute_base = base.to_string();
        self.iam_base = base.to_string();
        self.resource_manager_base = base.to_string();
        self
    }

    fn cluster_url(&self, name: &str) -> String {
        format!(
            "{}/projects/{}/locations/{}/clusters/{}",
            self.container_base, self.project_id, self.location, name
        )
    }

    /// Make an authenticated GET request.
    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, StackError> {
        debug!(url = %url, "GET request");

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated POST request.
    async fn post<T, B>(&self, url: &str, body: &B) -> Result<T, StackError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        debug!(url = %url, "POST request");

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated POST request, discarding the response body.
    async fn post_operation<B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<(), StackError> {
        debug!(url = %url, "POST request (operation)");

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(StackError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// Make an authenticated DELETE request. Missing resources are not an
    /// error; deletion is idempotent.
    async fn delete(&self, url: &str) -> Result<(), StackError> {
        debug!(url = %url, "DELETE request");

        let response = self
            .client
            .delete(url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(StackError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// Handle API response.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StackError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %text, "Failed to parse response");
                StackError::Serialization(e)
            })
        } else if status == StatusCode::NOT_FOUND {
            Err(StackError::NotFound(text))
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(StackError::Auth(text))
        } else {
            Err(StackError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    // ========================================================================
    // Container API - clusters
    // ========================================================================

    /// Create the cluster.
    ///
    /// # Errors
    /// Returns error on any non-success API response.
    pub async fn create_cluster(&self, body: &CreateClusterBody) -> Result<Operation, StackError> {
        info!(
            name = %body.cluster.name,
            location = %self.location,
            pools = body.cluster.node_pools.len(),
            "Creating GKE cluster"
        );

        let url = format!(
            "{}/projects/{}/locations/{}/clusters",
            self.container_base, self.project_id, self.location
        );

        let operation: Operation = self.post(&url, body).await?;

        info!(operation = %operation.name, "GKE cluster creation initiated");
        Ok(operation)
    }

    /// Get a cluster by name.
    ///
    /// # Errors
    /// Returns [`StackError::NotFound`] if the cluster does not exist.
    pub async fn get_cluster(&self, name: &str) -> Result<GkeCluster, StackError> {
        self.get(&self.cluster_url(name)).await
    }

    /// List clusters across all locations of the project.
    ///
    /// # Errors
    /// Returns error on any non-success API response.
    pub async fn list_clusters(&self) -> Result<Vec<GkeCluster>, StackError> {
        let url = format!(
            "{}/projects/{}/locations/-/clusters",
            self.container_base, self.project_id
        );

        let response: ClusterListResponse = self.get(&url).await?;
        Ok(response.clusters)
    }

    /// Delete a cluster. Succeeds if the cluster is already gone.
    ///
    /// # Errors
    /// Returns error on any non-success API response other than 404.
    pub async fn delete_cluster(&self, name: &str) -> Result<(), StackError> {
        info!(cluster = %name, "Deleting GKE cluster");
        self.delete(&self.cluster_url(name)).await?;
        info!(cluster = %name, "GKE cluster deletion initiated");
        Ok(())
    }

    /// Poll until the cluster reports `RUNNING`.
    ///
    /// # Errors
    /// Returns [`StackError::Timeout`] after `timeout_secs`, or an API
    /// error if the cluster enters an error state.
    pub async fn wait_cluster_ready(
        &self,
        name: &str,
        timeout_secs: u64,
    ) -> Result<GkeCluster, StackError> {
        info!(cluster = %name, timeout_secs, "Waiting for cluster to be ready");

        let start = std::time::Instant::now();
        let timeout = Duration::from_secs(timeout_secs);

        loop {
            let cluster = self.get_cluster(name).await?;
            let status = ClusterStatus::from_api(&cluster.status);

            debug!(
                cluster = %name,
                status = %status,
                elapsed_secs = start.elapsed().as_secs(),
                "Polling cluster status"
            );

            if status == ClusterStatus::Running {
                info!(cluster = %name, "Cluster is ready");
                return Ok(cluster);
            }

            if status == ClusterStatus::Error {
                return Err(StackError::Api {
                    status: 500,
                    message: "Cluster entered error state".to_string(),
                });
            }

            if start.elapsed() > timeout {
                return Err(StackError::Timeout(timeout_secs));
            }

            tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;
        }
    }

    /// Render a kubeconfig for the cluster, deferring credentials to
    /// `gcloud` at use time.
    ///
    /// # Errors
    /// Returns [`StackError::Config`] if the cluster has no endpoint yet.
    pub async fn kubeconfig(&self, name: &str) -> Result<String, StackError> {
        let cluster = self.get_cluster(name).await?;

        let endpoint = cluster
            .endpoint
            .ok_or_else(|| StackError::Config("Cluster endpoint not available".to_string()))?;

        Ok(render_kubeconfig(
            &cluster.name,
            &endpoint,
            &self.project_id,
            &self.location,
        ))
    }

    // ========================================================================
    // IAM - service accounts and project policy
    // ========================================================================

    /// Create the node service account.
    ///
    /// # Errors
    /// Returns error on any non-success API response.
    pub async fn create_service_account(
        &self,
        body: &CreateServiceAccountBody,
    ) -> Result<ServiceAccount, StackError> {
        info!(account_id = %body.account_id, "Creating service account");

        let url = format!(
            "{}/projects/{}/serviceAccounts",
            self.iam_base, self.project_id
        );

        self.post(&url, body).await
    }

    /// Get a service account by email.
    ///
    /// # Errors
    /// Returns [`StackError::NotFound`] if the account does not exist.
    pub async fn get_service_account(&self, email: &str) -> Result<ServiceAccount, StackError> {
        let url = format!(
            "{}/projects/{}/serviceAccounts/{}",
            self.iam_base, self.project_id, email
        );
        self.get(&url).await
    }

    /// Delete a service account. Succeeds if it is already gone.
    ///
    /// # Errors
    /// Returns error on any non-success API response other than 404.
    pub async fn delete_service_account(&self, email: &str) -> Result<(), StackError> {
        info!(email = %email, "Deleting service account");
        let url = format!(
            "{}/projects/{}/serviceAccounts/{}",
            self.iam_base, self.project_id, email
        );
        self.delete(&url).await
    }

    /// Read the project IAM policy.
    ///
    /// # Errors
    /// Returns error on any non-success API response.
    pub async fn get_iam_policy(&self) -> Result<Policy, StackError> {
        let url = format!(
            "{}/projects/{}:getIamPolicy",
            self.resource_manager_base, self.project_id
        );
        self.post(&url, &serde_json::json!({})).await
    }

    /// Write the project IAM policy.
    ///
    /// # Errors
    /// Returns error on any non-success API response.
    pub async fn set_iam_policy(&self, policy: Policy) -> Result<Policy, StackError> {
        let url = format!(
            "{}/projects/{}:setIamPolicy",
            self.resource_manager_base, self.project_id
        );
        self.post(&url, &SetIamPolicyBody { policy }).await
    }

    /// Grant roles to a service account on the project, read-modify-write.
    /// Bindings that already carry the member are left alone; the write is
    /// skipped entirely when nothing changed.
    ///
    /// # Errors
    /// Returns error on any non-success API response.
    pub async fn grant_roles(&self, email: &str, roles: &[&str]) -> Result<(), StackError> {
        let mut policy = self.get_iam_policy().await?;
        let member = render::iam_member(email);

        let mut added = 0;
        for role in roles {
            match policy.bindings.iter_mut().find(|b| b.role == *role) {
                Some(binding) => {
                    if !binding.members.contains(&member) {
                        binding.members.push(member.clone());
                        added += 1;
                    }
                }
                None => {
                    policy.bindings.push(crate::gcp::models::Binding {
                        role: (*role).to_string(),
                        members: vec![member.clone()],
                    });
                    added += 1;
                }
            }
        }

        if added == 0 {
            debug!(email = %email, "All role grants already present");
            return Ok(());
        }

        info!(email = %email, added, "Granting project roles");
        self.set_iam_policy(policy).await?;
        Ok(())
    }

    // ========================================================================
    // Compute API - firewalls
    // ========================================================================

    /// Insert a firewall rule.
    ///
    /// # Errors
    /// Returns error on any non-success API response.
    pub async fn insert_firewall(&self, body: &FirewallDefinition) -> Result<(), StackError> {
        info!(rule = %body.name, "Inserting firewall rule");

        let url = format!(
            "{}/projects/{}/global/firewalls",
            self.compute_base, self.project_id
        );

        self.post_operation(&url, body).await?;

        info!(rule = %body.name, "Firewall rule insertion initiated");
        Ok(())
    }

    /// Get a firewall rule by name.
    ///
    /// # Errors
    /// Returns [`StackError::NotFound`] if the rule does not exist.
    pub async fn get_firewall(&self, name: &str) -> Result<Firewall, StackError> {
        let url = format!(
            "{}/projects/{}/global/firewalls/{}",
            self.compute_base, self.project_id, name
        );
        self.get(&url).await
    }

    /// Delete a firewall rule. Succeeds if it is already gone.
    ///
    /// # Errors
    /// Returns error on any non-success API response other than 404.
    pub async fn delete_firewall(&self, name: &str) -> Result<(), StackError> {
        info!(rule = %name, "Deleting firewall rule");
        let url = format!(
            "{}/projects/{}/global/firewalls/{}",
            self.compute_base, self.project_id, name
        );
        self.delete(&url).await
    }
}

/// Kubeconfig that fetches credentials through `gcloud` at use time, so no
/// token material lands on disk.
fn render_kubeconfig(name: &str, endpoint: &str, project: &str, location: &str) -> String {
    format!(
        r"apiVersion: v1
kind: Config
clusters:
- cluster:
    server: https://{endpoint}
  name: {name}
contexts:
- context:
    cluster: {name}
    user: {name}
  name: {name}
current-context: {name}
users:
- name: {name}
  user:
    exec:
      apiVersion: client.authentication.k8s.io/v1beta1
      command: gcloud
      args:
        - container
        - clusters
        - get-credentials
        - {name}
        - --project
        - {project}
        - --location
        - {location}
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_cluster_status_mapping() {
        assert_eq!(ClusterStatus::from_api("PROVISIONING"), ClusterStatus::Creating);
        assert_eq!(ClusterStatus::from_api("RUNNING"), ClusterStatus::Running);
        assert_eq!(ClusterStatus::from_api("RECONCILING"), ClusterStatus::Updating);
        assert_eq!(ClusterStatus::from_api("ERROR"), ClusterStatus::Error);
        assert_eq!(ClusterStatus::from_api("SOMETHING_NEW"), ClusterStatus::Unknown);
    }

    #[test]
    fn test_cluster_status_display() {
        assert_eq!(ClusterStatus::Running.to_string(), "running");
        assert_eq!(ClusterStatus::Creating.to_string(), "creating");
    }

    #[test]
    fn test_render_kubeconfig_defers_to_gcloud() {
        let kubeconfig = render_kubeconfig("edge", "10.0.0.2", "acme-prod", "us-central1");
        assert!(kubeconfig.contains("server: https://10.0.0.2"));
        assert!(kubeconfig.contains("command: gcloud"));
        assert!(kubeconfig.contains("- acme-prod"));
        assert!(!kubeconfig.contains("token"));
    }

    #[tokio::test]
    async fn test_get_cluster_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/projects/acme-prod/locations/us-central1/clusters/edge",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "edge",
                "location": "us-central1",
                "status": "RUNNING",
                "endpoint": "10.0.0.2",
                "currentMasterVersion": "1.31.4-gke.1256000",
                "nodePools": [{
                    "name": "default-pool",
                    "initialNodeCount": 1,
                    "autoscaling": {"enabled": true, "minNodeCount": 1, "maxNodeCount": 100}
                }]
            })))
            .mount(&server)
            .await;

        let gcp = Gcp::new("acme-prod", "test-token", "us-central1")
            .unwrap()
            .with_base_url(&server.uri());

        let cluster = gcp.get_cluster("edge").await.unwrap();
        assert_eq!(cluster.name, "edge");
        assert_eq!(ClusterStatus::from_api(&cluster.status), ClusterStatus::Running);
        assert_eq!(cluster.node_pools.len(), 1);
        assert!(cluster.node_pools[0].autoscaling.as_ref().unwrap().enabled);
    }

    #[tokio::test]
    async fn test_get_cluster_missing_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("cluster not found"))
            .mount(&server)
            .await;

        let gcp = Gcp::new("acme-prod", "test-token", "us-central1")
            .unwrap()
            .with_base_url(&server.uri());

        let err = gcp.get_cluster("ghost").await.unwrap_err();
        assert!(matches!(err, StackError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_firewall_tolerates_missing_rule() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such rule"))
            .mount(&server)
            .await;

        let gcp = Gcp::new("acme-prod", "test-token", "us-central1")
            .unwrap()
            .with_base_url(&server.uri());

        assert!(gcp.delete_firewall("edge-allow-master-webhooks").await.is_ok());
    }
}

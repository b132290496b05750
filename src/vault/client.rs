//! Vault HTTP API client implementation.
//!
//! This module provides the HTTP client for the `sys/` endpoints of the Vault
//! REST API. It performs exactly one request per call; retries are left to
//! the next run.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{Result, VaultError};

use super::api::VaultApi;
use super::types::{BackendInfo, BackendRequest, DataResponse, KeyList, PolicyBody, PolicyWrite};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header carrying the Vault token.
const TOKEN_HEADER: &str = "X-Vault-Token";

/// Vault API client for any number of instances.
#[derive(Debug, Clone)]
pub struct VaultClient {
    /// HTTP client.
    client: Client,
    /// Token per instance address.
    tokens: HashMap<String, String>,
}

impl VaultClient {
    /// Creates a new Vault API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(tokens: HashMap<String, String>) -> Result<Self> {
        Self::with_timeout(tokens, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(tokens: HashMap<String, String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| VaultError::network("-", format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, tokens })
    }

    /// Builds the URL of a `v1` endpoint on an instance.
    fn url(address: &str, path: &str) -> String {
        format!(
            "{}/v1/{}",
            address.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Returns a request builder carrying the instance's token.
    fn request(&self, method: Method, address: &str, path: &str) -> Result<RequestBuilder> {
        let token = self.tokens.get(address).ok_or_else(|| VaultError::AuthenticationFailed {
            address: address.to_string(),
            message: String::from("no token configured for instance"),
        })?;

        Ok(self
            .client
            .request(method, Self::url(address, path))
            .header(TOKEN_HEADER, token.as_str()))
    }

    /// Sends a request and maps transport and status failures.
    ///
    /// A 404 is returned to the caller untouched so list calls can treat it
    /// as an empty result.
    async fn send(&self, address: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| VaultError::network(address, format!("Request failed: {e}")))?;

        let status = response.status();
        trace!(instance = address, status = status.as_u16(), "vault response");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(VaultError::AuthenticationFailed {
                address: address.to_string(),
                message: format!("token rejected ({status})"),
            }
            .into());
        }

        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(VaultError::api_error(address, status.as_u16(), body).into());
        }

        Ok(response)
    }

    /// Reads the `data` payload of an endpoint; `None` on 404.
    async fn read_data<T: DeserializeOwned>(&self, address: &str, path: &str) -> Result<Option<T>> {
        let request = self.request(Method::GET, address, path)?;
        let response = self.send(address, request).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let envelope: DataResponse<T> = response.json().await.map_err(|e| {
            VaultError::invalid_response(address, format!("Failed to parse response: {e}"))
        })?;
        Ok(Some(envelope.data))
    }

    /// Sends a mutating request with a JSON body.
    async fn write<B: Serialize + Sync>(
        &self,
        method: Method,
        address: &str,
        path: &str,
        body: &B,
    ) -> Result<()> {
        let request = self.request(method, address, path)?.json(body);
        let response = self.send(address, request).await?;
        Self::expect_found(address, path, &response)
    }

    /// Sends a `DELETE` request.
    async fn remove(&self, address: &str, path: &str) -> Result<()> {
        let request = self.request(Method::DELETE, address, path)?;
        let response = self.send(address, request).await?;
        Self::expect_found(address, path, &response)
    }

    /// Turns a 404 on a mutating call into an error.
    fn expect_found(address: &str, path: &str, response: &Response) -> Result<()> {
        if response.status() == StatusCode::NOT_FOUND {
            return Err(VaultError::api_error(address, 404, format!("{path} not found")).into());
        }
        Ok(())
    }

    /// Strips the trailing slash Vault uses in mount listings.
    fn mount_segment(path: &str) -> &str {
        path.trim_matches('/')
    }
}

#[async_trait]
impl VaultApi for VaultClient {
    async fn list_policies(&self, address: &str) -> Result<Vec<String>> {
        let listed: Option<KeyList> = self.read_data(address, "sys/policies/acl?list=true").await?;
        let names = listed.map(|l| l.keys).unwrap_or_default();
        debug!(instance = address, count = names.len(), "listed policies");
        Ok(names)
    }

    async fn read_policy(&self, address: &str, name: &str) -> Result<String> {
        let path = format!("sys/policies/acl/{name}");
        let body: Option<PolicyBody> = self.read_data(address, &path).await?;
        body.map(|b| b.policy).ok_or_else(|| {
            VaultError::api_error(address, 404, format!("policy {name} not found")).into()
        })
    }

    async fn write_policy(&self, address: &str, name: &str, rules: &str) -> Result<()> {
        let path = format!("sys/policies/acl/{name}");
        self.write(Method::PUT, address, &path, &PolicyWrite { policy: rules })
            .await
    }

    async fn delete_policy(&self, address: &str, name: &str) -> Result<()> {
        self.remove(address, &format!("sys/policies/acl/{name}"))
            .await
    }

    async fn list_secrets_engines(&self, address: &str) -> Result<BTreeMap<String, BackendInfo>> {
        let mounts: Option<BTreeMap<String, BackendInfo>> =
            self.read_data(address, "sys/mounts").await?;
        Ok(mounts.unwrap_or_default())
    }

    async fn enable_secrets_engine(
        &self,
        address: &str,
        path: &str,
        request: &BackendRequest,
    ) -> Result<()> {
        let path = format!("sys/mounts/{}", Self::mount_segment(path));
        self.write(Method::POST, address, &path, request).await
    }

    async fn tune_secrets_engine(
        &self,
        address: &str,
        path: &str,
        request: &BackendRequest,
    ) -> Result<()> {
        let tune = BackendRequest {
            backend_type: String::new(),
            description: request.description.clone(),
            options: request.options.clone(),
        };
        let path = format!("sys/mounts/{}/tune", Self::mount_segment(path));
        self.write(Method::POST, address, &path, &tune).await
    }

    async fn disable_secrets_engine(&self, address: &str, path: &str) -> Result<()> {
        self.remove(address, &format!("sys/mounts/{}", Self::mount_segment(path)))
            .await
    }

    async fn list_audit_devices(&self, address: &str) -> Result<BTreeMap<String, BackendInfo>> {
        let devices: Option<BTreeMap<String, BackendInfo>> =
            self.read_data(address, "sys/audit").await?;
        Ok(devices.unwrap_or_default())
    }

    async fn enable_audit_device(
        &self,
        address: &str,
        path: &str,
        request: &BackendRequest,
    ) -> Result<()> {
        let path = format!("sys/audit/{}", Self::mount_segment(path));
        self.write(Method::PUT, address, &path, request).await
    }

    async fn disable_audit_device(&self, address: &str, path: &str) -> Result<()> {
        self.remove(address, &format!("sys/audit/{}", Self::mount_segment(path)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvergeError;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> VaultClient {
        let tokens = HashMap::from([(server.uri(), String::from("s.test"))]);
        VaultClient::new(tokens).unwrap()
    }

    #[test]
    fn test_url_joins_cleanly() {
        assert_eq!(
            VaultClient::url("https://vault:8200/", "sys/mounts"),
            "https://vault:8200/v1/sys/mounts"
        );
    }

    #[tokio::test]
    async fn test_list_policies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sys/policies/acl"))
            .and(query_param("list", "true"))
            .and(header("X-Vault-Token", "s.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"keys": ["default", "readers", "root"]}
            })))
            .mount(&server)
            .await;

        let names = client_for(&server)
            .list_policies(&server.uri())
            .await
            .unwrap();
        assert_eq!(names, vec!["default", "readers", "root"]);
    }

    #[tokio::test]
    async fn test_read_policy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sys/policies/acl/readers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"name": "readers", "policy": "path \"kv/*\" {}"}
            })))
            .mount(&server)
            .await;

        let rules = client_for(&server)
            .read_policy(&server.uri(), "readers")
            .await
            .unwrap();
        assert_eq!(rules, "path \"kv/*\" {}");
    }

    #[tokio::test]
    async fn test_list_secrets_engines() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sys/mounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "kv/": {"type": "kv", "description": "kv store", "options": {"version": "2"}},
                    "sys/": {"type": "system", "description": "system endpoints", "options": null}
                }
            })))
            .mount(&server)
            .await;

        let mounts = client_for(&server)
            .list_secrets_engines(&server.uri())
            .await
            .unwrap();

        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts["kv/"].backend_type, "kv");
        assert_eq!(
            mounts["kv/"].normalized_options().get("version").map(String::as_str),
            Some("2")
        );
    }

    #[tokio::test]
    async fn test_enable_audit_device_sends_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/sys/audit/file"))
            .and(body_json(json!({
                "type": "file",
                "description": "file audit",
                "options": {"file_path": "/var/log/audit.log"}
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let request = BackendRequest {
            backend_type: String::from("file"),
            description: String::from("file audit"),
            options: [(String::from("file_path"), String::from("/var/log/audit.log"))]
                .into_iter()
                .collect(),
        };

        client_for(&server)
            .enable_audit_device(&server.uri(), "file/", &request)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_forbidden_maps_to_authentication_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sys/audit"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .list_audit_devices(&server.uri())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConvergeError::Vault(VaultError::AuthenticationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_api_failure() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/sys/mounts/kv"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .disable_secrets_engine(&server.uri(), "kv/")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConvergeError::Vault(VaultError::ApiRequestFailed { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_request() {
        let client = VaultClient::new(HashMap::new()).unwrap();
        let err = client.list_policies("http://127.0.0.1:1").await.unwrap_err();
        assert!(matches!(
            err,
            ConvergeError::Vault(VaultError::AuthenticationFailed { .. })
        ));
    }
}

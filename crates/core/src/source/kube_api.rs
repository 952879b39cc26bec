//! Kubernetes REST API source implementation.

use async_trait::async_trait;
use reqwest::{Certificate, Client, Identity};
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::resource::ResourceObject;

use super::connection::ClusterConnection;
use super::error::SourceError;
use super::traits::ItemSource;

/// Lists a custom resource (by default `virtualmachines.kubevirt.io/v1`)
/// across all namespaces, or within one.
pub struct KubeApiSource {
    client: Client,
    connection: ClusterConnection,
    group: String,
    version: String,
    resource: String,
    namespace: Option<String>,
    page_size: Option<u32>,
}

impl KubeApiSource {
    /// Creates a source for `connection` using the resource, namespace and
    /// paging settings of `config`.
    pub fn new(connection: ClusterConnection, config: &SourceConfig) -> Result<Self, SourceError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));

        if let Some(pem) = &connection.ca_pem {
            let certs = Certificate::from_pem_bundle(pem)
                .map_err(|e| SourceError::ClientBuild(format!("invalid CA bundle: {}", e)))?;
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }
        if let Some(identity) = &connection.client_identity {
            let identity = Identity::from_pkcs8_pem(&identity.cert_pem, &identity.key_pem)
                .map_err(|e| {
                    SourceError::ClientBuild(format!(
                        "invalid client certificate or key (PKCS#8 PEM key required): {}",
                        e
                    ))
                })?;
            builder = builder.identity(identity);
        }
        if connection.insecure_skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| SourceError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            connection,
            group: config.group.clone(),
            version: config.version.clone(),
            resource: config.resource.clone(),
            namespace: config.namespace.clone(),
            page_size: config.page_size,
        })
    }

    /// Resolves the connection from `config` and creates the source.
    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceError> {
        let connection = ClusterConnection::resolve(config)?;
        info!(
            server = %connection.server,
            origin = ?connection.origin,
            "Resolved cluster connection"
        );
        Self::new(connection, config)
    }

    pub fn connection(&self) -> &ClusterConnection {
        &self.connection
    }

    /// Build the list URL for one page.
    fn build_list_url(&self, continue_token: Option<&str>) -> String {
        let mut url = format!(
            "{}/apis/{}/{}",
            self.connection.server, self.group, self.version
        );
        if let Some(ns) = &self.namespace {
            url.push_str(&format!("/namespaces/{}", urlencoding::encode(ns)));
        }
        url.push('/');
        url.push_str(&self.resource);

        let mut params = Vec::new();
        if let Some(limit) = self.page_size {
            params.push(format!("limit={}", limit));
        }
        if let Some(token) = continue_token {
            params.push(format!("continue={}", urlencoding::encode(token)));
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }

        url
    }

    /// Fetch a single page of the list.
    async fn fetch_page(&self, continue_token: Option<&str>) -> Result<ListPage, SourceError> {
        let url = self.build_list_url(continue_token);
        debug!(url = %url, "Listing objects");

        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(token) = &self.connection.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        response
            .json::<ListPage>()
            .await
            .map_err(|e| SourceError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl ItemSource for KubeApiSource {
    fn name(&self) -> &str {
        "kube-api"
    }

    async fn list(&self) -> Result<Vec<ResourceObject>, SourceError> {
        let start = Instant::now();
        let mut objects = Vec::new();
        let mut continue_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.fetch_page(continue_token.as_deref()).await?;
            pages += 1;

            let item_api_version = page.api_version.clone();
            let item_kind = page
                .kind
                .as_deref()
                .and_then(|k| k.strip_suffix("List"))
                .map(str::to_string);

            for (idx, item) in page.items.into_iter().enumerate() {
                let mut object = ResourceObject::from_value(item).ok_or_else(|| {
                    SourceError::MalformedResponse(format!("item {} is not an object", idx))
                })?;
                fill_type_meta(&mut object, item_api_version.as_deref(), item_kind.as_deref());
                objects.push(object);
            }

            match page.metadata.continue_token {
                Some(token) if !token.is_empty() => continue_token = Some(token),
                _ => break,
            }
        }

        info!(
            resource = %format!("{}.{}", self.resource, self.group),
            namespace = self.namespace.as_deref().unwrap_or("*"),
            count = objects.len(),
            pages,
            duration_ms = start.elapsed().as_millis() as u64,
            "Listed objects"
        );

        Ok(objects)
    }
}

/// Items of a list response may omit `apiVersion`/`kind`; restore them from
/// the list's own type so exported files are self-describing.
fn fill_type_meta(object: &mut ResourceObject, api_version: Option<&str>, kind: Option<&str>) {
    let mut map = std::mem::take(object).into_map();
    if let Some(api_version) = api_version {
        map.entry("apiVersion")
            .or_insert_with(|| Value::String(api_version.to_string()));
    }
    if let Some(kind) = kind {
        map.entry("kind")
            .or_insert_with(|| Value::String(kind.to_string()));
    }
    *object = ResourceObject::new(map);
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    api_version: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    metadata: ListMeta,
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ListMeta {
    #[serde(default, rename = "continue")]
    continue_token: Option<String>,
}

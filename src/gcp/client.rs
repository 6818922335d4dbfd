//! API Client
//!
//! Main client for the control-plane REST API, combining authentication,
//! HTTP plumbing, and the URL layout of scoped collections.

use super::auth::GcpCredentials;
use super::http::{ApiHttpClient, HttpError};
use crate::ops::collector::ListPage;
use crate::ops::error::OpsError;
use crate::ops::poller::{OperationData, OperationError, OperationStatus};
use crate::ops::scope::{ResourceRef, Scope, ScopeKind};
use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

/// Production API host; override with `--api-host` to talk to a test or
/// staging endpoint.
pub const DEFAULT_API_HOST: &str = "https://compute.googleapis.com";

/// The API returns at most this many results per list page.
pub const MAX_PAGE_SIZE: u64 = 500;

/// Main API client
#[derive(Clone)]
pub struct GcpClient {
    credentials: GcpCredentials,
    http: ApiHttpClient,
    pub project_id: String,
    api_host: String,
}

impl GcpClient {
    /// Create a new client for one project
    pub async fn new(project_id: &str, api_host: &str) -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize credentials")?;

        let http = ApiHttpClient::new().context("Failed to create HTTP client")?;

        Ok(Self {
            credentials,
            http,
            project_id: project_id.to_string(),
            api_host: api_host.trim_end_matches('/').to_string(),
        })
    }

    // =========================================================================
    // URL layout
    // =========================================================================

    /// Build a project-relative API URL under one service
    fn project_url(&self, service: &str, path: &str) -> String {
        format!(
            "{}/{}/v1/projects/{}/{}",
            self.api_host, service, self.project_id, path
        )
    }

    /// Collection URL inside one scope
    pub fn scoped_url(&self, service: &str, scope: &Scope, collection: &str) -> String {
        match scope {
            Scope::Global => self.project_url(service, &format!("global/{}", collection)),
            Scope::Region(region) => {
                self.project_url(service, &format!("regions/{}/{}", region, collection))
            }
            Scope::Zone(zone) => {
                self.project_url(service, &format!("zones/{}/{}", zone, collection))
            }
        }
    }

    /// URL of one named resource inside a scope
    pub fn resource_url(&self, service: &str, scope: &Scope, collection: &str, name: &str) -> String {
        format!(
            "{}/{}",
            self.scoped_url(service, scope, collection),
            urlencoding::encode(name)
        )
    }

    // =========================================================================
    // Wire calls used by the lifecycle layer
    // =========================================================================

    /// Fetch one page of a scoped collection
    pub async fn list_page(
        &self,
        service: &str,
        scope: &Scope,
        collection: &str,
        filter: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<ListPage, OpsError> {
        let url = paged_url(&self.scoped_url(service, scope, collection), filter, page_token)?;
        let value = self
            .get_json(url.as_str(), &format!("{} in {}", collection, scope))
            .await?;
        Ok(parse_list_page(value))
    }

    /// Issue a delete and return the operation the backend started for it
    pub async fn delete_resource(
        &self,
        target: &ResourceRef,
        service: &str,
        collection: &str,
    ) -> Result<OperationData, OpsError> {
        let url = self.resource_url(service, &target.scope, collection, &target.name);
        let token = self.token().await?;
        let value = self
            .http
            .delete(&url, &token)
            .await
            .map_err(|e| to_ops_error(e, &target.to_string()))?;
        Ok(parse_operation(&value))
    }

    /// Fetch the current state of an operation in a scope
    pub async fn get_operation(
        &self,
        service: &str,
        scope: &Scope,
        operation: &str,
    ) -> Result<OperationData, OpsError> {
        let url = self.resource_url(service, scope, "operations", operation);
        let value = self
            .get_json(&url, &format!("operation {}", operation))
            .await?;
        Ok(parse_operation(&value))
    }

    /// Enumerate the known scope names of a kind (the resolver's lookup)
    pub async fn list_scope_names(&self, kind: ScopeKind) -> Result<Vec<String>, OpsError> {
        match kind {
            ScopeKind::Global => Ok(vec!["global".to_string()]),
            ScopeKind::Zonal => self.list_names("zones").await,
            ScopeKind::Regional => self.list_names("regions").await,
        }
    }

    /// List the name field of every entry in a top-level collection
    /// (zones, regions), draining all pages.
    async fn list_names(&self, collection: &str) -> Result<Vec<String>, OpsError> {
        let mut names = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let url = paged_url(&self.project_url("compute", collection), None, token.as_deref())?;
            let value = self.get_json(url.as_str(), collection).await?;
            let page = parse_list_page(value);
            names.extend(
                page.items
                    .iter()
                    .filter_map(|item| item.get("name").and_then(|n| n.as_str()))
                    .map(str::to_string),
            );
            match page.next_page_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(names)
    }

    /// Fetch the full documents of a top-level collection (for the zones
    /// and regions subcommands).
    pub async fn list_scope_details(&self, collection: &str) -> Result<Vec<Value>, OpsError> {
        let mut items = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let url = paged_url(&self.project_url("compute", collection), None, token.as_deref())?;
            let value = self.get_json(url.as_str(), collection).await?;
            let page = parse_list_page(value);
            items.extend(page.items);
            match page.next_page_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(items)
    }

    async fn token(&self) -> Result<String, OpsError> {
        self.credentials
            .get_token()
            .await
            .map_err(|e| OpsError::Transport(e.into()))
    }

    async fn get_json(&self, url: &str, resource: &str) -> Result<Value, OpsError> {
        let token = self.token().await?;
        self.http
            .get(url, &token)
            .await
            .map_err(|e| to_ops_error(e, resource))
    }
}

/// Map a wire-level failure into the lifecycle taxonomy: a 404 is the
/// backend's verdict on the named thing, everything else is transport.
fn to_ops_error(err: HttpError, resource: &str) -> OpsError {
    if err.is_not_found() {
        return OpsError::NotFound {
            resource: resource.to_string(),
        };
    }
    OpsError::transport(err)
}

fn paged_url(base: &str, filter: Option<&str>, page_token: Option<&str>) -> Result<Url, OpsError> {
    let mut url = Url::parse(base).map_err(OpsError::transport)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("maxResults", &MAX_PAGE_SIZE.to_string());
        if let Some(filter) = filter {
            query.append_pair("filter", filter);
        }
        if let Some(token) = page_token {
            query.append_pair("pageToken", token);
        }
    }
    Ok(url)
}

/// Decode a list response: an `items` array plus an optional continuation
/// token.
pub fn parse_list_page(response: Value) -> ListPage {
    let items = response
        .get("items")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let next_page_token = response
        .get("nextPageToken")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    ListPage {
        items,
        next_page_token,
    }
}

/// Decode an operation document. A DONE operation carrying an error block
/// is reported as terminally failed.
pub fn parse_operation(value: &Value) -> OperationData {
    let name = value
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let error = value
        .get("error")
        .and_then(|e| e.get("errors"))
        .and_then(|a| a.as_array())
        .and_then(|a| a.first())
        .map(|first| OperationError {
            code: first
                .get("code")
                .and_then(|v| v.as_str())
                .unwrap_or("UNKNOWN")
                .to_string(),
            message: first
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        });

    let mut status = OperationStatus::parse(
        value
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("PENDING"),
    );
    if error.is_some() && status == OperationStatus::Done {
        status = OperationStatus::Error;
    }

    OperationData {
        name,
        status,
        target_link: value
            .get("targetLink")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        error,
    }
}

/// Extract the short name from a resource URL
/// e.g. ".../projects/my-project/zones/us-central1-a/instances/vm-1" -> "vm-1"
pub fn extract_short_name(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

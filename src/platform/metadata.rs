use serde::Deserialize;

use super::Credentials;
use crate::error::{ExportError, ExportResult};
use crate::model::ResourceKind;
use crate::traits::HttpClient;

const TOKEN_HEADER: &str = "X-SF-TOKEN";

/// What the exporter needs to know about a resource before importing it
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceMetadata {
    pub display_name: String,
    /// Chart rendering type (`options.type`), only for widgets
    pub subtype: Option<String>,
    /// Child dashboard ids, only for groups
    pub children: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResource {
    name: String,
    #[serde(default)]
    dashboards: Option<Vec<String>>,
    #[serde(default)]
    options: Option<ApiChartOptions>,
}

#[derive(Debug, Deserialize)]
struct ApiChartOptions {
    #[serde(rename = "type")]
    chart_type: Option<String>,
}

/// Fetches display names, chart types and group children. Every call hits
/// the API; nothing is cached.
pub struct MetadataClient<'a> {
    http: &'a dyn HttpClient,
    credentials: &'a Credentials,
    api_domain: String,
}

impl<'a> MetadataClient<'a> {
    pub fn new(http: &'a dyn HttpClient, credentials: &'a Credentials, api_domain: &str) -> Self {
        Self {
            http,
            credentials,
            api_domain: api_domain.to_string(),
        }
    }

    /// URL of a resource, e.g. `https://api.us1.signalfx.com/v2/chart/<id>`
    pub fn resource_url(&self, kind: ResourceKind, id: &str) -> String {
        format!(
            "https://api.{}.{}/v2/{}/{}",
            self.credentials.realm,
            self.api_domain,
            kind.api_path(),
            id
        )
    }

    pub fn fetch_metadata(&self, kind: ResourceKind, id: &str) -> ExportResult<ResourceMetadata> {
        let url = self.resource_url(kind, id);
        let upstream = |message: String| ExportError::Upstream {
            kind,
            resource_id: id.to_string(),
            message,
        };

        let response = self
            .http
            .get(&url, &[(TOKEN_HEADER, self.credentials.api_token.as_str())])
            .map_err(|e| upstream(format!("{:#}", e)))?;

        if response.status == 401 || response.status == 403 {
            return Err(ExportError::Auth {
                kind,
                resource_id: id.to_string(),
                status: response.status,
            });
        }
        if !response.is_success() {
            return Err(upstream(format!("HTTP {} from {}", response.status, url)));
        }

        let resource: ApiResource = serde_json::from_str(&response.body)
            .map_err(|e| upstream(format!("malformed response: {}", e)))?;

        let subtype = match kind {
            ResourceKind::Widget => {
                let chart_type = resource
                    .options
                    .and_then(|o| o.chart_type)
                    .ok_or_else(|| upstream("chart response has no options.type".to_string()))?;
                Some(chart_type)
            }
            _ => None,
        };

        let children = match kind {
            ResourceKind::Group => resource.dashboards.unwrap_or_default(),
            _ => Vec::new(),
        };

        Ok(ResourceMetadata {
            display_name: resource.name,
            subtype,
            children,
        })
    }
}

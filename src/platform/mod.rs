//! Read-only access to the observability platform API

pub mod metadata;

pub use metadata::{MetadataClient, ResourceMetadata};

/// API token and realm used for both the platform API and the backend provider
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub api_token: String,
    pub realm: String,
}

impl Credentials {
    pub fn new(api_token: &str, realm: &str) -> Self {
        Self {
            api_token: api_token.to_string(),
            realm: realm.to_string(),
        }
    }
}

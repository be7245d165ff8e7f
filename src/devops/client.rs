use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::{ApiRequest, DevOpsApi, Method};
use crate::error::{Result, WorkloadError};
use crate::model::collection::Collection;

pub const API_VERSION: &str = "6.0";

pub struct HttpApi {
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

/// Basic auth with an empty user name and the token as password.
pub fn auth_header(access_token: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!(":{access_token}"));
    format!("Basic {encoded}")
}

pub fn request_url(collection: &Collection, path: &str) -> String {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    format!("{}{}", collection.base_url(), path)
}

#[async_trait]
impl DevOpsApi for HttpApi {
    async fn call(&self, collection: &Collection, request: ApiRequest) -> Result<Value> {
        let url = request_url(collection, &request.path);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        builder = builder
            .query(&request.query)
            .query(&[("api-version", API_VERSION)])
            .header(AUTHORIZATION, auth_header(&collection.access_token))
            .header(ACCEPT, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(method = ?request.method, %url, collection = %collection.name, "api request");
        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "api error");
            return Err(WorkloadError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        trace!(%url, body = %text, "api response");
        serde_json::from_str(&text)
            .map_err(|e| WorkloadError::DataShape(format!("invalid JSON from {url}: {e}")))
    }
}

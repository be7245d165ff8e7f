pub mod catalog;
pub mod client;
pub mod engine;
pub mod query;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::model::collection::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A call relative to a collection root, e.g. `/_apis/projects`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Percent-encode one path segment (project or team id/name).
pub fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// Authenticated JSON access to one collection endpoint.
#[async_trait]
pub trait DevOpsApi: Send + Sync {
    async fn call(&self, collection: &Collection, request: ApiRequest) -> Result<Value>;
}

#[cfg(test)]
pub mod tests;

use serde::{Deserialize, Serialize};
use std::fmt;

/// One organizational collection on the server, together with the token used to reach it.
#[derive(Clone, PartialEq, Eq)]
pub struct Collection {
    pub server_url: String,
    pub name: String,
    pub access_token: String,
}

impl Collection {
    pub fn new(
        server_url: impl Into<String>,
        name: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        let server_url: String = server_url.into();
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            name: name.into(),
            access_token: access_token.into(),
        }
    }

    /// `{server_url}/{collection}`, the root every API path hangs off.
    pub fn base_url(&self) -> String {
        format!("{}/{}", self.server_url, urlencoding::encode(&self.name))
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("server_url", &self.server_url)
            .field("name", &self.name)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub collection: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub project: String,
    pub collection: String,
}

impl Team {
    /// Area path the team's work items live under: `<project>\<team>`.
    pub fn area_path(&self) -> String {
        format!("{}\\{}", self.project, self.name)
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::collection::Collection;
use crate::model::member::IdentityMode;
use crate::workload::chart::MemberOrder;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Shared server URL used by collections that don't set their own.
    pub server_url: Option<String>,
    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub process: ProcessTemplate,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct CollectionConfig {
    pub server_url: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pat: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Only count items that have a target date.
    pub date_filter: bool,
    pub concurrency: usize,
    pub request_timeout_secs: u64,
    pub identity: IdentityMode,
    pub order: MemberOrder,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            date_filter: false,
            concurrency: 4,
            request_timeout_secs: 30,
            identity: IdentityMode::default(),
            order: MemberOrder::default(),
        }
    }
}

impl QueryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Work item type and state names of the server's process template.
///
/// Defaults match a zh-CN Agile template.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProcessTemplate {
    pub work_item_type: String,
    pub closed_state: String,
    pub deleted_state: String,
    pub resolved_state: String,
    /// States drawn as chart series, in stacking order.
    pub states: Vec<String>,
}

impl Default for ProcessTemplate {
    fn default() -> Self {
        Self {
            work_item_type: "用户情景".into(),
            closed_state: "已关闭".into(),
            deleted_state: "已删除".into(),
            resolved_state: "已解决".into(),
            states: vec![
                "新建".into(),
                "进行中".into(),
                "待评审".into(),
                "已解决".into(),
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Fully populated collections; incomplete entries are skipped.
    pub fn collections(&self) -> Vec<Collection> {
        self.collections
            .iter()
            .filter_map(|c| {
                let server_url = c
                    .server_url
                    .as_deref()
                    .or(self.server_url.as_deref())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())?;
                let name = c.name.trim();
                let pat = c.pat.trim();
                if name.is_empty() || pat.is_empty() {
                    return None;
                }
                Some(Collection::new(server_url, name, pat))
            })
            .collect()
    }
}

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("WORKLOAD_CONFIG") {
        return PathBuf::from(path);
    }
    data_dir().join("config.toml")
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".workload")
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

use chrono::{DateTime, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::member::{assignee_key, IdentityMode, IdentityRef};

/// Fields requested for every work item detail fetch.
pub const FIELD_PROJECTION: &[&str] = &[
    "System.Id",
    "System.Title",
    "System.AssignedTo",
    "System.State",
    "System.WorkItemType",
    "System.Description",
    "System.CreatedDate",
    "System.CreatedBy",
    "System.ChangedDate",
    "System.ChangedBy",
    "Microsoft.VSTS.Common.Priority",
    "System.AreaPath",
    "System.IterationPath",
    "Microsoft.VSTS.Scheduling.StartDate",
    "Microsoft.VSTS.Scheduling.TargetDate",
    "Microsoft.VSTS.Common.StateChangeDate",
];

/// Work item as returned by `_apis/wit/workitems`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkItem {
    pub id: u64,
    #[serde(default)]
    pub fields: RawFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFields {
    #[serde(rename = "System.Title")]
    pub title: Option<String>,
    #[serde(rename = "System.Description")]
    pub description: Option<String>,
    #[serde(rename = "System.State")]
    pub state: Option<String>,
    #[serde(rename = "System.WorkItemType")]
    pub work_item_type: Option<String>,
    #[serde(rename = "System.AssignedTo")]
    pub assigned_to: Option<IdentityRef>,
    #[serde(rename = "System.ChangedBy")]
    pub changed_by: Option<IdentityRef>,
    #[serde(rename = "System.ChangedDate")]
    pub changed_date: Option<String>,
    #[serde(rename = "Microsoft.VSTS.Common.Priority")]
    pub priority: Option<i64>,
    #[serde(rename = "System.AreaPath")]
    pub area_path: Option<String>,
    #[serde(rename = "System.IterationPath")]
    pub iteration_path: Option<String>,
    #[serde(rename = "Microsoft.VSTS.Scheduling.StartDate")]
    pub start_date: Option<String>,
    #[serde(rename = "Microsoft.VSTS.Scheduling.TargetDate")]
    pub target_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayStatus {
    Delayed,
    Warning,
    Normal,
    Unknown,
}

impl DelayStatus {
    /// Sort rank, most urgent first.
    pub fn severity(&self) -> u8 {
        match self {
            DelayStatus::Delayed => 1,
            DelayStatus::Warning => 2,
            DelayStatus::Normal => 3,
            DelayStatus::Unknown => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DelayStatus::Delayed => "delayed",
            DelayStatus::Warning => "warning",
            DelayStatus::Normal => "normal",
            DelayStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work item after processing: defaults applied, dates formatted, delay computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    pub collection: String,
    pub title: String,
    pub description: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    pub start_date: String,
    pub target_date: String,
    pub changed_date: String,
    pub changed_by: String,
    pub assigned_to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration_path: Option<String>,
    pub delay_status: DelayStatus,
}

/// Inputs that turn a raw record into a processed one.
#[derive(Debug, Clone, Copy)]
pub struct ItemContext<'a> {
    pub collection: &'a str,
    pub resolved_state: &'a str,
    pub today: NaiveDate,
    pub identity: IdentityMode,
}

impl WorkItem {
    pub fn from_raw(raw: RawWorkItem, ctx: &ItemContext<'_>) -> Self {
        let fields = raw.fields;
        let state = fields
            .state
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Unknown".into());
        let delay_status = classify_delay(
            &state,
            fields.target_date.as_deref(),
            ctx.resolved_state,
            ctx.today,
        );

        WorkItem {
            id: raw.id,
            collection: ctx.collection.to_string(),
            title: fields
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".into()),
            description: fields.description.unwrap_or_default(),
            state,
            priority: fields.priority,
            start_date: format_date(fields.start_date.as_deref()),
            target_date: format_date(fields.target_date.as_deref()),
            changed_date: format_date(fields.changed_date.as_deref()),
            changed_by: fields
                .changed_by
                .and_then(|c| c.display_name)
                .unwrap_or_else(|| "-".into()),
            assigned_to: assignee_key(fields.assigned_to.as_ref(), ctx.identity),
            area_path: fields.area_path,
            iteration_path: fields.iteration_path,
            delay_status,
        }
    }
}

/// Classify how urgent an item is relative to `today`.
///
/// Items in the resolved state are never late. Without a target date an item
/// is `Normal`; with one that cannot be parsed it is `Unknown`.
pub fn classify_delay(
    state: &str,
    target_date: Option<&str>,
    resolved_state: &str,
    today: NaiveDate,
) -> DelayStatus {
    if state == resolved_state {
        return DelayStatus::Normal;
    }
    let Some(raw) = target_date.filter(|d| !d.trim().is_empty()) else {
        return DelayStatus::Normal;
    };
    let Some(target) = parse_date(raw) else {
        return DelayStatus::Unknown;
    };

    let tomorrow = today + Duration::days(1);
    if target < today {
        DelayStatus::Delayed
    } else if target <= tomorrow {
        DelayStatus::Warning
    } else {
        DelayStatus::Normal
    }
}

/// Parse a server date into a local calendar day.
///
/// Full timestamps are shifted into local time before truncation; bare
/// `YYYY-MM-DD` prefixes are taken as-is.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

pub fn format_date(raw: Option<&str>) -> String {
    match raw.filter(|d| !d.trim().is_empty()) {
        None => "-".into(),
        Some(d) => parse_date(d)
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| d.to_string()),
    }
}

/// Stable sort by delay severity; equal-severity items keep their input order.
pub fn sort_by_severity(items: &mut [WorkItem]) {
    items.sort_by_key(|item| item.delay_status.severity());
}

use serde::{Deserialize, Serialize};

/// Key used for roster members that carry neither a display name nor a unique name.
pub const UNKNOWN_MEMBER: &str = "Unknown member";
/// Key used for work items with no assignee.
pub const UNASSIGNED: &str = "Unassigned";

/// Identity reference as the server embeds it in rosters and work-item fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Which identity attribute joins roster members to work-item assignees.
///
/// Display names are what people see, but two accounts sharing a display name
/// collapse into one member. `UniqueName` keys on the account name instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityMode {
    #[default]
    DisplayName,
    UniqueName,
}

impl IdentityRef {
    /// Member key for this identity, or `None` when both names are blank.
    pub fn key(&self, mode: IdentityMode) -> Option<String> {
        let display = non_blank(self.display_name.as_deref());
        let unique = non_blank(self.unique_name.as_deref());
        let picked = match mode {
            IdentityMode::DisplayName => display.or(unique),
            IdentityMode::UniqueName => unique.or(display),
        };
        picked.map(String::from)
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Key for a roster entry.
pub fn roster_key(identity: Option<&IdentityRef>, mode: IdentityMode) -> String {
    identity
        .and_then(|i| i.key(mode))
        .unwrap_or_else(|| UNKNOWN_MEMBER.to_string())
}

/// Key for a work-item assignee.
pub fn assignee_key(identity: Option<&IdentityRef>, mode: IdentityMode) -> String {
    identity
        .and_then(|i| i.key(mode))
        .unwrap_or_else(|| UNASSIGNED.to_string())
}

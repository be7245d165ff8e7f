use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{segment, ApiRequest, DevOpsApi};
use crate::error::{Result, WorkloadError};
use crate::model::collection::{Collection, Project, Team};
use crate::model::member::IdentityRef;

#[derive(Deserialize)]
struct NamedRef {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct TeamMember {
    identity: Option<IdentityRef>,
}

/// Decode the `value` array every list endpoint wraps its results in.
fn value_array<T: DeserializeOwned>(mut value: Value, what: &str) -> Result<Vec<T>> {
    let Some(array) = value.get_mut("value").map(Value::take) else {
        return Err(WorkloadError::DataShape(format!(
            "{what} response has no `value` array"
        )));
    };
    if !array.is_array() {
        return Err(WorkloadError::DataShape(format!(
            "{what} `value` is not an array"
        )));
    }
    serde_json::from_value(array).map_err(|e| WorkloadError::DataShape(format!("{what}: {e}")))
}

pub async fn list_projects(api: &dyn DevOpsApi, collection: &Collection) -> Result<Vec<Project>> {
    let value = api
        .call(collection, ApiRequest::get("/_apis/projects"))
        .await?;
    let refs: Vec<NamedRef> = value_array(value, "projects")?;
    Ok(refs
        .into_iter()
        .map(|p| Project {
            id: p.id,
            name: p.name,
            collection: collection.name.clone(),
        })
        .collect())
}

pub async fn list_teams(
    api: &dyn DevOpsApi,
    collection: &Collection,
    project: &Project,
) -> Result<Vec<Team>> {
    let path = format!("/_apis/projects/{}/teams", segment(&project.id));
    let value = api.call(collection, ApiRequest::get(path)).await?;
    let refs: Vec<NamedRef> = value_array(value, "teams")?;
    Ok(refs
        .into_iter()
        .map(|t| Team {
            id: t.id,
            name: t.name,
            project: project.name.clone(),
            collection: collection.name.clone(),
        })
        .collect())
}

/// Roster of one team. Entries without an identity come back as `None`.
pub async fn list_members(
    api: &dyn DevOpsApi,
    collection: &Collection,
    project: &Project,
    team: &Team,
) -> Result<Vec<Option<IdentityRef>>> {
    let path = format!(
        "/_apis/projects/{}/teams/{}/members",
        segment(&project.id),
        segment(&team.id)
    );
    let value = api.call(collection, ApiRequest::get(path)).await?;
    let members: Vec<TeamMember> = value_array(value, "team members")?;
    Ok(members.into_iter().map(|m| m.identity).collect())
}

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::catalog::{list_members, list_projects, list_teams};
use super::engine::{fetch_work_items, query_ids, BATCH_SIZE};
use super::query::WorkItemQuery;
use super::{ApiRequest, DevOpsApi, Method};
use crate::config::ProcessTemplate;
use crate::error::{Result, WorkloadError};
use crate::model::collection::{Collection, Project, Team};

type Handler = dyn Fn(&Collection, &ApiRequest) -> Result<Value> + Send + Sync;

/// A DevOpsApi that answers from a closure and records every call.
pub struct MockApi {
    handler: Box<Handler>,
    calls: Mutex<Vec<(String, ApiRequest)>>,
}

impl MockApi {
    pub fn new(
        handler: impl Fn(&Collection, &ApiRequest) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn serving(server: FakeServer) -> Self {
        Self::new(move |collection, request| server.handle(collection, request))
    }

    pub fn calls(&self) -> Vec<(String, ApiRequest)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_ending_with(&self, suffix: &str) -> Vec<(String, ApiRequest)> {
        self.calls()
            .into_iter()
            .filter(|(_, r)| r.path.ends_with(suffix))
            .collect()
    }
}

#[async_trait]
impl DevOpsApi for MockApi {
    async fn call(&self, collection: &Collection, request: ApiRequest) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((collection.name.clone(), request.clone()));
        (self.handler)(collection, &request)
    }
}

#[derive(Clone)]
struct FakeTeam {
    id: String,
    name: String,
    members: Vec<String>,
}

#[derive(Clone)]
struct FakeProject {
    id: String,
    name: String,
    teams: Vec<FakeTeam>,
}

#[derive(Clone)]
struct FakeItem {
    project: String,
    record: Value,
}

#[derive(Clone)]
struct FakeCollection {
    name: String,
    projects: Vec<FakeProject>,
    items: Vec<FakeItem>,
}

#[derive(Default)]
struct ServerState {
    collections: Vec<FakeCollection>,
    failing: Vec<(Option<String>, String)>,
}

/// In-memory stand-in for a server with several collections.
#[derive(Clone, Default)]
pub struct FakeServer {
    state: Arc<Mutex<ServerState>>,
}

impl FakeServer {
    /// `collections` × `projects` × `teams`, each team with one member.
    ///
    /// Collections are `c{i}`, projects `p{j}` with id `c{i}-p{j}`, teams `t{k}`
    /// with id `c{i}-p{j}-t{k}`, and the member of a team is named after its id.
    pub fn grid(collections: usize, projects: usize, teams: usize) -> Self {
        let collections = (0..collections)
            .map(|c| FakeCollection {
                name: format!("c{c}"),
                projects: (0..projects)
                    .map(|p| FakeProject {
                        id: format!("c{c}-p{p}"),
                        name: format!("p{p}"),
                        teams: (0..teams)
                            .map(|t| FakeTeam {
                                id: format!("c{c}-p{p}-t{t}"),
                                name: format!("t{t}"),
                                members: vec![format!("c{c}-p{p}-t{t}")],
                            })
                            .collect(),
                    })
                    .collect(),
                items: Vec::new(),
            })
            .collect();
        Self {
            state: Arc::new(Mutex::new(ServerState {
                collections,
                failing: Vec::new(),
            })),
        }
    }

    pub fn collections(&self) -> Vec<Collection> {
        self.state
            .lock()
            .unwrap()
            .collections
            .iter()
            .map(|c| Collection::new("http://tfs", c.name.clone(), "pat"))
            .collect()
    }

    /// Replace the roster of a team.
    pub fn set_members(&self, team_id: &str, members: &[&str]) {
        let mut state = self.state.lock().unwrap();
        for collection in &mut state.collections {
            for project in &mut collection.projects {
                for team in &mut project.teams {
                    if team.id == team_id {
                        team.members = members.iter().map(|m| m.to_string()).collect();
                    }
                }
            }
        }
    }

    pub fn add_item(
        &self,
        collection: &str,
        project: &str,
        id: u64,
        assignee: Option<&str>,
        state: &str,
        target_date: Option<&str>,
    ) {
        let mut fields = json!({
            "System.Title": format!("Item {id}"),
            "System.State": state,
        });
        if let Some(name) = assignee {
            fields["System.AssignedTo"] = json!({ "displayName": name, "uniqueName": format!("CORP\\{name}") });
        }
        if let Some(date) = target_date {
            fields["Microsoft.VSTS.Scheduling.TargetDate"] = json!(date);
        }
        let mut server = self.state.lock().unwrap();
        if let Some(c) = server.collections.iter_mut().find(|c| c.name == collection) {
            c.items.push(FakeItem {
                project: project.to_string(),
                record: json!({ "id": id, "fields": fields }),
            });
        }
    }

    /// Make every call to `path` fail with a 500 in all collections.
    pub fn fail_path(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .push((None, path.to_string()));
    }

    pub fn fail_collection_path(&self, collection: &str, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .push((Some(collection.to_string()), path.to_string()));
    }

    pub fn handle(&self, collection: &Collection, request: &ApiRequest) -> Result<Value> {
        let state = self.state.lock().unwrap();
        let failing = state.failing.iter().any(|(c, path)| {
            *path == request.path && c.as_ref().map_or(true, |c| *c == collection.name)
        });
        if failing {
            return Err(WorkloadError::Http {
                status: 500,
                body: "boom".into(),
            });
        }

        let Some(fake) = state.collections.iter().find(|c| c.name == collection.name) else {
            return Err(WorkloadError::Http {
                status: 404,
                body: "no such collection".into(),
            });
        };

        let path = request.path.as_str();
        if path == "/_apis/projects" {
            let value: Vec<Value> = fake
                .projects
                .iter()
                .map(|p| json!({ "id": p.id, "name": p.name }))
                .collect();
            return Ok(json!({ "count": value.len(), "value": value }));
        }

        if let Some(rest) = path.strip_prefix("/_apis/projects/") {
            let parts: Vec<&str> = rest.split('/').collect();
            let project = fake.projects.iter().find(|p| p.id == parts[0]);
            let Some(project) = project else {
                return Err(WorkloadError::Http {
                    status: 404,
                    body: "no such project".into(),
                });
            };
            return match parts.as_slice() {
                [_, "teams"] => {
                    let value: Vec<Value> = project
                        .teams
                        .iter()
                        .map(|t| json!({ "id": t.id, "name": t.name }))
                        .collect();
                    Ok(json!({ "value": value }))
                }
                [_, "teams", team_id, "members"] => {
                    let team = project.teams.iter().find(|t| t.id == *team_id);
                    let value: Vec<Value> = team
                        .map(|t| {
                            t.members
                                .iter()
                                .map(|m| json!({ "identity": { "displayName": m, "uniqueName": format!("CORP\\{m}") } }))
                                .collect()
                        })
                        .unwrap_or_default();
                    Ok(json!({ "value": value }))
                }
                _ => Err(WorkloadError::Http {
                    status: 404,
                    body: path.to_string(),
                }),
            };
        }

        if path == "/_apis/wit/wiql" {
            let query = request
                .body
                .as_ref()
                .and_then(|b| b["query"].as_str())
                .unwrap_or_default();
            let ids: Vec<Value> = fake
                .items
                .iter()
                .filter(|item| {
                    !query.contains("[System.TeamProject]")
                        || query.contains(&format!("[System.TeamProject] = '{}'", item.project))
                })
                .map(|item| json!({ "id": item.record["id"] }))
                .collect();
            return Ok(json!({ "workItems": ids }));
        }

        if path == "/_apis/wit/workitems" {
            let ids: Vec<u64> = request
                .query_value("ids")
                .unwrap_or_default()
                .split(',')
                .filter_map(|s| s.parse().ok())
                .collect();
            let value: Vec<Value> = ids
                .iter()
                .filter_map(|id| {
                    fake.items
                        .iter()
                        .find(|item| item.record["id"].as_u64() == Some(*id))
                        .map(|item| item.record.clone())
                })
                .collect();
            return Ok(json!({ "count": value.len(), "value": value }));
        }

        Err(WorkloadError::Http {
            status: 404,
            body: path.to_string(),
        })
    }
}

fn collection() -> Collection {
    Collection::new("http://tfs:8080/tfs", "DefaultCollection", "pat")
}

fn english_query() -> super::query::Wiql {
    WorkItemQuery::default().to_wiql(&ProcessTemplate::default())
}

#[tokio::test]
async fn pagination_follows_cursor_until_absent() {
    let api = MockApi::new(|_, request| {
        let token = request
            .body
            .as_ref()
            .and_then(|b| b.get("continuationToken"))
            .and_then(|t| t.as_str())
            .map(String::from);
        Ok(match token.as_deref() {
            None => json!({ "workItems": [{"id": 1}, {"id": 2}], "continuationToken": "page-2" }),
            Some("page-2") => json!({ "workItems": [{"id": 3}], "continuationToken": "page-3" }),
            Some("page-3") => json!({ "workItems": [{"id": 4}, {"id": 5}] }),
            Some(other) => panic!("unexpected token {other}"),
        })
    });

    let ids = query_ids(&api, &collection(), &english_query()).await.unwrap();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert_eq!(api.calls().len(), 3);
    assert!(api.calls().iter().all(|(_, r)| r.method == Method::Post));
}

#[tokio::test]
async fn empty_cursor_ends_pagination() {
    let api = MockApi::new(|_, _| Ok(json!({ "workItems": [{"id": 9}], "continuationToken": "" })));
    let ids = query_ids(&api, &collection(), &english_query()).await.unwrap();
    assert_eq!(ids, vec![9]);
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn repeated_cursor_is_loop_guard_error() {
    let api = MockApi::new(|_, _| Ok(json!({ "workItems": [{"id": 1}], "continuationToken": "same" })));
    let err = query_ids(&api, &collection(), &english_query())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkloadError::LoopGuard(_)));
    assert_eq!(api.calls().len(), 2);
}

#[tokio::test]
async fn wiql_body_carries_query_text() {
    let api = MockApi::new(|_, _| Ok(json!({ "workItems": [] })));
    query_ids(&api, &collection(), &english_query()).await.unwrap();
    let (_, request) = &api.calls()[0];
    assert_eq!(request.path, "/_apis/wit/wiql");
    let query = request.body.as_ref().unwrap()["query"].as_str().unwrap();
    assert!(query.starts_with("SELECT [System.Id] FROM WorkItems"));
    assert!(request.body.as_ref().unwrap().get("continuationToken").is_none());
}

#[tokio::test]
async fn detail_fetch_batches_by_200_in_order() {
    let api = MockApi::new(|_, request| {
        let value: Vec<Value> = request
            .query_value("ids")
            .unwrap()
            .split(',')
            .map(|id| json!({ "id": id.parse::<u64>().unwrap(), "fields": {} }))
            .collect();
        Ok(json!({ "value": value }))
    });

    let ids: Vec<u64> = (1..=450).rev().collect();
    let items = fetch_work_items(&api, &collection(), &ids).await.unwrap();

    let sizes: Vec<usize> = api
        .calls()
        .iter()
        .map(|(_, r)| r.query_value("ids").unwrap().split(',').count())
        .collect();
    assert_eq!(sizes, vec![BATCH_SIZE, BATCH_SIZE, 50]);
    let returned: Vec<u64> = items.iter().map(|i| i.id).collect();
    assert_eq!(returned, ids);
}

#[tokio::test]
async fn detail_fetch_requests_field_projection() {
    let api = MockApi::new(|_, _| Ok(json!({ "value": [] })));
    fetch_work_items(&api, &collection(), &[1]).await.unwrap();
    let (_, request) = &api.calls()[0];
    let fields = request.query_value("fields").unwrap();
    assert!(fields.contains("System.AssignedTo"));
    assert!(fields.contains("Microsoft.VSTS.Scheduling.TargetDate"));
}

#[tokio::test]
async fn no_ids_means_no_detail_calls() {
    let api = MockApi::new(|_, _| panic!("should not be called"));
    let items = fetch_work_items(&api, &collection(), &[]).await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn failing_batch_propagates() {
    let api = MockApi::new(|_, request| {
        if request.query_value("ids").unwrap().starts_with("201") {
            Err(WorkloadError::Http {
                status: 500,
                body: "batch failed".into(),
            })
        } else {
            Ok(json!({ "value": [] }))
        }
    });
    let ids: Vec<u64> = (1..=300).collect();
    let err = fetch_work_items(&api, &collection(), &ids)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkloadError::Http { status: 500, .. }));
}

#[tokio::test]
async fn missing_value_array_is_data_shape_error() {
    let api = MockApi::new(|_, _| Ok(json!({ "count": 0 })));
    let err = fetch_work_items(&api, &collection(), &[1]).await.unwrap_err();
    assert!(matches!(err, WorkloadError::DataShape(_)));

    let err = list_projects(&api, &collection()).await.unwrap_err();
    assert!(matches!(err, WorkloadError::DataShape(_)));
}

#[tokio::test]
async fn catalog_lists_projects_teams_and_members() {
    let server = FakeServer::grid(1, 1, 1);
    server.set_members("c0-p0-t0", &["Li Lei", "Han Meimei"]);
    let api = MockApi::serving(server.clone());
    let c = &server.collections()[0];

    let projects = list_projects(&api, c).await.unwrap();
    assert_eq!(
        projects,
        vec![Project {
            id: "c0-p0".into(),
            name: "p0".into(),
            collection: "c0".into()
        }]
    );

    let teams = list_teams(&api, c, &projects[0]).await.unwrap();
    assert_eq!(
        teams,
        vec![Team {
            id: "c0-p0-t0".into(),
            name: "t0".into(),
            project: "p0".into(),
            collection: "c0".into()
        }]
    );

    let members = list_members(&api, c, &projects[0], &teams[0]).await.unwrap();
    let names: Vec<String> = members
        .into_iter()
        .map(|m| m.unwrap().display_name.unwrap())
        .collect();
    assert_eq!(names, vec!["Li Lei", "Han Meimei"]);
    assert_eq!(
        api.calls()[2].1.path,
        "/_apis/projects/c0-p0/teams/c0-p0-t0/members"
    );
}

#[tokio::test]
async fn catalog_encodes_path_segments() {
    let api = MockApi::new(|_, _| Ok(json!({ "value": [] })));
    let project = Project {
        id: "My Project".into(),
        name: "My Project".into(),
        collection: "DefaultCollection".into(),
    };
    list_teams(&api, &collection(), &project).await.unwrap();
    assert_eq!(api.calls()[0].1.path, "/_apis/projects/My%20Project/teams");
}

#[tokio::test]
async fn http_errors_pass_through_catalog() {
    let api = MockApi::new(|_, _| {
        Err(WorkloadError::Http {
            status: 401,
            body: "unauthorized".into(),
        })
    });
    let err = list_projects(&api, &collection()).await.unwrap_err();
    assert!(matches!(err, WorkloadError::Http { status: 401, .. }));
}

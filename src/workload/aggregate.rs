use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{info, warn};

use super::selection::{resolve, ProjectSelector, ResolvedScope, Selection, TeamSelector};
use crate::config::{AppConfig, ProcessTemplate};
use crate::devops::catalog::list_members;
use crate::devops::engine::{fetch_work_items, query_ids};
use crate::devops::query::WorkItemQuery;
use crate::devops::DevOpsApi;
use crate::error::Result;
use crate::model::collection::Collection;
use crate::model::member::{roster_key, IdentityMode};
use crate::model::work_item::{ItemContext, WorkItem};
use crate::model::workload::WorkloadReport;

#[derive(Debug, Clone)]
pub struct AggregationOptions {
    /// Only count items that have a target date.
    pub require_target_date: bool,
    pub identity: IdentityMode,
    /// How many collections are fetched at once.
    pub concurrency: usize,
    pub today: NaiveDate,
    pub process: ProcessTemplate,
}

impl AggregationOptions {
    pub fn from_config(config: &AppConfig, today: NaiveDate) -> Self {
        Self {
            require_target_date: config.query.date_filter,
            identity: config.query.identity,
            concurrency: config.query.concurrency,
            today,
            process: config.process.clone(),
        }
    }
}

/// Everything one aggregation run depends on.
#[derive(Debug, Clone)]
pub struct AggregationRequest {
    pub collections: Vec<Collection>,
    pub selection: Selection,
    pub options: AggregationOptions,
}

/// Resolved scopes of one collection, fetched as a unit.
#[derive(Debug)]
struct CollectionUnit {
    collection: Collection,
    scopes: Vec<ResolvedScope>,
    /// False when a project of this collection was skipped during resolution.
    complete: bool,
}

/// Members and items one collection contributed.
#[derive(Debug, Default)]
struct Contribution {
    members: Vec<String>,
    items: Vec<WorkItem>,
}

/// Build the per-member workload for a request.
///
/// Collections are fetched concurrently (bounded by `options.concurrency`)
/// and merged in configuration order afterwards, so the output does not
/// depend on which fetch finishes first. A collection whose rosters or items
/// fail to load is left out and noted in `warnings`.
pub async fn aggregate(api: &dyn DevOpsApi, request: &AggregationRequest) -> Result<WorkloadReport> {
    let resolution = resolve(api, &request.collections, &request.selection).await?;

    let mut units: Vec<CollectionUnit> = Vec::new();
    for scope in resolution.scopes.iter().cloned() {
        match units.iter_mut().find(|u| u.collection == scope.collection) {
            Some(unit) => unit.scopes.push(scope),
            None => units.push(CollectionUnit {
                complete: resolution.is_complete(&scope.collection),
                collection: scope.collection.clone(),
                scopes: vec![scope],
            }),
        }
    }

    let options = &request.options;
    let selection = &request.selection;
    let results: Vec<(Collection, Result<Contribution>)> = stream::iter(units)
        .map(|unit| async move {
            let result = collect_contribution(api, &unit, selection, options).await;
            (unit.collection, result)
        })
        .buffered(options.concurrency.max(1))
        .collect()
        .await;

    let mut report = WorkloadReport {
        warnings: resolution.warnings.clone(),
        ..Default::default()
    };
    for (collection, result) in results {
        match result {
            Ok(contribution) => {
                for member in &contribution.members {
                    report.ensure_member(member);
                }
                for item in contribution.items {
                    report.assign(item);
                }
            }
            Err(e) => {
                warn!(collection = %collection.name, error = %e, "collection skipped");
                report.warnings.push(format!("{}: {e}", collection.name));
            }
        }
    }
    report.sort_items();

    info!(
        members = report.data.len(),
        items = report.total_items(),
        warnings = report.warnings.len(),
        "aggregation finished"
    );
    Ok(report)
}

/// Queries needed to cover the scopes of one collection.
///
/// The collection-wide query is only used when no project was skipped;
/// otherwise each resolved project is queried on its own so a skipped
/// project's items stay out.
fn query_plan(
    scopes: &[ResolvedScope],
    complete: bool,
    selection: &Selection,
    require_target_date: bool,
) -> Vec<WorkItemQuery> {
    match (&selection.project, &selection.team) {
        (ProjectSelector::All, TeamSelector::All) if complete => vec![WorkItemQuery {
            project: None,
            area_path: None,
            require_target_date,
        }],
        (_, TeamSelector::All) => scopes
            .iter()
            .map(|scope| WorkItemQuery {
                project: Some(scope.project.name.clone()),
                area_path: None,
                require_target_date,
            })
            .collect(),
        (_, TeamSelector::Specific(_)) => scopes
            .iter()
            .flat_map(|scope| {
                scope.teams.iter().map(move |team| WorkItemQuery {
                    project: Some(scope.project.name.clone()),
                    area_path: Some(team.area_path()),
                    require_target_date,
                })
            })
            .collect(),
    }
}

async fn collect_contribution(
    api: &dyn DevOpsApi,
    unit: &CollectionUnit,
    selection: &Selection,
    options: &AggregationOptions,
) -> Result<Contribution> {
    let collection = &unit.collection;
    let scopes = unit.scopes.as_slice();
    let mut contribution = Contribution::default();

    let mut seen_members = HashSet::new();
    for scope in scopes {
        for team in &scope.teams {
            let roster = list_members(api, collection, &scope.project, team).await?;
            for identity in roster {
                let key = roster_key(identity.as_ref(), options.identity);
                if seen_members.insert(key.clone()) {
                    contribution.members.push(key);
                }
            }
        }
    }

    let mut ids = Vec::new();
    let mut seen_ids = HashSet::new();
    for query in query_plan(scopes, unit.complete, selection, options.require_target_date) {
        let wiql = query.to_wiql(&options.process);
        for id in query_ids(api, collection, &wiql).await? {
            if seen_ids.insert(id) {
                ids.push(id);
            }
        }
    }

    let ctx = ItemContext {
        collection: &collection.name,
        resolved_state: &options.process.resolved_state,
        today: options.today,
        identity: options.identity,
    };
    contribution.items = fetch_work_items(api, collection, &ids)
        .await?
        .into_iter()
        .map(|raw| WorkItem::from_raw(raw, &ctx))
        .collect();

    Ok(contribution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devops::tests::{FakeServer, MockApi};
    use crate::model::work_item::DelayStatus;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 18).unwrap()
    }

    fn request(server: &FakeServer, selection: Selection) -> AggregationRequest {
        AggregationRequest {
            collections: server.collections(),
            selection,
            options: AggregationOptions {
                require_target_date: false,
                identity: IdentityMode::DisplayName,
                concurrency: 4,
                today: today(),
                process: ProcessTemplate::default(),
            },
        }
    }

    fn seeded() -> FakeServer {
        let server = FakeServer::grid(2, 1, 1);
        server.set_members("c0-p0-t0", &["Li Lei", "Han Meimei", "Idle Ian"]);
        server.set_members("c1-p0-t0", &["Li Lei", "Zhang Wei"]);
        server.add_item("c0", "p0", 1, Some("Li Lei"), "进行中", Some("2025-03-30"));
        server.add_item("c0", "p0", 2, Some("Li Lei"), "新建", Some("2025-02-01"));
        server.add_item("c0", "p0", 3, Some("Han Meimei"), "进行中", Some("2025-02-19"));
        server.add_item("c0", "p0", 4, None, "新建", None);
        server.add_item("c1", "p0", 5, Some("Li Lei"), "已解决", Some("2025-01-01"));
        server.add_item("c1", "p0", 6, Some("Contractor"), "待评审", None);
        server
    }

    #[tokio::test]
    async fn joins_items_to_roster_members() {
        let server = seeded();
        let api = MockApi::serving(server.clone());
        let report = aggregate(&api, &request(&server, Selection::default()))
            .await
            .unwrap();

        let data = &report.data;
        assert_eq!(data["Li Lei"].total, 3);
        assert_eq!(data["Han Meimei"].total, 1);
        assert_eq!(data["Idle Ian"].total, 0);
        assert_eq!(data["Zhang Wei"].total, 0);
        assert_eq!(data["Contractor"].total, 1);
        assert_eq!(data["Unassigned"].total, 1);
        for entry in data.values() {
            assert_eq!(entry.total, entry.items.len());
        }
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn member_items_sorted_by_severity() {
        let server = seeded();
        let api = MockApi::serving(server.clone());
        let report = aggregate(&api, &request(&server, Selection::default()))
            .await
            .unwrap();

        let li: Vec<(u64, DelayStatus)> = report.data["Li Lei"]
            .items
            .iter()
            .map(|i| (i.id, i.delay_status))
            .collect();
        assert_eq!(
            li,
            vec![
                (2, DelayStatus::Delayed),
                (1, DelayStatus::Normal),
                (5, DelayStatus::Normal),
            ]
        );
        assert_eq!(
            report.data["Han Meimei"].items[0].delay_status,
            DelayStatus::Warning
        );
    }

    #[tokio::test]
    async fn aggregation_is_idempotent() {
        let server = seeded();
        let api = MockApi::serving(server.clone());
        let req = request(&server, Selection::default());
        let first = aggregate(&api, &req).await.unwrap();
        let second = aggregate(&api, &req).await.unwrap();
        assert_eq!(
            serde_json::to_string(&first.data).unwrap(),
            serde_json::to_string(&second.data).unwrap()
        );
    }

    #[tokio::test]
    async fn concurrency_does_not_change_output() {
        let server = seeded();
        let api = MockApi::serving(server.clone());
        let mut sequential = request(&server, Selection::default());
        sequential.options.concurrency = 1;
        let a = aggregate(&api, &sequential).await.unwrap();
        let b = aggregate(&api, &request(&server, Selection::default()))
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn failing_roster_drops_only_that_collection() {
        let server = seeded();
        server.fail_collection_path("c1", "/_apis/projects/c1-p0/teams/c1-p0-t0/members");
        let api = MockApi::serving(server.clone());
        let report = aggregate(&api, &request(&server, Selection::default()))
            .await
            .unwrap();

        assert!(!report.data.contains_key("Zhang Wei"));
        assert!(!report.data.contains_key("Contractor"));
        assert_eq!(report.data["Li Lei"].total, 2);
        assert_eq!(report.total_items(), 4);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("c1:"));
    }

    #[tokio::test]
    async fn failing_item_fetch_drops_only_that_collection() {
        let server = seeded();
        server.fail_collection_path("c0", "/_apis/wit/workitems");
        let api = MockApi::serving(server.clone());
        let report = aggregate(&api, &request(&server, Selection::default()))
            .await
            .unwrap();
        assert!(!report.data.contains_key("Han Meimei"));
        assert_eq!(report.data["Li Lei"].total, 1);
        assert_eq!(report.data["Contractor"].total, 1);
    }

    #[tokio::test]
    async fn all_all_fetches_every_roster() {
        let server = FakeServer::grid(2, 2, 2);
        let api = MockApi::serving(server.clone());
        let report = aggregate(&api, &request(&server, Selection::default()))
            .await
            .unwrap();

        let member_calls = api.calls_ending_with("/members");
        assert_eq!(member_calls.len(), 8);
        assert_eq!(report.data.len(), 8);
        assert!(report.data.values().all(|e| e.total == 0));
        // one collection-wide query per collection
        assert_eq!(api.calls_ending_with("/_apis/wit/wiql").len(), 2);
    }

    #[tokio::test]
    async fn skipped_project_items_stay_out_of_all_all() {
        let server = FakeServer::grid(1, 2, 1);
        server.set_members("c0-p1-t0", &["Li Lei"]);
        server.add_item("c0", "p0", 1, Some("Ghost"), "进行中", None);
        server.add_item("c0", "p1", 2, Some("Li Lei"), "进行中", None);
        server.fail_path("/_apis/projects/c0-p0/teams");
        let api = MockApi::serving(server.clone());
        let report = aggregate(&api, &request(&server, Selection::default()))
            .await
            .unwrap();

        let names: Vec<&String> = report.data.keys().collect();
        assert_eq!(names, vec!["Li Lei"]);
        assert_eq!(report.total_items(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("c0/p0:"));

        let wiql = api.calls_ending_with("/_apis/wit/wiql");
        assert_eq!(wiql.len(), 1);
        let query = wiql[0].1.body.as_ref().unwrap()["query"].as_str().unwrap();
        assert!(query.contains("[System.TeamProject] = 'p1'"));
    }

    #[tokio::test]
    async fn specific_team_scopes_query_by_area_path() {
        let server = FakeServer::grid(1, 2, 2);
        let api = MockApi::serving(server.clone());
        let selection = Selection {
            project: ProjectSelector::parse("p1"),
            team: TeamSelector::parse("t1"),
        };
        aggregate(&api, &request(&server, selection)).await.unwrap();

        let wiql = api.calls_ending_with("/_apis/wit/wiql");
        assert_eq!(wiql.len(), 1);
        let query = wiql[0].1.body.as_ref().unwrap()["query"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(query.contains("[System.TeamProject] = 'p1'"));
        assert!(query.contains("[System.AreaPath] UNDER 'p1\\t1'"));
        assert_eq!(api.calls_ending_with("/members").len(), 1);
    }

    #[tokio::test]
    async fn date_filter_adds_target_date_clause() {
        let server = FakeServer::grid(1, 1, 1);
        let api = MockApi::serving(server.clone());
        let mut req = request(&server, Selection::default());
        req.options.require_target_date = true;
        aggregate(&api, &req).await.unwrap();
        let wiql = api.calls_ending_with("/_apis/wit/wiql");
        let query = wiql[0].1.body.as_ref().unwrap()["query"].as_str().unwrap();
        assert!(query.contains("[Microsoft.VSTS.Scheduling.TargetDate] <> ''"));
    }

    #[tokio::test]
    async fn roster_members_deduplicated_across_teams() {
        let server = FakeServer::grid(1, 1, 2);
        server.set_members("c0-p0-t0", &["Li Lei"]);
        server.set_members("c0-p0-t1", &["Li Lei", "Han Meimei"]);
        let api = MockApi::serving(server.clone());
        let report = aggregate(&api, &request(&server, Selection::default()))
            .await
            .unwrap();
        let names: Vec<&String> = report.data.keys().collect();
        assert_eq!(names, vec!["Han Meimei", "Li Lei"]);
    }

    #[tokio::test]
    async fn resolution_failure_propagates() {
        let server = FakeServer::grid(1, 1, 1);
        let api = MockApi::serving(server.clone());
        let selection = Selection {
            project: ProjectSelector::parse("nowhere"),
            team: TeamSelector::All,
        };
        assert!(aggregate(&api, &request(&server, selection)).await.is_err());
    }
}

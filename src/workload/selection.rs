use tracing::warn;

use crate::devops::catalog::{list_projects, list_teams};
use crate::devops::DevOpsApi;
use crate::error::{Result, WorkloadError};
use crate::model::collection::{Collection, Project, Team};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProjectSelector {
    /// Every project of every collection.
    #[default]
    All,
    /// A project matched by id, or by name ignoring case, optionally pinned to one collection.
    Specific {
        collection: Option<String>,
        key: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TeamSelector {
    #[default]
    All,
    Specific(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub project: ProjectSelector,
    pub team: TeamSelector,
}

fn is_all(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || raw.eq_ignore_ascii_case("all")
}

fn key_matches(key: &str, id: &str, name: &str) -> bool {
    key == id || key.eq_ignore_ascii_case(name)
}

impl ProjectSelector {
    /// `all`, `<project>` or `<collection>/<project>`.
    pub fn parse(raw: &str) -> Self {
        if is_all(raw) {
            return ProjectSelector::All;
        }
        let raw = raw.trim();
        match raw.split_once('/') {
            Some((collection, key)) if !collection.is_empty() && !key.is_empty() => {
                ProjectSelector::Specific {
                    collection: Some(collection.to_string()),
                    key: key.to_string(),
                }
            }
            _ => ProjectSelector::Specific {
                collection: None,
                key: raw.to_string(),
            },
        }
    }

    pub fn for_project(project: &Project) -> Self {
        ProjectSelector::Specific {
            collection: Some(project.collection.clone()),
            key: project.id.clone(),
        }
    }

    fn includes_collection(&self, collection: &Collection) -> bool {
        match self {
            ProjectSelector::Specific {
                collection: Some(name),
                ..
            } => name.eq_ignore_ascii_case(&collection.name),
            _ => true,
        }
    }

    pub fn matches(&self, project: &Project) -> bool {
        match self {
            ProjectSelector::All => true,
            ProjectSelector::Specific { key, .. } => key_matches(key, &project.id, &project.name),
        }
    }
}

impl TeamSelector {
    pub fn parse(raw: &str) -> Self {
        if is_all(raw) {
            TeamSelector::All
        } else {
            TeamSelector::Specific(raw.trim().to_string())
        }
    }

    pub fn matches(&self, team: &Team) -> bool {
        match self {
            TeamSelector::All => true,
            TeamSelector::Specific(key) => key_matches(key, &team.id, &team.name),
        }
    }
}

/// One project to aggregate, with the teams whose rosters count toward it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScope {
    pub collection: Collection,
    pub project: Project,
    pub teams: Vec<Team>,
}

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub scopes: Vec<ResolvedScope>,
    pub warnings: Vec<String>,
    /// Collections where at least one matching project was skipped.
    pub incomplete: Vec<Collection>,
}

impl Resolution {
    /// Whether every matching project of `collection` made it into `scopes`.
    pub fn is_complete(&self, collection: &Collection) -> bool {
        !self.incomplete.contains(collection)
    }
}

/// Expand a selection into concrete (collection, project, teams) scopes.
///
/// A collection whose projects can't be listed, or a project whose teams
/// can't be listed, is skipped with a warning. Resolution only fails when
/// nothing could be listed at all or a named project/team doesn't exist.
pub async fn resolve(
    api: &dyn DevOpsApi,
    collections: &[Collection],
    selection: &Selection,
) -> Result<Resolution> {
    if collections.is_empty() {
        return Err(WorkloadError::Configuration(
            "no collections configured".into(),
        ));
    }

    let mut resolution = Resolution::default();
    let mut listed_collections = 0;
    let mut last_error = None;
    let mut project_found = false;
    let mut team_listing_failed = false;

    for collection in collections {
        if !selection.project.includes_collection(collection) {
            continue;
        }

        let projects = match list_projects(api, collection).await {
            Ok(projects) => projects,
            Err(e) => {
                warn!(collection = %collection.name, error = %e, "failed to list projects");
                resolution
                    .warnings
                    .push(format!("{}: failed to list projects: {e}", collection.name));
                last_error = Some(e);
                continue;
            }
        };
        listed_collections += 1;

        for project in projects.into_iter().filter(|p| selection.project.matches(p)) {
            project_found = true;

            let teams = match list_teams(api, collection, &project).await {
                Ok(teams) => teams,
                Err(e) => {
                    warn!(collection = %collection.name, project = %project.name, error = %e, "failed to list teams");
                    resolution.warnings.push(format!(
                        "{}/{}: failed to list teams: {e}",
                        collection.name, project.name
                    ));
                    team_listing_failed = true;
                    if !resolution.incomplete.contains(collection) {
                        resolution.incomplete.push(collection.clone());
                    }
                    continue;
                }
            };

            let teams: Vec<Team> = teams
                .into_iter()
                .filter(|t| selection.team.matches(t))
                .collect();
            if teams.is_empty() && selection.team != TeamSelector::All {
                continue;
            }

            resolution.scopes.push(ResolvedScope {
                collection: collection.clone(),
                project,
                teams,
            });
        }
    }

    if listed_collections == 0 {
        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no collection matches the selection".into());
        return Err(WorkloadError::Configuration(format!(
            "could not list projects: {detail}"
        )));
    }
    if let ProjectSelector::Specific { key, .. } = &selection.project {
        if !project_found {
            return Err(WorkloadError::Configuration(format!(
                "project {key:?} not found"
            )));
        }
    }
    if let TeamSelector::Specific(key) = &selection.team {
        if resolution.scopes.is_empty() && !team_listing_failed {
            return Err(WorkloadError::Configuration(format!("team {key:?} not found")));
        }
    }

    Ok(resolution)
}

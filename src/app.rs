use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::AppConfig;
use crate::devops::catalog::{list_projects, list_teams};
use crate::devops::DevOpsApi;
use crate::event::KeyAction;
use crate::model::collection::{Collection, Project, Team};
use crate::model::workload::{WorkloadEntry, WorkloadReport};
use crate::workload::aggregate::{aggregate, AggregationOptions, AggregationRequest};
use crate::workload::chart::{chart_data, ChartData, MemberOrder};
use crate::workload::selection::{ProjectSelector, Selection, TeamSelector};

#[derive(Debug, Clone)]
pub enum Action {
    Key(KeyAction),
    Tick,
    WorkloadLoaded {
        generation: u64,
        result: Result<WorkloadReport, String>,
    },
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewMode {
    Projects,
    Teams,
    Chart,
    MemberDetail,
}

pub struct App {
    pub view_mode: ViewMode,
    pub projects: Vec<Project>,
    /// Row in the project picker; row 0 is "All projects".
    pub selected_project: usize,
    pub teams: Vec<Team>,
    /// Row in the team picker; row 0 is "All teams".
    pub selected_team: usize,
    pub selection: Option<Selection>,
    /// Display names of the active selection, captured when it was picked.
    pub selection_label: Option<String>,
    pub report: Option<WorkloadReport>,
    pub selected_member: usize,
    pub detail_scroll: usize,
    pub search: String,
    pub search_active: bool,
    pub date_filter: bool,
    pub order: MemberOrder,
    pub loading: bool,
    pub error: Option<String>,
    pub flash_message: Option<(String, Instant)>,
    pub should_quit: bool,
    pub action_tx: mpsc::UnboundedSender<Action>,
    api: Arc<dyn DevOpsApi>,
    collections: Vec<Collection>,
    options: AggregationOptions,
    generation: u64,
    running: Option<JoinHandle<()>>,
}

impl App {
    pub fn new(
        config: &AppConfig,
        api: Arc<dyn DevOpsApi>,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Self {
        let today = chrono::Local::now().date_naive();
        Self {
            view_mode: ViewMode::Projects,
            projects: Vec::new(),
            selected_project: 0,
            teams: Vec::new(),
            selected_team: 0,
            selection: None,
            selection_label: None,
            report: None,
            selected_member: 0,
            detail_scroll: 0,
            search: String::new(),
            search_active: false,
            date_filter: config.query.date_filter,
            order: config.query.order,
            loading: false,
            error: None,
            flash_message: None,
            should_quit: false,
            action_tx,
            api,
            collections: config.collections(),
            options: AggregationOptions::from_config(config, today),
            generation: 0,
            running: None,
        }
    }

    pub fn has_collections(&self) -> bool {
        !self.collections.is_empty()
    }

    pub fn states(&self) -> &[String] {
        &self.options.process.states
    }

    pub async fn update(&mut self, action: Action) {
        match action {
            Action::Key(key) => self.handle_key(key).await,
            Action::Tick => {
                // Clear flash message after 3 seconds
                if let Some((_, t)) = &self.flash_message {
                    if t.elapsed().as_secs() >= 3 {
                        self.flash_message = None;
                    }
                }
            }
            Action::WorkloadLoaded { generation, result } => {
                self.finish_aggregation(generation, result);
            }
            Action::Quit => {
                self.should_quit = true;
            }
        }
    }

    async fn handle_key(&mut self, key: KeyAction) {
        if self.search_active {
            self.handle_search_key(key);
            return;
        }

        match key {
            KeyAction::Char('q') => self.should_quit = true,
            KeyAction::Up => match self.view_mode {
                ViewMode::Projects => {
                    self.selected_project = self.selected_project.saturating_sub(1);
                }
                ViewMode::Teams => {
                    self.selected_team = self.selected_team.saturating_sub(1);
                }
                ViewMode::Chart => {
                    self.selected_member = self.selected_member.saturating_sub(1);
                }
                ViewMode::MemberDetail => {
                    self.detail_scroll = self.detail_scroll.saturating_sub(1);
                }
            },
            KeyAction::Down => match self.view_mode {
                ViewMode::Projects => {
                    if self.selected_project < self.projects.len() {
                        self.selected_project += 1;
                    }
                }
                ViewMode::Teams => {
                    if self.selected_team < self.teams.len() {
                        self.selected_team += 1;
                    }
                }
                ViewMode::Chart => {
                    let count = self.chart().categories.len();
                    if count > 0 && self.selected_member < count - 1 {
                        self.selected_member += 1;
                    }
                }
                ViewMode::MemberDetail => {
                    self.detail_scroll += 1;
                }
            },
            KeyAction::Select | KeyAction::Right => match self.view_mode {
                ViewMode::Projects => self.choose_project().await,
                ViewMode::Teams => self.choose_team(),
                ViewMode::Chart => {
                    if self.selected_member_entry().is_some() {
                        self.detail_scroll = 0;
                        self.view_mode = ViewMode::MemberDetail;
                    }
                }
                ViewMode::MemberDetail => {}
            },
            KeyAction::Left | KeyAction::Escape => match self.view_mode {
                ViewMode::Projects => {}
                ViewMode::Teams => self.view_mode = ViewMode::Projects,
                ViewMode::Chart => self.view_mode = ViewMode::Teams,
                ViewMode::MemberDetail => self.view_mode = ViewMode::Chart,
            },
            KeyAction::Char('/') => {
                if matches!(self.view_mode, ViewMode::Chart) {
                    self.search_active = true;
                }
            }
            KeyAction::Char('f') => {
                self.date_filter = !self.date_filter;
                let status = if self.date_filter { "ON" } else { "OFF" };
                self.flash_message =
                    Some((format!("Target date filter: {status}"), Instant::now()));
                if self.selection.is_some() {
                    self.start_aggregation();
                }
            }
            KeyAction::Char('r') => match self.view_mode {
                ViewMode::Projects | ViewMode::Teams => self.load_projects().await,
                ViewMode::Chart | ViewMode::MemberDetail => self.start_aggregation(),
            },
            KeyAction::Char(_) | KeyAction::Backspace => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyAction) {
        match key {
            KeyAction::Char(c) => self.search.push(c),
            KeyAction::Backspace => {
                self.search.pop();
            }
            KeyAction::Escape => {
                self.search.clear();
                self.search_active = false;
            }
            KeyAction::Select => self.search_active = false,
            _ => {}
        }
        self.selected_member = 0;
    }

    /// Load the project catalog of every configured collection.
    ///
    /// A collection that fails is reported and skipped; the others still load.
    pub async fn load_projects(&mut self) {
        if self.collections.is_empty() {
            self.error = Some(
                "No collections configured. Add server_url, name and pat to ~/.workload/config.toml"
                    .into(),
            );
            return;
        }

        self.loading = true;
        self.error = None;
        let mut projects = Vec::new();
        let mut errors = Vec::new();
        for collection in &self.collections {
            match list_projects(self.api.as_ref(), collection).await {
                Ok(list) => projects.extend(list),
                Err(e) => errors.push(format!("{}: {e}", collection.name)),
            }
        }

        self.projects = projects;
        self.selected_project = self.selected_project.min(self.projects.len());
        if !errors.is_empty() {
            self.error = Some(format!("Failed to load projects: {}", errors.join("; ")));
        }
        self.loading = false;
    }

    fn picked_project(&self) -> Option<&Project> {
        self.selected_project
            .checked_sub(1)
            .and_then(|i| self.projects.get(i))
    }

    fn picked_team(&self) -> Option<&Team> {
        self.selected_team
            .checked_sub(1)
            .and_then(|i| self.teams.get(i))
    }

    async fn choose_project(&mut self) {
        self.teams.clear();
        self.selected_team = 0;

        if let Some(project) = self.picked_project().cloned() {
            let Some(collection) = self
                .collections
                .iter()
                .find(|c| c.name == project.collection)
                .cloned()
            else {
                return;
            };
            self.loading = true;
            self.error = None;
            match list_teams(self.api.as_ref(), &collection, &project).await {
                Ok(teams) => self.teams = teams,
                Err(e) => self.error = Some(format!("Failed to load teams: {e}")),
            }
            self.loading = false;
        }

        self.view_mode = ViewMode::Teams;
    }

    fn choose_team(&mut self) {
        let project = match self.picked_project() {
            Some(p) => ProjectSelector::for_project(p),
            None => ProjectSelector::All,
        };
        let team = match self.picked_team() {
            Some(t) => TeamSelector::Specific(t.id.clone()),
            None => TeamSelector::All,
        };
        self.selection = Some(Selection { project, team });
        self.selection_label = Some(self.picker_label());
        self.selected_member = 0;
        self.view_mode = ViewMode::Chart;
        self.start_aggregation();
    }

    /// Start a new aggregation run, superseding any run still in flight.
    pub fn start_aggregation(&mut self) {
        let Some(selection) = self.selection.clone() else {
            self.error = Some("Select a project and a team first".into());
            return;
        };

        if let Some(handle) = self.running.take() {
            handle.abort();
        }
        self.generation += 1;
        let generation = self.generation;

        let mut options = self.options.clone();
        options.require_target_date = self.date_filter;
        options.today = chrono::Local::now().date_naive();
        let request = AggregationRequest {
            collections: self.collections.clone(),
            selection,
            options,
        };

        self.loading = true;
        self.error = None;
        let api = self.api.clone();
        let tx = self.action_tx.clone();
        self.running = Some(tokio::spawn(async move {
            let result = aggregate(api.as_ref(), &request)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(Action::WorkloadLoaded { generation, result });
        }));
    }

    fn finish_aggregation(&mut self, generation: u64, result: Result<WorkloadReport, String>) {
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale workload result");
            return;
        }
        self.running = None;
        self.loading = false;

        match result {
            Ok(report) => {
                self.error = if report.warnings.is_empty() {
                    None
                } else {
                    Some(format!("Partial result: {}", report.warnings.join("; ")))
                };
                self.report = Some(report);
            }
            Err(msg) => {
                self.error = Some(format!("Failed to load workload: {msg}"));
                self.report = None;
            }
        }

        let count = self.chart().categories.len();
        if self.selected_member >= count {
            self.selected_member = count.saturating_sub(1);
        }
    }

    fn search_term(&self) -> Option<&str> {
        Some(self.search.as_str()).filter(|s| !s.is_empty())
    }

    pub fn chart(&self) -> ChartData {
        match &self.report {
            Some(report) => chart_data(&report.data, self.states(), self.order, self.search_term()),
            None => ChartData::default(),
        }
    }

    pub fn selected_member_entry(&self) -> Option<(String, &WorkloadEntry)> {
        let report = self.report.as_ref()?;
        let name = self.chart().categories.get(self.selected_member)?.clone();
        let entry = report.data.get(&name)?;
        Some((name, entry))
    }

    /// Scope under the picker cursor.
    pub fn picker_label(&self) -> String {
        let project = self
            .picked_project()
            .map(|p| format!("{} / {}", p.collection, p.name))
            .unwrap_or_else(|| "All projects".into());
        let team = self
            .picked_team()
            .map(|t| t.name.clone())
            .unwrap_or_else(|| "All teams".into());
        format!("{project} › {team}")
    }

    /// Scope of the data on screen, independent of where the picker cursor is.
    pub fn scope_label(&self) -> String {
        if let Some(label) = &self.selection_label {
            return label.clone();
        }
        let Some(selection) = &self.selection else {
            return "No selection".into();
        };
        let project = match &selection.project {
            ProjectSelector::All => "All projects".to_string(),
            ProjectSelector::Specific { collection: Some(c), key } => format!("{c} / {key}"),
            ProjectSelector::Specific { collection: None, key } => key.clone(),
        };
        let team = match &selection.team {
            TeamSelector::All => "All teams".to_string(),
            TeamSelector::Specific(key) => key.clone(),
        };
        format!("{project} › {team}")
    }
}

use anyhow::{bail, Context, Result};
use serde_json::json;

use crate::config::AppConfig;
use crate::devops::catalog::{list_projects, list_teams};
use crate::devops::DevOpsApi;
use crate::model::workload::WorkloadData;
use crate::workload::aggregate::{aggregate, AggregationOptions, AggregationRequest};
use crate::workload::chart::{chart_data, ChartData};
use crate::workload::selection::{ProjectSelector, Selection, TeamSelector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dashboard,
    Report(ReportArgs),
    Projects,
    Teams(String),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArgs {
    pub project: String,
    pub team: String,
    pub date_filter: bool,
    pub search: Option<String>,
    pub json: bool,
}

impl Default for ReportArgs {
    fn default() -> Self {
        Self {
            project: "all".into(),
            team: "all".into(),
            date_filter: false,
            search: None,
            json: false,
        }
    }
}

/// Parse everything after the program name.
pub fn parse_command(args: &[String]) -> Result<Command> {
    let Some(first) = args.first() else {
        return Ok(Command::Dashboard);
    };
    match first.as_str() {
        "report" => Ok(Command::Report(parse_report_args(&args[1..])?)),
        "projects" => Ok(Command::Projects),
        "teams" => match args.get(1) {
            Some(project) => Ok(Command::Teams(project.clone())),
            None => bail!("Usage: workload teams <project>"),
        },
        "help" | "-h" | "--help" => Ok(Command::Help),
        other => bail!("Unknown command: {other}\n\nRun `workload help` for usage."),
    }
}

/// Parse `workload report` options.
///
/// Supported forms:
///   workload report
///   workload report -p Shop -t Web
///   workload report --project DefaultCollection/Shop --date-filter --json
///   workload report --search li
pub fn parse_report_args(args: &[String]) -> Result<ReportArgs> {
    let mut report = ReportArgs::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            flag @ ("-p" | "--project" | "-t" | "--team" | "-s" | "--search") => {
                i += 1;
                let Some(value) = args.get(i) else {
                    bail!("Missing value for {flag}");
                };
                match flag {
                    "-p" | "--project" => report.project = value.clone(),
                    "-t" | "--team" => report.team = value.clone(),
                    _ => report.search = Some(value.clone()),
                }
            }
            "--date-filter" => report.date_filter = true,
            "--json" => report.json = true,
            other => bail!("Unknown report option: {other}"),
        }
        i += 1;
    }

    Ok(report)
}

/// Aggregate and render the report as text or JSON.
pub async fn report_output(api: &dyn DevOpsApi, config: &AppConfig, args: &ReportArgs) -> Result<String> {
    let collections = config.collections();
    if collections.is_empty() {
        bail!("No collections configured. Add server_url, name and pat to ~/.workload/config.toml");
    }

    let mut options = AggregationOptions::from_config(config, chrono::Local::now().date_naive());
    options.require_target_date |= args.date_filter;
    let request = AggregationRequest {
        collections,
        selection: Selection {
            project: ProjectSelector::parse(&args.project),
            team: TeamSelector::parse(&args.team),
        },
        options,
    };

    let report = aggregate(api, &request)
        .await
        .context("Failed to load workload")?;
    let chart = chart_data(
        &report.data,
        &config.process.states,
        config.query.order,
        args.search.as_deref(),
    );

    if args.json {
        let body = json!({
            "chart": chart,
            "workload": report.data,
            "warnings": report.warnings,
        });
        return Ok(serde_json::to_string_pretty(&body)?);
    }

    let mut out = render_table(&chart, &report.data);
    for warning in &report.warnings {
        out.push_str(&format!("warning: {warning}\n"));
    }
    Ok(out)
}

/// Plain-text table: one row per member with the total and per-state counts.
///
/// Items in states outside the chart series are counted in an `Other`
/// column, shown only when some member has such items.
pub fn render_table(chart: &ChartData, data: &WorkloadData) -> String {
    if chart.categories.is_empty() {
        return "No assigned work items.\n".into();
    }

    let totals: Vec<usize> = (0..chart.categories.len())
        .map(|m| {
            data.get(&chart.categories[m])
                .map(|entry| entry.total)
                .unwrap_or_else(|| chart.stack_total(m))
        })
        .collect();
    let others: Vec<usize> = totals
        .iter()
        .enumerate()
        .map(|(m, total)| total.saturating_sub(chart.stack_total(m)))
        .collect();
    let show_other = others.iter().any(|&n| n > 0);

    let name_width = chart
        .categories
        .iter()
        .map(|c| c.chars().count())
        .max()
        .unwrap_or(0)
        .max("Member".len());
    let col_widths: Vec<usize> = chart
        .series
        .iter()
        .map(|s| s.label.chars().count().max(3))
        .collect();

    let mut out = format!("{:<name_width$}  {:>5}", "Member", "Total");
    for (series, width) in chart.series.iter().zip(&col_widths) {
        out.push_str(&format!("  {:>width$}", series.label));
    }
    if show_other {
        out.push_str("  Other");
    }
    out.push('\n');

    for (m, member) in chart.categories.iter().enumerate() {
        out.push_str(&format!("{member:<name_width$}  {:>5}", totals[m]));
        for (series, width) in chart.series.iter().zip(&col_widths) {
            let value = series.values.get(m).copied().unwrap_or(0);
            out.push_str(&format!("  {value:>width$}"));
        }
        if show_other {
            out.push_str(&format!("  {:>5}", others[m]));
        }
        out.push('\n');
    }
    out
}

pub async fn projects_output(api: &dyn DevOpsApi, config: &AppConfig) -> Result<String> {
    let mut out = String::new();
    for collection in config.collections() {
        match list_projects(api, &collection).await {
            Ok(projects) => {
                for p in projects {
                    out.push_str(&format!("{}/{}\t{}\n", collection.name, p.name, p.id));
                }
            }
            Err(e) => out.push_str(&format!("{}: error: {e}\n", collection.name)),
        }
    }
    Ok(out)
}

pub async fn teams_output(api: &dyn DevOpsApi, config: &AppConfig, project: &str) -> Result<String> {
    let selector = ProjectSelector::parse(project);
    let mut out = String::new();
    let mut found = false;
    for collection in config.collections() {
        let projects = match list_projects(api, &collection).await {
            Ok(p) => p,
            Err(e) => {
                out.push_str(&format!("{}: error: {e}\n", collection.name));
                continue;
            }
        };
        for p in projects.iter().filter(|p| selector.matches(p)) {
            found = true;
            let teams = list_teams(api, &collection, p)
                .await
                .with_context(|| format!("Failed to list teams of {}", p.name))?;
            for t in teams {
                out.push_str(&format!("{}/{}/{}\t{}\n", collection.name, p.name, t.name, t.id));
            }
        }
    }
    if !found {
        bail!("Project {project:?} not found");
    }
    Ok(out)
}

pub fn print_help() {
    println!("workload: team workload dashboard for Azure DevOps Server\n");
    println!("USAGE:");
    println!("  workload                    Launch the dashboard");
    println!("  workload report [options]   Print per-member workload");
    println!("  workload projects           List projects of every collection");
    println!("  workload teams <project>    List teams of a project");
    println!();
    println!("REPORT OPTIONS:");
    println!("  -p, --project <all|name|collection/name>");
    println!("  -t, --team <all|name>");
    println!("  -s, --search <text>   Only members whose name contains <text>");
    println!("      --date-filter     Only items with a target date");
    println!("      --json            Print chart data and workload as JSON");
    println!();
    println!("Configuration is read from ~/.workload/config.toml (or $WORKLOAD_CONFIG).");
}

//! Typed WIQL construction.
//!
//! Values are always emitted as quoted literals with embedded quotes doubled,
//! so project and team names can't break out of a clause.

use std::fmt::Write;

use crate::config::ProcessTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    WorkItemType,
    TeamProject,
    AreaPath,
    State,
    Priority,
    TargetDate,
}

impl Field {
    pub fn reference(&self) -> &'static str {
        match self {
            Field::Id => "System.Id",
            Field::WorkItemType => "System.WorkItemType",
            Field::TeamProject => "System.TeamProject",
            Field::AreaPath => "System.AreaPath",
            Field::State => "System.State",
            Field::Priority => "Microsoft.VSTS.Common.Priority",
            Field::TargetDate => "Microsoft.VSTS.Scheduling.TargetDate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Equals(Field, String),
    NotEquals(Field, String),
    Under(Field, String),
    IsSet(Field),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wiql {
    clauses: Vec<Clause>,
    order_by: Vec<Field>,
}

pub fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl Wiql {
    pub fn select_ids() -> Self {
        Self {
            clauses: Vec::new(),
            order_by: Vec::new(),
        }
    }

    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Append an ascending sort key.
    pub fn order_by(mut self, field: Field) -> Self {
        self.order_by.push(field);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn to_query_string(&self) -> String {
        let mut out = format!("SELECT [{}] FROM WorkItems", Field::Id.reference());

        for (i, clause) in self.clauses.iter().enumerate() {
            out.push_str(if i == 0 { " WHERE " } else { " AND " });
            let _ = match clause {
                Clause::Equals(f, v) => write!(out, "[{}] = {}", f.reference(), literal(v)),
                Clause::NotEquals(f, v) => write!(out, "[{}] <> {}", f.reference(), literal(v)),
                Clause::Under(f, v) => write!(out, "[{}] UNDER {}", f.reference(), literal(v)),
                Clause::IsSet(f) => write!(out, "[{}] <> ''", f.reference()),
            };
        }

        for (i, field) in self.order_by.iter().enumerate() {
            out.push_str(if i == 0 { " ORDER BY " } else { ", " });
            let _ = write!(out, "[{}] ASC", field.reference());
        }

        out
    }
}

/// The work-item id query for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkItemQuery {
    pub project: Option<String>,
    pub area_path: Option<String>,
    pub require_target_date: bool,
}

impl WorkItemQuery {
    pub fn to_wiql(&self, process: &ProcessTemplate) -> Wiql {
        let mut wiql = Wiql::select_ids().and(Clause::Equals(
            Field::WorkItemType,
            process.work_item_type.clone(),
        ));
        if let Some(project) = &self.project {
            wiql = wiql.and(Clause::Equals(Field::TeamProject, project.clone()));
        }
        if let Some(area) = &self.area_path {
            wiql = wiql.and(Clause::Under(Field::AreaPath, area.clone()));
        }
        if self.require_target_date {
            wiql = wiql.and(Clause::IsSet(Field::TargetDate));
        }
        wiql.and(Clause::NotEquals(Field::State, process.closed_state.clone()))
            .and(Clause::NotEquals(Field::State, process.deleted_state.clone()))
            .order_by(Field::State)
            .order_by(Field::Priority)
    }
}

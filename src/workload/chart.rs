use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::model::workload::WorkloadData;

/// Direction members are listed in, by total item count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberOrder {
    #[default]
    Descending,
    Ascending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub values: Vec<usize>,
}

/// State-stacked bar data: `series[s].values[m]` is the number of items of
/// member `categories[m]` in state `series[s].label`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartData {
    pub categories: Vec<String>,
    pub series: Vec<ChartSeries>,
}

impl ChartData {
    pub fn stack_total(&self, member_index: usize) -> usize {
        self.series
            .iter()
            .filter_map(|s| s.values.get(member_index))
            .sum()
    }

    pub fn max_stack_total(&self) -> usize {
        (0..self.categories.len())
            .map(|i| self.stack_total(i))
            .max()
            .unwrap_or(0)
    }
}

fn matches_filter(name: &str, filter: Option<&str>) -> bool {
    match filter.map(str::trim).filter(|f| !f.is_empty()) {
        None => true,
        Some(term) => name.to_lowercase().contains(&term.to_lowercase()),
    }
}

/// Members with at least one item, ordered by total; ties keep name order.
pub fn member_order(data: &WorkloadData, order: MemberOrder, filter: Option<&str>) -> Vec<String> {
    let mut members: Vec<(&String, usize)> = data
        .iter()
        .filter(|(name, entry)| entry.total > 0 && matches_filter(name, filter))
        .map(|(name, entry)| (name, entry.total))
        .collect();

    match order {
        MemberOrder::Descending => members.sort_by_key(|(_, total)| Reverse(*total)),
        MemberOrder::Ascending => members.sort_by_key(|(_, total)| *total),
    }

    members.into_iter().map(|(name, _)| name.clone()).collect()
}

pub fn chart_data(
    data: &WorkloadData,
    states: &[String],
    order: MemberOrder,
    filter: Option<&str>,
) -> ChartData {
    let categories = member_order(data, order, filter);
    let series = states
        .iter()
        .map(|state| ChartSeries {
            label: state.clone(),
            values: categories
                .iter()
                .map(|member| {
                    data.get(member)
                        .map(|entry| entry.count_in_state(state))
                        .unwrap_or(0)
                })
                .collect(),
        })
        .collect();

    ChartData { categories, series }
}

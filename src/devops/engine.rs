use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use tracing::debug;

use super::query::Wiql;
use super::{ApiRequest, DevOpsApi};
use crate::error::{Result, WorkloadError};
use crate::model::collection::Collection;
use crate::model::work_item::{RawWorkItem, FIELD_PROJECTION};

/// Largest id list the work-items endpoint accepts in one call.
pub const BATCH_SIZE: usize = 200;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WiqlResponse {
    #[serde(default)]
    work_items: Vec<WorkItemRef>,
    continuation_token: Option<String>,
}

#[derive(Deserialize)]
struct WorkItemRef {
    id: u64,
}

#[derive(Deserialize)]
struct WorkItemsResponse {
    value: Option<Vec<RawWorkItem>>,
}

/// Run a WIQL query and follow continuation tokens until the server stops
/// returning one.
///
/// A token the server already handed out once means it is looping, which is
/// reported as [`WorkloadError::LoopGuard`] instead of spinning forever.
pub async fn query_ids(api: &dyn DevOpsApi, collection: &Collection, wiql: &Wiql) -> Result<Vec<u64>> {
    let query = wiql.to_query_string();
    debug!(collection = %collection.name, clauses = wiql.clauses().len(), %query, "running wiql");

    let mut ids = Vec::new();
    let mut seen_tokens: HashSet<String> = HashSet::new();
    let mut continuation: Option<String> = None;

    loop {
        let mut body = json!({ "query": query });
        if let Some(token) = &continuation {
            body["continuationToken"] = json!(token);
        }

        let value = api
            .call(collection, ApiRequest::post("/_apis/wit/wiql", body))
            .await?;
        let page: WiqlResponse = serde_json::from_value(value)
            .map_err(|e| WorkloadError::DataShape(format!("wiql response: {e}")))?;
        ids.extend(page.work_items.into_iter().map(|w| w.id));

        match page.continuation_token.filter(|t| !t.is_empty()) {
            Some(token) => {
                if !seen_tokens.insert(token.clone()) {
                    return Err(WorkloadError::LoopGuard(format!(
                        "server repeated continuation token {token:?} for {}",
                        collection.name
                    )));
                }
                continuation = Some(token);
            }
            None => break,
        }
    }

    debug!(collection = %collection.name, count = ids.len(), "wiql ids");
    Ok(ids)
}

/// Resolve ids to full records in batches of [`BATCH_SIZE`], preserving order.
pub async fn fetch_work_items(
    api: &dyn DevOpsApi,
    collection: &Collection,
    ids: &[u64],
) -> Result<Vec<RawWorkItem>> {
    let fields = FIELD_PROJECTION.join(",");
    let mut items = Vec::with_capacity(ids.len());

    for batch in ids.chunks(BATCH_SIZE) {
        let csv = batch
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let request = ApiRequest::get("/_apis/wit/workitems")
            .query("ids", csv)
            .query("fields", fields.clone());

        let value = api.call(collection, request).await?;
        let resp: WorkItemsResponse = serde_json::from_value(value)
            .map_err(|e| WorkloadError::DataShape(format!("work items response: {e}")))?;
        let batch_items = resp.value.ok_or_else(|| {
            WorkloadError::DataShape("work items response has no `value` array".into())
        })?;
        items.extend(batch_items);
    }

    Ok(items)
}

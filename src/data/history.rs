use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};

use crate::data::provider::{
    GET_STAKING_TRANSACTIONS_HISTORY, GET_TRANSACTIONS_HISTORY, RpcError, RpcTransport,
};
use crate::data::types::{HistoryFilter, HistoryItem, RawTransaction, SortOrder, TxKind};

/// Parameters shared by every page request of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub address: String,
    pub page_size: u32,
    pub full_tx: bool,
    pub filter: HistoryFilter,
    pub order: SortOrder,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("fetching {kind} history page {page_index}")]
    Rpc {
        kind: TxKind,
        page_index: u32,
        #[source]
        source: RpcError,
    },

    #[error("{kind} history page {page_index} repeats the previous page")]
    RepeatedPage { kind: TxKind, page_index: u32 },
}

impl TxKind {
    fn history_method(&self) -> &'static str {
        match self {
            TxKind::Plain => GET_TRANSACTIONS_HISTORY,
            TxKind::Staking => GET_STAKING_TRANSACTIONS_HISTORY,
        }
    }

    fn list_key(&self) -> &'static str {
        match self {
            TxKind::Plain => "transactions",
            TxKind::Staking => "staking_transactions",
        }
    }
}

fn page_params(query: &HistoryQuery, page_index: u32) -> Value {
    json!([{
        "address": query.address,
        "pageIndex": page_index,
        "pageSize": query.page_size,
        "fullTx": query.full_tx,
        "txType": query.filter.as_param(),
        "order": query.order.as_param(),
    }])
}

/// Pull the item list out of a history result. A missing result or list is
/// an empty page.
fn page_items(kind: TxKind, result: Value) -> Result<Vec<Value>, RpcError> {
    let malformed = |reason: String| RpcError::Malformed {
        method: kind.history_method().to_string(),
        reason,
    };

    match result {
        Value::Null => Ok(Vec::new()),
        Value::Object(mut map) => match map.remove(kind.list_key()) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(malformed(format!(
                "'{}' is not a list: {other}",
                kind.list_key()
            ))),
        },
        other => Err(malformed(format!("unexpected result {other}"))),
    }
}

/// Fetch every page of one kind of history, stopping at the first empty page.
///
/// Pages are requested strictly in index order. A page identical to the one
/// before it aborts the walk, since a node that ignores `pageIndex` would
/// otherwise never produce the empty terminating page.
pub async fn fetch_all_history<T: RpcTransport>(
    transport: &T,
    query: &HistoryQuery,
    kind: TxKind,
) -> Result<Vec<HistoryItem>, HistoryError> {
    let mut results = Vec::new();
    let mut previous: Option<Vec<Value>> = None;
    let mut page_index: u32 = 0;

    loop {
        let rpc_err = |source| HistoryError::Rpc {
            kind,
            page_index,
            source,
        };

        let result = transport
            .call(kind.history_method(), page_params(query, page_index))
            .await
            .map_err(rpc_err)?;
        let raw = page_items(kind, result).map_err(rpc_err)?;

        if raw.is_empty() {
            break;
        }
        if previous.as_ref() == Some(&raw) {
            return Err(HistoryError::RepeatedPage { kind, page_index });
        }

        let items = raw
            .iter()
            .cloned()
            .map(serde_json::from_value::<HistoryItem>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                rpc_err(RpcError::Malformed {
                    method: kind.history_method().to_string(),
                    reason: e.to_string(),
                })
            })?;

        debug!(%kind, page_index, items = items.len(), "history page");
        results.extend(items);
        previous = Some(raw);
        page_index += 1;
    }

    info!(%kind, pages = page_index, items = results.len(), "history complete");
    Ok(results)
}

/// Paginate each requested kind independently. A failure in one kind does
/// not discard what another kind already returned.
pub async fn fetch_kinds<T: RpcTransport>(
    transport: &T,
    query: &HistoryQuery,
    kinds: &[TxKind],
) -> Vec<(TxKind, Result<Vec<HistoryItem>, HistoryError>)> {
    let mut outcomes = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        outcomes.push((kind, fetch_all_history(transport, query, kind).await));
    }
    outcomes
}

/// Concatenate independently paginated sequences and order them by
/// timestamp. The sort is stable, so equal timestamps keep retrieval order.
pub fn merge_by_timestamp(
    sequences: Vec<Vec<RawTransaction>>,
    order: SortOrder,
) -> Vec<RawTransaction> {
    let mut merged: Vec<RawTransaction> = sequences.into_iter().flatten().collect();
    match order {
        SortOrder::Asc => merged.sort_by_key(|tx| tx.timestamp),
        SortOrder::Desc => merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
    }
    merged
}

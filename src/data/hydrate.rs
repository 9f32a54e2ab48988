use std::collections::{HashMap, HashSet};
use std::time::Duration;

use alloy::primitives::B256;
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::data::provider::{
    GET_STAKING_TRANSACTION_BY_HASH, GET_TRANSACTION_BY_HASH, GET_TRANSACTION_RECEIPT, RpcError,
    RpcTransport,
};
use crate::data::types::TxKind;

/// Which body to fetch for each hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    Transaction,
    StakingTransaction,
    Receipt,
}

impl Hydration {
    /// Body lookup for hashes paginated from `kind` history.
    pub fn body_for(kind: TxKind) -> Self {
        match kind {
            TxKind::Plain => Hydration::Transaction,
            TxKind::Staking => Hydration::StakingTransaction,
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Hydration::Transaction => GET_TRANSACTION_BY_HASH,
            Hydration::StakingTransaction => GET_STAKING_TRANSACTION_BY_HASH,
            Hydration::Receipt => GET_TRANSACTION_RECEIPT,
        }
    }
}

impl std::fmt::Display for Hydration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Hydration::Transaction => write!(f, "transaction fetch"),
            Hydration::StakingTransaction => write!(f, "staking transaction fetch"),
            Hydration::Receipt => write!(f, "receipt fetch"),
        }
    }
}

/// Bounds on one hydration batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLimits {
    /// Maximum RPC calls in flight at once.
    pub max_in_flight: usize,
    /// Deadline for the whole batch; outstanding calls are dropped when it
    /// elapses.
    pub deadline: Option<Duration>,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_in_flight: 32,
            deadline: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum HydrateError {
    #[error("{operation} for {hash}")]
    Rpc {
        operation: Hydration,
        hash: B256,
        #[source]
        source: RpcError,
    },

    #[error("{operation} for {hash} returned an unreadable body: {reason}")]
    Body {
        operation: Hydration,
        hash: B256,
        reason: String,
    },

    #[error("{operation} batch of {size} did not finish within {after:?}")]
    DeadlineElapsed {
        operation: Hydration,
        size: usize,
        after: Duration,
    },
}

/// Fetch the body for every hash concurrently and key each result by the hash
/// that requested it.
///
/// A `null` result is "not found" and is left out of the map. Any transport
/// failure fails the whole batch and drops the calls still in flight.
pub async fn hydrate<T, R>(
    transport: &T,
    hashes: &[B256],
    operation: Hydration,
    limits: &BatchLimits,
) -> Result<HashMap<B256, R>, HydrateError>
where
    T: RpcTransport,
    R: DeserializeOwned,
{
    let mut seen = HashSet::with_capacity(hashes.len());
    let unique: Vec<B256> = hashes.iter().copied().filter(|h| seen.insert(*h)).collect();
    let size = unique.len();

    let batch = async {
        let mut in_flight = stream::iter(unique)
            .map(|hash| async move {
                let result = transport.call(operation.method(), json!([hash])).await;
                (hash, result)
            })
            .buffer_unordered(limits.max_in_flight.max(1));

        let mut hydrated = HashMap::with_capacity(size);
        while let Some((hash, result)) = in_flight.next().await {
            let value = result.map_err(|source| HydrateError::Rpc {
                operation,
                hash,
                source,
            })?;

            if value.is_null() {
                debug!(%operation, %hash, "no result, skipping");
                continue;
            }

            let body = serde_json::from_value::<R>(value).map_err(|e| HydrateError::Body {
                operation,
                hash,
                reason: e.to_string(),
            })?;
            hydrated.insert(hash, body);
        }

        debug!(%operation, requested = size, found = hydrated.len(), "batch complete");
        Ok(hydrated)
    };

    match limits.deadline {
        Some(after) => tokio::time::timeout(after, batch)
            .await
            .map_err(|_| HydrateError::DeadlineElapsed {
                operation,
                size,
                after,
            })?,
        None => batch.await,
    }
}

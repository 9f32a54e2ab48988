pub mod abi;
pub mod classify;
pub mod decoder;
pub mod export;
pub mod history;
pub mod hydrate;
pub mod networks;
pub mod provider;
pub mod router;
pub mod tokens;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use std::collections::{BTreeMap, HashMap, HashSet};

use alloy::primitives::{Address, B256};
use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::data::abi::AbiRegistry;
use crate::data::classify::{Category, ReportSelection, classify};
use crate::data::decoder::decode_call;
use crate::data::history::{fetch_kinds, merge_by_timestamp};
use crate::data::hydrate::{Hydration, hydrate};
use crate::data::provider::RpcTransport;
use crate::data::router::project;
use crate::data::types::{EnrichedRecord, HistoryItem, RawTransaction, Receipt, TxKind};
use crate::utils::parse_account;

/// Runs one retrieval: paginate, hydrate, decode, project, classify.
///
/// Holds no state between runs; two runs against the same chain height
/// produce the same records.
pub struct Pipeline<T: RpcTransport> {
    transport: T,
    registry: AbiRegistry,
    config: PipelineConfig,
}

impl<T: RpcTransport> Pipeline<T> {
    pub fn new(transport: T, registry: AbiRegistry, config: PipelineConfig) -> Self {
        Self {
            transport,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Produce one record per retrieved transaction, in retrieval order (or
    /// timestamp order when several kinds are merged).
    pub async fn run(&self) -> Result<Vec<EnrichedRecord>> {
        let transactions = self.retrieve().await?;

        let receipts: HashMap<B256, Receipt> = if self.config.include_receipts {
            let hashes: Vec<B256> = transactions.iter().map(|tx| tx.hash).collect();
            let receipts = hydrate(&self.transport, &hashes, Hydration::Receipt, &self.config.limits)
                .await
                .wrap_err_with(|| format!("fetching receipts for {} transactions", hashes.len()))?;
            if receipts.len() < hashes.len() {
                warn!(
                    missing = hashes.len() - receipts.len(),
                    "some transactions have no receipt"
                );
            }
            receipts
        } else {
            HashMap::new()
        };

        let records: Vec<EnrichedRecord> = transactions
            .into_iter()
            .map(|tx| {
                let receipt = receipts.get(&tx.hash).cloned();
                let record = enrich(&self.registry, tx, receipt);
                log_gaps(&record);
                record
            })
            .collect();

        info!(records = records.len(), "pipeline complete");
        Ok(records)
    }

    /// Paginate every requested kind and make sure each item has a body.
    async fn retrieve(&self) -> Result<Vec<RawTransaction>> {
        let query = &self.config.query;
        let mut sequences: Vec<(TxKind, Vec<HistoryItem>)> = Vec::with_capacity(self.config.kinds.len());

        for (kind, outcome) in fetch_kinds(&self.transport, query, &self.config.kinds).await {
            match outcome {
                Ok(items) => sequences.push((kind, items)),
                Err(e) => {
                    let retrieved: usize = sequences.iter().map(|(_, items)| items.len()).sum();
                    if retrieved > 0 {
                        warn!(%kind, retrieved, "history retrieval failed after other kinds completed");
                    }
                    return Err(e).wrap_err_with(|| {
                        format!("retrieving {kind} history for {}", query.address)
                    });
                }
            }
        }

        // Staking hashes only resolve through the staking lookup
        let mut bodies: HashMap<B256, RawTransaction> = HashMap::new();
        for (kind, items) in &sequences {
            let pending: Vec<B256> = items
                .iter()
                .filter_map(|item| match item {
                    HistoryItem::Hash(hash) => Some(*hash),
                    HistoryItem::Full(_) => None,
                })
                .collect();
            if pending.is_empty() {
                continue;
            }

            let operation = Hydration::body_for(*kind);
            let hydrated: HashMap<B256, RawTransaction> =
                hydrate(&self.transport, &pending, operation, &self.config.limits)
                    .await
                    .wrap_err_with(|| format!("fetching {} {kind} transaction bodies", pending.len()))?;
            bodies.extend(hydrated);
        }

        let mut seen = HashSet::new();
        let resolved: Vec<Vec<RawTransaction>> = sequences
            .into_iter()
            .map(|(_, items)| {
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        HistoryItem::Full(tx) => Some(*tx),
                        HistoryItem::Hash(hash) => {
                            let body = bodies.remove(&hash);
                            if body.is_none() {
                                warn!(%hash, "transaction not found, skipping");
                            }
                            body
                        }
                    })
                    .filter(|tx| seen.insert(tx.hash))
                    .collect()
            })
            .collect();

        if resolved.len() > 1 {
            Ok(merge_by_timestamp(resolved, query.order))
        } else {
            Ok(resolved.into_iter().flatten().collect())
        }
    }
}

/// Decode, project and classify one transaction.
///
/// Decoding and projection failures are kept on the record, not raised.
pub fn enrich(registry: &AbiRegistry, tx: RawTransaction, receipt: Option<Receipt>) -> EnrichedRecord {
    let decoded = decode_call(registry, &tx.input);
    let router = match &decoded {
        Ok(invocation) => project(invocation, tx.value),
        Err(_) => Ok(None),
    };
    let category = decoded
        .as_ref()
        .map(|invocation| classify(&invocation.name))
        .unwrap_or(Category::Unclassified);

    EnrichedRecord {
        tx,
        receipt,
        decoded,
        router,
        category,
    }
}

fn log_gaps(record: &EnrichedRecord) {
    let hash = record.tx.hash;
    if let Err(e) = &record.decoded {
        warn!(%hash, error = %e, "undecodable call data");
    }
    if let Err(e) = &record.router {
        warn!(%hash, error = %e, "router projection failed");
    }
    if let (Ok(invocation), Ok(None)) = (&record.decoded, &record.router) {
        if record.category != Category::Unclassified {
            warn!(%hash, method = %invocation.name, "classified method has no router fields");
        }
    }
}

/// Keep only records sent by `address`. Senders reported as hex or as
/// `one1..` both match.
pub fn filter_by_sender(records: Vec<EnrichedRecord>, address: Address) -> Vec<EnrichedRecord> {
    records
        .into_iter()
        .filter(|record| parse_account(&record.tx.from) == Some(address))
        .collect()
}

/// Restrict to one report bucket. Undecodable records only appear in `All`.
pub fn select(records: Vec<EnrichedRecord>, selection: ReportSelection) -> Vec<EnrichedRecord> {
    match selection {
        ReportSelection::All => records,
        ReportSelection::Only(category) => records
            .into_iter()
            .filter(|record| record.decoded.is_ok() && record.category == category)
            .collect(),
    }
}

pub fn category_counts(records: &[EnrichedRecord]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.category.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Records keyed by lowercased hex sender address. A sender that does not
/// parse as an account is keyed by its lowercased text.
pub fn group_by_sender(records: &[EnrichedRecord]) -> BTreeMap<String, Vec<&EnrichedRecord>> {
    let mut groups: BTreeMap<String, Vec<&EnrichedRecord>> = BTreeMap::new();
    for record in records {
        let key = parse_account(&record.tx.from)
            .map(|a| a.to_string())
            .unwrap_or_else(|| record.tx.from.clone())
            .to_lowercase();
        groups.entry(key).or_default().push(record);
    }
    groups
}

pub fn group_by_block(records: &[EnrichedRecord]) -> BTreeMap<u64, Vec<&EnrichedRecord>> {
    let mut groups: BTreeMap<u64, Vec<&EnrichedRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.tx.block_number).or_default().push(record);
    }
    groups
}

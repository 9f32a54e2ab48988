use std::fs;
use std::path::{Path, PathBuf};

use alloy::primitives::{Address, U256};
use serde::Serialize;
use thiserror::Error;

use crate::data::classify::ReportSelection;
use crate::data::router::TokenLegs;
use crate::data::tokens::TokenResolver;
use crate::data::types::EnrichedRecord;
use crate::utils::{format_timestamp, scale_amount};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// One report line. Column order follows field order.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct ReportRow {
    address: String,
    tx_hash: String,
    timestamp: String,
    status: String,
    category: String,
    method: String,
    token_a: String,
    token_a_amount: String,
    token_b: String,
    token_b_amount: String,
}

/// Labels and amounts needed to render token legs.
pub struct TokenContext<'a, R: TokenResolver> {
    pub tokens: &'a R,
    pub wrapped_native: Option<Address>,
    pub native_symbol: &'a str,
}

impl<R: TokenResolver> TokenContext<'_, R> {
    fn leg(&self, token: Option<Address>, amount: Option<U256>) -> (String, String) {
        let Some(token) = token else {
            return (String::new(), amount.map(|a| a.to_string()).unwrap_or_default());
        };
        let label = self.tokens.label(&token, self.wrapped_native, self.native_symbol);
        let amount = amount
            .map(|a| scale_amount(a, self.tokens.decimals(&token)))
            .unwrap_or_default();
        (label, amount)
    }
}

fn report_row<R: TokenResolver>(record: &EnrichedRecord, ctx: &TokenContext<'_, R>) -> ReportRow {
    let legs = record
        .router_params()
        .map(|params| TokenLegs::from_params(params, ctx.wrapped_native))
        .unwrap_or_default();
    let (token_a, token_a_amount) = ctx.leg(legs.token_a, legs.amount_a);
    let (token_b, token_b_amount) = ctx.leg(legs.token_b, legs.amount_b);

    ReportRow {
        address: record.tx.from.clone(),
        tx_hash: record.tx.hash.to_string(),
        timestamp: format_timestamp(record.tx.timestamp),
        status: record.status().to_string(),
        category: record.category.to_string(),
        method: record.method_name().unwrap_or_default().to_string(),
        token_a,
        token_a_amount,
        token_b,
        token_b_amount,
    }
}

/// Write `records` as a CSV report at `path`, creating parent directories.
/// Returns the number of rows written; nothing is written for an empty set.
pub fn export_records_csv<R: TokenResolver>(
    records: &[EnrichedRecord],
    ctx: &TokenContext<'_, R>,
    path: &Path,
) -> Result<usize, ExportError> {
    if records.is_empty() {
        return Ok(0);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file = fs::File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut wtr = csv::Writer::from_writer(file);

    for record in records {
        wtr.serialize(report_row(record, ctx))?;
    }
    wtr.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(records.len())
}

/// `{dir}/{sender-}{type}-txs.csv`
pub fn report_path(dir: &Path, sender: Option<&str>, selection: ReportSelection) -> PathBuf {
    let prefix = sender.map(|s| format!("{s}-")).unwrap_or_default();
    dir.join(format!("{prefix}{}-txs.csv", selection.label()))
}

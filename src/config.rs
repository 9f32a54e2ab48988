use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use clap::Parser;
use thiserror::Error;

use crate::data::classify::ReportSelection;
use crate::data::history::HistoryQuery;
use crate::data::hydrate::BatchLimits;
use crate::data::networks::{get_network_config, supported_networks};
use crate::data::types::{HistoryFilter, SortOrder, TxKind};
use crate::utils::parse_account;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "router-history",
    about = "Fetch, decode and classify the transaction history of a swap router"
)]
pub struct Config {
    /// Network preset (mainnet, testnet, localnet)
    #[arg(short, long, default_value = "testnet")]
    pub network: String,

    /// RPC endpoint URL, overrides the network preset
    #[arg(long, env = "ROUTER_HISTORY_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Shard the router lives on
    #[arg(long, default_value = "0")]
    pub shard: u32,

    /// Router contract address (0x.. or one1..)
    #[arg(short, long, env = "ROUTER_ADDRESS")]
    pub router: String,

    /// Router ABI: a bare ABI array or a build artifact with an `abi` key
    #[arg(long)]
    pub abi: PathBuf,

    /// Token list JSON used to label and scale amounts
    #[arg(long)]
    pub tokens: Option<PathBuf>,

    /// Report type: all, swap, addLiquidity, removeLiquidity
    #[arg(short = 't', long = "type", default_value = "all")]
    pub report_type: String,

    /// Number of transactions to fetch per page
    #[arg(short = 'p', long, default_value = "1000")]
    pub per_page: u32,

    /// Only report transactions sent by this address
    #[arg(short, long)]
    pub address: Option<String>,

    /// Which side of the history to fetch
    #[arg(long, value_enum, default_value_t = HistoryFilter::All)]
    pub history_filter: HistoryFilter,

    /// Order in which history pages are requested and merged
    #[arg(long, value_enum, default_value_t = SortOrder::Asc)]
    pub order: SortOrder,

    /// Also fetch staking transactions and merge them by timestamp
    #[arg(long)]
    pub staking: bool,

    /// Skip fetching receipts
    #[arg(long)]
    pub no_receipts: bool,

    /// Request hashes only from the history and hydrate bodies by hash
    #[arg(long)]
    pub hashes_only: bool,

    /// Maximum concurrent RPC calls per hydration batch
    #[arg(long, default_value = "32")]
    pub max_in_flight: usize,

    /// Per-call RPC timeout in seconds
    #[arg(long, default_value = "30")]
    pub rpc_timeout_secs: u64,

    /// Deadline for a whole hydration batch in seconds
    #[arg(long)]
    pub batch_deadline_secs: Option<u64>,

    /// Directory the CSV report is written to
    #[arg(long, default_value = "data/txs")]
    pub output_dir: PathBuf,

    /// Wrapped native token address, overrides the network preset
    #[arg(long)]
    pub wrapped_native: Option<String>,
}

/// Startup errors. Any of these prevents a pipeline run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field} address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("invalid ABI: {0}")]
    InvalidAbi(String),

    #[error("router table disagrees with the ABI: {0}")]
    RouterSchema(String),

    #[error("unknown network '{name}', expected one of {supported}")]
    UnknownNetwork { name: String, supported: String },

    #[error("network {network} has no shard {shard}")]
    ShardOutOfRange { network: String, shard: u32 },

    #[error("{0} must be greater than zero")]
    InvalidLimit(&'static str),

    #[error("{0}")]
    InvalidReportType(String),

    #[error("invalid token list: {0}")]
    InvalidTokenList(String),
}

/// Validated settings for one run, handed to the pipeline and its
/// collaborators.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub rpc_url: String,
    pub shard: u32,
    pub abi_path: PathBuf,
    pub tokens_path: Option<PathBuf>,
    pub query: HistoryQuery,
    pub kinds: Vec<TxKind>,
    pub include_receipts: bool,
    pub limits: BatchLimits,
    pub rpc_timeout: Duration,
    pub selection: ReportSelection,
    pub sender_filter: Option<Address>,
    pub output_dir: PathBuf,
    pub wrapped_native: Option<Address>,
    pub native_symbol: String,
}

impl Config {
    /// Validate the command line and resolve presets.
    pub fn pipeline(&self) -> Result<PipelineConfig, ConfigError> {
        let network = get_network_config(&self.network)
            .ok_or_else(|| ConfigError::UnknownNetwork {
                name: self.network.clone(),
                supported: supported_networks().join(", "),
            })?;

        let rpc_url = match &self.rpc_url {
            Some(url) => url.clone(),
            None => network
                .rpc_url(self.shard)
                .ok_or_else(|| ConfigError::ShardOutOfRange {
                    network: network.name.clone(),
                    shard: self.shard,
                })?,
        };

        validate_account("router", &self.router)?;
        let router = self.router.trim().to_string();
        let sender_filter = self
            .address
            .as_deref()
            .map(|a| validate_account("sender", a))
            .transpose()?;

        let wrapped_native = match &self.wrapped_native {
            Some(value) => Some(Address::from_str(value).map_err(|_| {
                ConfigError::InvalidAddress {
                    field: "wrapped native",
                    value: value.clone(),
                }
            })?),
            None => network.wrapped_native,
        };

        if self.per_page == 0 {
            return Err(ConfigError::InvalidLimit("per-page"));
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::InvalidLimit("max-in-flight"));
        }
        if self.rpc_timeout_secs == 0 {
            return Err(ConfigError::InvalidLimit("rpc-timeout-secs"));
        }

        let selection = self
            .report_type
            .parse::<ReportSelection>()
            .map_err(ConfigError::InvalidReportType)?;

        let mut kinds = vec![TxKind::Plain];
        if self.staking {
            kinds.push(TxKind::Staking);
        }

        Ok(PipelineConfig {
            rpc_url,
            shard: self.shard,
            abi_path: self.abi.clone(),
            tokens_path: self.tokens.clone(),
            query: HistoryQuery {
                address: router,
                page_size: self.per_page,
                full_tx: !self.hashes_only,
                filter: self.history_filter,
                order: self.order,
            },
            kinds,
            include_receipts: !self.no_receipts,
            limits: BatchLimits {
                max_in_flight: self.max_in_flight,
                deadline: self.batch_deadline_secs.map(Duration::from_secs),
            },
            rpc_timeout: Duration::from_secs(self.rpc_timeout_secs),
            selection,
            sender_filter,
            output_dir: self.output_dir.clone(),
            wrapped_native,
            native_symbol: network.symbol,
        })
    }
}

/// Accept a hex address or a checksummed bech32 `one1..` address.
fn validate_account(field: &'static str, value: &str) -> Result<Address, ConfigError> {
    parse_account(value).ok_or_else(|| ConfigError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

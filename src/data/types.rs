use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{B256, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::data::classify::Category;
use crate::data::decoder::DecodeError;
use crate::data::router::{RouterError, RouterParams};

/// A transaction body as returned by the node's history and by-hash calls.
///
/// Numeric fields accept JSON numbers as well as hex (`0x..`) or decimal
/// strings, since the v1 and v2 RPC namespaces disagree on the encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub hash: B256,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub input: Bytes,
    #[serde(default, with = "quantity::big")]
    pub value: U256,
    #[serde(default, with = "quantity::int")]
    pub timestamp: u64,
    #[serde(default, with = "quantity::int")]
    pub block_number: u64,
    #[serde(default, rename = "shardID", with = "quantity::int")]
    pub shard_id: u64,
}

/// Execution receipt. Only the fields the pipeline reads are typed; the rest
/// of the chain metadata is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: B256,
    #[serde(default, with = "quantity::opt_int")]
    pub status: Option<u64>,
    #[serde(default, with = "quantity::int")]
    pub block_number: u64,
    #[serde(default, with = "quantity::int")]
    pub gas_used: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Receipt {
    pub fn tx_status(&self) -> TxStatus {
        match self.status {
            Some(1) => TxStatus::Success,
            Some(_) => TxStatus::Failure,
            None => TxStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Failure,
    Unknown,
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxStatus::Success => write!(f, "Success"),
            TxStatus::Failure => write!(f, "Failure"),
            TxStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One entry of a history page: a bare hash when the history was requested
/// without full bodies, the body otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HistoryItem {
    Hash(B256),
    Full(Box<RawTransaction>),
}

impl HistoryItem {
    pub fn hash(&self) -> B256 {
        match self {
            HistoryItem::Hash(hash) => *hash,
            HistoryItem::Full(tx) => tx.hash,
        }
    }
}

/// Which history namespace to paginate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxKind {
    Plain,
    Staking,
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxKind::Plain => write!(f, "plain"),
            TxKind::Staking => write!(f, "staking"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// The `txType` history filter: everything touching the address, or only
/// the transactions it sent / received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum HistoryFilter {
    #[default]
    All,
    Sent,
    Received,
}

impl HistoryFilter {
    pub fn as_param(&self) -> &'static str {
        match self {
            HistoryFilter::All => "ALL",
            HistoryFilter::Sent => "SENT",
            HistoryFilter::Received => "RECEIVED",
        }
    }
}

/// A decoded contract call: the resolved method and its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInvocation {
    pub name: String,
    pub signature: String,
    pub selector: [u8; 4],
    pub params: Vec<DynSolValue>,
}

impl std::fmt::Display for MethodInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params: Vec<String> = self.params.iter().map(crate::utils::format_sol_value).collect();
        write!(f, "{}({})", self.name, params.join(", "))
    }
}

/// Terminal output of the pipeline, one per retrieved transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub tx: RawTransaction,
    pub receipt: Option<Receipt>,
    pub decoded: Result<MethodInvocation, DecodeError>,
    pub router: Result<Option<RouterParams>, RouterError>,
    pub category: Category,
}

impl EnrichedRecord {
    pub fn invocation(&self) -> Option<&MethodInvocation> {
        self.decoded.as_ref().ok()
    }

    pub fn router_params(&self) -> Option<&RouterParams> {
        self.router.as_ref().ok().and_then(Option::as_ref)
    }

    pub fn method_name(&self) -> Option<&str> {
        self.invocation().map(|inv| inv.name.as_str())
    }

    pub fn status(&self) -> TxStatus {
        self.receipt
            .as_ref()
            .map(Receipt::tx_status)
            .unwrap_or(TxStatus::Unknown)
    }
}

/// Serde adapters for RPC quantities that may arrive as numbers, hex strings
/// or decimal strings.
pub(crate) mod quantity {
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::utils::parse_quantity;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Float(f64),
        Text(String),
    }

    fn to_u256<E: serde::de::Error>(raw: Raw) -> Result<U256, E> {
        match raw {
            Raw::Int(n) => Ok(U256::from(n)),
            // Large values lose precision when the node emits them as bare JSON numbers.
            Raw::Float(f) if f >= 0.0 && f.is_finite() => Ok(U256::from(f as u128)),
            Raw::Float(f) => Err(E::custom(format!("invalid quantity {f}"))),
            Raw::Text(s) => {
                parse_quantity(&s).ok_or_else(|| E::custom(format!("invalid quantity {s:?}")))
            }
        }
    }

    pub mod big {
        use super::*;

        pub fn serialize<S: Serializer>(value: &U256, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(&format!("{value:#x}"))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
            to_u256(Raw::deserialize(d)?)
        }
    }

    pub mod int {
        use super::*;

        pub fn serialize<S: Serializer>(value: &u64, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_u64(*value)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
            let value = to_u256(Raw::deserialize(d)?)?;
            u64::try_from(value).map_err(|_| serde::de::Error::custom("quantity exceeds u64"))
        }
    }

    pub mod opt_int {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => s.serialize_some(v),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
            match Option::<Raw>::deserialize(d)? {
                Some(raw) => {
                    let value = to_u256(raw)?;
                    u64::try_from(value)
                        .map(Some)
                        .map_err(|_| serde::de::Error::custom("quantity exceeds u64"))
                }
                None => Ok(None),
            }
        }
    }
}

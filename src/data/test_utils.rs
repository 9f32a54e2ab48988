//! Shared fixtures for unit tests: a scripted RPC transport and a router ABI.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, B256};
use serde_json::{Value, json};

use crate::data::abi::AbiRegistry;
use crate::data::provider::{
    GET_STAKING_TRANSACTION_BY_HASH, GET_STAKING_TRANSACTIONS_HISTORY, GET_TRANSACTION_BY_HASH,
    GET_TRANSACTION_RECEIPT, GET_TRANSACTIONS_HISTORY, RpcError, RpcTransport,
};
use crate::data::types::TxKind;

pub const ROUTER: &str = "0x0000000000000000000000000000000000000abc";
pub const SENDER: &str = "0x00000000000000000000000000000000000000aa";

const ROUTER_ABI: &str = r#"[
  {"type":"function","name":"factory","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"address"}]},
  {"type":"function","name":"WETH","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"address"}]},
  {"type":"function","name":"addLiquidity","stateMutability":"nonpayable","inputs":[
    {"name":"tokenA","type":"address"},{"name":"tokenB","type":"address"},
    {"name":"amountADesired","type":"uint256"},{"name":"amountBDesired","type":"uint256"},
    {"name":"amountAMin","type":"uint256"},{"name":"amountBMin","type":"uint256"},
    {"name":"to","type":"address"},{"name":"deadline","type":"uint256"}],
   "outputs":[{"name":"amountA","type":"uint256"},{"name":"amountB","type":"uint256"},{"name":"liquidity","type":"uint256"}]},
  {"type":"function","name":"addLiquidityETH","stateMutability":"payable","inputs":[
    {"name":"token","type":"address"},{"name":"amountTokenDesired","type":"uint256"},
    {"name":"amountTokenMin","type":"uint256"},{"name":"amountETHMin","type":"uint256"},
    {"name":"to","type":"address"},{"name":"deadline","type":"uint256"}],
   "outputs":[{"name":"amountToken","type":"uint256"},{"name":"amountETH","type":"uint256"},{"name":"liquidity","type":"uint256"}]},
  {"type":"function","name":"removeLiquidity","stateMutability":"nonpayable","inputs":[
    {"name":"tokenA","type":"address"},{"name":"tokenB","type":"address"},
    {"name":"liquidity","type":"uint256"},{"name":"amountAMin","type":"uint256"},
    {"name":"amountBMin","type":"uint256"},{"name":"to","type":"address"},
    {"name":"deadline","type":"uint256"}],
   "outputs":[{"name":"amountA","type":"uint256"},{"name":"amountB","type":"uint256"}]},
  {"type":"function","name":"removeLiquidityETH","stateMutability":"nonpayable","inputs":[
    {"name":"token","type":"address"},{"name":"liquidity","type":"uint256"},
    {"name":"amountTokenMin","type":"uint256"},{"name":"amountETHMin","type":"uint256"},
    {"name":"to","type":"address"},{"name":"deadline","type":"uint256"}],
   "outputs":[{"name":"amountToken","type":"uint256"},{"name":"amountETH","type":"uint256"}]},
  {"type":"function","name":"swapExactTokensForTokens","stateMutability":"nonpayable","inputs":[
    {"name":"amountIn","type":"uint256"},{"name":"amountOutMin","type":"uint256"},
    {"name":"path","type":"address[]"},{"name":"to","type":"address"},
    {"name":"deadline","type":"uint256"}],
   "outputs":[{"name":"amounts","type":"uint256[]"}]},
  {"type":"function","name":"swapTokensForExactTokens","stateMutability":"nonpayable","inputs":[
    {"name":"amountOut","type":"uint256"},{"name":"amountInMax","type":"uint256"},
    {"name":"path","type":"address[]"},{"name":"to","type":"address"},
    {"name":"deadline","type":"uint256"}],
   "outputs":[{"name":"amounts","type":"uint256[]"}]},
  {"type":"function","name":"swapExactETHForTokens","stateMutability":"payable","inputs":[
    {"name":"amountOutMin","type":"uint256"},{"name":"path","type":"address[]"},
    {"name":"to","type":"address"},{"name":"deadline","type":"uint256"}],
   "outputs":[{"name":"amounts","type":"uint256[]"}]},
  {"type":"function","name":"swapTokensForExactETH","stateMutability":"nonpayable","inputs":[
    {"name":"amountOut","type":"uint256"},{"name":"amountInMax","type":"uint256"},
    {"name":"path","type":"address[]"},{"name":"to","type":"address"},
    {"name":"deadline","type":"uint256"}],
   "outputs":[{"name":"amounts","type":"uint256[]"}]},
  {"type":"function","name":"swapExactTokensForETH","stateMutability":"nonpayable","inputs":[
    {"name":"amountIn","type":"uint256"},{"name":"amountOutMin","type":"uint256"},
    {"name":"path","type":"address[]"},{"name":"to","type":"address"},
    {"name":"deadline","type":"uint256"}],
   "outputs":[{"name":"amounts","type":"uint256[]"}]},
  {"type":"function","name":"swapETHForExactTokens","stateMutability":"payable","inputs":[
    {"name":"amountOut","type":"uint256"},{"name":"path","type":"address[]"},
    {"name":"to","type":"address"},{"name":"deadline","type":"uint256"}],
   "outputs":[{"name":"amounts","type":"uint256[]"}]},
  {"type":"event","name":"Sync","anonymous":false,"inputs":[
    {"name":"reserve0","type":"uint112","indexed":false},{"name":"reserve1","type":"uint112","indexed":false}]}
]"#;

pub fn router_abi_json() -> &'static str {
    ROUTER_ABI
}

pub fn router_registry() -> AbiRegistry {
    AbiRegistry::from_json(ROUTER_ABI).unwrap()
}

/// Selector of `method` followed by the ABI encoding of `params`.
pub fn encode_call(method: &str, params: Vec<DynSolValue>) -> Vec<u8> {
    let registry = router_registry();
    let definition = registry.method(method).unwrap();
    let mut input = definition.selector.to_vec();
    input.extend(DynSolValue::Tuple(params).abi_encode_params());
    input
}

pub fn token(n: u8) -> Address {
    Address::repeat_byte(n)
}

pub fn hash(n: u8) -> B256 {
    B256::repeat_byte(n)
}

/// A full transaction body sent by [`SENDER`] to [`ROUTER`].
pub fn tx_json(n: u8, value: &str, timestamp: u64, input: &str) -> Value {
    tx_json_from(n, SENDER, value, timestamp, input)
}

pub fn tx_json_from(n: u8, from: &str, value: &str, timestamp: u64, input: &str) -> Value {
    json!({
        "hash": hash(n).to_string(),
        "from": from,
        "to": ROUTER,
        "input": input,
        "value": value,
        "timestamp": timestamp,
        "blockNumber": 1000 + n as u64,
        "shardID": 0,
    })
}

pub fn receipt_json(n: u8, status: &str) -> Value {
    json!({
        "transactionHash": hash(n).to_string(),
        "status": status,
        "blockNumber": 1000 + n as u64,
        "gasUsed": "0x5208",
        "logs": [],
    })
}

type Scripted = Result<Value, String>;

/// Scripted JSON-RPC node. Unscripted history pages come back empty and
/// unscripted hashes come back `null`.
#[derive(Default)]
pub struct MockTransport {
    history: HashMap<(&'static str, u64), Scripted>,
    by_hash: HashMap<(&'static str, B256), Scripted>,
    failing: Vec<B256>,
    delays: HashMap<B256, Duration>,
    calls: Mutex<Vec<(&'static str, Value)>>,
    completed: Mutex<Vec<B256>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

fn history_method(kind: TxKind) -> (&'static str, &'static str) {
    match kind {
        TxKind::Plain => (GET_TRANSACTIONS_HISTORY, "transactions"),
        TxKind::Staking => (GET_STAKING_TRANSACTIONS_HISTORY, "staking_transactions"),
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_page(self, kind: TxKind, page: u64, items: Vec<Value>) -> Self {
        let (_, key) = history_method(kind);
        let mut result = serde_json::Map::new();
        result.insert(key.to_string(), Value::Array(items));
        self.with_raw_history(kind, page, Value::Object(result))
    }

    pub fn with_raw_history(mut self, kind: TxKind, page: u64, result: Value) -> Self {
        let (method, _) = history_method(kind);
        self.history.insert((method, page), Ok(result));
        self
    }

    pub fn failing_history_page(mut self, kind: TxKind, page: u64) -> Self {
        let (method, _) = history_method(kind);
        self.history
            .insert((method, page), Err("connection reset".to_string()));
        self
    }

    pub fn with_transaction(mut self, tx: Value) -> Self {
        let hash: B256 = serde_json::from_value(tx["hash"].clone()).unwrap();
        self.by_hash.insert((GET_TRANSACTION_BY_HASH, hash), Ok(tx));
        self
    }

    pub fn with_staking_transaction(mut self, tx: Value) -> Self {
        let hash: B256 = serde_json::from_value(tx["hash"].clone()).unwrap();
        self.by_hash.insert((GET_STAKING_TRANSACTION_BY_HASH, hash), Ok(tx));
        self
    }

    pub fn with_receipt(mut self, receipt: Value) -> Self {
        let hash: B256 = serde_json::from_value(receipt["transactionHash"].clone()).unwrap();
        self.by_hash.insert((GET_TRANSACTION_RECEIPT, hash), Ok(receipt));
        self
    }

    /// Answer `getTransactionByHash` for `hash` with an arbitrary result.
    pub fn with_raw_result(mut self, hash: B256, result: Value) -> Self {
        self.by_hash.insert((GET_TRANSACTION_BY_HASH, hash), Ok(result));
        self
    }

    /// Every by-hash call for `hash` fails.
    pub fn failing_hash(mut self, hash: B256) -> Self {
        self.failing.push(hash);
        self
    }

    pub fn with_delay(mut self, hash: B256, delay: Duration) -> Self {
        self.delays.insert(hash, delay);
        self
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| *m == method)
            .count()
    }

    pub fn params_of(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| *m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn requested_pages(&self, method: &str) -> Vec<u64> {
        self.params_of(method)
            .iter()
            .filter_map(|params| params[0]["pageIndex"].as_u64())
            .collect()
    }

    /// Hashes in the order their by-hash calls finished.
    pub fn completion_order(&self) -> Vec<B256> {
        self.completed.lock().unwrap().clone()
    }

    /// Highest number of calls observed in flight at once.
    pub fn max_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn respond(&self, method: &'static str, params: &Value) -> Scripted {
        if let Some(page) = params[0]["pageIndex"].as_u64() {
            return self
                .history
                .get(&(method, page))
                .cloned()
                .unwrap_or_else(|| Ok(Value::Null));
        }

        let hash: B256 = serde_json::from_value(params[0].clone()).map_err(|e| e.to_string())?;
        if let Some(delay) = self.delays.get(&hash) {
            tokio::time::sleep(*delay).await;
        }
        self.completed.lock().unwrap().push(hash);

        if self.failing.contains(&hash) {
            return Err("connection reset".to_string());
        }
        self.by_hash
            .get(&(method, hash))
            .cloned()
            .unwrap_or(Ok(Value::Null))
    }
}

impl RpcTransport for MockTransport {
    async fn call(&self, method: &'static str, params: Value) -> Result<Value, RpcError> {
        self.calls.lock().unwrap().push((method, params.clone()));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        let outcome = self.respond(method, &params).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        outcome.map_err(|reason| RpcError::Transport {
            method: method.to_string(),
            reason,
        })
    }
}

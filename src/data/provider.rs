use std::future::Future;
use std::time::Duration;

use alloy::rpc::client::RpcClient;
use alloy::transports::http::Http;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub const GET_TRANSACTIONS_HISTORY: &str = "hmyv2_getTransactionsHistory";
pub const GET_STAKING_TRANSACTIONS_HISTORY: &str = "hmyv2_getStakingTransactionsHistory";
pub const GET_TRANSACTION_BY_HASH: &str = "hmyv2_getTransactionByHash";
pub const GET_STAKING_TRANSACTION_BY_HASH: &str = "hmyv2_getStakingTransactionByHash";
pub const GET_TRANSACTION_RECEIPT: &str = "hmyv2_getTransactionReceipt";

/// Failure of a single RPC call. Never retried by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("{method} failed: {reason}")]
    Transport { method: String, reason: String },

    #[error("{method} timed out after {after:?}")]
    Timeout { method: String, after: Duration },

    #[error("{method} returned a malformed response: {reason}")]
    Malformed { method: String, reason: String },
}

/// JSON-RPC access to one shard endpoint.
///
/// `call` resolves to the response's `result` payload, `Value::Null` when the
/// node returned none. Implementations must be safe to call concurrently.
pub trait RpcTransport: Send + Sync {
    fn call(
        &self,
        method: &'static str,
        params: Value,
    ) -> impl Future<Output = Result<Value, RpcError>> + Send;
}

/// HTTP transport over alloy's JSON-RPC client, bound to a single shard.
pub struct HttpTransport {
    client: RpcClient,
    timeout: Duration,
}

impl HttpTransport {
    pub fn connect(rpc_url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let url = rpc_url.parse().map_err(|e| RpcError::Transport {
            method: "connect".to_string(),
            reason: format!("invalid RPC URL {rpc_url}: {e}"),
        })?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport {
                method: "connect".to_string(),
                reason: e.to_string(),
            })?;

        let transport = Http::with_client(http_client, url);
        Ok(Self {
            client: RpcClient::new(transport, false),
            timeout,
        })
    }
}

impl RpcTransport for HttpTransport {
    async fn call(&self, method: &'static str, params: Value) -> Result<Value, RpcError> {
        debug!(method, %params, "rpc call");
        let request = self.client.request::<_, Value>(method, params);

        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(RpcError::Transport {
                method: method.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(RpcError::Timeout {
                method: method.to_string(),
                after: self.timeout,
            }),
        }
    }
}

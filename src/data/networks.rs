use alloy::primitives::{Address, address};

/// Endpoint preset for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: String,
    /// RPC endpoint with a `{shard}` placeholder.
    pub rpc_template: String,
    pub shard_count: u32,
    pub symbol: String,
    pub wrapped_native: Option<Address>,
}

impl NetworkConfig {
    /// RPC endpoint serving the given shard.
    pub fn rpc_url(&self, shard: u32) -> Option<String> {
        if shard >= self.shard_count {
            return None;
        }
        Some(self.rpc_template.replace("{shard}", &shard.to_string()))
    }
}

/// Get a network preset by name.
pub fn get_network_config(name: &str) -> Option<NetworkConfig> {
    match name.to_lowercase().as_str() {
        "mainnet" | "main" => Some(NetworkConfig {
            name: "Mainnet".to_string(),
            rpc_template: "https://api.s{shard}.t.hmny.io".to_string(),
            shard_count: 4,
            symbol: "ONE".to_string(),
            wrapped_native: Some(address!("cF664087a5bB0237a0BAd6742852ec6c8d69A27a")),
        }),
        "testnet" | "test" => Some(NetworkConfig {
            name: "Testnet".to_string(),
            rpc_template: "https://api.s{shard}.b.hmny.io".to_string(),
            shard_count: 2,
            symbol: "ONE".to_string(),
            wrapped_native: None,
        }),
        "localnet" | "local" => Some(NetworkConfig {
            name: "Localnet".to_string(),
            rpc_template: "http://localhost:950{shard}".to_string(),
            shard_count: 2,
            symbol: "ONE".to_string(),
            wrapped_native: None,
        }),
        _ => None,
    }
}

/// Return a list of all supported network names.
pub fn supported_networks() -> Vec<&'static str> {
    vec!["mainnet", "testnet", "localnet"]
}

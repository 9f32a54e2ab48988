use std::collections::HashMap;
use std::fs;
use std::path::Path;

use alloy::primitives::Address;
use serde::Deserialize;

use crate::config::ConfigError;

/// Decimals assumed for tokens missing from the list.
pub const DEFAULT_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub address: Address,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    DEFAULT_DECIMALS
}

/// Address to token metadata lookup used when labelling report amounts.
pub trait TokenResolver {
    fn token(&self, address: &Address) -> Option<&TokenInfo>;

    /// Symbol for `address`. The wrapped native token is reported under the
    /// native symbol; unknown tokens are labelled by their address.
    fn label(&self, address: &Address, wrapped_native: Option<Address>, native_symbol: &str) -> String {
        if wrapped_native == Some(*address) {
            return native_symbol.to_string();
        }
        match self.token(address) {
            Some(info) => info.symbol.clone(),
            None => address.to_string(),
        }
    }

    fn decimals(&self, address: &Address) -> u8 {
        self.token(address)
            .map(|info| info.decimals)
            .unwrap_or(DEFAULT_DECIMALS)
    }
}

#[derive(Debug, Default)]
pub struct TokenList {
    by_address: HashMap<Address, TokenInfo>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TokenFile {
    Bare(Vec<TokenInfo>),
    Wrapped { tokens: Vec<TokenInfo> },
}

impl TokenList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidTokenList(format!("{}: {e}", path.display())))?;
        Self::from_json(&data)
    }

    /// Parse a bare token array or a token-list object with a `tokens` key.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: TokenFile =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidTokenList(e.to_string()))?;
        let tokens = match file {
            TokenFile::Bare(tokens) | TokenFile::Wrapped { tokens } => tokens,
        };

        Ok(Self {
            by_address: tokens.into_iter().map(|t| (t.address, t)).collect(),
        })
    }

    pub fn find_symbol(&self, symbol: &str) -> Option<&TokenInfo> {
        self.by_address.values().find(|t| t.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

impl TokenResolver for TokenList {
    fn token(&self, address: &Address) -> Option<&TokenInfo> {
        self.by_address.get(address)
    }
}

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{Address, U256};
use thiserror::Error;

use crate::config::ConfigError;
use crate::data::abi::AbiRegistry;
use crate::data::types::MethodInvocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Address,
    Uint,
    Path,
}

impl FieldKind {
    fn accepts(&self, ty: &DynSolType) -> bool {
        match (self, ty) {
            (FieldKind::Address, DynSolType::Address) => true,
            (FieldKind::Uint, DynSolType::Uint(_)) => true,
            (FieldKind::Path, DynSolType::Array(inner)) => **inner == DynSolType::Address,
            _ => false,
        }
    }
}

/// Named layout of one router method's positional arguments.
#[derive(Debug)]
pub struct RouterSchema {
    pub method: &'static str,
    /// One entry per ABI input, in declaration order.
    pub fields: &'static [(&'static str, FieldKind)],
    /// Where the transaction's native value is spliced into the projection,
    /// for methods whose native leg is implicit.
    pub native_value: Option<(usize, &'static str)>,
}

use FieldKind::{Address as Addr, Path, Uint};

pub static ROUTER_SCHEMAS: &[RouterSchema] = &[
    RouterSchema {
        method: "addLiquidity",
        fields: &[
            ("tokenAAddress", Addr),
            ("tokenBAddress", Addr),
            ("amountADesired", Uint),
            ("amountBDesired", Uint),
            ("amountAMin", Uint),
            ("amountBMin", Uint),
            ("to", Addr),
            ("deadline", Uint),
        ],
        native_value: None,
    },
    RouterSchema {
        method: "addLiquidityETH",
        fields: &[
            ("tokenAddress", Addr),
            ("amountTokenDesired", Uint),
            ("amountTokenMin", Uint),
            ("amountETHMin", Uint),
            ("to", Addr),
            ("deadline", Uint),
        ],
        native_value: Some((3, "amountETHDesired")),
    },
    RouterSchema {
        method: "removeLiquidity",
        fields: &[
            ("tokenAAddress", Addr),
            ("tokenBAddress", Addr),
            ("liquidity", Uint),
            ("amountAMin", Uint),
            ("amountBMin", Uint),
            ("to", Addr),
            ("deadline", Uint),
        ],
        native_value: None,
    },
    RouterSchema {
        method: "removeLiquidityETH",
        fields: &[
            ("tokenAddress", Addr),
            ("liquidity", Uint),
            ("amountTokenMin", Uint),
            ("amountETHMin", Uint),
            ("to", Addr),
            ("deadline", Uint),
        ],
        native_value: None,
    },
    RouterSchema {
        method: "swapExactTokensForTokens",
        fields: &[
            ("amountIn", Uint),
            ("amountOutMin", Uint),
            ("path", Path),
            ("to", Addr),
            ("deadline", Uint),
        ],
        native_value: None,
    },
    RouterSchema {
        method: "swapTokensForExactTokens",
        fields: &[
            ("amountOut", Uint),
            ("amountInMax", Uint),
            ("path", Path),
            ("to", Addr),
            ("deadline", Uint),
        ],
        native_value: None,
    },
    RouterSchema {
        method: "swapExactETHForTokens",
        fields: &[
            ("amountOutMin", Uint),
            ("path", Path),
            ("to", Addr),
            ("deadline", Uint),
        ],
        native_value: Some((0, "amountETHDesired")),
    },
    RouterSchema {
        method: "swapTokensForExactETH",
        fields: &[
            ("amountOut", Uint),
            ("amountInMax", Uint),
            ("path", Path),
            ("to", Addr),
            ("deadline", Uint),
        ],
        native_value: None,
    },
    RouterSchema {
        method: "swapExactTokensForETH",
        fields: &[
            ("amountIn", Uint),
            ("amountOutMin", Uint),
            ("path", Path),
            ("to", Addr),
            ("deadline", Uint),
        ],
        native_value: None,
    },
    RouterSchema {
        method: "swapETHForExactTokens",
        fields: &[
            ("amountOut", Uint),
            ("path", Path),
            ("to", Addr),
            ("deadline", Uint),
        ],
        native_value: Some((0, "amountETHDesired")),
    },
];

pub fn schema(method: &str) -> Option<&'static RouterSchema> {
    ROUTER_SCHEMAS.iter().find(|s| s.method == method)
}

/// Check every schema whose method the ABI declares against the declared
/// parameter count and types. Methods missing from the ABI are skipped; a
/// schema that disagrees with the ABI is a startup error.
pub fn validate_schemas(registry: &AbiRegistry) -> Result<usize, ConfigError> {
    let mut checked = 0;

    for schema in ROUTER_SCHEMAS {
        let Some(method) = registry.method(schema.method) else {
            continue;
        };

        if method.inputs.len() != schema.fields.len() {
            return Err(ConfigError::RouterSchema(format!(
                "{} declares {} inputs, table maps {}",
                method.signature,
                method.inputs.len(),
                schema.fields.len()
            )));
        }

        for ((field, kind), ty) in schema.fields.iter().zip(&method.inputs) {
            if !kind.accepts(ty) {
                return Err(ConfigError::RouterSchema(format!(
                    "{}: field {field} expects {kind:?}, ABI declares {ty}",
                    method.signature
                )));
            }
        }

        if let Some((index, _)) = schema.native_value {
            if index > schema.fields.len() {
                return Err(ConfigError::RouterSchema(format!(
                    "{}: native value splice index {index} out of range",
                    schema.method
                )));
            }
        }

        checked += 1;
    }

    Ok(checked)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("{method} decoded {found} parameters, router table maps {expected}")]
    ParameterCount {
        method: String,
        expected: usize,
        found: usize,
    },
}

/// Named view over a router call's parameters, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterParams {
    pub method: String,
    pub fields: Vec<(&'static str, DynSolValue)>,
}

impl RouterParams {
    pub fn get(&self, name: &str) -> Option<&DynSolValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    pub fn amount(&self, name: &str) -> Option<U256> {
        match self.get(name)? {
            DynSolValue::Uint(value, _) => Some(*value),
            _ => None,
        }
    }

    pub fn address(&self, name: &str) -> Option<Address> {
        match self.get(name)? {
            DynSolValue::Address(address) => Some(*address),
            _ => None,
        }
    }

    pub fn path(&self) -> Option<Vec<Address>> {
        match self.get("path")? {
            DynSolValue::Array(items) => items
                .iter()
                .map(|item| match item {
                    DynSolValue::Address(address) => Some(*address),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(name, _)| *name).collect()
    }
}

/// Project a decoded call onto its named router fields.
///
/// `Ok(None)` means the method has no router schema; an error means the
/// method is known but its decoded arguments do not fit the schema.
pub fn project(
    invocation: &MethodInvocation,
    native_value: U256,
) -> Result<Option<RouterParams>, RouterError> {
    let Some(schema) = schema(&invocation.name) else {
        return Ok(None);
    };

    if invocation.params.len() != schema.fields.len() {
        return Err(RouterError::ParameterCount {
            method: invocation.name.clone(),
            expected: schema.fields.len(),
            found: invocation.params.len(),
        });
    }

    let mut fields: Vec<(&'static str, DynSolValue)> = schema
        .fields
        .iter()
        .zip(&invocation.params)
        .map(|((name, _), value)| (*name, value.clone()))
        .collect();

    if let Some((index, name)) = schema.native_value {
        fields.insert(index.min(fields.len()), (name, DynSolValue::Uint(native_value, 256)));
    }

    Ok(Some(RouterParams {
        method: invocation.name.clone(),
        fields,
    }))
}

/// The two token legs a router call moves, and the amount reported for each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenLegs {
    pub token_a: Option<Address>,
    pub amount_a: Option<U256>,
    pub token_b: Option<Address>,
    pub amount_b: Option<U256>,
}

impl TokenLegs {
    /// Work out which tokens a call touches and which amount to report for
    /// each side. Native legs are attributed to the wrapped native token.
    pub fn from_params(params: &RouterParams, wrapped_native: Option<Address>) -> Self {
        let (token_a, token_b) = match (
            params.address("tokenAAddress"),
            params.address("tokenBAddress"),
            params.address("tokenAddress"),
            params.path(),
        ) {
            (Some(a), Some(b), _, _) => (Some(a), Some(b)),
            (_, _, Some(token), _) => (wrapped_native, Some(token)),
            (_, _, _, Some(path)) => {
                let first = path.first().copied();
                let last = if path.len() > 1 {
                    path.last().copied()
                } else {
                    wrapped_native
                };
                (first, last)
            }
            _ => (None, None),
        };

        let (a_field, b_field) = match params.method.as_str() {
            "addLiquidity" => ("amountADesired", "amountBDesired"),
            "addLiquidityETH" => ("amountETHDesired", "amountTokenDesired"),
            "removeLiquidity" => ("amountAMin", "amountBMin"),
            "removeLiquidityETH" => ("amountETHMin", "amountTokenMin"),
            "swapExactTokensForTokens" | "swapExactTokensForETH" => ("amountIn", "amountOutMin"),
            "swapTokensForExactTokens" | "swapTokensForExactETH" => ("amountInMax", "amountOut"),
            "swapExactETHForTokens" => ("amountETHDesired", "amountOutMin"),
            "swapETHForExactTokens" => ("amountETHDesired", "amountOut"),
            _ => return Self { token_a, token_b, ..Self::default() },
        };

        Self {
            token_a,
            amount_a: params.amount(a_field),
            token_b,
            amount_b: params.amount(b_field),
        }
    }
}

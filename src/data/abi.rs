use std::collections::HashMap;
use std::fs;
use std::path::Path;

use alloy::dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy::json_abi::JsonAbi;

use crate::config::ConfigError;
use crate::data::decoder::DecodeError;

/// One callable method of the configured contract.
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    pub name: String,
    pub signature: String,
    pub selector: [u8; 4],
    pub inputs: Vec<DynSolType>,
    pub input_names: Vec<String>,
    pub outputs: Vec<DynSolType>,
}

/// Selector -> method lookup for a single contract, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct AbiRegistry {
    methods: HashMap<[u8; 4], MethodDefinition>,
}

impl AbiRegistry {
    /// Build the registry from a parsed ABI. Every function's parameter types
    /// must resolve, otherwise the ABI is rejected.
    pub fn from_abi(abi: &JsonAbi) -> Result<Self, ConfigError> {
        let mut methods = HashMap::new();

        for func in abi.functions() {
            let resolve_all = |params: &[alloy::json_abi::Param]| {
                params
                    .iter()
                    .map(|p| p.resolve())
                    .collect::<Result<Vec<DynSolType>, _>>()
                    .map_err(|e| ConfigError::InvalidAbi(format!("{}: {e}", func.signature())))
            };

            let definition = MethodDefinition {
                name: func.name.clone(),
                signature: func.signature(),
                selector: func.selector().0,
                inputs: resolve_all(func.inputs.as_slice())?,
                input_names: func.inputs.iter().map(|p| p.name.clone()).collect(),
                outputs: resolve_all(func.outputs.as_slice())?,
            };
            methods.insert(definition.selector, definition);
        }

        if methods.is_empty() {
            return Err(ConfigError::InvalidAbi(
                "ABI declares no functions".to_string(),
            ));
        }

        Ok(Self { methods })
    }

    /// Load an ABI from disk. Accepts either a bare ABI array or a contract
    /// build artifact with the ABI under an `abi` key.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidAbi(format!("{}: {e}", path.display())))?;
        Self::from_json(&data)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidAbi(e.to_string()))?;

        let abi_value = match value {
            serde_json::Value::Object(mut artifact) => artifact
                .remove("abi")
                .ok_or_else(|| ConfigError::InvalidAbi("artifact has no 'abi' key".to_string()))?,
            other => other,
        };

        let abi: JsonAbi =
            serde_json::from_value(abi_value).map_err(|e| ConfigError::InvalidAbi(e.to_string()))?;
        Self::from_abi(&abi)
    }

    pub fn resolve(&self, selector: [u8; 4]) -> Option<&MethodDefinition> {
        self.methods.get(&selector)
    }

    /// Resolve from hex call-data or a hex selector. Only the first 4 bytes
    /// are used; case and the `0x` prefix are ignored.
    pub fn resolve_hex(&self, input: &str) -> Option<&MethodDefinition> {
        let no0x = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);
        let head = no0x.get(..8)?;
        let bytes = alloy::primitives::hex::decode(head).ok()?;
        let selector: [u8; 4] = bytes.try_into().ok()?;
        self.resolve(selector)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDefinition> {
        self.methods.values().find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }
}

/// Decode ABI-encoded arguments into one value per declared type.
///
/// The data must be word aligned and at least as long as the static head of
/// the type list; anything the decoder rejects is reported as malformed
/// rather than partially decoded.
pub fn decode_params(
    method: &str,
    types: &[DynSolType],
    data: &[u8],
) -> Result<Vec<DynSolValue>, DecodeError> {
    let malformed = |reason: String| DecodeError::MalformedCallData {
        method: method.to_string(),
        reason,
    };

    if data.len() % 32 != 0 {
        return Err(malformed(format!(
            "{} bytes is not a whole number of 32-byte words",
            data.len()
        )));
    }

    let head_len: usize = types.iter().map(head_size).sum();
    if data.len() < head_len {
        return Err(malformed(format!(
            "expected at least {head_len} bytes of arguments, got {}",
            data.len()
        )));
    }

    if types.is_empty() {
        return Ok(Vec::new());
    }

    let decoded = DynSolType::Tuple(types.to_vec())
        .abi_decode_sequence(data)
        .map_err(|e| malformed(e.to_string()))?;

    match decoded {
        DynSolValue::Tuple(values) if values.len() == types.len() => Ok(values),
        other => Err(malformed(format!(
            "decoded {} values for {} declared types",
            match other {
                DynSolValue::Tuple(values) => values.len(),
                _ => 1,
            },
            types.len()
        ))),
    }
}

/// Bytes a type occupies in the head of an encoding: one offset word for
/// dynamic types, the full inline size for static ones.
fn head_size(ty: &DynSolType) -> usize {
    if is_dynamic(ty) {
        return 32;
    }
    match ty {
        DynSolType::FixedArray(inner, len) => head_size(inner) * len,
        DynSolType::Tuple(inner) => inner.iter().map(head_size).sum(),
        _ => 32,
    }
}

/// Whether a type is encoded out of line behind an offset word.
fn is_dynamic(ty: &DynSolType) -> bool {
    match ty {
        DynSolType::Bytes | DynSolType::String | DynSolType::Array(_) => true,
        DynSolType::FixedArray(inner, _) => is_dynamic(inner),
        DynSolType::Tuple(inner) => inner.iter().any(is_dynamic),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_utils::{router_abi_json, router_registry};
    use alloy::primitives::{Address, U256, keccak256};

    #[test]
    fn test_registry_resolves_every_declared_selector() {
        let registry = router_registry();
        let abi: JsonAbi = serde_json::from_str(router_abi_json()).unwrap();

        for func in abi.functions() {
            let expected = keccak256(func.signature().as_bytes());
            let selector: [u8; 4] = expected[..4].try_into().unwrap();
            let method = registry.resolve(selector).unwrap();
            assert_eq!(method.signature, func.signature());
            assert_eq!(method.name, func.name);
        }
        assert_eq!(registry.len(), abi.functions().count());
    }

    #[test]
    fn test_registry_unknown_selector() {
        let registry = router_registry();
        assert!(registry.resolve([0xde, 0xad, 0xbe, 0xef]).is_none());
        assert!(registry.resolve([0xa9, 0x05, 0x9c, 0xbb]).is_none());
    }

    #[test]
    fn test_resolve_hex_case_and_prefix() {
        let registry = router_registry();
        // swapExactTokensForTokens(uint256,uint256,address[],address,uint256)
        let lower = registry.resolve_hex("0x38ed1739").unwrap();
        assert_eq!(lower.name, "swapExactTokensForTokens");
        let upper = registry.resolve_hex("38ED1739FFFF").unwrap();
        assert_eq!(upper.name, "swapExactTokensForTokens");
        assert!(registry.resolve_hex("0x38ed17").is_none());
        assert!(registry.resolve_hex("0xzzzzzzzz").is_none());
    }

    #[test]
    fn test_load_artifact_with_abi_key() {
        let artifact = format!(r#"{{"contractName":"Router","abi":{}}}"#, router_abi_json());
        let registry = AbiRegistry::from_json(&artifact).unwrap();
        assert!(registry.method("addLiquidityETH").is_some());
    }

    #[test]
    fn test_load_rejects_empty_or_invalid_abi() {
        assert!(matches!(
            AbiRegistry::from_json("[]"),
            Err(ConfigError::InvalidAbi(_))
        ));
        assert!(matches!(
            AbiRegistry::from_json(r#"{"bytecode":"0x"}"#),
            Err(ConfigError::InvalidAbi(_))
        ));
        assert!(matches!(
            AbiRegistry::from_json("not json"),
            Err(ConfigError::InvalidAbi(_))
        ));
    }

    #[test]
    fn test_decode_params_returns_one_value_per_type() {
        let types = vec![DynSolType::Uint(256), DynSolType::Address];
        let mut data = vec![0u8; 64];
        data[31] = 0x2a;
        data[44..64].copy_from_slice(&[0x11; 20]);

        let values = decode_params("f", &types, &data).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], DynSolValue::Uint(U256::from(42u64), 256));
        assert_eq!(values[1], DynSolValue::Address(Address::from([0x11; 20])));
    }

    #[test]
    fn test_decode_params_dynamic_array() {
        let types = vec![
            DynSolType::Uint(256),
            DynSolType::Array(Box::new(DynSolType::Address)),
        ];
        let encoded = DynSolValue::Tuple(vec![
            DynSolValue::Uint(U256::from(5u64), 256),
            DynSolValue::Array(vec![
                DynSolValue::Address(Address::from([0x01; 20])),
                DynSolValue::Address(Address::from([0x02; 20])),
            ]),
        ])
        .abi_encode_params();

        let values = decode_params("f", &types, &encoded).unwrap();
        assert_eq!(values.len(), 2);
        match &values[1] {
            DynSolValue::Array(items) => assert_eq!(items.len(), 2),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_params_truncated_is_malformed() {
        let types = vec![DynSolType::Uint(256), DynSolType::Address];
        let err = decode_params("f", &types, &[0u8; 32]).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedCallData { .. }));

        let err = decode_params("f", &types, &[0u8; 63]).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedCallData { .. }));
    }

    #[test]
    fn test_decode_params_bad_dynamic_offset_is_malformed() {
        let types = vec![DynSolType::Array(Box::new(DynSolType::Address))];
        // Offset points far past the end of the data
        let mut data = vec![0u8; 32];
        data[31] = 0xff;
        let err = decode_params("f", &types, &data).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedCallData { .. }));
    }

    #[test]
    fn test_head_size() {
        assert_eq!(head_size(&DynSolType::Uint(256)), 32);
        assert_eq!(head_size(&DynSolType::Bytes), 32);
        assert_eq!(
            head_size(&DynSolType::FixedArray(Box::new(DynSolType::Address), 3)),
            96
        );
        assert_eq!(
            head_size(&DynSolType::Tuple(vec![DynSolType::Bool, DynSolType::Uint(8)])),
            64
        );
    }

    #[test]
    fn test_dynamic_types_take_one_head_word() {
        let tuple_with_bytes = DynSolType::Tuple(vec![DynSolType::Uint(256), DynSolType::Bytes]);
        assert!(is_dynamic(&tuple_with_bytes));
        assert_eq!(head_size(&tuple_with_bytes), 32);

        let fixed_of_dynamic = DynSolType::FixedArray(Box::new(DynSolType::String), 2);
        assert!(is_dynamic(&fixed_of_dynamic));
        assert_eq!(head_size(&fixed_of_dynamic), 32);

        assert!(!is_dynamic(&DynSolType::FixedArray(Box::new(DynSolType::Address), 2)));
        assert!(is_dynamic(&DynSolType::Array(Box::new(DynSolType::Address))));
        assert_eq!(
            head_size(&DynSolType::Tuple(vec![
                DynSolType::Address,
                DynSolType::FixedArray(Box::new(DynSolType::Uint(256)), 2),
            ])),
            96
        );
    }
}

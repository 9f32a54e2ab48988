use thiserror::Error;

use crate::data::abi::{AbiRegistry, decode_params};
use crate::data::types::MethodInvocation;
use crate::utils::format_selector;

/// Why a transaction's call-data could not be turned into a method call.
/// All of these are expected for some transactions and are recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("call-data is {0} bytes, too short for a selector")]
    TooShort(usize),

    #[error("selector {} is not in the contract ABI", format_selector(.0))]
    UnknownSelector([u8; 4]),

    #[error("malformed call-data for {method}: {reason}")]
    MalformedCallData { method: String, reason: String },
}

/// Extract the 4-byte method selector from transaction input data.
pub fn extract_selector(input: &[u8]) -> Option<[u8; 4]> {
    if input.len() < 4 {
        return None;
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&input[..4]);
    Some(selector)
}

/// Decode call-data against the registry: selector, method lookup, then the
/// trailing bytes against the method's input types.
pub fn decode_call(registry: &AbiRegistry, input: &[u8]) -> Result<MethodInvocation, DecodeError> {
    let selector = extract_selector(input).ok_or(DecodeError::TooShort(input.len()))?;
    let method = registry
        .resolve(selector)
        .ok_or(DecodeError::UnknownSelector(selector))?;
    let params = decode_params(&method.name, &method.inputs, &input[4..])?;

    Ok(MethodInvocation {
        name: method.name.clone(),
        signature: method.signature.clone(),
        selector,
        params,
    })
}

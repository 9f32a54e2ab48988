use std::str::FromStr;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, U256};
use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};
use chrono::DateTime;

/// Human-readable part of Harmony account addresses.
const ACCOUNT_HRP: Hrp = Hrp::parse_unchecked("one");

/// Parse an RPC quantity given either as `0x`-prefixed hex or as a decimal
/// string. An empty hex string (`"0x"`) is zero.
pub fn parse_quantity(s: &str) -> Option<U256> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.is_empty() {
            return Some(U256::ZERO);
        }
        return U256::from_str_radix(hex, 16).ok();
    }
    if s.is_empty() {
        return None;
    }
    U256::from_str_radix(s, 10).ok()
}

/// Parse an account given as `0x` hex or as a bech32 `one1..` address.
/// The bech32 checksum is verified, so a typo yields `None` rather than a
/// different account.
pub fn parse_account(s: &str) -> Option<Address> {
    let s = s.trim();
    if s.starts_with("0x") || s.starts_with("0X") {
        return Address::from_str(s).ok();
    }

    let checked = CheckedHrpstring::new::<Bech32>(s).ok()?;
    if !checked.hrp().as_str().eq_ignore_ascii_case(ACCOUNT_HRP.as_str()) {
        return None;
    }
    let bytes: Vec<u8> = checked.byte_iter().collect();
    Address::try_from(bytes.as_slice()).ok()
}

/// Render an account as its `one1..` address. Falls back to hex if
/// encoding fails.
pub fn to_bech32(address: &Address) -> String {
    bech32::encode::<Bech32>(ACCOUNT_HRP, address.as_slice()).unwrap_or_else(|_| address.to_string())
}

/// Scale a raw integer token amount into a human-readable decimal string.
///
/// 18-decimal amounts are divided exactly in integer arithmetic and printed
/// without trailing zeros (`1500000000000000000` -> `1.5`). Any other decimal
/// count goes through `f64` and is printed with exactly `decimals` fractional
/// digits (`150` at 2 decimals -> `1.50`), so large or very precise amounts
/// of such tokens are not bit-exact.
pub fn scale_amount(raw: U256, decimals: u8) -> String {
    if decimals == 18 {
        return format_exact(raw, 18);
    }

    let amount = raw.to_string().parse::<f64>().unwrap_or(0.0);
    let scaled = amount / 10f64.powi(decimals as i32);
    format!("{scaled:.prec$}", prec = decimals as usize)
}

/// Exact base-unit division: whole part, then the fractional part with
/// trailing zeros trimmed. Whole values have no decimal point.
fn format_exact(value: U256, decimals: u8) -> String {
    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder.is_zero() {
        return format!("{whole}");
    }

    let remainder_str = format!("{remainder}");
    let padded = format!("{:0>width$}", remainder_str, width = decimals as usize);
    let trimmed = padded.trim_end_matches('0');
    format!("{whole}.{trimmed}")
}

/// Format a Unix timestamp as a UTC datetime string. Zero renders empty.
pub fn format_timestamp(timestamp: u64) -> String {
    if timestamp == 0 {
        return String::new();
    }
    DateTime::from_timestamp(timestamp as i64, 0)
        .map(|dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
        .unwrap_or_default()
}

/// Format a method selector as "0xabcdef12"
pub fn format_selector(selector: &[u8; 4]) -> String {
    format!("0x{}", alloy::primitives::hex::encode(selector))
}

/// Format a dynamic Solidity value to a human-readable string.
pub fn format_sol_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::FixedBytes(b, _) => format!("0x{}", alloy::primitives::hex::encode(b)),
        DynSolValue::Address(a) => format!("{a}"),
        DynSolValue::Function(f) => format!("0x{}", alloy::primitives::hex::encode(f)),
        DynSolValue::Bytes(b) => format!("0x{}", alloy::primitives::hex::encode(b)),
        DynSolValue::String(s) => format!("\"{s}\""),
        DynSolValue::Array(arr) | DynSolValue::FixedArray(arr) => {
            let inner: Vec<String> = arr.iter().map(format_sol_value).collect();
            format!("[{}]", inner.join(", "))
        }
        DynSolValue::Tuple(parts) => {
            let inner: Vec<String> = parts.iter().map(format_sol_value).collect();
            format!("({})", inner.join(", "))
        }
    }
}

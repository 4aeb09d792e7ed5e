//! Input validation for addresses and token parameters.
//!
//! Everything here runs before any network call, so a bad setting fails the
//! run at the config stage instead of producing a revert or a valuation that
//! is off by orders of magnitude.

use alloy::primitives::Address;

// ============================================
// Validation Constants
// ============================================

/// Length of a `0x`-prefixed 20-byte hex address.
pub const ADDRESS_LEN: usize = 42;

/// Tokens reporting more decimals than this are treated as misconfigured.
pub const MAX_TOKEN_DECIMALS: u8 = 24;

// ============================================
// Validation Helpers
// ============================================

/// Parse a `0x`-prefixed, 42 character hex address.
///
/// Mixed-case input is accepted without enforcing the EIP-55 checksum; the
/// persisted form is always re-checksummed.
pub fn parse_address(value: &str) -> Result<Address, String> {
    let value = value.trim();
    if !value.starts_with("0x") {
        return Err(format!("{value} is not 0x-prefixed"));
    }
    if value.len() != ADDRESS_LEN {
        return Err(format!(
            "{value} has {} characters, expected {ADDRESS_LEN}",
            value.len()
        ));
    }

    let address: Address = value
        .parse()
        .map_err(|e| format!("{value} is not a hex address: {e}"))?;

    if address == Address::ZERO {
        return Err("zero address is not a valid target".to_string());
    }

    Ok(address)
}

/// Validate a token decimal count.
#[inline]
pub fn validate_decimals(decimals: u8) -> Option<u8> {
    if decimals <= MAX_TOKEN_DECIMALS {
        Some(decimals)
    } else {
        None
    }
}

/// EIP-55 checksummed form used in persisted rows.
#[inline]
pub fn checksummed(address: &Address) -> String {
    address.to_checksum(None)
}

//! Utility functions for the spotwatch pipeline.
//!
//! - [`validation`] - Address and decimal validation run before any network call
//! - [`conversion`] - Amount scaling and timestamp conversions

mod conversion;
mod validation;

// ============================================
// Re-exports
// ============================================

// Conversion utilities
pub use conversion::{format_amount, iso8601, scale_amount, timestamp_from_unix};

// Validation utilities
pub use validation::{
    checksummed, parse_address, validate_decimals, ADDRESS_LEN, MAX_TOKEN_DECIMALS,
};

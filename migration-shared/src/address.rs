//! Address helpers.
//!
//! Addresses arrive from the indexer in whatever case the indexer stored them.
//! The destination keys records by address, so every address is lower-cased
//! before it is used as a key or placed in a batch.

/// Lower-cases and trims an address.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Returns true for a `0x`-prefixed, 20-byte hex address in any case.
pub fn is_valid_address(address: &str) -> bool {
    let Some(hex) = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
    else {
        return false;
    };

    hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

//! Signature generation and row hashing.
//
// The signature is a stateless, deterministic secret derived from the ledger
// table name and the stores admin code. Every persisted row carries a hash of
// its cells keyed by this signature, so edits made directly to the flat file
// are detectable on the next verification pass.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};

/// Generates the Base64-encoded ledger signature from the table name and the
/// optional admin code.
///
/// - If the code is missing or empty, signature = Base64Encode(name)
/// - Otherwise, signature = Base64Encode(name:code)
///
/// Fails when the name is missing or empty.
pub fn ledger_signature(name: &str, code: Option<&str>) -> Result<String, String> {
    if name.trim().is_empty() {
        return Err("Name must not be empty".to_string());
    }
    let signature = match code {
        Some(code) if !code.is_empty() => {
            let mut combined = String::with_capacity(name.len() + 1 + code.len());
            combined.push_str(name);
            combined.push(':');
            combined.push_str(code);
            let encoded = BASE64.encode(combined.as_bytes());
            drop(combined);
            encoded
        }
        _ => BASE64.encode(name.as_bytes()),
    };
    Ok(signature)
}

/// Hashes one row's cells keyed by the ledger signature.
///
/// Cells are fed through SHA-256 with a separator byte so shifting content
/// between adjacent cells cannot produce the same digest.
pub fn hash_row(values: &[String], signature: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(signature.as_bytes());
    for value in values {
        hasher.update([0x1f]);
        hasher.update(value.as_bytes());
    }
    BASE64.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_name_only() {
        let sig = ledger_signature("store_ledger", None).unwrap();
        assert_eq!(sig, BASE64.encode("store_ledger".as_bytes()));
    }

    #[test]
    fn signature_name_and_code() {
        let sig = ledger_signature("store_ledger", Some("stores123")).unwrap();
        assert_eq!(sig, BASE64.encode("store_ledger:stores123".as_bytes()));
    }

    #[test]
    fn signature_empty_code() {
        let sig = ledger_signature("store_ledger", Some("")).unwrap();
        assert_eq!(sig, BASE64.encode("store_ledger".as_bytes()));
    }

    #[test]
    fn signature_empty_name() {
        let err = ledger_signature("", Some("stores123")).unwrap_err();
        assert!(err.contains("Name must not be empty"));
        let err = ledger_signature("   ", None).unwrap_err();
        assert!(err.contains("Name must not be empty"));
    }

    #[test]
    fn hash_is_deterministic() {
        let row = vec!["2025-06-01".to_string(), "A001".to_string()];
        assert_eq!(hash_row(&row, "sig"), hash_row(&row, "sig"));
        assert_ne!(hash_row(&row, "sig"), hash_row(&row, "other"));
    }

    #[test]
    fn hash_distinguishes_cell_boundaries() {
        let a = vec!["ab".to_string(), "c".to_string()];
        let b = vec!["a".to_string(), "bc".to_string()];
        assert_ne!(hash_row(&a, "sig"), hash_row(&b, "sig"));
    }
}

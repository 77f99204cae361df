//! Store key generation for request identity.

use sha2::{Digest, Sha256};

/// Compute the store key for a request: SHA-256 over method and absolute URL.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_cache_key("GET", "https://app.example.com/index.html");
        let hash2 = compute_cache_key("GET", "https://app.example.com/index.html");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_different_method() {
        let get = compute_cache_key("GET", "https://app.example.com/api");
        let head = compute_cache_key("HEAD", "https://app.example.com/api");
        assert_ne!(get, head);
    }

    #[test]
    fn test_hash_query_is_significant() {
        let plain = compute_cache_key("GET", "https://app.example.com/app.js");
        let versioned = compute_cache_key("GET", "https://app.example.com/app.js?v=2");
        assert_ne!(plain, versioned);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_cache_key("GET", "https://app.example.com/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

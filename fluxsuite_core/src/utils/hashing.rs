//! Utility functions for getting hashes
use std::hash::{DefaultHasher, Hash, Hasher};

pub(crate) fn calculate_hash<T: Hash + ?Sized>(t: &T) -> u64 {
    let mut s = DefaultHasher::new();
    t.hash(&mut s);
    s.finish()
}

/// Hash rendered as lowercase hexadecimal, stable within a build
pub(crate) fn hash_as_hex_string<T: Hash + ?Sized>(t: &T) -> String {
    format!("{:x}", calculate_hash(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_hash_is_deterministic() {
        assert_eq!(hash_as_hex_string("PGI"), hash_as_hex_string("PGI"));
        assert_ne!(hash_as_hex_string("PGI"), hash_as_hex_string("PFK"));
        assert!(hash_as_hex_string("PGI").chars().all(|c| c.is_ascii_hexdigit()));
    }
}

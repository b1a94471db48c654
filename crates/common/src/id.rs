//! ID generation utilities.

use ulid::Ulid;
use uuid::Uuid;

/// Alphabet for short identifiers. Omits characters that are easy to misread
/// (`0`, `1`, `I`, `O`, `l`).
const SHORT_ALPHABET: &[u8; 57] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Length of a short identifier. 57^22 covers the full 128-bit space.
pub const SHORT_ID_LEN: usize = 22;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are:
    /// - Lexicographically sortable
    /// - Monotonically increasing within the same millisecond
    /// - Shorter than UUIDs when represented as strings
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate a short, URL-safe identifier from a random UUID.
    ///
    /// Used for chat group names, which appear in URLs and meeting ids.
    #[must_use]
    pub fn generate_short(&self) -> String {
        encode_short(Uuid::new_v4().as_u128())
    }

    /// Generate a cryptographically secure random token.
    #[must_use]
    pub fn generate_token(&self) -> String {
        // Use UUID v4 for tokens (no time component for security)
        Uuid::new_v4().simple().to_string()
    }
}

fn encode_short(mut value: u128) -> String {
    let base = SHORT_ALPHABET.len() as u128;
    let mut out = [SHORT_ALPHABET[0]; SHORT_ID_LEN];

    for slot in out.iter_mut().rev() {
        *slot = SHORT_ALPHABET[(value % base) as usize];
        value /= base;
    }

    out.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ulid() {
        let id_gen = IdGenerator::new();
        let id1 = id_gen.generate();
        let id2 = id_gen.generate();

        assert_eq!(id1.len(), 26);
        assert_eq!(id2.len(), 26);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_generate_short() {
        let id_gen = IdGenerator::new();
        let a = id_gen.generate_short();
        let b = id_gen.generate_short();

        assert_eq!(a.len(), SHORT_ID_LEN);
        assert_ne!(a, b);
        assert!(a.bytes().all(|c| SHORT_ALPHABET.contains(&c)));
    }

    #[test]
    fn test_encode_short_is_fixed_width() {
        assert_eq!(encode_short(0), "2".repeat(SHORT_ID_LEN));
        assert_eq!(encode_short(u128::MAX).len(), SHORT_ID_LEN);
    }

    #[test]
    fn test_generate_token() {
        let id_gen = IdGenerator::new();
        let token = id_gen.generate_token();

        assert_eq!(token.len(), 32); // Simple UUID without hyphens
    }
}

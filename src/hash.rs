//! Content fingerprinting.
//!
//! Documents are fingerprinted with SHA-256 so that an unchanged document can
//! be detected without downloading its parts. The digest is fed in fixed
//! 64 KiB chunks; the chunk size never affects the output.

use sha2::{Digest, Sha256};

/// Size of each slice fed to the hasher.
pub const SHA256_BUFF_SIZE: usize = 64 * 1024;

/// Compute the lowercase hex SHA-256 digest of `content`.
///
/// # Example
///
/// ```rust
/// use vectara_kit::hash::calculate_sha256;
///
/// let digest = calculate_sha256(b"This is my content");
/// assert_eq!(digest.len(), 64);
/// ```
pub fn calculate_sha256(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    for chunk in content.chunks(SHA256_BUFF_SIZE) {
        hasher.update(chunk);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        assert_eq!(
            calculate_sha256("This is my content".as_bytes()),
            "ee302829a269d5db4b10188b2d006e4c8bb639b25d73b92db3944ec5faddd40d"
        );
    }

    #[test]
    fn test_deterministic() {
        let content = b"repeatable input";
        assert_eq!(calculate_sha256(content), calculate_sha256(content));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(
            calculate_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_chunking_matches_single_update() {
        // Spans several buffers plus a partial tail.
        let content: Vec<u8> = (0..(SHA256_BUFF_SIZE * 3 + 17))
            .map(|i| (i % 251) as u8)
            .collect();
        let expected = hex::encode(Sha256::digest(&content));
        assert_eq!(calculate_sha256(&content), expected);
    }

    #[test]
    fn test_single_bit_difference() {
        let a = calculate_sha256(b"content-a");
        let b = calculate_sha256(b"content-b");
        assert_ne!(a, b);
    }
}

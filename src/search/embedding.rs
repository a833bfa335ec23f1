//! Deterministic text embeddings via harmonic token projection.
//!
//! Training-free embedding: each token is encoded as an integer from its
//! Unicode code points, reduced modulo a table of primes, and projected
//! onto unit circles; token vectors are mean-pooled and L2-normalized.
//! Identical text always produces an identical vector, which the index
//! lifecycle and the tests depend on.

use std::f64::consts::PI;

use crate::error::{Error, Result};

/// Embedding dimension (2 coordinates per modulus). Fixed per model;
/// persisted artifacts are tagged with it and refuse to load on mismatch.
pub const EMBEDDING_DIM: usize = 384;

const NUM_MODULI: usize = EMBEDDING_DIM / 2;

/// Longest token prefix considered, in Unicode code points.
const MAX_TOKEN_LENGTH: usize = 64;

/// First NUM_MODULI primes, guaranteeing pairwise-coprime moduli.
static COPRIME_MODULI: &[u64] = &[
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71,
    73, 79, 83, 89, 97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151,
    157, 163, 167, 173, 179, 181, 191, 193, 197, 199, 211, 223, 227, 229, 233,
    239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293, 307, 311, 313, 317,
    331, 337, 347, 349, 353, 359, 367, 373, 379, 383, 389, 397, 401, 409, 419,
    421, 431, 433, 439, 443, 449, 457, 461, 463, 467, 479, 487, 491, 499, 503,
    509, 521, 523, 541, 547, 557, 563, 569, 571, 577, 587, 593, 599, 601, 607,
    613, 617, 619, 631, 641, 643, 647, 653, 659, 661, 673, 677, 683, 691, 701,
    709, 719, 727, 733, 739, 743, 751, 757, 761, 769, 773, 787, 797, 809, 811,
    821, 823, 827, 829, 839, 853, 857, 859, 863, 877, 881, 883, 887, 907, 911,
    919, 929, 937, 941, 947, 953, 967, 971, 977, 983, 991, 997, 1009, 1013,
    1019, 1021, 1031, 1033, 1039, 1049, 1051, 1061, 1063, 1069, 1087, 1091,
    1093, 1097, 1103, 1109, 1117, 1123, 1129, 1151, 1153, 1163, 1171, 1181,
];

/// Maps text to fixed-dimension vectors. `initialize` must succeed before
/// `embed` is usable; initialization is idempotent and only the first
/// call does work.
pub struct EmbeddingProvider {
    moduli: Option<Vec<u64>>,
}

impl EmbeddingProvider {
    pub fn new() -> Self {
        Self { moduli: None }
    }

    /// One-time model setup. Safe to call repeatedly; subsequent calls
    /// are no-ops.
    pub fn initialize(&mut self) -> Result<()> {
        if self.moduli.is_none() {
            self.moduli = Some(COPRIME_MODULI[..NUM_MODULI].to_vec());
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.moduli.is_some()
    }

    /// Embed one text. Tokens are whitespace/punctuation-split and
    /// lowercased; text with no tokens embeds to the zero vector.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let moduli = self.moduli.as_ref().ok_or_else(|| {
            Error::ModelUnavailable("initialize() has not completed".to_string())
        })?;

        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Ok(vec![0.0; EMBEDDING_DIM]);
        }

        let mut pooled = vec![0.0f64; EMBEDDING_DIM];
        for token in &tokens {
            let n = token_to_integer(token);
            for (slot, &m) in moduli.iter().enumerate() {
                let theta = 2.0 * PI * ((n % m) as f64) / (m as f64);
                pooled[2 * slot] += theta.sin();
                pooled[2 * slot + 1] += theta.cos();
            }
        }
        for val in &mut pooled {
            *val /= tokens.len() as f64;
        }

        let norm: f64 = pooled.iter().map(|x| x * x).sum::<f64>().sqrt();
        let embedding = if norm > 0.0 {
            pooled.iter().map(|x| (*x / norm) as f32).collect()
        } else {
            pooled.iter().map(|x| *x as f32).collect()
        };

        Ok(embedding)
    }
}

impl Default for EmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a token as a base-2^16 integer over its code points, wrapping
/// on overflow.
fn token_to_integer(token: &str) -> u64 {
    let mut n: u64 = 0;
    for c in token.chars().take(MAX_TOKEN_LENGTH) {
        n = n.wrapping_mul(65536).wrapping_add(c as u64);
    }
    n
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// Euclidean (L2) distance, the index's similarity metric.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> EmbeddingProvider {
        let mut p = EmbeddingProvider::new();
        p.initialize().unwrap();
        p
    }

    #[test]
    fn test_embed_before_initialize_fails() {
        let p = EmbeddingProvider::new();
        let err = p.embed("anything").unwrap_err();
        assert!(matches!(err, crate::error::Error::ModelUnavailable(_)));
    }

    #[test]
    fn test_initialize_idempotent() {
        let mut p = EmbeddingProvider::new();
        p.initialize().unwrap();
        p.initialize().unwrap();
        assert!(p.is_initialized());
    }

    #[test]
    fn test_deterministic_across_instances() {
        let a = provider().embed("meeting notes from tuesday").unwrap();
        let b = provider().embed("meeting notes from tuesday").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_dimension_and_normalization() {
        let emb = provider().embed("hello world").unwrap();
        assert_eq!(emb.len(), EMBEDDING_DIM);
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let emb = provider().embed("   ").unwrap();
        assert_eq!(emb, vec![0.0; EMBEDDING_DIM]);
    }

    #[test]
    fn test_different_text_differs() {
        let p = provider();
        let a = p.embed("apples").unwrap();
        let b = p.embed("oranges").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_shared_tokens_are_closer() {
        let p = provider();
        let base = p.embed("apple pie recipe").unwrap();
        let close = p.embed("apple tart recipe").unwrap();
        let far = p.embed("quarterly budget review").unwrap();
        assert!(l2_distance(&base, &close) < l2_distance(&base, &far));
    }

    #[test]
    fn test_l2_distance() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((l2_distance(&a, &b) - 5.0).abs() < 1e-6);
        assert_eq!(l2_distance(&a, &a), 0.0);
    }
}

//! Deterministic lexical embedding for question similarity.
//!
//! Feature hashing over word tokens and operator symbols, L2-normalized.
//! It is not a neural model: two questions score high when they share
//! vocabulary and operators, which is what the in-memory knowledge base
//! needs to recognize rephrasings of stored questions.

use blake3::Hasher;

/// Default embedding dimensionality.
pub const DEFAULT_EMBEDDING_DIM: usize = 128;

const OPERATOR_TOKENS: &[char] = &['+', '-', '*', '/', '^', '=', '∫', '√', '∞', 'π'];

/// Word tokens (ASCII alphanumeric runs) and single operator characters.
fn tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut out = Vec::new();
    let mut word = String::new();
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            word.push(c);
            continue;
        }
        if !word.is_empty() {
            out.push(std::mem::take(&mut word));
        }
        if OPERATOR_TOKENS.contains(&c) {
            out.push(c.to_string());
        }
    }
    if !word.is_empty() {
        out.push(word);
    }
    out
}

#[allow(clippy::cast_possible_truncation)]
fn bucket(token: &str, dim: usize) -> (usize, f32) {
    let mut h = Hasher::new();
    h.update(token.as_bytes());
    let hash = h.finalize();
    let bytes = hash.as_bytes();

    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    let index = u64::from_le_bytes(raw) % dim as u64;
    let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
    (index as usize, sign)
}

/// Embeds `text` with `DEFAULT_EMBEDDING_DIM` dimensions.
#[must_use]
pub fn lexical_embedding(text: &str) -> Vec<f32> {
    lexical_embedding_with_dim(text, DEFAULT_EMBEDDING_DIM)
}

/// Embeds `text` with a custom dimension. Text without tokens maps to the
/// zero vector.
#[must_use]
pub fn lexical_embedding_with_dim(text: &str, dim: usize) -> Vec<f32> {
    if dim == 0 {
        return Vec::new();
    }
    let mut vec = vec![0.0f32; dim];
    for token in tokens(text) {
        let (index, sign) = bucket(&token, dim);
        vec[index] += sign;
    }

    let norm2: f64 = vec.iter().map(|&x| f64::from(x) * f64::from(x)).sum();
    if norm2 > 0.0 {
        #[allow(clippy::cast_possible_truncation)]
        let inv = norm2.sqrt().recip() as f32;
        for x in &mut vec {
            *x *= inv;
        }
    }
    vec
}

/// Cosine similarity; zero for empty, mismatched or zero-length vectors.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }
    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    if sim.is_finite() {
        narrow(sim)
    } else {
        0.0
    }
}

#[allow(clippy::cast_possible_truncation)]
fn narrow(value: f64) -> f32 {
    value as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_embedding_is_deterministic() {
        assert_eq!(lexical_embedding("x + 2 = 5"), lexical_embedding("x + 2 = 5"));
    }

    #[test]
    fn lexical_embedding_dim_is_respected() {
        assert_eq!(lexical_embedding_with_dim("x", 13).len(), 13);
        assert!(lexical_embedding_with_dim("x", 0).is_empty());
    }

    #[test]
    fn operators_are_tokens() {
        assert_eq!(tokens("2*x+1"), vec!["2", "*", "x", "+", "1"]);
        assert_eq!(tokens("What's √x"), vec!["what", "s", "√", "x"]);
    }

    #[test]
    fn identical_text_has_unit_similarity() {
        let a = lexical_embedding("derivative of sin(x)");
        let b = lexical_embedding("Derivative of SIN(x)");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn similarity_degrades_gracefully() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&lexical_embedding(""), &lexical_embedding("x")), 0.0);
    }
}

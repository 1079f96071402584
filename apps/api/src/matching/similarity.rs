//! Cosine similarity between embeddings, mapped onto a 0 to 100 score.

/// Raw cosine similarity in [-1, 1].
///
/// `None` when the vectors are empty or differ in length (comparison skipped).
/// `Some(0.0)` when either norm is zero, which covers the zero-vector fallback.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(0.0);
    }

    let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
    if cosine.is_finite() {
        Some(cosine.clamp(-1.0, 1.0))
    } else {
        Some(0.0)
    }
}

/// `round(max(0, cosine) * 100)`. Negative similarity carries no partial-match
/// meaning, so it clamps to 0.
pub fn similarity_score(a: &[f32], b: &[f32]) -> Option<u8> {
    cosine_similarity(a, b).map(cosine_to_score)
}

pub fn cosine_to_score(cosine: f64) -> u8 {
    (cosine.max(0.0) * 100.0).round().clamp(0.0, 100.0) as u8
}

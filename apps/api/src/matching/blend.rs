//! Picks the single "official" score for an application.

use serde::Serialize;

use crate::models::analysis::MatchAnalysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Ai,
    Similarity,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendedScore {
    pub score: u8,
    pub source: ScoreSource,
}

/// AI match score when analysis succeeded, else the cosine score, else 0.
/// Deterministic in its two inputs.
pub fn blend_scores(similarity: Option<u8>, analysis: Option<&MatchAnalysis>) -> BlendedScore {
    match (analysis, similarity) {
        (Some(a), _) => BlendedScore {
            score: a.match_score.min(100),
            source: ScoreSource::Ai,
        },
        (None, Some(s)) => BlendedScore {
            score: s.min(100),
            source: ScoreSource::Similarity,
        },
        (None, None) => BlendedScore {
            score: 0,
            source: ScoreSource::None,
        },
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Qualitative verdict returned by the AI match analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Strong Match")]
    StrongMatch,
    #[serde(rename = "Good Match")]
    GoodMatch,
    #[serde(rename = "Moderate Match")]
    ModerateMatch,
    #[serde(rename = "Weak Match")]
    WeakMatch,
    #[serde(rename = "Poor Match")]
    PoorMatch,
}

impl Recommendation {
    pub const ALL: [Recommendation; 5] = [
        Recommendation::StrongMatch,
        Recommendation::GoodMatch,
        Recommendation::ModerateMatch,
        Recommendation::WeakMatch,
        Recommendation::PoorMatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongMatch => "Strong Match",
            Recommendation::GoodMatch => "Good Match",
            Recommendation::ModerateMatch => "Moderate Match",
            Recommendation::WeakMatch => "Weak Match",
            Recommendation::PoorMatch => "Poor Match",
        }
    }

    /// Lenient label lookup: case, whitespace, `_` and `-` are ignored, and the
    /// trailing "match" is optional ("strong", "STRONG_MATCH").
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        let normalized = normalized.strip_suffix("match").unwrap_or(&normalized);
        Self::ALL.into_iter().find(|r| {
            r.as_str()
                .split_whitespace()
                .next()
                .is_some_and(|head| head.eq_ignore_ascii_case(normalized))
        })
    }

    /// Score band used when the model's label is missing or unrecognized.
    pub fn from_score(score: u8) -> Self {
        match score {
            85..=u8::MAX => Recommendation::StrongMatch,
            70..=84 => Recommendation::GoodMatch,
            50..=69 => Recommendation::ModerateMatch,
            30..=49 => Recommendation::WeakMatch,
            _ => Recommendation::PoorMatch,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsMatch {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub additional: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceMatch {
    pub candidate_years: Option<f32>,
    pub meets_requirement: bool,
    pub analysis: String,
}

/// Validated output of the AI match analyzer. Every field has been coerced
/// into range before a value of this type exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchAnalysis {
    /// 0 – 100
    pub match_score: u8,
    pub skills_match: SkillsMatch,
    pub experience_match: ExperienceMatch,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendation: Recommendation,
    pub summary: String,
}

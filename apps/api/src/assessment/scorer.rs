use std::collections::HashMap;

use serde::Serialize;

use crate::assessment::generator::McqQuestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestScore {
    pub correct_answers: usize,
    /// Always the full question set length.
    pub total_questions: usize,
    /// round(correct / total * 100), 0 for an empty set.
    pub percentage: u8,
}

/// Scores a sparse answer map (question index → selected option).
/// Absent, null and out-of-range selections all count as wrong.
pub fn score_answers(
    questions: &[McqQuestion],
    answers: &HashMap<usize, Option<i64>>,
) -> TestScore {
    let correct_answers = questions
        .iter()
        .enumerate()
        .filter(|(i, question)| {
            matches!(answers.get(i), Some(Some(selected)) if *selected == i64::from(question.correct_index))
        })
        .count();

    let total_questions = questions.len();
    let percentage = if total_questions == 0 {
        0
    } else {
        (correct_answers as f64 / total_questions as f64 * 100.0).round() as u8
    };

    TestScore {
        correct_answers,
        total_questions,
        percentage,
    }
}

/// Blend of the intake match score and the test percentage.
pub fn overall_score(match_score: u8, test_score: u8) -> u8 {
    ((f64::from(match_score) + f64::from(test_score)) / 2.0).round() as u8
}

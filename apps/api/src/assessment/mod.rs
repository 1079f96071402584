// MCQ assessments: generation, scoring, and single-use test sessions.
// Generation is a hard-fail flow; there is no fallback question set.

pub mod generator;
pub mod handlers;
pub mod prompts;
pub mod scorer;
pub mod session;

// Job postings: creation with a one-time description embedding, and
// AI-written job descriptions.

pub mod description;
pub mod handlers;
pub mod prompts;

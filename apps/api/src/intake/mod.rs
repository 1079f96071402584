// Application intake: form validation, the scoring pipeline and its HTTP surface.

pub mod handlers;
pub mod orchestrator;
pub mod validation;

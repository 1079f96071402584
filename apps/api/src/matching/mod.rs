// Resume-to-job matching pipeline.
// extractor → embedding → similarity → analyzer (conditional) → blend.
// All provider calls go through llm_client traits.

pub mod analyzer;
pub mod blend;
pub mod embedding;
pub mod extractor;
pub mod prompts;
pub mod similarity;

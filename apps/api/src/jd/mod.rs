// Job-description extraction pipeline:
// validate upload → extract text → build prompt → generate → normalize → respond.
// All model calls go through llm_client.

pub mod handlers;
pub mod normalizer;
pub mod prompts;

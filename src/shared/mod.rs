pub mod constants;
pub mod llm;
pub mod prompts;
pub mod test_helpers;
pub mod types;
pub mod validation;

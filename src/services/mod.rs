pub mod json_extract;
pub mod ledger;
pub mod llm_service;
pub mod normalizer;
pub mod publisher;
pub mod quiz_generator;

pub use json_extract::{extract_json, JsonExtractError};
pub use ledger::Ledger;
pub use llm_service::{LlmService, Oracle, OracleTarget};
pub use normalizer::ContentNormalizer;
pub use publisher::Publisher;
pub use quiz_generator::QuizGenerator;

pub mod document;
pub mod manifest;
pub mod quiz;

pub use document::{NormalizedContent, SourceDocument};
pub use manifest::ManifestEntry;
pub use quiz::{GeneratedQuiz, Quiz, QuizQuestion, OPTIONS_PER_QUESTION, QUESTIONS_PER_QUIZ};

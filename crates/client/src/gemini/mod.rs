//! Google Gemini integration for AI menu suggestions.
//!
//! Two prompts, both in Brazilian Portuguese:
//!
//! - a craving ("algo quente e picante") becomes three dish suggestions,
//!   constrained to a JSON response schema
//! - a product name becomes a short marketing description
//!
//! Prompts live in `templates/gemini/` and are rendered with askama.

mod client;
mod error;
mod types;

pub use client::{DESCRIPTION_WORDS, GeminiClient, SUGGESTION_COUNT};
pub use error::{ApiError, ApiErrorResponse, GeminiError};
pub use types::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    MenuSuggestion, Part, menu_suggestion_schema,
};

//! Prompt system for Handbook.
//!
//! - YAML-based prompt definitions with declared slots
//! - Strict Handlebars rendering
//! - The embedded grounded-answer prompt, overridable per workspace

pub mod builder;
pub mod grounded;
pub mod loader;
pub mod types;

pub use builder::build_prompt;
pub use grounded::{
    grounded_instructions, load_answer_prompt, render_answer_prompt, ANSWER_PROMPT_ID,
    NOT_FOUND_MESSAGE,
};
pub use loader::{load_prompt, parse_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};

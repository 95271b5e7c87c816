//! The grounded-answer prompt used by the answering pipeline.
//!
//! The prompt has exactly four slots: the core values policy, the fixed
//! instructions, the retrieved context and the employee's question. The
//! instruction text is constant so that every answer is judged against the
//! same rules, including the verbatim not-found sentence.

use crate::builder::build_prompt;
use crate::loader::{load_prompt, parse_prompt, prompts_dir};
use crate::types::{BuiltPrompt, PromptDefinition};
use handbook_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::path::Path;

pub const ANSWER_PROMPT_ID: &str = "answer.grounded";

/// Sentence the model must reply with when the context has no answer.
pub const NOT_FOUND_MESSAGE: &str = "I could not find information on this topic in the available company documents. Please consult your manager or the relevant department.";

const DEFAULT_ANSWER_PROMPT: &str = include_str!("../prompts/answer.grounded.yml");

/// Fixed instruction block placed in the `instructions` slot.
pub fn grounded_instructions() -> String {
    format!(
        "1. Answer ONLY from the information in the Context section. Never use outside or general knowledge.\n\
         2. Never invent policies, figures, deadlines or procedures that the Context does not state.\n\
         3. If the Context does not contain the answer, reply with exactly this sentence and nothing else: \"{}\"\n\
         4. Keep the answer consistent with the Core Values.\n\
         5. End the answer with a line starting with \"Sources:\" that lists the source of every excerpt you used.",
        NOT_FOUND_MESSAGE
    )
}

/// Load the answer prompt, preferring a workspace override.
pub fn load_answer_prompt(workspace: Option<&Path>) -> AppResult<PromptDefinition> {
    if let Some(ws) = workspace {
        if prompts_dir(ws)
            .join(format!("{}.yml", ANSWER_PROMPT_ID))
            .exists()
        {
            let definition = load_prompt(ws, ANSWER_PROMPT_ID)?;
            ensure_answer_slots(&definition)?;
            return Ok(definition);
        }
    }

    parse_prompt(DEFAULT_ANSWER_PROMPT)
}

fn ensure_answer_slots(definition: &PromptDefinition) -> AppResult<()> {
    for slot in ["coreValues", "instructions", "context", "question"] {
        if !definition.slots.iter().any(|s| s == slot) {
            return Err(AppError::Prompt(format!(
                "Answer prompt override must declare the '{}' slot",
                slot
            )));
        }
    }
    Ok(())
}

/// Render the grounded-answer prompt.
///
/// Identical inputs always produce an identical prompt.
pub fn render_answer_prompt(
    definition: &PromptDefinition,
    core_values: &str,
    context: &str,
    question: &str,
) -> AppResult<BuiltPrompt> {
    let mut variables = BTreeMap::new();
    variables.insert("coreValues".to_string(), core_values.trim().to_string());
    variables.insert("instructions".to_string(), grounded_instructions());
    variables.insert("context".to_string(), context.to_string());
    variables.insert("question".to_string(), question.trim().to_string());

    build_prompt(definition, variables)
}

//! Prompt builder: renders a definition's template with slot values.

use crate::types::{BuiltPrompt, PromptDefinition};
use handbook_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::BTreeMap;

/// Build a prompt from a definition and slot values.
///
/// Every slot the definition declares must be present in `variables`.
/// Rendering is strict: a template reference to an unknown variable is an
/// error rather than an empty string, so a prompt is never sent half-filled.
///
/// # Example
/// ```no_run
/// use handbook_prompt::{build_prompt, PromptDefinition};
/// use std::collections::BTreeMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = BTreeMap::new();
/// vars.insert("question".to_string(), "What is the refund window?".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: BTreeMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let missing: Vec<&str> = definition
        .slots
        .iter()
        .filter(|slot| !variables.contains_key(slot.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' is missing slot values: {}",
            definition.id,
            missing.join(", ")
        )));
    }

    let user = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(
        None,
        user,
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &BTreeMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

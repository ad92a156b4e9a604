//! Prompt loader for workspace overrides of the answer prompt.

use crate::types::{PromptDefinition, ANSWER_PROMPT_ID};
use support_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Path of a prompt override file inside the workspace.
pub fn prompt_path(workspace_path: &Path, prompt_id: &str) -> PathBuf {
    workspace_path
        .join(".support/prompts")
        .join(format!("{}.yml", prompt_id))
}

/// Load a prompt definition by ID from `.support/prompts/<id>.yml`.
///
/// # Example
/// ```no_run
/// use support_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "support.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompt_path(workspace_path, prompt_id);

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// The answer prompt: the workspace override if present, else the built-in one.
pub fn load_answer_prompt(workspace_path: &Path) -> AppResult<PromptDefinition> {
    if prompt_path(workspace_path, ANSWER_PROMPT_ID).exists() {
        load_prompt(workspace_path, ANSWER_PROMPT_ID)
    } else {
        Ok(PromptDefinition::default())
    }
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if def.system.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt system template cannot be empty".to_string(),
        ));
    }

    // The evidence and the question must both reach the synthesizer
    for placeholder in ["{{context}}", "{{query}}"] {
        if !def.template.contains(placeholder) {
            return Err(AppError::Prompt(format!(
                "Prompt template must reference {}",
                placeholder
            )));
        }
    }

    Ok(())
}

//! Prompt types for the support desk.

use serde::{Deserialize, Serialize};

/// Identifier of the answer prompt, also its override file stem.
pub const ANSWER_PROMPT_ID: &str = "support.answer";

const DEFAULT_SYSTEM_TEMPLATE: &str = "\
You are a knowledgeable customer support assistant.
You have access to two kinds of evidence:
1. Customer database records (profiles, orders, support tickets)
2. Company policies, FAQs and guidelines

Rules:
- Answer only from the evidence supplied with the question. Do not use outside knowledge.
- When a fact comes from customer data, say clearly that it comes from the customer's records.
- When a fact comes from a policy document, cite it with the tag of its evidence block, for example [Source 2].
- If the evidence does not support a claim, say that it is unknown instead of guessing.
- Be helpful, accurate and professional.";

const DEFAULT_USER_TEMPLATE: &str = "\
Available Information:

{{context}}

---

Customer Question: {{query}}

Please provide a comprehensive answer using any relevant information from the sources above.";

/// A prompt definition: built in, or loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// System prompt template (Handlebars)
    pub system: String,

    /// User prompt template; must reference `{{context}}` and `{{query}}`
    pub template: String,
}

impl Default for PromptDefinition {
    fn default() -> Self {
        Self {
            id: ANSWER_PROMPT_ID.to_string(),
            title: "Grounded support answer".to_string(),
            api_version: "1.0".to_string(),
            system: DEFAULT_SYSTEM_TEMPLATE.to_string(),
            template: DEFAULT_USER_TEMPLATE.to_string(),
        }
    }
}

/// System/user prompt pair handed to the synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub system_prompt: String,
    pub user_prompt: String,
}

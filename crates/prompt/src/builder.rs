//! Prompt builder: renders an evidence bundle and a query into a
//! synthesis request.
//!
//! Evidence blocks are tagged `[Source k]` in bundle order, starting at 1.
//! The tag format is shared with the answer post-processor, which strips
//! every such tag the synthesizer echoes back.

use crate::types::{PromptDefinition, SynthesisRequest};
use handlebars::Handlebars;
use std::collections::HashMap;
use support_core::{AppError, AppResult, CustomerProfile, EvidenceBundle, EvidenceItem, Ticket};

const SYSTEM_TEMPLATE: &str = "system";
const USER_TEMPLATE: &str = "user";

/// Inline citation tag for the k-th evidence block (1-based).
pub fn citation_tag(ordinal: usize) -> String {
    format!("[Source {}]", ordinal)
}

/// Renders synthesis requests from a prompt definition.
///
/// Templates are compiled once; building a request is then a pure
/// function of the query and the bundle.
pub struct PromptBuilder {
    handlebars: Handlebars<'static>,
    max_tickets: usize,
}

impl PromptBuilder {
    /// Compile the definition's templates.
    ///
    /// # Arguments
    /// * `definition` - Built-in or workspace-loaded prompt definition
    /// * `max_tickets` - Tickets rendered per customer (newest first)
    pub fn new(definition: &PromptDefinition, max_tickets: usize) -> AppResult<Self> {
        let mut handlebars = Handlebars::new();

        // Plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(true);

        handlebars
            .register_template_string(SYSTEM_TEMPLATE, &definition.system)
            .map_err(|e| AppError::Prompt(format!("Failed to register system template: {}", e)))?;
        handlebars
            .register_template_string(USER_TEMPLATE, &definition.template)
            .map_err(|e| AppError::Prompt(format!("Failed to register user template: {}", e)))?;

        let builder = Self {
            handlebars,
            max_tickets,
        };

        // Strict mode only reports unknown variables at render time
        let sample = Self::variables("sample question", String::new(), 0);
        for name in [SYSTEM_TEMPLATE, USER_TEMPLATE] {
            builder.render(name, &sample)?;
        }

        tracing::debug!("Compiled prompt templates for {}", definition.id);

        Ok(builder)
    }

    fn variables(
        query: &str,
        context: String,
        source_count: usize,
    ) -> HashMap<&'static str, String> {
        HashMap::from([
            ("query", query.to_string()),
            ("context", context),
            ("source_count", source_count.to_string()),
        ])
    }

    /// Build the system/user prompt pair for one query.
    pub fn build(&self, query: &str, bundle: &EvidenceBundle) -> AppResult<SynthesisRequest> {
        let variables = Self::variables(query, self.render_context(bundle), bundle.len());

        let system_prompt = self.render(SYSTEM_TEMPLATE, &variables)?;
        let user_prompt = self.render(USER_TEMPLATE, &variables)?;

        tracing::debug!(
            sources = bundle.len(),
            user_prompt_bytes = user_prompt.len(),
            "Built synthesis request"
        );

        Ok(SynthesisRequest {
            system_prompt,
            user_prompt,
        })
    }

    fn render(&self, name: &str, variables: &HashMap<&str, String>) -> AppResult<String> {
        self.handlebars
            .render(name, variables)
            .map_err(|e| AppError::Prompt(format!("Failed to render {} template: {}", name, e)))
    }

    /// Render every evidence item as a tagged block, in bundle order.
    pub fn render_context(&self, bundle: &EvidenceBundle) -> String {
        bundle
            .items()
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}\n{}", citation_tag(i + 1), self.render_item(item)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn render_item(&self, item: &EvidenceItem) -> String {
        match item {
            EvidenceItem::Customer {
                profile, tickets, ..
            } => self.render_customer(profile, tickets),
            EvidenceItem::Policy {
                content,
                source_label,
                ..
            } => format!("Document: {}\n{}", source_label, content.trim()),
        }
    }

    fn render_customer(&self, profile: &CustomerProfile, tickets: &[Ticket]) -> String {
        let record = &profile.record;
        let mut lines = vec![
            format!("Customer: {}", record.name),
            format!("Email: {}", record.email),
            format!("Phone: {}", or_na(record.phone.as_deref())),
            format!("Account Status: {}", or_na(record.account_status.as_deref())),
            format!("Account Type: {}", or_na(record.account_type.as_deref())),
            format!("Member Since: {}", or_na(record.signup_date.as_deref())),
        ];
        if let Some(total) = record.total_orders {
            lines.push(format!("Total Orders: {}", total));
        }
        if let Some(value) = record.lifetime_value {
            lines.push(format!("Lifetime Value: ${:.2}", value));
        }

        if !profile.orders.is_empty() {
            lines.push(format!("\nOrders ({}):", profile.orders.len()));
            lines.extend(profile.orders.iter().map(|order| {
                format!(
                    "  - #{} on {}: {} ({}) {}",
                    order.id,
                    or_na(order.order_date.as_deref()),
                    order
                        .amount
                        .map(|a| format!("${:.2}", a))
                        .unwrap_or_else(|| "N/A".to_string()),
                    or_na(order.status.as_deref()),
                    order.items.join(", ")
                )
            }));
        }

        if !tickets.is_empty() {
            lines.push(format!("\nSupport Tickets ({}):", tickets.len()));
            lines.extend(tickets.iter().take(self.max_tickets).map(|ticket| {
                format!(
                    "  - {}: {} (priority: {}, opened {})",
                    ticket.title,
                    or_na(ticket.status.as_deref()),
                    or_na(ticket.priority.as_deref()),
                    or_na(ticket.created_date.as_deref())
                )
            }));
        }

        lines.join("\n")
    }
}

fn or_na(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("N/A")
}

#[cfg(test)]
mod tests {
    use super::*;
    use support_core::{CustomerRecord, Order};

    fn ema() -> EvidenceItem {
        let record = CustomerRecord {
            id: 1,
            name: "Ema Johnson".to_string(),
            email: "ema.johnson@email.com".to_string(),
            phone: Some("+1-555-0101".to_string()),
            signup_date: Some("2023-06-15".to_string()),
            account_status: Some("active".to_string()),
            account_type: Some("premium".to_string()),
            total_orders: Some(12),
            lifetime_value: Some(4500.0),
        };
        let ticket = |id: i64, title: &str| Ticket {
            id,
            title: title.to_string(),
            description: None,
            status: Some("closed".to_string()),
            created_date: Some(format!("2024-01-{:02}", 20 - id)),
            resolved_date: None,
            category: None,
            priority: Some("high".to_string()),
        };

        EvidenceItem::Customer {
            customer_id: 1,
            profile: CustomerProfile {
                record,
                orders: vec![Order {
                    id: 2,
                    order_date: Some("2024-01-12".to_string()),
                    amount: Some(450.0),
                    status: Some("delivered".to_string()),
                    items: vec!["Laptop Stand".to_string(), "Keyboard".to_string()],
                }],
            },
            tickets: vec![
                ticket(1, "Subscription upgrade"),
                ticket(2, "Shipping delay question"),
                ticket(3, "Refund request for order #5001"),
                ticket(4, "Account login issues"),
            ],
        }
    }

    fn shipping_chunk() -> EvidenceItem {
        EvidenceItem::Policy {
            content: "Standard shipping costs $5.99 and takes 3-5 business days.\n".to_string(),
            source_label: "shipping_policy".to_string(),
            similarity: 0.92,
        }
    }

    #[test]
    fn test_blocks_are_tagged_in_bundle_order() {
        let builder = PromptBuilder::new(&PromptDefinition::default(), 3).unwrap();
        let bundle = EvidenceBundle::new(vec![ema()], vec![shipping_chunk()]);

        let context = builder.render_context(&bundle);
        let first = context.find("[Source 1]\nCustomer: Ema Johnson").unwrap();
        let second = context
            .find("[Source 2]\nDocument: shipping_policy")
            .unwrap();
        assert!(first < second);
        assert!(!context.contains("[Source 3]"));
    }

    #[test]
    fn test_customer_block_limits_tickets() {
        let builder = PromptBuilder::new(&PromptDefinition::default(), 3).unwrap();
        let context = builder.render_context(&EvidenceBundle::new(vec![ema()], Vec::new()));

        assert!(context.contains("Support Tickets (4):"));
        assert!(context.contains("Subscription upgrade: closed"));
        assert!(context.contains("Refund request for order #5001"));
        assert!(!context.contains("Account login issues"));
        assert!(context.contains("Lifetime Value: $4500.00"));
        assert!(context.contains("Laptop Stand, Keyboard"));
    }

    #[test]
    fn test_build_renders_query_after_context() {
        let builder = PromptBuilder::new(&PromptDefinition::default(), 3).unwrap();
        let bundle = EvidenceBundle::new(Vec::new(), vec![shipping_chunk()]);

        let request = builder
            .build("What are the shipping costs?", &bundle)
            .unwrap();

        assert!(request.system_prompt.contains("Answer only from the evidence"));
        let context_at = request.user_prompt.find("[Source 1]").unwrap();
        let query_at = request
            .user_prompt
            .find("Customer Question: What are the shipping costs?")
            .unwrap();
        assert!(context_at < query_at);
    }

    #[test]
    fn test_query_text_is_not_escaped() {
        let builder = PromptBuilder::new(&PromptDefinition::default(), 3).unwrap();
        let request = builder
            .build("Is <b>\"express\"</b> & overnight covered?", &EvidenceBundle::empty())
            .unwrap();
        assert!(request
            .user_prompt
            .contains("Is <b>\"express\"</b> & overnight covered?"));
    }

    #[test]
    fn test_custom_definition_variables() {
        let def = PromptDefinition {
            system: "You have {{source_count}} sources.".to_string(),
            template: "{{context}} || {{query}}".to_string(),
            ..PromptDefinition::default()
        };
        let builder = PromptBuilder::new(&def, 3).unwrap();
        let request = builder
            .build("refund?", &EvidenceBundle::new(Vec::new(), vec![shipping_chunk()]))
            .unwrap();

        assert_eq!(request.system_prompt, "You have 1 sources.");
        assert!(request.user_prompt.ends_with(" || refund?"));
    }

    #[test]
    fn test_unknown_variable_is_prompt_error() {
        let def = PromptDefinition {
            template: "{{context}} {{query}} {{customer_tier}}".to_string(),
            ..PromptDefinition::default()
        };
        let result = PromptBuilder::new(&def, 3);
        assert!(matches!(result, Err(AppError::Prompt(_))));

        let def = PromptDefinition {
            system: "Cite {{source_total}} sources.".to_string(),
            ..PromptDefinition::default()
        };
        assert!(PromptBuilder::new(&def, 3).is_err());
    }

    #[test]
    fn test_citation_tag_format() {
        assert_eq!(citation_tag(1), "[Source 1]");
        assert_eq!(citation_tag(12), "[Source 12]");
    }
}

//! Shared data model for the support pipeline.
//!
//! Customer-directory records, policy chunks, evidence bundles and the
//! final answer contract all live here so every crate speaks the same types.

use serde::{Deserialize, Serialize};

/// Attribution label used for every piece of customer evidence.
pub const CUSTOMER_SOURCE_LABEL: &str = "customer_database";

/// A customer name as known to the directory, with its matching form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownName {
    /// Display name exactly as stored
    pub display: String,

    /// Lower-cased form used for matching
    pub normalized: String,
}

impl KnownName {
    pub fn new(display: impl Into<String>) -> Self {
        let display = display.into();
        let normalized = display.to_lowercase();
        Self {
            display,
            normalized,
        }
    }
}

/// One row of the customer directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub signup_date: Option<String>,
    pub account_status: Option<String>,
    pub account_type: Option<String>,
    pub total_orders: Option<i64>,
    pub lifetime_value: Option<f64>,
}

/// A purchase attached to a customer profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_date: Option<String>,
    pub amount: Option<f64>,
    pub status: Option<String>,

    /// Item names (stored as a JSON array)
    #[serde(default)]
    pub items: Vec<String>,
}

/// Full customer profile: the record plus order history (newest first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub record: CustomerRecord,

    #[serde(default)]
    pub orders: Vec<Order>,
}

impl CustomerProfile {
    /// Profile carrying only what the search record already knows.
    pub fn from_record(record: CustomerRecord) -> Self {
        Self {
            record,
            orders: Vec::new(),
        }
    }
}

/// A support ticket raised by a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub created_date: Option<String>,
    pub resolved_date: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
}

/// One chunk returned by the document index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyChunk {
    pub content: String,

    /// Identifier of the source document (file name without extension)
    pub source_label: String,

    /// Semantic closeness to the query, in [0, 1]
    pub similarity: f32,
}

/// Which knowledge source(s) a query is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteDecision {
    Customer,
    Policy,
    Both,
}

impl RouteDecision {
    pub fn includes_customer(self) -> bool {
        matches!(self, RouteDecision::Customer | RouteDecision::Both)
    }

    pub fn includes_policy(self) -> bool {
        matches!(self, RouteDecision::Policy | RouteDecision::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteDecision::Customer => "CUSTOMER",
            RouteDecision::Policy => "POLICY",
            RouteDecision::Both => "BOTH",
        }
    }
}

impl std::fmt::Display for RouteDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of retrieved support data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvidenceItem {
    Customer {
        customer_id: i64,
        profile: CustomerProfile,
        tickets: Vec<Ticket>,
    },
    Policy {
        content: String,
        source_label: String,
        similarity: f32,
    },
}

impl EvidenceItem {
    pub fn from_chunk(chunk: PolicyChunk) -> Self {
        EvidenceItem::Policy {
            content: chunk.content,
            source_label: chunk.source_label,
            similarity: chunk.similarity,
        }
    }

    /// Attribution label shown to the caller.
    pub fn label(&self) -> &str {
        match self {
            EvidenceItem::Customer { .. } => CUSTOMER_SOURCE_LABEL,
            EvidenceItem::Policy { source_label, .. } => source_label,
        }
    }

    /// Relevance as a whole percentage. Customer facts are exact matches.
    pub fn relevance_percent(&self) -> u8 {
        match self {
            EvidenceItem::Customer { .. } => 100,
            EvidenceItem::Policy { similarity, .. } => {
                let clamped = if similarity.is_finite() {
                    similarity.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                (clamped * 100.0).round() as u8
            }
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            EvidenceItem::Customer { .. } => SourceKind::CustomerData,
            EvidenceItem::Policy { .. } => SourceKind::Document,
        }
    }
}

/// Ordered evidence gathered for one query. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    items: Vec<EvidenceItem>,
}

impl EvidenceBundle {
    /// Customer evidence always precedes policy evidence.
    pub fn new(customer: Vec<EvidenceItem>, policy: Vec<EvidenceItem>) -> Self {
        let mut items = customer;
        items.extend(policy);
        Self { items }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[EvidenceItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_context(&self) -> bool {
        !self.items.is_empty()
    }
}

/// Category of an attributed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    CustomerData,
    Document,
}

/// Caller-facing attribution for one evidence item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// 1-based ordinal matching the `[Source k]` tag in the prompt
    pub id: usize,
    pub label: String,
    pub relevance_percent: u8,
    pub kind: SourceKind,
}

/// The externally observable result of answering one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub sources: Vec<SourceDescriptor>,
    pub has_context: bool,
    pub query: String,
    pub route: RouteDecision,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(similarity: f32) -> EvidenceItem {
        EvidenceItem::Policy {
            content: "Returns accepted within 30 days.".to_string(),
            source_label: "refund_policy".to_string(),
            similarity,
        }
    }

    fn customer() -> EvidenceItem {
        EvidenceItem::Customer {
            customer_id: 1,
            profile: CustomerProfile::from_record(CustomerRecord {
                id: 1,
                name: "Ema Johnson".to_string(),
                email: "ema.johnson@email.com".to_string(),
                phone: None,
                signup_date: None,
                account_status: None,
                account_type: None,
                total_orders: None,
                lifetime_value: None,
            }),
            tickets: Vec::new(),
        }
    }

    #[test]
    fn test_known_name_normalizes() {
        let name = KnownName::new("Sarah Chen");
        assert_eq!(name.display, "Sarah Chen");
        assert_eq!(name.normalized, "sarah chen");
    }

    #[test]
    fn test_relevance_percent() {
        assert_eq!(customer().relevance_percent(), 100);
        assert_eq!(policy(0.92).relevance_percent(), 92);
        assert_eq!(policy(0.875).relevance_percent(), 88);
        assert_eq!(policy(1.7).relevance_percent(), 100);
        assert_eq!(policy(-0.2).relevance_percent(), 0);
        assert_eq!(policy(f32::NAN).relevance_percent(), 0);
    }

    #[test]
    fn test_bundle_orders_customer_first() {
        let bundle = EvidenceBundle::new(vec![customer()], vec![policy(0.5), policy(0.4)]);
        assert_eq!(bundle.len(), 3);
        assert_eq!(bundle.items()[0].label(), CUSTOMER_SOURCE_LABEL);
        assert_eq!(bundle.items()[1].label(), "refund_policy");
        assert!(bundle.has_context());
    }

    #[test]
    fn test_has_context_iff_non_empty() {
        assert!(!EvidenceBundle::empty().has_context());
        assert!(!EvidenceBundle::new(Vec::new(), Vec::new()).has_context());
        assert!(EvidenceBundle::new(Vec::new(), vec![policy(0.1)]).has_context());
        assert!(EvidenceBundle::new(vec![customer()], Vec::new()).has_context());
    }

    #[test]
    fn test_route_serialization() {
        let json = serde_json::to_string(&RouteDecision::Both).unwrap();
        assert_eq!(json, "\"BOTH\"");
        assert!(RouteDecision::Both.includes_customer());
        assert!(RouteDecision::Both.includes_policy());
        assert!(!RouteDecision::Policy.includes_customer());
    }

    #[test]
    fn test_source_kind_serialization() {
        let descriptor = SourceDescriptor {
            id: 1,
            label: CUSTOMER_SOURCE_LABEL.to_string(),
            relevance_percent: 100,
            kind: SourceKind::CustomerData,
        };
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["kind"], "customer_data");
        assert_eq!(json["relevance_percent"], 100);
    }
}

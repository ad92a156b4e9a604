//! Per-query routing between the customer directory and the policy index.

use crate::classifier::KeywordClassifier;
use crate::matcher::match_names;
use support_core::{CustomerRecord, RouteDecision};
use support_knowledge::CustomerDirectory;

/// Outcome of routing one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Routing {
    pub decision: RouteDecision,

    /// Known customers named in the query
    pub mentioned_names: Vec<String>,

    /// Records found by the trial probe. `Some` only when the probe ran
    /// and succeeded; the aggregator reuses them instead of searching again.
    pub probe_records: Option<Vec<CustomerRecord>>,
}

/// Decision table for the signalled cases.
///
/// Returns `None` when neither signal is present and a trial lookup has
/// to break the tie.
pub fn decide(names_mentioned: bool, has_policy_keywords: bool) -> Option<RouteDecision> {
    match (names_mentioned, has_policy_keywords) {
        (true, true) => Some(RouteDecision::Both),
        (true, false) => Some(RouteDecision::Customer),
        (false, true) => Some(RouteDecision::Policy),
        (false, false) => None,
    }
}

/// Decision after a trial lookup that found `records_found` customers.
pub fn decide_after_probe(records_found: usize) -> RouteDecision {
    if records_found > 0 {
        RouteDecision::Customer
    } else {
        RouteDecision::Policy
    }
}

/// Combines name and keyword signals, probing the directory when neither fires.
#[derive(Debug, Clone)]
pub struct Router {
    classifier: KeywordClassifier,
}

impl Router {
    pub fn new(classifier: KeywordClassifier) -> Self {
        Self { classifier }
    }

    /// Route `query`. Never fails: directory errors degrade to "no names"
    /// and "probe found nothing".
    pub async fn route(&self, query: &str, directory: &dyn CustomerDirectory) -> Routing {
        let known_names = match directory.list_all_names().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!("Customer name lookup failed, matching no names: {}", e);
                Vec::new()
            }
        };

        let mentioned_names = match_names(query, &known_names);
        let has_policy_keywords = self.classifier.classify(query);

        tracing::debug!(
            mentioned = ?mentioned_names,
            has_policy_keywords,
            "Routing signals"
        );

        if let Some(decision) = decide(!mentioned_names.is_empty(), has_policy_keywords) {
            return Routing {
                decision,
                mentioned_names,
                probe_records: None,
            };
        }

        let term = query.trim();
        if term.is_empty() {
            return Routing {
                decision: RouteDecision::Policy,
                mentioned_names,
                probe_records: None,
            };
        }

        match directory.search(term).await {
            Ok(records) => {
                tracing::debug!(records = records.len(), "Trial customer lookup");
                Routing {
                    decision: decide_after_probe(records.len()),
                    mentioned_names,
                    probe_records: Some(records),
                }
            }
            Err(e) => {
                tracing::warn!("Trial customer lookup failed, routing to policy: {}", e);
                Routing {
                    decision: RouteDecision::Policy,
                    mentioned_names,
                    probe_records: None,
                }
            }
        }
    }
}

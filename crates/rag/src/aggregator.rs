//! Evidence gathering for a routed query.
//!
//! Each source is isolated: a failing directory or index contributes an
//! empty slice and a warning, never an error.

use crate::router::Routing;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use support_core::{CustomerProfile, CustomerRecord, EvidenceBundle, EvidenceItem};
use support_knowledge::{CustomerDirectory, DocumentIndex};

/// Profile/ticket fetches in flight at once.
const MAX_CONCURRENT_LOOKUPS: usize = 4;

/// Builds evidence bundles from the two knowledge sources.
#[derive(Clone)]
pub struct ContextAggregator {
    directory: Arc<dyn CustomerDirectory>,
    index: Arc<dyn DocumentIndex>,
}

impl ContextAggregator {
    pub fn new(directory: Arc<dyn CustomerDirectory>, index: Arc<dyn DocumentIndex>) -> Self {
        Self { directory, index }
    }

    /// Gather evidence for `routing.decision`; customer items precede policy items.
    pub async fn aggregate(
        &self,
        query: &str,
        routing: &Routing,
        n_results: usize,
    ) -> EvidenceBundle {
        let decision = routing.decision;

        let customer = async {
            if decision.includes_customer() {
                self.customer_evidence(routing).await
            } else {
                Vec::new()
            }
        };
        let policy = async {
            if decision.includes_policy() {
                self.policy_evidence(query, n_results).await
            } else {
                Vec::new()
            }
        };

        let (customer, policy) = futures::join!(customer, policy);

        tracing::info!(
            route = %decision,
            customer_items = customer.len(),
            policy_items = policy.len(),
            "Aggregated evidence"
        );

        EvidenceBundle::new(customer, policy)
    }

    async fn customer_evidence(&self, routing: &Routing) -> Vec<EvidenceItem> {
        let records = match &routing.probe_records {
            Some(records) => records.clone(),
            None => self.resolve_names(&routing.mentioned_names).await,
        };

        stream::iter(records)
            .map(|record| self.customer_item(record))
            .buffered(MAX_CONCURRENT_LOOKUPS)
            .collect::<Vec<_>>()
            .await
    }

    /// Directory records for the mentioned display names, one per customer.
    ///
    /// A failed search empties the whole slice.
    async fn resolve_names(&self, names: &[String]) -> Vec<CustomerRecord> {
        let mut resolved: Vec<CustomerRecord> = Vec::new();

        for name in names {
            let records = match self.directory.search(name).await {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!("Customer lookup for '{}' failed: {}", name, e);
                    return Vec::new();
                }
            };

            let wanted = name.to_lowercase();
            for record in records {
                if record.name.to_lowercase() == wanted
                    && !resolved.iter().any(|r| r.id == record.id)
                {
                    resolved.push(record);
                }
            }
        }

        if resolved.is_empty() && !names.is_empty() {
            tracing::info!("Mentioned customers no longer resolve: {:?}", names);
        }

        resolved
    }

    async fn customer_item(&self, record: CustomerRecord) -> EvidenceItem {
        let customer_id = record.id;
        let (profile, tickets) = futures::join!(
            self.directory.get_profile(customer_id),
            self.directory.get_tickets(customer_id)
        );

        let profile = profile.unwrap_or_else(|e| {
            tracing::warn!("Profile fetch for customer {} failed: {}", customer_id, e);
            CustomerProfile::from_record(record)
        });
        let tickets = tickets.unwrap_or_else(|e| {
            tracing::warn!("Ticket fetch for customer {} failed: {}", customer_id, e);
            Vec::new()
        });

        EvidenceItem::Customer {
            customer_id,
            profile,
            tickets,
        }
    }

    async fn policy_evidence(&self, query: &str, n_results: usize) -> Vec<EvidenceItem> {
        match self.index.search(query, n_results).await {
            Ok(chunks) => chunks.into_iter().map(EvidenceItem::from_chunk).collect(),
            Err(e) => {
                tracing::warn!("Policy search failed: {}", e);
                Vec::new()
            }
        }
    }
}

//! In-memory collaborators with call counters.

use crate::synthesizer::AnswerSynthesizer;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use support_core::{
    AppError, AppResult, CustomerProfile, CustomerRecord, KnownName, PolicyChunk, Ticket,
};
use support_knowledge::{CustomerDirectory, DocumentIndex};
use support_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use support_prompt::SynthesisRequest;

pub fn record(id: i64, name: &str) -> CustomerRecord {
    CustomerRecord {
        id,
        name: name.to_string(),
        email: format!("{}@email.com", name.to_lowercase().replace(' ', ".")),
        phone: Some(format!("+1-555-01{:02}", id)),
        signup_date: Some("2023-06-15".to_string()),
        account_status: Some("active".to_string()),
        account_type: Some("premium".to_string()),
        total_orders: Some(12),
        lifetime_value: Some(4500.0),
    }
}

pub fn chunk(label: &str, similarity: f32) -> PolicyChunk {
    PolicyChunk {
        content: format!("{} text", label),
        source_label: label.to_string(),
        similarity,
    }
}

fn ticket(id: i64) -> Ticket {
    Ticket {
        id,
        title: format!("Ticket {}", id),
        description: None,
        status: Some("closed".to_string()),
        created_date: Some(format!("2024-01-{:02}", 28 - id)),
        resolved_date: None,
        category: None,
        priority: Some("medium".to_string()),
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    customers: Vec<CustomerRecord>,
    tickets: HashMap<i64, usize>,
    unavailable: bool,
    failing_profiles: bool,
    failing_tickets: bool,
    list_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn with_customers(customers: Vec<CustomerRecord>) -> Self {
        Self {
            customers,
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn with_tickets(mut self, customer_id: i64, count: usize) -> Self {
        self.tickets.insert(customer_id, count);
        self
    }

    pub fn failing_profiles(mut self) -> Self {
        self.failing_profiles = true;
        self
    }

    pub fn failing_tickets(mut self) -> Self {
        self.failing_tickets = true;
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> AppResult<()> {
        if self.unavailable {
            Err(AppError::DirectoryUnavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CustomerDirectory for FakeDirectory {
    async fn list_all_names(&self) -> AppResult<Vec<KnownName>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .customers
            .iter()
            .map(|c| KnownName::new(c.name.clone()))
            .collect())
    }

    async fn search(&self, term: &str) -> AppResult<Vec<CustomerRecord>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let term = term.to_lowercase();
        Ok(self
            .customers
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&term) || c.email.contains(&term))
            .cloned()
            .collect())
    }

    async fn get_profile(&self, customer_id: i64) -> AppResult<CustomerProfile> {
        self.check()?;
        if self.failing_profiles {
            return Err(AppError::DirectoryUnavailable("profile timeout".to_string()));
        }
        self.customers
            .iter()
            .find(|c| c.id == customer_id)
            .cloned()
            .map(CustomerProfile::from_record)
            .ok_or_else(|| AppError::NotFound(format!("Customer {}", customer_id)))
    }

    async fn get_tickets(&self, customer_id: i64) -> AppResult<Vec<Ticket>> {
        self.check()?;
        if self.failing_tickets {
            return Err(AppError::DirectoryUnavailable("ticket table locked".to_string()));
        }
        let count = self.tickets.get(&customer_id).copied().unwrap_or(0);
        Ok((1..=count as i64).map(ticket).collect())
    }
}

#[derive(Default)]
pub struct FakeIndex {
    chunks: Vec<PolicyChunk>,
    unavailable: bool,
    search_calls: AtomicUsize,
    last_n_results: Mutex<Option<usize>>,
}

impl FakeIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_chunks(chunks: Vec<PolicyChunk>) -> Self {
        Self {
            chunks,
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn last_n_results(&self) -> Option<usize> {
        *self.last_n_results.lock().unwrap()
    }
}

#[async_trait]
impl DocumentIndex for FakeIndex {
    async fn search(&self, _query: &str, n_results: usize) -> AppResult<Vec<PolicyChunk>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_n_results.lock().unwrap() = Some(n_results);
        if self.unavailable {
            return Err(AppError::IndexUnavailable("collection missing".to_string()));
        }
        Ok(self.chunks.iter().take(n_results).cloned().collect())
    }
}

/// Plays back a fixed list of outcomes, one per call.
pub struct ScriptedSynthesizer {
    script: Mutex<VecDeque<AppResult<String>>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<SynthesisRequest>>,
}

impl ScriptedSynthesizer {
    pub fn new(script: Vec<AppResult<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn answering(answer: &str) -> Self {
        Self::new(vec![Ok(answer.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<SynthesisRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerSynthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest, _timeout: Duration) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::fatal_synthesis("script exhausted")))
    }
}

/// Minimal [`LlmClient`] that records the last request.
pub struct FakeLlmClient {
    answer: String,
    delay: Option<Duration>,
    last_request: Mutex<Option<LlmRequest>>,
}

impl FakeLlmClient {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            delay: None,
            last_request: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn last_request(&self) -> Option<LlmRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        *self.last_request.lock().unwrap() = Some(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(LlmResponse {
            content: self.answer.clone(),
            model: request.model.clone(),
            usage: LlmUsage::new(10, 5),
        })
    }
}

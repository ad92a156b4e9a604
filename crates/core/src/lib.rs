//! Support Desk Core Library
//!
//! This crate provides the foundational pieces shared by every other crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management
//! - The pipeline's data model (evidence, routes, answers)

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use types::{
    AnswerResult, CustomerProfile, CustomerRecord, EvidenceBundle, EvidenceItem, KnownName,
    Order, PolicyChunk, RouteDecision, SourceDescriptor, SourceKind, Ticket,
    CUSTOMER_SOURCE_LABEL,
};

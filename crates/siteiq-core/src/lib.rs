//! SiteIQ Core - intelligence orchestration for construction project queries
//!
//! A free-form question about a project goes in; one composite, confidence
//! scored answer comes out. In between the orchestrator admits the query
//! against a fixed capacity, runs the mandatory semantic and context
//! analysis, classifies the intent, fans out to the collaborators that
//! intent needs, derives cross-cutting insights and assembles the response.
//!
//! # Architecture
//!
//! 1. **Admission** (`admission`): fair bounded-concurrency gate and active-query registry
//! 2. **Classification** (`classifier`): explicit intent, semantic label, then an ordered keyword table
//! 3. **Dispatch** (`dispatch`): per-call deadline, timeout and failure isolation
//! 4. **Synthesis** (`synthesis`): rules over already-collected results
//! 5. **Assembly** (`assembly`): confidence, summary and follow-up
//!
//! Collaborators are reached only through the traits in [`collaborators`].
//! [`SnapshotBackend`] implements all of them from a project snapshot.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use siteiq_core::{
//!     Collaborators, Intent, IntelligenceOrchestrator, OrchestratorConfig, Query,
//!     SnapshotBackend,
//! };
//!
//! # tokio_test::block_on(async {
//! let backend = Arc::new(SnapshotBackend::default());
//! let orchestrator = IntelligenceOrchestrator::new(
//!     Collaborators::from_backend(backend),
//!     OrchestratorConfig::default(),
//! )?;
//!
//! let query = Query::builder()
//!     .user("u-1")
//!     .project("P1")
//!     .text("predict schedule delay for foundation")
//!     .build();
//!
//! let response = orchestrator.process_query(query).await;
//! assert!(response.success);
//! assert_eq!(response.intent, Some(Intent::Prediction));
//! println!("{}", response.summary);
//! # Ok::<(), siteiq_core::SiteIqError>(())
//! # }).unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod admission;
pub mod assembly;
pub mod classifier;
pub mod collaborators;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod health;
pub mod orchestrator;
pub mod query;
pub mod response;
pub mod synthesis;
pub mod types;

// Re-export commonly used types for convenience
pub use admission::ActiveQuerySnapshot;
pub use classifier::{classify, classify_text, KEYWORD_RULES};
pub use collaborators::{Collaborators, Layer, ProjectSnapshot, SnapshotBackend};
pub use config::OrchestratorConfig;
pub use error::{CollaboratorError, Result, SiteIqError};
pub use events::{EventSubscription, OrchestratorEvent};
pub use health::HealthRecord;
pub use orchestrator::IntelligenceOrchestrator;
pub use query::{Intent, Priority, Query, QueryState};
pub use response::{
    AlertResult, InsightCategory, InsightResult, PredictionResult, QueryStatus,
    RecommendationResult, Response, Severity,
};
pub use synthesis::{CompositeSynthesizer, SynthesisInput, SynthesisRule};
pub use types::{Timestamp, Value, ValueMap};

pub use tokio_util::sync::CancellationToken;
pub use uuid::Uuid;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

//! Memory extraction and paced personality responses.
//!
//! This crate provides:
//! - Transcript parsing into structured messages
//! - A single-shot memory extraction workflow
//! - A paced, failure-isolated generation run over three personalities
//! - Observable run state with explicit run exclusion
//!
//! # Quick Start
//!
//! ```ignore
//! use persona_core::{Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::new(SessionConfig::new("http://localhost:8000"))?;
//!
//!     session.extract("user: I love pizza\nassistant: Same!").await?;
//!
//!     session
//!         .generate("Long day at work", |kind, text| println!("{kind}: {text}"))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod orchestrator;
pub mod pacing;
pub mod service;
pub mod session;
pub mod state;
pub mod testing;
pub mod transcript;

// Re-export the wire types so callers need only this crate
pub use guppshupp::{Error as ServiceError, ExtractedMemories, Health, Message, PersonalityKind};

// Primary public API
pub use config::SessionConfig;
pub use orchestrator::{GenerationFailure, GenerationReport, PersonalityOrchestrator, RunEvent};
pub use pacing::{FixedDelay, NoDelay, Pacing, DEFAULT_PACING_INTERVAL};
pub use service::{HealthCheck, MemoryExtractor, PersonalityGenerator};
pub use session::{Session, SessionError};
pub use state::{PersonalityResponseSet, RunKind, RunState};
pub use testing::{MockFailure, MockReply, MockService};
pub use tokio_util::sync::CancellationToken;

//! # stackplan_synth
//!
//! Synthesis engine and provider contract for stackplan.
//!
//! This crate turns an ordered dependency graph into real resources: it
//! walks the topological order, resolves deferred attributes as outputs
//! become available, and invokes an external provider through a narrow
//! create/destroy contract with bounded retries for transient failures.
//!
//! # Architecture
//!
//! - **Provider**: the async create/destroy contract the engine depends on
//! - **StubProvider**: deterministic in-memory provider for planning and tests
//! - **Synthesizer**: the sequential synthesis and teardown walks
//! - **PlanState**: persisted record of one run, enabling a later destroy
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stackplan_synth::{StubProvider, Synthesizer};
//!
//! let synthesizer = Synthesizer::new(Arc::new(StubProvider::new()));
//! let plan = synthesizer.synthesize(&graph).await?;
//! plan.save(&state_path)?;
//! ```

pub mod error;
pub mod provider;
pub mod state;
pub mod stub;
pub mod synthesizer;

pub use error::{SynthError, SynthResult};
pub use provider::{Outputs, Provider, ProviderError, ResolvedConfig, RetryPolicy};
pub use state::{PlanRecord, PlanState};
pub use stub::StubProvider;
pub use synthesizer::Synthesizer;

//! Sequential multi-profile fingerprint sampling.
//!
//! For each profile in a fixed table the pipeline spoofs the runtime's
//! timezone and languages, gathers every signal concurrently, assembles a
//! flat sample, pauses, and moves on. The finished batch is posted to a
//! collection endpoint in one request.
//!
//! ```rust
//! # async fn run() -> fp_sampler::Result<()> {
//! use fp_sampler::runtime::EmulatedRuntime;
//! use fp_sampler::{Sampler, SamplerConfig};
//! use std::sync::Arc;
//!
//! let mut sampler = Sampler::new(SamplerConfig::default(), Arc::new(EmulatedRuntime::default()))?;
//! let outcome = sampler.collect_and_submit().await;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub mod assembler;
#[cfg(feature = "cdp")]
pub mod cdp;
pub mod config;
pub mod controller;
pub mod error;
pub mod profiles;
pub mod runtime;
mod sampler;
pub mod session;
pub mod signals;
pub mod spoofer;
pub mod submit;

pub use assembler::{Batch, Sample};
pub use config::SamplerConfig;
pub use controller::{CollectionController, ControllerState};
pub use error::{Result, SamplerError};
pub use profiles::{Profile, ProfileTable};
pub use sampler::Sampler;
pub use session::SessionContext;
pub use submit::{SubmissionClient, SubmissionOutcome, SubmissionStatus};

//! StreamSage Core Library
//!
//! Builds repost-kit prompts for a generative-AI backend, validates the
//! structured answer, tracks the request state, and renders the exportable
//! report.

pub mod backend;
pub mod error;
pub mod parse;
pub mod prompt;
pub mod provider;
pub mod report;
pub mod state;
pub mod types;

// Re-export commonly used items at crate root
pub use backend::{GenerationBackend, HttpBackend};
pub use error::{ErrorKind, GenerationError, ProviderError, Result};
pub use parse::parse_result;
pub use prompt::{GenerationPrompt, OutputSchema, build_prompt};
pub use provider::{ClientConfig, Provider, ProviderConfig};
pub use report::{render_report, render_report_now, report_file_name, save_report};
pub use state::{Repurposer, RequestState, Snapshot};
pub use types::{GenerationRequest, GenerationResult};

//! Client for a file/URL scanning service.
//!
//! A scan submits a file or URL to `POST /analyze`, polls
//! `GET /analysis/{id}` until the analysis leaves the `queued` state, and
//! turns the per-engine report into a malicious/safe verdict.
//!
//! ```rust,ignore
//! use scan_client::{HttpBackend, ScanClient, TextRenderer};
//!
//! let client = ScanClient::new(HttpBackend::new_for_server("http://127.0.0.1:5000")?);
//! let state = client.scan(None, Some("https://example.com".into()), &TextRenderer)?;
//! ```

pub mod backend;
pub mod client;
pub mod clock;
pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mock;
pub mod poll;
pub mod render;
pub mod report;
pub mod session;
pub mod submission;
pub mod ui;

pub use backend::{AnalysisHandle, ScanBackend};
pub use client::ScanClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::ScanError;
pub use http::{HttpBackend, DEFAULT_SERVER_ADDR};
pub use mock::MockBackend;
pub use poll::{PollConfig, PollOutcome};
pub use render::{JsonRenderer, RecordingRenderer, Renderer, TextRenderer};
pub use report::{AnalysisResponse, EngineReport, EngineResult, ScanSummary, Verdict};
pub use session::{SessionToken, Sessions};
pub use submission::{FileUpload, Submission};
pub use ui::{reduce, UiClass, UiContent, UiEvent, UiState};

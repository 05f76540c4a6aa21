use std::path::Path;

use tracing::{info, warn};

use crate::backend::{AnalysisHandle, ScanBackend};
use crate::clock::{Clock, SystemClock};
use crate::errors::ScanError;
use crate::poll::{PollConfig, PollOutcome, Poller};
use crate::render::Renderer;
use crate::report::AnalysisResponse;
use crate::session::{SessionToken, Sessions};
use crate::submission::{FileUpload, Submission};
use crate::ui::{reduce, UiEvent, UiState};

/// Drives one scan from submission to rendered verdict.
///
/// `scan` is safe to call from several threads at once. Only the newest
/// session renders its outcome; older poll loops notice they have been
/// replaced and stop before their next fetch.
pub struct ScanClient<B, C = SystemClock> {
    backend: B,
    clock: C,
    poll_config: PollConfig,
    sessions: Sessions,
}

impl<B: ScanBackend> ScanClient<B, SystemClock> {
    pub fn new(backend: B) -> ScanClient<B, SystemClock> {
        ScanClient::with_clock(backend, SystemClock)
    }
}

impl<B: ScanBackend, C: Clock> ScanClient<B, C> {
    pub fn with_clock(backend: B, clock: C) -> ScanClient<B, C> {
        ScanClient {
            backend,
            clock,
            poll_config: PollConfig::default(),
            sessions: Sessions::new(),
        }
    }

    pub fn with_poll_config(mut self, poll_config: PollConfig) -> ScanClient<B, C> {
        self.poll_config = poll_config;
        self
    }

    /// Shares a session registry, e.g. between clients driving one result view.
    pub fn with_sessions(mut self, sessions: Sessions) -> ScanClient<B, C> {
        self.sessions = sessions;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn submit(&self, submission: &Submission) -> Result<AnalysisHandle, ScanError> {
        self.backend.submit(submission)
    }

    pub fn poll_until_ready(
        &self,
        handle: &AnalysisHandle,
        token: &SessionToken,
    ) -> Result<PollOutcome, ScanError> {
        Poller::new(&self.backend, &self.clock, &self.poll_config, handle, token).run()
    }

    /// Reduces `analysis` to a state and hands it to `renderer`.
    pub fn render<R: Renderer>(&self, analysis: &AnalysisResponse, renderer: &R) -> UiState {
        let state = reduce(UiEvent::Analysis(analysis));
        emit(renderer, &state);
        state
    }

    /// Validates the inputs, submits, polls and renders.
    ///
    /// Missing input is returned as `Err` with nothing rendered or sent. Every
    /// later failure is rendered as an error state and returned as `Ok`.
    /// `Ok(None)` means a newer session took over before this one finished.
    pub fn scan<R: Renderer>(
        &self,
        file: Option<FileUpload>,
        url: Option<String>,
        renderer: &R,
    ) -> Result<Option<UiState>, ScanError> {
        let submission = Submission::from_parts(file, url)?;
        let token = self
            .sessions
            .begin_with(|_| emit(renderer, &reduce(UiEvent::Submitted)));
        info!(session = token.id(), submission = %submission.describe(), "scan started");

        let state = match self.run_session(&submission, &token) {
            Ok(Some(analysis)) => reduce(UiEvent::Analysis(&analysis)),
            Ok(None) => return Ok(None),
            Err(err) => {
                warn!(session = token.id(), error = %err, "scan failed");
                reduce(UiEvent::Failed(&err))
            }
        };

        let rendered = token.if_current(|| {
            emit(renderer, &state);
            state
        });
        match &rendered {
            Some(state) => info!(session = token.id(), class = state.class.as_str(), "scan finished"),
            None => info!(session = token.id(), "session superseded, result discarded"),
        }
        Ok(rendered)
    }

    /// Like [`scan`](ScanClient::scan), reading the upload from `file` first.
    ///
    /// A file that cannot be read ends the scan like any other failure: a new
    /// session renders the error state and nothing is sent.
    pub fn scan_path<R: Renderer>(
        &self,
        file: Option<&Path>,
        url: Option<String>,
        renderer: &R,
    ) -> Result<Option<UiState>, ScanError> {
        match file.map(FileUpload::from_path).transpose() {
            Ok(file) => self.scan(file, url, renderer),
            Err(err) => {
                warn!(error = %err, "could not read the upload");
                let state = reduce(UiEvent::Failed(&err));
                self.sessions.begin_with(|_| emit(renderer, &state));
                Ok(Some(state))
            }
        }
    }

    /// Fetches an existing analysis once and renders whatever it reports.
    pub fn check_status<R: Renderer>(&self, handle: &AnalysisHandle, renderer: &R) -> UiState {
        let state = match self.backend.fetch_analysis(handle) {
            Ok(analysis) => reduce(UiEvent::Analysis(&analysis)),
            Err(err) => {
                warn!(analysis_id = %handle, error = %err, "status check failed");
                reduce(UiEvent::Failed(&err))
            }
        };
        emit(renderer, &state);
        state
    }

    fn run_session(
        &self,
        submission: &Submission,
        token: &SessionToken,
    ) -> Result<Option<AnalysisResponse>, ScanError> {
        let handle = self.submit(submission)?;
        Ok(self.poll_until_ready(&handle, token)?.into_response())
    }
}

fn emit<R: Renderer>(renderer: &R, state: &UiState) {
    if let Err(err) = renderer.render(state) {
        warn!(error = %err, "failed to render result");
    }
}

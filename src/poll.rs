//! Waiting for a queued analysis to finish.
//!
//! Each iteration sleeps for the configured interval and then fetches the
//! analysis once. The loop ends on the first status other than `queued`, when
//! an optional attempt or duration cap is reached, or when the session that
//! started it has been replaced. HTTP failures end it immediately, without
//! retries.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::backend::{AnalysisHandle, ScanBackend};
use crate::clock::Clock;
use crate::errors::ScanError;
use crate::report::AnalysisResponse;
use crate::session::SessionToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Wait before every fetch, including the first one.
    pub interval: Duration,
    /// Stop after this many fetches. `None` polls forever.
    pub max_attempts: Option<u32>,
    /// Stop once this much time has passed since polling started.
    pub max_duration: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            max_duration: None,
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> PollConfig {
        self.interval = interval;
        self
    }

    /// At least one fetch is always made.
    pub fn with_max_attempts(mut self, attempts: u32) -> PollConfig {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    pub fn with_max_duration(mut self, duration: Duration) -> PollConfig {
        self.max_duration = Some(duration);
        self
    }

    pub fn is_bounded(&self) -> bool {
        self.max_attempts.is_some() || self.max_duration.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// First result whose status is not `queued`.
    Ready(AnalysisResponse),
    /// A cap was hit; carries the last (queued) result.
    StillQueued(AnalysisResponse),
    /// A newer session started; nothing should be rendered.
    Superseded,
}

impl PollOutcome {
    pub fn into_response(self) -> Option<AnalysisResponse> {
        match self {
            PollOutcome::Ready(analysis) | PollOutcome::StillQueued(analysis) => Some(analysis),
            PollOutcome::Superseded => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    Waiting,
    Fetching,
    Finished,
}

/// Poll loop as an explicit state machine. `step` performs one transition;
/// `run` steps until an outcome is produced.
pub struct Poller<'a, B, C> {
    backend: &'a B,
    clock: &'a C,
    config: &'a PollConfig,
    handle: &'a AnalysisHandle,
    token: &'a SessionToken,
    started: Instant,
    attempts: u32,
    last: Option<AnalysisResponse>,
    state: PollState,
}

impl<'a, B: ScanBackend, C: Clock> Poller<'a, B, C> {
    pub fn new(
        backend: &'a B,
        clock: &'a C,
        config: &'a PollConfig,
        handle: &'a AnalysisHandle,
        token: &'a SessionToken,
    ) -> Poller<'a, B, C> {
        Poller {
            backend,
            clock,
            config,
            handle,
            token,
            started: clock.now(),
            attempts: 0,
            last: None,
            state: PollState::Waiting,
        }
    }

    /// Number of fetches made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_finished(&self) -> bool {
        self.state == PollState::Finished
    }

    pub fn step(&mut self) -> Result<Option<PollOutcome>, ScanError> {
        if self.state == PollState::Finished {
            return Ok(None);
        }
        if !self.token.is_current() {
            info!(analysis_id = %self.handle, session = self.token.id(), "session superseded, polling stopped");
            self.state = PollState::Finished;
            return Ok(Some(PollOutcome::Superseded));
        }

        match self.state {
            PollState::Waiting => {
                if self.cap_reached() {
                    if let Some(last) = self.last.take() {
                        info!(analysis_id = %self.handle, attempts = self.attempts, "poll limit reached, analysis still queued");
                        self.state = PollState::Finished;
                        return Ok(Some(PollOutcome::StillQueued(last)));
                    }
                }
                self.clock.sleep(self.config.interval);
                self.state = PollState::Fetching;
                Ok(None)
            }
            PollState::Fetching => {
                self.state = PollState::Finished;
                let analysis = self.backend.fetch_analysis(self.handle)?;
                self.attempts += 1;
                debug!(analysis_id = %self.handle, attempt = self.attempts, status = ?analysis.status(), "polled analysis");

                if analysis.is_queued() {
                    self.last = Some(analysis);
                    self.state = PollState::Waiting;
                    Ok(None)
                } else {
                    info!(analysis_id = %self.handle, attempts = self.attempts, "analysis finished");
                    Ok(Some(PollOutcome::Ready(analysis)))
                }
            }
            PollState::Finished => Ok(None),
        }
    }

    pub fn run(mut self) -> Result<PollOutcome, ScanError> {
        loop {
            if let Some(outcome) = self.step()? {
                return Ok(outcome);
            }
        }
    }

    fn cap_reached(&self) -> bool {
        if self.attempts == 0 {
            return false;
        }
        if let Some(max_attempts) = self.config.max_attempts {
            if self.attempts >= max_attempts {
                return true;
            }
        }
        if let Some(max_duration) = self.config.max_duration {
            if self.clock.now().duration_since(self.started) >= max_duration {
                return true;
            }
        }
        false
    }
}

/// Polls `handle` until it is no longer queued. See [`Poller`].
pub fn poll_until_ready<B: ScanBackend, C: Clock>(
    backend: &B,
    clock: &C,
    config: &PollConfig,
    handle: &AnalysisHandle,
    token: &SessionToken,
) -> Result<PollOutcome, ScanError> {
    Poller::new(backend, clock, config, handle, token).run()
}

//! Scripted in-memory backend for tests and offline demos.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::backend::{AnalysisHandle, ScanBackend};
use crate::errors::ScanError;
use crate::report::AnalysisResponse;
use crate::submission::Submission;

type FetchHook = Box<dyn Fn(usize) + Send + Sync>;

/// Replays queued answers in order and records every call it receives.
///
/// `submit` answers with `mock-analysis` unless told otherwise. Once the
/// scripted analyses run out, `fetch_analysis` returns the fallback if one is
/// set, and an error otherwise.
pub struct MockBackend {
    submit_results: Mutex<VecDeque<Result<AnalysisHandle, ScanError>>>,
    analysis_results: Mutex<VecDeque<Result<AnalysisResponse, ScanError>>>,
    fallback: Option<AnalysisResponse>,
    submissions: Mutex<Vec<Submission>>,
    fetches: Mutex<Vec<AnalysisHandle>>,
    on_fetch: Option<FetchHook>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockBackend {
    pub fn new() -> MockBackend {
        MockBackend {
            submit_results: Mutex::new(VecDeque::new()),
            analysis_results: Mutex::new(VecDeque::new()),
            fallback: None,
            submissions: Mutex::new(Vec::new()),
            fetches: Mutex::new(Vec::new()),
            on_fetch: None,
        }
    }

    pub fn with_submit_result(self, result: Result<AnalysisHandle, ScanError>) -> MockBackend {
        lock(&self.submit_results).push_back(result);
        self
    }

    pub fn with_analysis(self, analysis: AnalysisResponse) -> MockBackend {
        self.with_analysis_result(Ok(analysis))
    }

    pub fn with_analysis_result(self, result: Result<AnalysisResponse, ScanError>) -> MockBackend {
        lock(&self.analysis_results).push_back(result);
        self
    }

    pub fn with_fallback(mut self, analysis: AnalysisResponse) -> MockBackend {
        self.fallback = Some(analysis);
        self
    }

    /// Runs `hook` with the 1-based fetch number before each fetch is answered.
    pub fn on_fetch(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> MockBackend {
        self.on_fetch = Some(Box::new(hook));
        self
    }

    pub fn submissions(&self) -> Vec<Submission> {
        lock(&self.submissions).clone()
    }

    pub fn submit_count(&self) -> usize {
        lock(&self.submissions).len()
    }

    pub fn fetch_count(&self) -> usize {
        lock(&self.fetches).len()
    }

    pub fn fetched_handles(&self) -> Vec<AnalysisHandle> {
        lock(&self.fetches).clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        MockBackend::new()
    }
}

impl ScanBackend for MockBackend {
    fn submit(&self, submission: &Submission) -> Result<AnalysisHandle, ScanError> {
        lock(&self.submissions).push(submission.clone());
        lock(&self.submit_results)
            .pop_front()
            .unwrap_or_else(|| Ok(AnalysisHandle::new("mock-analysis")))
    }

    fn fetch_analysis(&self, handle: &AnalysisHandle) -> Result<AnalysisResponse, ScanError> {
        let count = {
            let mut fetches = lock(&self.fetches);
            fetches.push(handle.clone());
            fetches.len()
        };
        if let Some(hook) = &self.on_fetch {
            hook(count);
        }

        let scripted = lock(&self.analysis_results).pop_front();
        match (scripted, &self.fallback) {
            (Some(result), _) => result,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(ScanError::malformed(
                format!("mock://analysis/{}", handle),
                "no scripted analysis left",
            )),
        }
    }
}

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::ScanError;
use crate::report::AnalysisResponse;
use crate::submission::Submission;

/// Identifier the backend hands out for a submitted analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisHandle(String);

impl AnalysisHandle {
    pub fn new(id: impl Into<String>) -> AnalysisHandle {
        AnalysisHandle(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnalysisHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two calls the client makes against a scanning service.
pub trait ScanBackend: Send + Sync {
    /// `POST /analyze`
    fn submit(&self, submission: &Submission) -> Result<AnalysisHandle, ScanError>;

    /// `GET /analysis/{id}`
    fn fetch_analysis(&self, handle: &AnalysisHandle) -> Result<AnalysisResponse, ScanError>;
}

impl<B: ScanBackend + ?Sized> ScanBackend for &B {
    fn submit(&self, submission: &Submission) -> Result<AnalysisHandle, ScanError> {
        (**self).submit(submission)
    }

    fn fetch_analysis(&self, handle: &AnalysisHandle) -> Result<AnalysisResponse, ScanError> {
        (**self).fetch_analysis(handle)
    }
}

impl<B: ScanBackend + ?Sized> ScanBackend for Arc<B> {
    fn submit(&self, submission: &Submission) -> Result<AnalysisHandle, ScanError> {
        (**self).submit(submission)
    }

    fn fetch_analysis(&self, handle: &AnalysisHandle) -> Result<AnalysisResponse, ScanError> {
        (**self).fetch_analysis(handle)
    }
}

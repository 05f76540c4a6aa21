//! Result-panel state as a pure function of what just happened.
//!
//! `reduce` never touches output; a [`Renderer`](crate::render::Renderer)
//! receives the state it returns. Each state carries exactly one class, so a
//! new state fully replaces the old one.

use serde::Serialize;

use crate::errors::ScanError;
use crate::report::{AnalysisResponse, ScanSummary, Verdict};

pub const ANALYZING_MESSAGE: &str = "Analyzing...";
pub const STILL_QUEUED_MESSAGE: &str =
    "The analysis is still in progress. Please wait and try again later.";
pub const MISSING_ATTRIBUTES_MESSAGE: &str = "Error: Could not get the analysis attributes.";
pub const MISSING_RESULTS_MESSAGE: &str = "Error: Could not get the engine results.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UiClass {
    Analyzing,
    Info,
    Malicious,
    Safe,
    Error,
}

impl UiClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            UiClass::Analyzing => "analyzing",
            UiClass::Info => "info",
            UiClass::Malicious => "malicious",
            UiClass::Safe => "safe",
            UiClass::Error => "error",
        }
    }
}

impl From<Verdict> for UiClass {
    fn from(verdict: Verdict) -> UiClass {
        match verdict {
            Verdict::Malicious => UiClass::Malicious,
            Verdict::Safe => UiClass::Safe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum UiContent {
    Message(String),
    Summary(ScanSummary),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiState {
    pub class: UiClass,
    pub content: UiContent,
}

impl UiState {
    fn message(class: UiClass, message: impl Into<String>) -> UiState {
        UiState {
            class,
            content: UiContent::Message(message.into()),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            UiContent::Message(message) => Some(message),
            UiContent::Summary(_) => None,
        }
    }

    pub fn summary(&self) -> Option<&ScanSummary> {
        match &self.content {
            UiContent::Summary(summary) => Some(summary),
            UiContent::Message(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.class == UiClass::Error
    }
}

#[derive(Debug, Clone, Copy)]
pub enum UiEvent<'a> {
    /// A submission is about to be sent.
    Submitted,
    /// An analysis result came back, queued or not.
    Analysis(&'a AnalysisResponse),
    /// The session ended with an error.
    Failed(&'a ScanError),
}

pub fn reduce(event: UiEvent<'_>) -> UiState {
    match event {
        UiEvent::Submitted => UiState::message(UiClass::Analyzing, ANALYZING_MESSAGE),
        UiEvent::Failed(err) => UiState::message(UiClass::Error, format!("Error: {}", err)),
        UiEvent::Analysis(analysis) => match analysis.attributes() {
            None => UiState::message(UiClass::Error, MISSING_ATTRIBUTES_MESSAGE),
            Some(attributes) if attributes.is_queued() => {
                UiState::message(UiClass::Info, STILL_QUEUED_MESSAGE)
            }
            Some(attributes) => match ScanSummary::from_attributes(attributes) {
                Some(summary) => UiState {
                    class: summary.verdict().into(),
                    content: UiContent::Summary(summary),
                },
                None => UiState::message(UiClass::Error, MISSING_RESULTS_MESSAGE),
            },
        },
    }
}

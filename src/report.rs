//! Wire types for `GET /analysis/{id}` and the summary derived from them.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The only status the client treats specially.
pub const STATUS_QUEUED: &str = "queued";

/// The only category counted as a detection.
pub const CATEGORY_MALICIOUS: &str = "malicious";

/// Body of `GET /analysis/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub data: AnalysisData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisData {
    #[serde(default)]
    pub attributes: Option<AnalysisAttributes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisAttributes {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    /// Absent (or `null`) while queued; a finished analysis without it has no verdict.
    #[serde(default)]
    pub results: Option<EngineReport>,
}

/// One engine's answer. `result` is `null` for most undetected entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineResult {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub result: Option<String>,
}

impl EngineResult {
    pub fn new(category: impl Into<String>, result: Option<&str>) -> EngineResult {
        EngineResult {
            category: category.into(),
            result: result.map(str::to_string),
        }
    }

    pub fn is_malicious(&self) -> bool {
        self.category == CATEGORY_MALICIOUS
    }
}

/// Engine name to verdict, kept in the order the backend sent them.
///
/// Order only matters for display. A repeated engine name keeps its first
/// position and takes the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineReport {
    entries: Vec<(String, EngineResult)>,
}

impl EngineReport {
    pub fn new() -> EngineReport {
        EngineReport::default()
    }

    pub fn insert(&mut self, engine: impl Into<String>, result: EngineResult) {
        let engine = engine.into();
        match self.entries.iter_mut().find(|(name, _)| *name == engine) {
            Some(entry) => entry.1 = result,
            None => self.entries.push((engine, result)),
        }
    }

    pub fn with(mut self, engine: impl Into<String>, result: EngineResult) -> EngineReport {
        self.insert(engine, result);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EngineResult)> {
        self.entries.iter().map(|(name, result)| (name.as_str(), result))
    }
}

impl Serialize for EngineReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (engine, result) in &self.entries {
            map.serialize_entry(engine, result)?;
        }
        map.end()
    }
}

struct EngineReportVisitor;

impl<'de> Visitor<'de> for EngineReportVisitor {
    type Value = EngineReport;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of engine names to results")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<EngineReport, A::Error> {
        let mut report = EngineReport::new();
        while let Some((engine, result)) = access.next_entry::<String, EngineResult>()? {
            report.insert(engine, result);
        }
        Ok(report)
    }
}

impl<'de> Deserialize<'de> for EngineReport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<EngineReport, D::Error> {
        deserializer.deserialize_map(EngineReportVisitor)
    }
}

impl AnalysisResponse {
    pub fn new(attributes: Option<AnalysisAttributes>) -> AnalysisResponse {
        AnalysisResponse {
            data: AnalysisData { attributes },
        }
    }

    pub fn attributes(&self) -> Option<&AnalysisAttributes> {
        self.data.attributes.as_ref()
    }

    /// Status reported by the backend, if the response carries attributes.
    pub fn status(&self) -> Option<&str> {
        self.attributes().map(|attributes| attributes.status.as_str())
    }

    /// A response without attributes is not queued: polling stops on it.
    pub fn is_queued(&self) -> bool {
        self.status() == Some(STATUS_QUEUED)
    }
}

impl AnalysisAttributes {
    pub fn new(status: impl Into<String>) -> AnalysisAttributes {
        AnalysisAttributes {
            status: status.into(),
            md5: None,
            sha256: None,
            results: None,
        }
    }

    pub fn with_hashes(mut self, md5: impl Into<String>, sha256: impl Into<String>) -> AnalysisAttributes {
        self.md5 = Some(md5.into());
        self.sha256 = Some(sha256.into());
        self
    }

    pub fn with_results(mut self, results: EngineReport) -> AnalysisAttributes {
        self.results = Some(results);
        self
    }

    pub fn is_queued(&self) -> bool {
        self.status == STATUS_QUEUED
    }
}

/// One line of the detected/undetected lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineVerdict {
    pub engine: String,
    pub category: String,
    pub result: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Malicious,
    Safe,
}

/// Derived view of a finished analysis. Never stored, rebuilt per result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub md5: Option<String>,
    pub sha256: Option<String>,
    pub total_engines: usize,
    pub malicious_count: usize,
    pub detected: Vec<EngineVerdict>,
    pub undetected: Vec<EngineVerdict>,
}

impl ScanSummary {
    /// `None` when the backend sent no engine results.
    pub fn from_attributes(attributes: &AnalysisAttributes) -> Option<ScanSummary> {
        let results = attributes.results.as_ref()?;
        let mut detected = Vec::new();
        let mut undetected = Vec::new();

        for (engine, result) in results.iter() {
            let verdict = EngineVerdict {
                engine: engine.to_string(),
                category: result.category.clone(),
                result: result.result.clone(),
            };
            if result.is_malicious() {
                detected.push(verdict);
            } else {
                undetected.push(verdict);
            }
        }

        Some(ScanSummary {
            md5: attributes.md5.clone(),
            sha256: attributes.sha256.clone(),
            total_engines: results.len(),
            malicious_count: detected.len(),
            detected,
            undetected,
        })
    }

    pub fn verdict(&self) -> Verdict {
        if self.malicious_count > 0 {
            Verdict::Malicious
        } else {
            Verdict::Safe
        }
    }

    pub fn ratio_text(&self) -> String {
        format!(
            "{} out of {} engines detected this as malicious.",
            self.malicious_count, self.total_engines
        )
    }
}

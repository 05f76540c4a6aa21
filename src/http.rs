use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use crate::backend::{AnalysisHandle, ScanBackend};
use crate::errors::ScanError;
use crate::report::AnalysisResponse;
use crate::submission::Submission;

pub const DEFAULT_SERVER_ADDR: &str = "http://127.0.0.1:5000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `ScanBackend` speaking JSON over HTTP with a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    server_addr: url::Url,
    http_client: reqwest::blocking::Client,
}

impl HttpBackend {
    pub fn new() -> Result<HttpBackend, ScanError> {
        HttpBackend::new_for_server(DEFAULT_SERVER_ADDR)
    }

    pub fn new_for_server(server_addr: &str) -> Result<HttpBackend, ScanError> {
        HttpBackend::with_timeout(server_addr, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(server_addr: &str, timeout: Duration) -> Result<HttpBackend, ScanError> {
        let server_addr_parsed = url::Url::parse(server_addr)?;
        let scheme = server_addr_parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ScanError::BadScheme {
                scheme: scheme.to_string(),
            });
        }

        let http_client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("scan-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpBackend {
            server_addr: server_addr_parsed,
            http_client,
        })
    }

    pub fn submission_url(&self) -> Result<url::Url, ScanError> {
        Ok(self.server_addr.join("/analyze")?)
    }

    /// `/analysis/{id}`, with the id percent-encoded as one path segment.
    pub fn analysis_url(&self, handle: &AnalysisHandle) -> Result<url::Url, ScanError> {
        let mut endpoint_url = self.server_addr.join("/analysis/")?;
        endpoint_url
            .path_segments_mut()
            .map_err(|_| ScanError::BadScheme {
                scheme: self.server_addr.scheme().to_string(),
            })?
            .pop_if_empty()
            .push(handle.as_str());
        Ok(endpoint_url)
    }

    fn send_analysis_request(
        &self,
        endpoint_url: url::Url,
        form: Form,
    ) -> Result<AnalysisHandle, ScanError> {
        #[derive(Deserialize)]
        struct ServerResponse {
            data: Option<ServerResponseData>,
        }

        #[derive(Deserialize)]
        struct ServerResponseData {
            id: Option<serde_json::Value>,
        }

        let resp = self
            .http_client
            .post(endpoint_url.clone())
            .multipart(form)
            .send()?;

        let resp_status = resp.status();
        if !resp_status.is_success() {
            return Err(ScanError::http(endpoint_url, resp_status.as_u16()));
        }

        let resp_body_bytes = resp.bytes()?;
        let resp_data: ServerResponse = serde_json::from_slice(&resp_body_bytes)
            .map_err(|e| ScanError::malformed(endpoint_url.as_str(), e.to_string()))?;

        match resp_data.data.and_then(|data| data.id) {
            Some(serde_json::Value::String(id)) => Ok(AnalysisHandle::new(id)),
            Some(serde_json::Value::Number(id)) => Ok(AnalysisHandle::new(id.to_string())),
            _ => Err(ScanError::malformed(
                endpoint_url,
                "missing data.id in server response",
            )),
        }
    }
}

impl ScanBackend for HttpBackend {
    fn submit(&self, submission: &Submission) -> Result<AnalysisHandle, ScanError> {
        let endpoint_url = self.submission_url()?;
        let form = match submission {
            Submission::File(file) => Form::new().part(
                submission.field_name(),
                Part::bytes(file.bytes.clone()).file_name(file.filename.clone()),
            ),
            Submission::Url(url) => Form::new().text(submission.field_name(), url.clone()),
        };

        debug!(endpoint = %endpoint_url, submission = %submission.describe(), "submitting for analysis");
        let handle = self.send_analysis_request(endpoint_url, form)?;
        info!(analysis_id = %handle, "analysis accepted");
        Ok(handle)
    }

    fn fetch_analysis(&self, handle: &AnalysisHandle) -> Result<AnalysisResponse, ScanError> {
        let endpoint_url = self.analysis_url(handle)?;
        let resp = self.http_client.get(endpoint_url.clone()).send()?;

        let resp_status = resp.status();
        if !resp_status.is_success() {
            return Err(ScanError::http(endpoint_url, resp_status.as_u16()));
        }

        let resp_body_bytes = resp.bytes()?;
        let analysis: AnalysisResponse = serde_json::from_slice(&resp_body_bytes)
            .map_err(|e| ScanError::malformed(endpoint_url.as_str(), e.to_string()))?;
        debug!(analysis_id = %handle, status = ?analysis.status(), "fetched analysis");
        Ok(analysis)
    }
}

//! Report field extraction.
//!
//! Extraction is best-effort enrichment: an uploaded report is stored whether or not the
//! extractor succeeds. The trait keeps the vendor behind a seam; [`HttpExtractor`] talks to any
//! service that accepts the JSON request below and answers with [`ExtractedData`].
//!
//! Request body:
//! ```json
//! {"filename": "cbc.pdf", "contentType": "application/pdf", "data": "<base64>"}
//! ```

use crate::config::ExtractionConfig;
use crate::models::ExtractedData;
use crate::{HospitalError, HospitalResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;

/// Bytes and metadata handed to an extractor.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionInput<'a> {
    pub filename: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

/// Pulls structured fields out of a report. Implementations may block.
pub trait ReportExtractor: Send + Sync {
    fn extract(&self, input: ExtractionInput<'_>) -> HospitalResult<ExtractedData>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractionRequest<'a> {
    filename: &'a str,
    content_type: &'a str,
    data: String,
}

/// Extraction over HTTP with a bearer key and a request timeout.
///
/// Uses the blocking `reqwest` client; construct and call it from a blocking context
/// (`tokio::task::spawn_blocking`), never directly on an async worker.
pub struct HttpExtractor {
    endpoint: String,
    api_key: Option<String>,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl HttpExtractor {
    pub fn new(cfg: ExtractionConfig) -> HospitalResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| HospitalError::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: cfg.endpoint,
            api_key: cfg.api_key,
            timeout_secs: cfg.timeout.as_secs(),
            client,
        })
    }
}

impl ReportExtractor for HttpExtractor {
    fn extract(&self, input: ExtractionInput<'_>) -> HospitalResult<ExtractedData> {
        let body = ExtractionRequest {
            filename: input.filename,
            content_type: input.content_type,
            data: STANDARD.encode(input.bytes),
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                HospitalError::Extraction(format!("request timed out after {}s", self.timeout_secs))
            } else if e.is_connect() {
                HospitalError::Extraction("could not connect to extraction service".into())
            } else {
                HospitalError::Extraction(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HospitalError::Extraction(format!(
                "extraction service returned HTTP {}",
                status.as_u16()
            )));
        }

        response
            .json::<ExtractedData>()
            .map_err(|e| HospitalError::Extraction(format!("unreadable extraction response: {e}")))
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed result and counts calls.
    pub struct FakeExtractor {
        pub result: Result<ExtractedData, String>,
        pub calls: AtomicUsize,
    }

    impl FakeExtractor {
        pub fn ok(data: ExtractedData) -> Self {
            Self {
                result: Ok(data),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                result: Err(message.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ReportExtractor for FakeExtractor {
        fn extract(&self, _input: ExtractionInput<'_>) -> HospitalResult<ExtractedData> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(HospitalError::Extraction)
        }
    }
}

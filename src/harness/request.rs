use std::error::Error as _;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use thiserror::Error;

use crate::harness::config::{HarnessConfig, IsolationLevel};
use crate::harness::gate::StartGate;
use crate::harness::results::ResultLog;

/// Longest response body kept in a result line before it is cut.
const BODY_PREVIEW_CHARS: usize = 50;

/// Characters escaped in the `iso` query value.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>');

#[derive(Error, Debug)]
pub(crate) enum RequestError {
    #[error("request timed out: {}", with_causes(.0))]
    Timeout(reqwest::Error),

    #[error("{}", with_causes(.0))]
    Http(reqwest::Error),

    #[error("unable to build HTTP client: {0}")]
    Client(reqwest::Error),
}

impl From<reqwest::Error> for RequestError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            RequestError::Timeout(error)
        } else {
            RequestError::Http(error)
        }
    }
}

/// Renders `error` followed by every underlying cause, e.g. the refused connection behind a
/// failed send.
fn with_causes(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.ends_with(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Put => f.write_str("PUT"),
        }
    }
}

/// Percent-encodes an isolation level for the `iso` query parameter.
pub(crate) fn encode_level(level: IsolationLevel) -> String {
    utf8_percent_encode(level.label(), QUERY_VALUE).to_string()
}

/// Cuts `body` to its first 50 characters, marking the cut with `...`.
pub(crate) fn preview_body(body: &str) -> String {
    match body.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Formats the observation for one completed request.
pub(crate) fn format_result(elapsed: Duration, status: StatusCode, body: &str) -> String {
    format!(
        "[{} ms] Status {} | {}",
        elapsed.as_millis(),
        status.as_u16(),
        preview_body(body)
    )
}

/// The user record under test, reachable through a shared blocking client.
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    client: Client,
    base_url: String,
    target_id: u32,
}

impl Endpoint {
    pub(crate) fn new(config: &HarnessConfig) -> Result<Self, RequestError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(&config.user_agent)
            .tcp_nodelay(true)
            .build()
            .map_err(RequestError::Client)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            target_id: config.target_id,
        })
    }

    pub(crate) fn url(&self, level: IsolationLevel) -> String {
        format!(
            "{}/{}?iso={}",
            self.base_url,
            self.target_id,
            encode_level(level)
        )
    }

    /// Sends one request and returns its formatted observation.
    ///
    /// Timing covers sending the request and reading the whole body. Any status code counts as a
    /// result; only transport failures and timeouts are errors.
    pub(crate) fn send(
        &self,
        method: Method,
        payload: Option<&str>,
        level: IsolationLevel,
    ) -> Result<String, RequestError> {
        let url = self.url(level);
        let request = match method {
            Method::Put => self
                .client
                .put(&url)
                .header(CONTENT_TYPE, "application/json")
                // Payload goes in verbatim.
                .body(format!("{{\"country\":\"{}\"}}", payload.unwrap_or_default())),
            Method::Get => self.client.get(&url),
        };

        trace!("Dispatching {} {}", method, url);
        let start = Instant::now();
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;
        let elapsed = start.elapsed();
        trace!("{} {} answered {} in {:?}", method, url, status, elapsed);

        Ok(format_result(elapsed, status, &body))
    }
}

/// What one task observed, kept so the driver can account for every task it joined.
#[derive(Debug)]
pub(crate) struct TaskOutcome {
    pub(crate) actor: String,
    pub(crate) result: Result<String, RequestError>,
}

/// A single simulated user's request.
#[derive(Debug, Clone)]
pub(crate) struct RequestTask {
    actor: String,
    method: Method,
    payload: Option<String>,
    level: IsolationLevel,
    gate: Arc<StartGate>,
}

impl RequestTask {
    pub(crate) fn get(actor: &str, level: IsolationLevel, gate: &Arc<StartGate>) -> Self {
        Self {
            actor: actor.to_string(),
            method: Method::Get,
            payload: None,
            level,
            gate: Arc::clone(gate),
        }
    }

    pub(crate) fn put(
        actor: &str,
        payload: &str,
        level: IsolationLevel,
        gate: &Arc<StartGate>,
    ) -> Self {
        Self {
            actor: actor.to_string(),
            method: Method::Put,
            payload: Some(payload.to_string()),
            level,
            gate: Arc::clone(gate),
        }
    }

    pub(crate) fn actor(&self) -> &str {
        &self.actor
    }

    /// Waits for the start gate, sends the request and logs what happened.
    pub(crate) fn run(self, endpoint: &Endpoint, log: &ResultLog) -> TaskOutcome {
        self.gate.wait();

        let result = endpoint.send(self.method, self.payload.as_deref(), self.level);
        match &result {
            Ok(observation) => log.line(&format!("   {} Finished: {}", self.actor, observation)),
            Err(e) => log.line(&format!("   {} Failed: {}", self.actor, e)),
        }

        TaskOutcome {
            actor: self.actor,
            result,
        }
    }
}

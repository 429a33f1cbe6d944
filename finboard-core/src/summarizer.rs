//! Narrative summaries from a hosted text agent.
//!
//! The agent is reached only through the [`Summarizer`] trait. Responses are
//! streamed as chunks; a failure mid-stream keeps whatever text had already
//! arrived in [`SummaryError::Interrupted`].

use crate::domain::{Fundamentals, NOT_AVAILABLE};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::io::BufRead;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("summarizer unavailable: {0}")]
    Unavailable(String),

    #[error("summarizer timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("summary interrupted after {} characters: {reason}", .partial.len())]
    Interrupted { partial: String, reason: String },

    #[error("provider error: {0}")]
    Provider(String),
}

impl SummaryError {
    /// Text received before the failure, if any.
    pub fn partial(&self) -> Option<&str> {
        match self {
            SummaryError::Interrupted { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

/// Opaque conversation identifier passed to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait Summarizer: Send + Sync {
    fn summarize(&self, session: &SessionId, prompt: &str) -> Result<String, SummaryError>;
}

/// Concatenate streamed chunks, preserving partial text on a provider error.
pub fn assemble_chunks<I, E>(chunks: I) -> Result<String, SummaryError>
where
    I: IntoIterator<Item = Result<String, E>>,
    E: fmt::Display,
{
    let mut text = String::new();
    for chunk in chunks {
        match chunk {
            Ok(c) => text.push_str(&c),
            Err(e) => {
                return Err(SummaryError::Interrupted {
                    partial: text,
                    reason: e.to_string(),
                })
            }
        }
    }
    Ok(text)
}

#[derive(Serialize)]
struct AgentRequest<'a> {
    session_id: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct AgentLine {
    chunk: Option<String>,
    error: Option<String>,
}

/// Agent behind a plain HTTP endpoint.
///
/// `POST {endpoint}` with `{"session_id", "prompt"}`; the body is
/// newline-delimited JSON objects, each `{"chunk": ".."}` or `{"error": ".."}`.
pub struct HttpSummarizer {
    client: reqwest::blocking::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpSummarizer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SummaryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SummaryError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> SummaryError {
        if e.is_timeout() {
            SummaryError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            SummaryError::Unavailable(e.to_string())
        }
    }
}

/// Decode an NDJSON agent stream into chunk results.
pub fn decode_stream(reader: impl BufRead) -> impl Iterator<Item = Result<String, String>> {
    reader.lines().filter_map(|line| {
        let line = match line {
            Ok(l) => l,
            Err(e) => return Some(Err(e.to_string())),
        };
        if line.trim().is_empty() {
            return None;
        }
        match serde_json::from_str::<AgentLine>(&line) {
            Ok(AgentLine { error: Some(e), .. }) => Some(Err(e)),
            Ok(AgentLine { chunk: Some(c), .. }) => Some(Ok(c)),
            Ok(_) => None,
            Err(e) => Some(Err(format!("malformed stream line: {e}"))),
        }
    })
}

impl Summarizer for HttpSummarizer {
    fn summarize(&self, session: &SessionId, prompt: &str) -> Result<String, SummaryError> {
        tracing::info!(session = %session, chars = prompt.len(), "invoking summarizer");
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&AgentRequest {
                session_id: session.as_str(),
                prompt,
            })
            .send()
            .map_err(|e| self.transport_error(e))?;

        if !resp.status().is_success() {
            return Err(SummaryError::Provider(format!("HTTP {}", resp.status())));
        }

        let text = assemble_chunks(decode_stream(std::io::BufReader::new(resp)))?;
        tracing::debug!(session = %session, chars = text.len(), "summary received");
        Ok(text)
    }
}

fn or_na<T: fmt::Display>(v: &Option<T>) -> String {
    v.as_ref().map_or_else(|| NOT_AVAILABLE.to_string(), |x| x.to_string())
}

/// Governance and board analysis prompt for one or more companies.
pub fn insights_prompt(companies: &[Fundamentals]) -> String {
    let mut p = String::from(
        "Provide summary of the following information. Be brief and concise. \
         I want you to also analyse the gender equity, salaries and age of the board. \
         Work with bullet points and line breaks.\n",
    );
    for f in companies {
        let _ = write!(
            p,
            "\nCompany: {}\n- Industry: {}\n- Business Summary: {}\n\
             - Full-Time Employees: {}\n- Key Officers:\n",
            f.symbol,
            or_na(&f.industry),
            or_na(&f.business_summary),
            or_na(&f.full_time_employees),
        );
        for o in &f.officers {
            let _ = writeln!(
                p,
                "  - Name: {}, Age: {}, Title: {}, Total Pay: {}",
                or_na(&o.name),
                or_na(&o.age),
                or_na(&o.title),
                or_na(&o.total_pay),
            );
        }
        let r = &f.risk;
        let _ = write!(
            p,
            "- Audit Risk: {}\n- Board Risk: {}\n- Compensation Risk: {}\n\
             - Shareholder Rights Risk: {}\n- Overall Risk: {}\n\
             - Held by Insiders: {}\n- Held by Institutions: {}\n",
            or_na(&r.audit),
            or_na(&r.board),
            or_na(&r.compensation),
            or_na(&r.shareholder_rights),
            or_na(&r.overall),
            or_na(&f.held_percent_insiders),
            or_na(&f.held_percent_institutions),
        );
    }
    if companies.len() > 1 {
        p.push_str("\nConclude with an overall comparison of the companies listed.");
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Officer;

    #[test]
    fn assemble_concatenates() {
        let chunks: Vec<Result<String, String>> = vec![Ok("Hello, ".into()), Ok("world".into())];
        assert_eq!(assemble_chunks(chunks).unwrap(), "Hello, world");
    }

    #[test]
    fn interruption_keeps_partial_text() {
        let chunks: Vec<Result<String, String>> = vec![
            Ok("First part. ".into()),
            Err("throttled".into()),
            Ok("never seen".into()),
        ];
        let err = assemble_chunks(chunks).unwrap_err();
        assert_eq!(err.partial(), Some("First part. "));
        assert!(err.to_string().contains("throttled"));
    }

    #[test]
    fn decode_ndjson_stream() {
        let body = "{\"chunk\":\"a\"}\n\n{\"chunk\":\"b\"}\n{\"error\":\"boom\"}\n";
        let out: Vec<_> = decode_stream(body.as_bytes()).collect();
        assert_eq!(out, vec![Ok("a".to_string()), Ok("b".to_string()), Err("boom".to_string())]);
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn prompt_lists_officers_and_na() {
        let mut f = Fundamentals::empty("TD.TO");
        f.industry = Some("Banks".into());
        f.officers = vec![Officer {
            name: Some("Jane Roe".into()),
            age: Some(55),
            ..Officer::default()
        }];
        let p = insights_prompt(&[f.clone()]);
        assert!(p.contains("Company: TD.TO"));
        assert!(p.contains("- Industry: Banks"));
        assert!(p.contains("Name: Jane Roe, Age: 55, Title: N/A"));
        assert!(p.contains("- Board Risk: N/A"));
        assert!(!p.contains("overall comparison"));

        let two = insights_prompt(&[f.clone(), Fundamentals::empty("RY.TO")]);
        assert!(two.ends_with("Conclude with an overall comparison of the companies listed."));
    }
}

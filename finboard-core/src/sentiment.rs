//! Public-opinion sentiment scoring.
//!
//! Snippets of public text about a company are classified one by one into a
//! [`Polarity`] and tallied. The scalar score is a placeholder heuristic:
//!
//! `score = (positive / total + ((neutral + mixed) / total) / 2) * 100`
//!
//! which is 0 when no snippets were retrieved.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MAX_SNIPPETS: usize = 30;

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("snippet source failed for '{company}': {reason}")]
    Source { company: String, reason: String },

    #[error("classifier failed: {0}")]
    Classifier(String),

    #[error("HTTP client setup failed: {0}")]
    Client(String),

    #[error("unknown polarity label '{0}'")]
    UnknownLabel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl FromStr for Polarity {
    type Err = SentimentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" => Ok(Polarity::Positive),
            "NEGATIVE" => Ok(Polarity::Negative),
            "NEUTRAL" => Ok(Polarity::Neutral),
            "MIXED" => Ok(Polarity::Mixed),
            _ => Err(SentimentError::UnknownLabel(s.to_string())),
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Polarity::Positive => "POSITIVE",
            Polarity::Negative => "NEGATIVE",
            Polarity::Neutral => "NEUTRAL",
            Polarity::Mixed => "MIXED",
        })
    }
}

/// Text -> polarity.
pub trait SentimentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Polarity, SentimentError>;
}

/// Company name -> short public text snippets.
pub trait SnippetSource: Send + Sync {
    fn snippets(&self, company: &str, limit: usize) -> Result<Vec<String>, SentimentError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentTally {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub mixed: usize,
}

impl SentimentTally {
    pub fn record(&mut self, p: Polarity) {
        match p {
            Polarity::Positive => self.positive += 1,
            Polarity::Negative => self.negative += 1,
            Polarity::Neutral => self.neutral += 1,
            Polarity::Mixed => self.mixed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral + self.mixed
    }

    /// Score in [0, 100]; 0 when the tally is empty.
    pub fn score(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let t = total as f64;
        (self.positive as f64 / t + ((self.neutral + self.mixed) as f64 / t) / 2.0) * 100.0
    }

    /// Position on a negative (0) .. positive (1) axis; 0.5 when undecided.
    pub fn opinion_cursor(&self) -> f64 {
        let total = self.total();
        if self.positive + self.negative == 0 {
            return 0.5;
        }
        let t = total as f64;
        let pos = self.positive as f64 / t;
        let neg = self.negative as f64 / t;
        if pos > neg {
            0.5 + pos / 2.0
        } else {
            0.5 - neg / 2.0
        }
    }
}

impl FromIterator<Polarity> for SentimentTally {
    fn from_iter<I: IntoIterator<Item = Polarity>>(iter: I) -> Self {
        let mut t = Self::default();
        for p in iter {
            t.record(p);
        }
        t
    }
}

/// Classify at most `max` snippets. A classifier error fails the whole batch.
pub fn score_snippets(
    snippets: &[String],
    classifier: &dyn SentimentClassifier,
    max: usize,
) -> Result<SentimentTally, SentimentError> {
    snippets
        .iter()
        .take(max)
        .map(|s| classifier.classify(s))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySentiment {
    pub company: String,
    pub tally: SentimentTally,
    pub score: f64,
    pub cursor: f64,
}

impl CompanySentiment {
    pub fn from_tally(company: &str, tally: SentimentTally) -> Self {
        Self {
            company: company.to_string(),
            score: tally.score(),
            cursor: tally.opinion_cursor(),
            tally,
        }
    }
}

pub fn analyze_company(
    company: &str,
    source: &dyn SnippetSource,
    classifier: &dyn SentimentClassifier,
    max: usize,
) -> Result<CompanySentiment, SentimentError> {
    let snippets = source.snippets(company, max)?;
    let tally = score_snippets(&snippets, classifier, max)?;
    tracing::debug!(company, snippets = tally.total(), score = tally.score(), "sentiment scored");
    Ok(CompanySentiment::from_tally(company, tally))
}

/// Result for one company in a ranking; failures stay scoped to that company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RankedSentiment {
    Scored(CompanySentiment),
    Failed { company: String, error: String },
}

impl RankedSentiment {
    fn score(&self) -> f64 {
        match self {
            RankedSentiment::Scored(c) => c.score,
            RankedSentiment::Failed { .. } => f64::NEG_INFINITY,
        }
    }
}

/// Score every company and sort by descending score. Failed companies sort last.
pub fn rank_companies(
    companies: &[String],
    source: &dyn SnippetSource,
    classifier: &dyn SentimentClassifier,
    max: usize,
) -> Vec<RankedSentiment> {
    let mut out: Vec<RankedSentiment> = companies
        .iter()
        .map(|c| match analyze_company(c, source, classifier, max) {
            Ok(s) => RankedSentiment::Scored(s),
            Err(e) => {
                tracing::warn!(company = %c, error = %e, "sentiment failed");
                RankedSentiment::Failed {
                    company: c.clone(),
                    error: e.to_string(),
                }
            }
        })
        .collect();
    out.sort_by(|a, b| b.score().total_cmp(&a.score()));
    out
}

/// Offline word-list classifier.
#[derive(Debug, Clone)]
pub struct LexiconClassifier {
    positive: Vec<&'static str>,
    negative: Vec<&'static str>,
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self {
            positive: vec![
                "gain", "gains", "growth", "strong", "beat", "beats", "record", "profit",
                "profits", "up", "bullish", "upgrade", "outperform", "rally", "love", "great",
                "good", "excellent", "positive", "rise", "rises", "surge",
            ],
            negative: vec![
                "loss", "losses", "weak", "miss", "misses", "down", "bearish", "downgrade",
                "underperform", "lawsuit", "layoffs", "fall", "falls", "drop", "drops", "bad",
                "poor", "negative", "decline", "plunge", "hate", "scandal",
            ],
        }
    }
}

impl SentimentClassifier for LexiconClassifier {
    fn classify(&self, text: &str) -> Result<Polarity, SentimentError> {
        let (mut pos, mut neg) = (0usize, 0usize);
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let w = word.to_lowercase();
            if self.positive.contains(&w.as_str()) {
                pos += 1;
            } else if self.negative.contains(&w.as_str()) {
                neg += 1;
            }
        }
        Ok(match (pos, neg) {
            (0, 0) => Polarity::Neutral,
            (_, 0) => Polarity::Positive,
            (0, _) => Polarity::Negative,
            _ => Polarity::Mixed,
        })
    }
}

/// Snippets stored one per line in `{dir}/{company}.txt`.
#[derive(Debug, Clone)]
pub struct FileSnippetSource {
    dir: PathBuf,
}

impl FileSnippetSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, company: &str) -> PathBuf {
        let stem: String = company
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{stem}.txt"))
    }
}

impl SnippetSource for FileSnippetSource {
    fn snippets(&self, company: &str, limit: usize) -> Result<Vec<String>, SentimentError> {
        let path = self.path_for(company);
        let content = std::fs::read_to_string(&path).map_err(|e| SentimentError::Source {
            company: company.to_string(),
            reason: format!("{}: {e}", path.display()),
        })?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(limit)
            .map(str::to_string)
            .collect())
    }
}

/// Snippets from a JSON endpoint: `GET {endpoint}?q={company}&limit={n}`
/// answering either `["..", ..]` or `{"snippets": ["..", ..]}`.
pub struct HttpSnippetSource {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpSnippetSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SentimentError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SentimentError::Client(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnippetPayload {
    Bare(Vec<String>),
    Wrapped { snippets: Vec<String> },
}

impl SnippetSource for HttpSnippetSource {
    fn snippets(&self, company: &str, limit: usize) -> Result<Vec<String>, SentimentError> {
        let fail = |reason: String| SentimentError::Source {
            company: company.to_string(),
            reason,
        };
        let limit_s = limit.to_string();
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", company), ("limit", limit_s.as_str())])
            .send()
            .map_err(|e| fail(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(fail(format!("HTTP {}", resp.status())));
        }
        let payload: SnippetPayload = resp.json().map_err(|e| fail(e.to_string()))?;
        let mut snippets = match payload {
            SnippetPayload::Bare(v) | SnippetPayload::Wrapped { snippets: v } => v,
        };
        snippets.truncate(limit);
        Ok(snippets)
    }
}

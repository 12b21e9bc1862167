//! The think/answer reasoning protocol.
//!
//! Agents running under the protocol wrap their deliberation in
//! `<think>…</think>` and their output in `<answer>…</answer>`. Parsing never
//! fails: missing tags degrade to [`ReasoningResponse::Unstructured`] or
//! [`ReasoningResponse::Partial`], and only a fully tagged response earns
//! the format reward.

use regex_lite::Regex;
use std::sync::LazyLock;

static THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>(.*?)</think>").expect("static think pattern"));

static ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<answer>(.*?)</answer>").expect("static answer pattern"));

/// A parsed agent response.
#[derive(Debug, Clone, PartialEq)]
pub enum ReasoningResponse {
    /// No `<answer>` block: the whole trimmed response is the answer.
    Unstructured {
        /// Deliberation, if a `<think>` block was present anyway.
        think: Option<String>,
        answer: String,
    },
    /// An `<answer>` block without a `<think>` block.
    Partial { answer: String },
    /// Both blocks present.
    Structured { think: String, answer: String },
}

impl ReasoningResponse {
    /// Parse a raw backend response. The first match of each tag wins.
    pub fn parse(raw: &str) -> Self {
        let think = capture(&THINK_RE, raw);
        let answer = capture(&ANSWER_RE, raw);

        match (think, answer) {
            (Some(think), Some(answer)) => Self::Structured { think, answer },
            (None, Some(answer)) => Self::Partial { answer },
            (think, None) => Self::Unstructured {
                think,
                answer: raw.trim().to_string(),
            },
        }
    }

    /// The text passed downstream.
    pub fn answer(&self) -> &str {
        match self {
            Self::Unstructured { answer, .. }
            | Self::Partial { answer }
            | Self::Structured { answer, .. } => answer,
        }
    }

    /// The deliberation text, empty when absent.
    pub fn think(&self) -> &str {
        match self {
            Self::Structured { think, .. } => think.as_str(),
            Self::Unstructured { think: Some(think), .. } => think.as_str(),
            _ => "",
        }
    }

    pub fn has_think(&self) -> bool {
        match self {
            Self::Structured { .. } => true,
            Self::Unstructured { think, .. } => think.is_some(),
            Self::Partial { .. } => false,
        }
    }

    /// 1.0 when both blocks are present, otherwise 0.0.
    pub fn format_reward(&self) -> f64 {
        match self {
            Self::Structured { .. } => 1.0,
            _ => 0.0,
        }
    }

    /// The first `max_chars` characters of the think text followed by "...".
    pub fn think_preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.think().chars().take(max_chars).collect();
        preview.push_str("...");
        preview
    }
}

fn capture(re: &Regex, raw: &str) -> Option<String> {
    re.captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Arithmetic mean of format rewards; 0.0 for no rewards.
pub fn aggregate_adherence(rewards: &[f64]) -> f64 {
    if rewards.is_empty() {
        return 0.0;
    }
    rewards.iter().sum::<f64>() / rewards.len() as f64
}

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

const SNIPPET_MAX_CHARS: usize = 200;

/// Which documentation-service call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Search,
    Detail,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Search => f.write_str("search"),
            Stage::Detail => f.write_str("content detail"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("{stage} request failed")]
    Transport {
        stage: Stage,
        #[source]
        source: reqwest::Error,
    },

    #[error("{stage} returned {status} for {url}")]
    Status {
        stage: Stage,
        status: StatusCode,
        url: String,
        snippet: String,
    },

    #[error("{stage} response could not be decoded")]
    Decode {
        stage: Stage,
        #[source]
        source: reqwest::Error,
    },
}

impl RetrievalError {
    /// Timeouts cover the body read too, so they can surface as decode errors.
    pub fn is_timeout(&self) -> bool {
        match self {
            RetrievalError::Transport { source, .. } | RetrievalError::Decode { source, .. } => {
                source.is_timeout()
            }
            RetrievalError::Status { .. } => false,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            RetrievalError::Transport { stage, .. }
            | RetrievalError::Status { stage, .. }
            | RetrievalError::Decode { stage, .. } => *stage,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("completion request failed")]
    Transport(#[from] reqwest::Error),

    #[error("completion API returned {status}: {snippet}")]
    Status { status: StatusCode, snippet: String },

    #[error("completion response could not be decoded")]
    Decode(#[source] reqwest::Error),

    #[error("completion response contained no choices")]
    EmptyChoices,
}

impl GenerationError {
    pub fn is_timeout(&self) -> bool {
        match self {
            GenerationError::Transport(e) | GenerationError::Decode(e) => e.is_timeout(),
            GenerationError::Status { .. } | GenerationError::EmptyChoices => false,
        }
    }
}

/// Bounded, single-line excerpt of an upstream body for server-side logs.
pub fn make_snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > SNIPPET_MAX_CHARS {
        let cut: String = flat.chars().take(SNIPPET_MAX_CHARS).collect();
        format!("{cut}...")
    } else {
        flat
    }
}

#[test]
fn test_make_snippet() {
    assert_eq!(make_snippet("  a\n  b\tc "), "a b c");

    let long = "x".repeat(500);
    let snippet = make_snippet(&long);
    assert_eq!(snippet.chars().count(), SNIPPET_MAX_CHARS + 3);
    assert!(snippet.ends_with("..."));

    // multi-byte chars are never split
    let accents = "ção ".repeat(100);
    assert!(make_snippet(&accents).ends_with("..."));
}

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, ThreadviewError};

static THREAD_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^thread_[0-9A-Za-z]+$").expect("valid regex"));
static PLATFORM_THREAD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://platform\.openai\.com(?:/.*)?(?:[?&]thread=|/threads/)(thread_[0-9A-Za-z]+)(?:[/?&#].*)?$")
        .expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn parse(input: &str) -> Result<Self> {
        input.parse()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ThreadId {
    type Err = ThreadviewError;

    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim();

        // Accepted forms:
        // 1) thread_<id>
        // 2) openai://thread_<id> or openai://threads/thread_<id>
        // 3) a platform.openai.com URL carrying ?thread=<id> or /threads/<id>
        let candidate = if let Some(target) = trimmed.strip_prefix("openai://") {
            target.strip_prefix("threads/").unwrap_or(target)
        } else if let Some(captures) = PLATFORM_THREAD_RE.captures(trimmed) {
            captures.get(1).map_or(trimmed, |id| id.as_str())
        } else {
            trimmed
        };

        if !THREAD_ID_RE.is_match(candidate) {
            return Err(ThreadviewError::InvalidThreadId(input.to_string()));
        }

        Ok(Self(candidate.to_string()))
    }
}

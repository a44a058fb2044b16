//! Heuristic source language detection
//!
//! Checks run in a fixed order and the first match wins: markup is checked
//! before Python, Python before JavaScript, JavaScript before CSS.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static HTML_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<html|<!DOCTYPE html|<body|<head|<div|<span|<p|<a").unwrap()
});

static PYTHON_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)def\s+\w+\s*\(|import\s+\w+|from\s+\w+\s+import|if\s+__name__\s*==\s*(?:'__main__'|"__main__"):|class\s+\w+"#,
    )
    .unwrap()
});

static JAVASCRIPT_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)function\s+\w+\s*\(|const\s+\w+\s*=|let\s+\w+\s*=|var\s+\w+\s*=|document\.|window\.|console\.|new Promise",
    )
    .unwrap()
});

static CSS_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{\s*[\w-]+\s*:\s*[^;]+;\s*\}|@media|@keyframes|#[\w-]+\s*\{").unwrap()
});

/// Coarse language tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Html,
    Python,
    JavaScript,
    Css,
    Text,
}

impl Language {
    /// Tag sent to the execution endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Html => "html",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Css => "css",
            Language::Text => "text",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True if the text contains an HTML tag opening such as `<div` or `<body`
pub fn looks_like_html(text: &str) -> bool {
    HTML_MARKERS.is_match(text)
}

/// Classify raw text into a coarse language tag
pub fn detect_language(code: &str) -> Language {
    if code.is_empty() {
        return Language::Text;
    }
    if looks_like_html(code) {
        Language::Html
    } else if PYTHON_MARKERS.is_match(code) {
        Language::Python
    } else if JAVASCRIPT_MARKERS.is_match(code) {
        Language::JavaScript
    } else if CSS_MARKERS.is_match(code) {
        Language::Css
    } else {
        Language::Text
    }
}

//! Code-block extraction from LLM responses
//!
//! Responses are free-form markdown. The extractor pulls out the first
//! fenced block of each kind (html/markup, css, javascript/js, any) and, for
//! HTML, lifts inline `<style>`/`<script>` contents when no dedicated CSS or
//! JS block was given. Repeated blocks of the same kind are not aggregated.

use crate::language::{looks_like_html, Language};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static HTML_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```(?:html|markup)\n(.*?)\n```").unwrap());
static CSS_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```css\n(.*?)\n```").unwrap());
static JS_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```(?:javascript|js)\n(.*?)\n```").unwrap());
static ANY_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```([a-z]*)\n(.*?)\n```").unwrap());
static STYLE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style>(.*?)</style>").unwrap());
static SCRIPT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script>(.*?)</script>").unwrap());

/// Code fragments found in one response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodeBundle {
    pub html_code: String,
    pub css_code: String,
    pub js_code: String,
    /// Body of the first fenced block of any language, untrimmed
    pub original_code: String,
    /// Declared language of the first fenced block, `html` when the bundle
    /// was classified as markup, `text` when nothing was declared
    pub language: String,
}

impl CodeBundle {
    /// True if neither HTML nor a generic block was found
    pub fn is_empty(&self) -> bool {
        self.html_code.is_empty() && self.original_code.is_empty()
    }

    /// True if HTML comes with separate CSS or JS that must be spliced in
    pub fn is_multi_file(&self) -> bool {
        !self.html_code.is_empty() && (!self.css_code.is_empty() || !self.js_code.is_empty())
    }

    /// True if the bundle carries no declared language
    pub fn language_undeclared(&self) -> bool {
        self.language.is_empty() || self.language == Language::Text.as_str()
    }
}

fn first_capture(re: &Regex, text: &str, group: usize) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(group))
        .map(|m| m.as_str().to_string())
}

/// Extract HTML, CSS and JavaScript fragments from a response
pub fn extract_code_blocks(response: &str) -> CodeBundle {
    if response.is_empty() {
        return CodeBundle {
            language: Language::Text.as_str().to_string(),
            ..Default::default()
        };
    }

    let mut bundle = CodeBundle {
        html_code: first_capture(&HTML_BLOCK, response, 1)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        css_code: first_capture(&CSS_BLOCK, response, 1)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        js_code: first_capture(&JS_BLOCK, response, 1)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        original_code: String::new(),
        language: Language::Text.as_str().to_string(),
    };

    match ANY_BLOCK.captures(response) {
        Some(caps) => {
            bundle.original_code = caps.get(2).map(|m| m.as_str()).unwrap_or("").to_string();
            let declared = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            if declared.eq_ignore_ascii_case("markup") {
                bundle.language = Language::Html.as_str().to_string();
            } else if !declared.is_empty() {
                bundle.language = declared.to_lowercase();
            }
        }
        None => {
            // Unfenced markup: the whole response is the document. A reply
            // with a malformed fence is prose, not a document.
            if !response.contains("```") && looks_like_html(response) {
                bundle.original_code = response.to_string();
            }
        }
    }

    if bundle.html_code.is_empty()
        && (looks_like_html(&bundle.original_code) || bundle.language == "html")
    {
        bundle.html_code = bundle.original_code.clone();
        bundle.language = Language::Html.as_str().to_string();
    }

    if !bundle.html_code.is_empty() && bundle.css_code.is_empty() {
        if let Some(css) = first_capture(&STYLE_TAG, &bundle.html_code, 1) {
            bundle.css_code = css.trim().to_string();
        }
    }

    if !bundle.html_code.is_empty() && bundle.js_code.is_empty() {
        if let Some(js) = first_capture(&SCRIPT_TAG, &bundle.html_code, 1) {
            bundle.js_code = js.trim().to_string();
        }
    }

    bundle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_block_is_trimmed() {
        let response = "Here you go:\n```html\n\n  <p>hello</p>  \n```\nEnjoy.";
        let bundle = extract_code_blocks(response);
        assert_eq!(bundle.html_code, "<p>hello</p>");
        assert_eq!(bundle.language, "html");
    }

    #[test]
    fn test_unfenced_html_is_whole_text() {
        let response = "<div class=\"card\">hi</div>";
        let bundle = extract_code_blocks(response);
        assert_eq!(bundle.html_code, response);
        assert_eq!(bundle.language, "html");
    }

    #[test]
    fn test_malformed_fence_is_not_whole_text_html() {
        let response = "Here is the page:\n```html\n<div>hi</div>```\nEnjoy.";
        let bundle = extract_code_blocks(response);
        assert!(bundle.html_code.is_empty());
        assert!(bundle.is_empty());
        assert_eq!(bundle.language, "text");
    }

    #[test]
    fn test_unclosed_fence_is_not_whole_text_html() {
        let bundle = extract_code_blocks("```html\n<p>never closed</p>");
        assert!(bundle.is_empty());
    }

    #[test]
    fn test_markup_fence_is_html() {
        let response = "```markup\n<section>ok</section>\n```";
        let bundle = extract_code_blocks(response);
        assert_eq!(bundle.html_code, "<section>ok</section>");
        assert_eq!(bundle.language, "html");
    }

    #[test]
    fn test_plain_text_has_no_code() {
        let bundle = extract_code_blocks("The answer is forty-two.");
        assert!(bundle.is_empty());
        assert_eq!(bundle.language, "text");
    }

    #[test]
    fn test_empty_response() {
        let bundle = extract_code_blocks("");
        assert!(bundle.is_empty());
        assert_eq!(bundle.language, "text");
    }

    #[test]
    fn test_separate_html_css_js_blocks() {
        let response = "```html\n<ul id=\"list\"></ul>\n```\n\n```css\nul { margin: 0; }\n```\n\n```javascript\nconsole.log('ready');\n```";
        let bundle = extract_code_blocks(response);
        assert_eq!(bundle.html_code, "<ul id=\"list\"></ul>");
        assert_eq!(bundle.css_code, "ul { margin: 0; }");
        assert_eq!(bundle.js_code, "console.log('ready');");
        assert!(bundle.is_multi_file());
    }

    #[test]
    fn test_generic_python_block() {
        let response = "```python\ndef f():\n    return 1\n```";
        let bundle = extract_code_blocks(response);
        assert_eq!(bundle.original_code, "def f():\n    return 1");
        assert_eq!(bundle.language, "python");
        assert!(bundle.html_code.is_empty());
        assert!(!bundle.is_empty());
    }

    #[test]
    fn test_untagged_block_with_markup_becomes_html() {
        let response = "```\n<body><h1>Title</h1></body>\n```";
        let bundle = extract_code_blocks(response);
        assert_eq!(bundle.html_code, "<body><h1>Title</h1></body>");
        assert_eq!(bundle.language, "html");
    }

    #[test]
    fn test_inline_style_and_script_are_lifted() {
        let response = "```html\n<html><head><style>\nh1 { color: red; }\n</style></head><body><script>alert(1)</script></body></html>\n```";
        let bundle = extract_code_blocks(response);
        assert_eq!(bundle.css_code, "h1 { color: red; }");
        assert_eq!(bundle.js_code, "alert(1)");
    }

    #[test]
    fn test_explicit_css_block_is_not_overridden() {
        let response = "```html\n<style>a{}</style><p>x</p>\n```\n```css\np { color: blue; }\n```";
        let bundle = extract_code_blocks(response);
        assert_eq!(bundle.css_code, "p { color: blue; }");
    }

    #[test]
    fn test_only_first_block_of_a_kind_is_kept() {
        let response = "```css\na { color: red; }\n```\n```css\nb { color: blue; }\n```";
        let bundle = extract_code_blocks(response);
        assert_eq!(bundle.css_code, "a { color: red; }");
    }
}

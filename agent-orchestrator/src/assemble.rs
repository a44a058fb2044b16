//! Assembly of extracted fragments into one runnable HTML document
//!
//! Injection is a plain string splice: nothing is escaped or validated, and
//! an existing block is only recognised when it is byte-identical.

use regex::Regex;
use std::sync::LazyLock;

static COMPLETE_DOCUMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<html|<!DOCTYPE html").unwrap());

/// True if the markup already is a full document rather than a fragment
pub fn is_complete_document(html: &str) -> bool {
    COMPLETE_DOCUMENT.is_match(html)
}

/// Merge HTML with optional CSS and JavaScript into a single document
///
/// Empty `css`/`js` strings are treated as absent.
pub fn assemble_document(html: &str, css: &str, js: &str) -> String {
    if is_complete_document(html) {
        inject_into_document(html, css, js)
    } else {
        wrap_fragment(html, css, js)
    }
}

fn inject_into_document(html: &str, css: &str, js: &str) -> String {
    let mut document = html.to_string();

    if !css.is_empty() {
        let style = format!("<style>{}</style>", css);
        if !document.contains(&style) {
            document = if document.contains("</head>") {
                document.replacen("</head>", &format!("{}</head>", style), 1)
            } else if document.contains("<body>") {
                document.replacen("<body>", &format!("<body>{}", style), 1)
            } else {
                document + &style
            };
        }
    }

    if !js.is_empty() {
        let script = format!("<script>{}</script>", js);
        if !document.contains(&script) {
            document = if document.contains("</body>") {
                document.replacen("</body>", &format!("{}</body>", script), 1)
            } else {
                document + &script
            };
        }
    }

    document
}

fn wrap_fragment(html: &str, css: &str, js: &str) -> String {
    let style = if css.is_empty() {
        String::new()
    } else {
        format!("<style>{}</style>", css)
    };
    let script = if js.is_empty() {
        String::new()
    } else {
        format!("<script>{}</script>", js)
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Preview</title>
  {style}
</head>
<body>
  {html}
  {script}
</body>
</html>"#
    )
}

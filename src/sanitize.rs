//! HTML/markup to plain text
//!
//! Issue descriptions and comment bodies arrive as HTML-ish markup. This conversion is
//! pure and never fails: input that cannot be turned into text is returned unchanged.

use scraper::{Html, Node};

/// Elements whose text content is not prose
const SKIPPED_ELEMENTS: [&str; 2] = ["script", "style"];

/// Convert markup to plain text
///
/// Text nodes and `<br>` become separate lines; every line is trimmed and blank lines are
/// dropped. Empty input yields an empty string.
///
/// ```
/// use jira_scrape::sanitize::to_plain_text;
///
/// assert_eq!(to_plain_text("<p>a<br>b</p>"), "a\nb");
/// ```
pub fn to_plain_text(markup: &str) -> String {
    if markup.trim().is_empty() {
        return String::new();
    }
    if ends_inside_tag(markup) {
        return markup.to_string();
    }

    let fragment = Html::parse_fragment(markup);
    let mut pieces: Vec<&str> = Vec::new();
    let mut has_elements = false;

    for node in fragment.tree.root().descendants() {
        match node.value() {
            Node::Text(text) => {
                let skipped = node
                    .parent()
                    .and_then(|p| p.value().as_element())
                    .is_some_and(|e| SKIPPED_ELEMENTS.contains(&e.name()));
                if !skipped {
                    pieces.push(&**text);
                }
            }
            Node::Element(element) => match element.name() {
                "html" => {}
                "br" => {
                    has_elements = true;
                    pieces.push("\n");
                }
                _ => has_elements = true,
            },
            _ => {}
        }
    }

    let joined = pieces.join("\n");
    let text = joined
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    // Nothing recoverable, e.g. an unterminated tag swallowed the whole input
    if text.is_empty() && (!fragment.errors.is_empty() || !has_elements) {
        return markup.to_string();
    }
    text
}

/// True when the last tag opener (`<` followed by a name, `/` or `!`) is never closed
///
/// The parser would swallow everything from that opener to the end of input.
fn ends_inside_tag(markup: &str) -> bool {
    markup
        .match_indices('<')
        .filter(|(i, _)| {
            markup[i + 1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!')
        })
        .last()
        .is_some_and(|(i, _)| !markup[i..].contains('>'))
}

/// [`to_plain_text`] for optional fields; `None` becomes an empty string
pub fn to_plain_text_opt(markup: Option<&str>) -> String {
    markup.map(to_plain_text).unwrap_or_default()
}

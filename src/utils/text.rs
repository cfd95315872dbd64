// Text cleanup for embedding input

use std::collections::HashSet;

/// Strip all HTML tags, keeping only the text content. Provider summaries
/// and instructions arrive as HTML fragments.
pub fn strip_html(text: &str) -> String {
    let mut scrub = ammonia::Builder::empty();
    scrub.clean_content_tags(HashSet::from(["script", "style"]));
    let cleaned = scrub.clean(text).to_string();
    collapse_whitespace(&cleaned)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

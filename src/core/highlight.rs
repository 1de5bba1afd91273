use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Serialize;

// Same `\w` the `\b` assertions use, combining marks included.
static LEADING_WORD_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w").unwrap());
static TRAILING_WORD_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightSegment {
    pub text: String,
    pub highlighted: bool,
}

impl HighlightSegment {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            highlighted: false,
        }
    }

    fn keyword(text: &str) -> Self {
        Self {
            text: text.to_string(),
            highlighted: true,
        }
    }
}

/// Splits `text` into plain and keyword segments. Keywords match case-insensitively on
/// whole words only, so `java` never lights up inside `javascript`.
pub fn highlight(text: &str, keywords: &[String]) -> Vec<HighlightSegment> {
    if text.is_empty() {
        return Vec::new();
    }

    let Some(regex) = keyword_regex(keywords) else {
        return vec![HighlightSegment::plain(text)];
    };

    let mut segments = Vec::new();
    let mut cursor = 0;
    for m in regex.find_iter(text) {
        if m.start() > cursor {
            segments.push(HighlightSegment::plain(&text[cursor..m.start()]));
        }
        segments.push(HighlightSegment::keyword(m.as_str()));
        cursor = m.end();
    }

    if cursor < text.len() {
        segments.push(HighlightSegment::plain(&text[cursor..]));
    }

    segments
}

fn keyword_regex(keywords: &[String]) -> Option<Regex> {
    let mut unique: Vec<&str> = Vec::new();
    for keyword in keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
        if !unique
            .iter()
            .any(|existing| existing.to_lowercase() == keyword.to_lowercase())
        {
            unique.push(keyword);
        }
    }

    if unique.is_empty() {
        return None;
    }

    // Longest first so "machine learning" wins over "machine".
    unique.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

    let alternatives: Vec<String> = unique.iter().map(|k| bounded_pattern(k)).collect();
    RegexBuilder::new(&alternatives.join("|"))
        .case_insensitive(true)
        .build()
        .ok()
}

fn bounded_pattern(keyword: &str) -> String {
    let escaped = regex::escape(keyword);
    let leading = LEADING_WORD_CHAR.is_match(keyword);
    let trailing = TRAILING_WORD_CHAR.is_match(keyword);

    format!(
        "{}{}{}",
        if leading { r"\b" } else { "" },
        escaped,
        if trailing { r"\b" } else { "" }
    )
}

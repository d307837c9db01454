use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Info,
    Warning,
    Critical,
    Success,
    Empty,
}

/// A short advisory line shown in the footer assistant.
///
/// `key` is the plain-text fingerprint of `text`; two suggestions that read the
/// same once markup is removed share a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub key: String,
}

impl Suggestion {
    pub fn new(text: impl Into<String>, kind: SuggestionKind) -> Self {
        let text = text.into();
        let key = plain_text_key(&text);
        Self { text, kind, key }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, SuggestionKind::Info)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(text, SuggestionKind::Warning)
    }

    pub fn critical(text: impl Into<String>) -> Self {
        Self::new(text, SuggestionKind::Critical)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, SuggestionKind::Success)
    }

    pub fn empty(text: impl Into<String>) -> Self {
        Self::new(text, SuggestionKind::Empty)
    }

    pub fn plain_text(&self) -> &str {
        &self.key
    }
}

/// Strips markup tags, decodes the handful of entities the dashboard emits and
/// collapses whitespace.
///
/// A `<` only opens a tag when followed by a letter, `/` or `!`, and a tag
/// without a closing `>` is kept as text.
pub fn plain_text_key(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        stripped.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let opens_tag = after
            .chars()
            .next()
            .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '/' || ch == '!');
        match after.find('>') {
            Some(close) if opens_tag => {
                stripped.push(' ');
                rest = &after[close + 1..];
            }
            _ => {
                stripped.push('<');
                rest = after;
            }
        }
    }
    stripped.push_str(rest);

    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ignores_markup_and_spacing() {
        let bold = Suggestion::warning("<strong>AB-1</strong>  is close to breach");
        let plain = Suggestion::warning("AB-1 is close to breach");
        assert_eq!(bold.key, plain.key);
        assert_eq!(bold.key, "AB-1 is close to breach");
    }

    #[test]
    fn bare_angle_brackets_are_text() {
        let two_hours = Suggestion::info("Response time < 2h for AB-1");
        let four_hours = Suggestion::info("Response time < 4h for AB-2");
        assert_eq!(two_hours.key, "Response time < 2h for AB-1");
        assert_ne!(two_hours.key, four_hours.key);
        assert_eq!(plain_text_key("a <b and c"), "a <b and c");
        assert_eq!(plain_text_key("<!-- note --><em>late</em>"), "late");
    }

    #[test]
    fn entities_are_decoded_once() {
        assert_eq!(plain_text_key("a &amp;lt; b"), "a &lt; b");
        assert_eq!(plain_text_key("R&amp;D&nbsp;queue"), "R&D queue");
    }

    #[test]
    fn serializes_kind_as_type_field() {
        let value = serde_json::to_value(Suggestion::critical("breached")).expect("json");
        assert_eq!(value["type"], "critical");
        assert_eq!(value["key"], "breached");
    }
}

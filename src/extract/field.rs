//! Single-field extraction: anchor triple or regex override.

use regex::Regex;

use crate::model::{Field, Pattern};

use super::error::{ExtractError, ExtractResult};

/// A [`Pattern`] with its regex override compiled once.
#[derive(Debug, Clone)]
pub struct Matcher<'p> {
    pattern: &'p Pattern,
    regex: Option<Regex>,
}

impl<'p> Matcher<'p> {
    /// Compile `pattern` on behalf of `field_id`.
    pub fn compile(field_id: &str, pattern: &'p Pattern) -> ExtractResult<Self> {
        let regex = match &pattern.regex {
            Some(source) => Some(Regex::new(source).map_err(|e| ExtractError::Pattern {
                field: field_id.to_string(),
                pattern: source.clone(),
                message: e.to_string(),
            })?),
            None => None,
        };
        Ok(Self { pattern, regex })
    }

    pub fn regex(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }

    /// Locate the value in `text`, trimmed. Empty values count as missing.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        let raw = match &self.regex {
            Some(regex) => {
                let caps = regex.captures(text)?;
                caps.get(1).or_else(|| caps.get(0))?.as_str()
            }
            None => find_anchored(text, self.pattern)?,
        };
        Some(raw.trim()).filter(|v| !v.is_empty())
    }
}

/// Extract the value described by `field` from `text`.
///
/// Returns [`ExtractError::NotFound`] when the anchors do not locate a
/// non-empty value and [`ExtractError::Pattern`] when the regex override does
/// not compile.
pub fn extract_field(text: &str, field: &Field) -> ExtractResult<String> {
    let matcher = Matcher::compile(&field.id, &field.pattern)?;
    matcher
        .find(text)
        .map(str::to_string)
        .ok_or_else(|| ExtractError::NotFound {
            field: field.id.clone(),
        })
}

/// Anchor-mode extraction, untrimmed.
///
/// With an empty `after` the value runs to the next `before` match, or to the
/// end of the text when there is none.
fn find_anchored<'t>(text: &'t str, pattern: &Pattern) -> Option<&'t str> {
    let start = if pattern.before.is_empty() {
        0
    } else {
        let (idx, matched) = text
            .match_indices(pattern.before.as_str())
            .nth(pattern.effective_occurrence() - 1)?;
        idx + matched.len()
    };

    let rest = &text[start..];
    let end = if !pattern.after.is_empty() {
        rest.find(pattern.after.as_str())?
    } else if !pattern.before.is_empty() {
        rest.find(pattern.before.as_str()).unwrap_or(rest.len())
    } else {
        rest.len()
    };
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(pattern: Pattern) -> Field {
        Field::new("value", pattern)
    }

    #[test]
    fn occurrence_selects_nth_anchor() {
        let text = "A[x]B[x]C[x]D";
        let second = field(Pattern::nth("[x]", "", 2));
        assert_eq!(extract_field(text, &second).unwrap(), "C");

        let fourth = field(Pattern::nth("[x]", "", 4));
        assert_eq!(
            extract_field(text, &fourth),
            Err(ExtractError::NotFound {
                field: "value".into()
            })
        );
    }

    #[test]
    fn last_occurrence_runs_to_end() {
        let third = field(Pattern::nth("[x]", "", 3));
        assert_eq!(extract_field("A[x]B[x]C[x]D", &third).unwrap(), "D");
    }

    #[test]
    fn before_after_round_trip() {
        let cases = [
            ("Version: ", "\n", "1.2.3"),
            ("[Build ", "]", "123"),
            ("<b>", "</b>", "Foo Bar"),
        ];
        for (before, after, value) in cases {
            let text = format!("junk {before}{value}{after} trailing");
            let f = field(Pattern::anchored(before, after));
            assert_eq!(extract_field(&text, &f).unwrap(), value);
        }
    }

    #[test]
    fn value_is_trimmed_and_empty_is_missing() {
        let f = field(Pattern::anchored("Name:", ";"));
        assert_eq!(extract_field("Name:   Foo  ;", &f).unwrap(), "Foo");
        assert!(matches!(
            extract_field("Name:   ;", &f),
            Err(ExtractError::NotFound { .. })
        ));
    }

    #[test]
    fn missing_after_is_not_found() {
        let f = field(Pattern::anchored("Name:", ";"));
        assert!(matches!(
            extract_field("Name: Foo", &f),
            Err(ExtractError::NotFound { .. })
        ));
    }

    #[test]
    fn empty_anchors_take_whole_text() {
        let f = field(Pattern::default());
        assert_eq!(extract_field("  everything  ", &f).unwrap(), "everything");
    }

    #[test]
    fn regex_prefers_first_group() {
        let f = field(Pattern::regex(r"\[Build (\d+)\]"));
        assert_eq!(extract_field("x [Build 123] y", &f).unwrap(), "123");

        let whole = field(Pattern::regex(r"\d{4}-\d{2}-\d{2}"));
        assert_eq!(extract_field("on 2024-01-01.", &whole).unwrap(), "2024-01-01");
    }

    #[test]
    fn regex_overrides_anchors() {
        let mut pattern = Pattern::regex(r"id=(\w+)");
        pattern.before = "nothing-like-this".into();
        assert_eq!(extract_field("id=abc", &field(pattern)).unwrap(), "abc");
    }

    #[test]
    fn invalid_regex_is_pattern_error() {
        let f = field(Pattern::regex("(unclosed"));
        let err = extract_field("text", &f).unwrap_err();
        assert!(matches!(err, ExtractError::Pattern { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn extraction_is_deterministic() {
        let f = field(Pattern::nth("|", "|", 2));
        let text = "a|b|c|d";
        let first = extract_field(text, &f);
        for _ in 0..10 {
            assert_eq!(extract_field(text, &f), first);
        }
        assert_eq!(first.unwrap(), "c");
    }
}

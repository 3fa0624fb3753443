//! Pattern inference from a highlighted span.
//!
//! Given the full text and a selection, infer `before`/`after` anchors that
//! would re-extract the selection. Each side is probed by an ordered table of
//! heuristics; the first heuristic that fires wins:
//!
//! 1. **Opening tag** flush with the boundary (`[b]`, `[url=..]`, `<span>`).
//! 2. **Closing tag** at the boundary, allowing whitespace in between.
//! 3. **Keyword** from the configured list, flush or within 3 characters.
//! 4. **Adjacent punctuation** (simple mode only).
//! 5. **Windowed** best delimiter within the lookaround window (nth/auto).
//! 6. **Raw fallback**: the 10 characters next to the boundary.
//!
//! The `after` side mirrors each heuristic against the start of the suffix.
//! Inference is pure: identical inputs always give identical anchors.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::Pattern;

use super::error::{ExtractError, ExtractResult};

// ── Tag patterns ────────────────────────────────────────────────────────

static RE_OPEN_TAG_AT_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\[[A-Za-z][A-Za-z0-9]*(?:[= ][^\[\]]*)?\]|<[A-Za-z][^<>]*>)$").unwrap()
});

static RE_CLOSE_TAG_AT_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\[/[A-Za-z][A-Za-z0-9]*\]|</[A-Za-z][A-Za-z0-9]*\s*>)\s*$").unwrap()
});

static RE_CLOSE_TAG_AT_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\[/[A-Za-z][A-Za-z0-9]*\]|</[A-Za-z][A-Za-z0-9]*\s*>)").unwrap()
});

static RE_OPEN_TAG_AT_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\[[A-Za-z][A-Za-z0-9]*(?:[= ][^\[\]]*)?\]|<[A-Za-z][^<>]*>)").unwrap()
});

/// Maximum characters allowed between a keyword and the boundary.
const KEYWORD_SLACK: usize = 3;

/// Characters taken by the raw fallback.
const RAW_FALLBACK_CHARS: usize = 10;

// ── Types ───────────────────────────────────────────────────────────────

/// How aggressively to search for anchors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferMode {
    /// Single adjacent delimiter, occurrence fixed at 1.
    Simple,
    /// Windowed delimiter search with occurrence counting.
    Nth,
    #[default]
    Auto,
    /// No inference: the caller should ask for a regex instead.
    Regex,
}

impl FromStr for InferMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "nth" => Ok(Self::Nth),
            "auto" => Ok(Self::Auto),
            "regex" => Ok(Self::Regex),
            other => Err(format!(
                "unknown inference mode \"{other}\" (expected simple, nth, auto or regex)"
            )),
        }
    }
}

impl std::fmt::Display for InferMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Nth => write!(f, "nth"),
            Self::Auto => write!(f, "auto"),
            Self::Regex => write!(f, "regex"),
        }
    }
}

/// Delimiter vocabularies used by inference.
///
/// The windowed heuristic tries `markup_tags`, then `keywords`, then
/// `punctuation`, then `separators`, in list order within each class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub keywords: Vec<String>,
    pub markup_tags: Vec<String>,
    pub punctuation: Vec<String>,
    pub separators: Vec<String>,
    /// Window size, in characters, for the windowed heuristic.
    pub lookaround: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            keywords: strings(&[
                "Version:", "Version ", "Build:", "Build ", "Branch:", "Release:", "Date:",
                "Size:", "Platform:", "Updated:",
            ]),
            markup_tags: strings(&[
                "[/b]", "[b]", "[/i]", "[i]", "[/u]", "[u]", "[/url]", "[/color]", "[/size]",
                "[/quote]", "[/code]", "[/spoiler]", "</b>", "<b>", "</i>", "<i>", "</a>",
                "</span>", "</li>", "<li>",
            ]),
            punctuation: strings(&[
                "[", "]", "(", ")", "{", "}", "<", ">", ":", "=", "\"", "'", "|",
            ]),
            separators: strings(&[" - ", " | ", ", ", "\n", "\t", " "]),
            lookaround: 24,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Anchors inferred from a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredPattern {
    pub before: String,
    pub after: String,
    pub occurrence: u32,
    /// 0–100; the weaker of the two sides.
    pub confidence: u8,
    /// Set in regex mode: nothing was inferred, a regex must be entered.
    pub manual_regex: bool,
}

impl InferredPattern {
    fn manual_regex_placeholder() -> Self {
        Self {
            before: String::new(),
            after: String::new(),
            occurrence: 1,
            confidence: 0,
            manual_regex: true,
        }
    }

    pub fn into_pattern(self) -> Pattern {
        Pattern::nth(&self.before, &self.after, self.occurrence)
    }
}

// ── Heuristic table ─────────────────────────────────────────────────────

/// Which end of the selection a probe looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// The prefix, anchored at its end.
    Before,
    /// The suffix, anchored at its start.
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    OpeningTag,
    ClosingTag,
    Keyword,
    AdjacentPunctuation,
    Windowed,
    RawFallback,
}

struct Heuristic {
    rule: Rule,
    confidence: u8,
    modes: &'static [InferMode],
}

const ANCHOR_MODES: &[InferMode] = &[InferMode::Simple, InferMode::Nth, InferMode::Auto];

const HEURISTICS: &[Heuristic] = &[
    Heuristic {
        rule: Rule::OpeningTag,
        confidence: 95,
        modes: ANCHOR_MODES,
    },
    Heuristic {
        rule: Rule::ClosingTag,
        confidence: 90,
        modes: ANCHOR_MODES,
    },
    Heuristic {
        rule: Rule::Keyword,
        confidence: 90,
        modes: ANCHOR_MODES,
    },
    Heuristic {
        rule: Rule::AdjacentPunctuation,
        confidence: 70,
        modes: &[InferMode::Simple],
    },
    Heuristic {
        rule: Rule::Windowed,
        confidence: 80,
        modes: &[InferMode::Nth, InferMode::Auto],
    },
    Heuristic {
        rule: Rule::RawFallback,
        confidence: 40,
        modes: ANCHOR_MODES,
    },
];

/// A fired heuristic: the delimiter text and its confidence.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Probe {
    delimiter: String,
    confidence: u8,
}

/// Delimiter classes for the windowed heuristic, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DelimiterClass {
    Markup,
    Keyword,
    Punctuation,
    Separator,
}

impl DelimiterClass {
    fn specificity(self) -> i64 {
        match self {
            Self::Markup => 4,
            Self::Keyword => 3,
            Self::Punctuation => 2,
            Self::Separator => 1,
        }
    }

    fn confidence(self) -> u8 {
        match self {
            Self::Markup => 80,
            Self::Keyword => 78,
            Self::Punctuation => 74,
            Self::Separator => 70,
        }
    }
}

// ── Inference ───────────────────────────────────────────────────────────

/// Infer anchors for the byte range `start..end` of `full_text`.
pub fn infer_pattern(
    full_text: &str,
    start: usize,
    end: usize,
    mode: InferMode,
    config: &InferenceConfig,
) -> ExtractResult<InferredPattern> {
    if start > end
        || end > full_text.len()
        || !full_text.is_char_boundary(start)
        || !full_text.is_char_boundary(end)
    {
        return Err(ExtractError::InvalidSelection {
            start,
            end,
            len: full_text.len(),
        });
    }

    if mode == InferMode::Regex {
        return Ok(InferredPattern::manual_regex_placeholder());
    }

    let prefix = &full_text[..start];
    let suffix = &full_text[end..];

    let before = probe_side(prefix, Side::Before, mode, config);
    let after = probe_side(suffix, Side::After, mode, config);

    let occurrence = if mode == InferMode::Simple || before.delimiter.is_empty() {
        1
    } else {
        prefix.matches(before.delimiter.as_str()).count().max(1) as u32
    };

    tracing::debug!(
        before = %before.delimiter,
        after = %after.delimiter,
        occurrence,
        %mode,
        "inferred anchors"
    );

    Ok(InferredPattern {
        confidence: before.confidence.min(after.confidence),
        before: before.delimiter,
        after: after.delimiter,
        occurrence,
        manual_regex: false,
    })
}

fn probe_side(text: &str, side: Side, mode: InferMode, config: &InferenceConfig) -> Probe {
    HEURISTICS
        .iter()
        .filter(|h| h.modes.contains(&mode))
        .find_map(|h| apply(h, text, side, config))
        .unwrap_or(Probe {
            delimiter: String::new(),
            confidence: 0,
        })
}

fn apply(heuristic: &Heuristic, text: &str, side: Side, config: &InferenceConfig) -> Option<Probe> {
    let fixed = |delimiter: &str| Probe {
        delimiter: delimiter.to_string(),
        confidence: heuristic.confidence,
    };

    match heuristic.rule {
        Rule::OpeningTag => {
            let found = match side {
                Side::Before => RE_OPEN_TAG_AT_END.find(text),
                Side::After => RE_CLOSE_TAG_AT_START.find(text),
            };
            found.map(|m| fixed(m.as_str()))
        }
        Rule::ClosingTag => {
            let caps = match side {
                Side::Before => RE_CLOSE_TAG_AT_END.captures(text),
                Side::After => RE_OPEN_TAG_AT_START.captures(text),
            }?;
            caps.get(1).map(|m| fixed(m.as_str()))
        }
        Rule::Keyword => probe_keyword(text, side, &config.keywords, heuristic.confidence),
        Rule::AdjacentPunctuation => {
            let c = match side {
                Side::Before => text.chars().next_back(),
                Side::After => text.chars().next(),
            }?;
            let mut buf = [0u8; 4];
            let c = c.encode_utf8(&mut buf);
            config
                .punctuation
                .iter()
                .any(|p| p == c)
                .then(|| fixed(c))
        }
        Rule::Windowed => probe_windowed(text, side, config),
        Rule::RawFallback => {
            let raw = match side {
                Side::Before => &text[tail_start(text, RAW_FALLBACK_CHARS)..],
                Side::After => &text[..head_end(text, RAW_FALLBACK_CHARS)],
            };
            Some(fixed(raw))
        }
    }
}

/// Closest keyword within [`KEYWORD_SLACK`] characters of the boundary.
///
/// The delimiter spans from the keyword to the boundary so the anchor
/// matches the text exactly. Flush keywords keep full confidence; keywords
/// separated by slack lose 5 points. Ties go to the longer keyword.
fn probe_keyword(text: &str, side: Side, keywords: &[String], confidence: u8) -> Option<Probe> {
    let mut best: Option<(usize, usize, String)> = None;

    for keyword in keywords.iter().filter(|k| !k.is_empty()) {
        let candidate = match side {
            Side::Before => text.rfind(keyword.as_str()).map(|pos| {
                let gap = text[pos + keyword.len()..].chars().count();
                (gap, &text[pos..])
            }),
            Side::After => text.find(keyword.as_str()).map(|pos| {
                let gap = text[..pos].chars().count();
                (gap, &text[..pos + keyword.len()])
            }),
        };
        let Some((gap, delimiter)) = candidate else {
            continue;
        };
        if gap > KEYWORD_SLACK {
            continue;
        }
        let better = match &best {
            None => true,
            Some((best_gap, best_len, _)) => {
                gap < *best_gap || (gap == *best_gap && keyword.len() > *best_len)
            }
        };
        if better {
            best = Some((gap, keyword.len(), delimiter.to_string()));
        }
    }

    best.map(|(gap, _, delimiter)| Probe {
        delimiter,
        confidence: if gap == 0 { confidence } else { confidence - 5 },
    })
}

/// Best delimiter from the priority list inside the lookaround window.
///
/// Score favours specificity class first, then delimiter length, then
/// proximity to the boundary; ties keep the earlier list entry.
fn probe_windowed(text: &str, side: Side, config: &InferenceConfig) -> Option<Probe> {
    let classes = [
        (DelimiterClass::Markup, &config.markup_tags),
        (DelimiterClass::Keyword, &config.keywords),
        (DelimiterClass::Punctuation, &config.punctuation),
        (DelimiterClass::Separator, &config.separators),
    ];

    let mut best: Option<(i64, DelimiterClass, String)> = None;

    for (class, candidates) in classes {
        for candidate in candidates.iter().filter(|c| !c.is_empty()) {
            let found = match side {
                Side::Before => {
                    let window_start = tail_start(text, config.lookaround);
                    text.rfind(candidate.as_str())
                        .filter(|pos| *pos >= window_start)
                        .map(|pos| {
                            let distance = text[pos + candidate.len()..].chars().count();
                            (distance, &text[pos..])
                        })
                }
                Side::After => {
                    let window_end = head_end(text, config.lookaround);
                    text.find(candidate.as_str())
                        .filter(|pos| pos + candidate.len() <= window_end)
                        .map(|pos| {
                            let distance = text[..pos].chars().count();
                            (distance, &text[..pos + candidate.len()])
                        })
                }
            };
            let Some((distance, delimiter)) = found else {
                continue;
            };
            let length = candidate.chars().count().min(20) as i64;
            let score = class.specificity() * 100 + length * 4 - distance as i64;
            if best.as_ref().is_none_or(|(s, _, _)| score > *s) {
                best = Some((score, class, delimiter.to_string()));
            }
        }
    }

    best.map(|(_, class, delimiter)| Probe {
        delimiter,
        confidence: class.confidence(),
    })
}

/// Byte index where the last `n` characters of `s` begin.
fn tail_start(s: &str, n: usize) -> usize {
    if n == 0 {
        return s.len();
    }
    s.char_indices().rev().nth(n - 1).map(|(i, _)| i).unwrap_or(0)
}

/// Byte index just past the first `n` characters of `s`.
fn head_end(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

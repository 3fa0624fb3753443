//! Variant auto-detection by rule scoring.

use regex::Regex;

use crate::model::{DetectionRule, Variant};

use super::error::{ExtractError, ExtractResult};

/// A variant together with its detection score for some text.
#[derive(Debug, Clone, Copy)]
pub struct VariantScore<'a> {
    pub variant: &'a Variant,
    pub score: u32,
}

/// Score one variant: +1 per matching `contains` rule, +2 per matching regex.
///
/// Invalid regex rules contribute nothing.
pub fn score_variant(text: &str, variant: &Variant) -> u32 {
    variant
        .detection_rules
        .iter()
        .map(|rule| match rule {
            DetectionRule::Contains(value) => u32::from(text.contains(value.as_str())),
            DetectionRule::Regex(source) => match Regex::new(source) {
                Ok(re) if re.is_match(text) => 2,
                Ok(_) => 0,
                Err(e) => {
                    tracing::warn!(
                        variant = %variant.id,
                        pattern = %source,
                        error = %e,
                        "ignoring invalid detection regex"
                    );
                    0
                }
            },
        })
        .sum()
}

/// Scores for every variant, in list order.
pub fn score_variants<'a>(text: &str, variants: &'a [Variant]) -> Vec<VariantScore<'a>> {
    variants
        .iter()
        .map(|variant| VariantScore {
            variant,
            score: score_variant(text, variant),
        })
        .collect()
}

/// Pick the best-scoring variant for `text`.
///
/// Ties prefer `default_id`, then the earliest variant in list order.
pub fn select_variant<'a>(
    text: &str,
    variants: &'a [Variant],
    default_id: &str,
) -> ExtractResult<&'a Variant> {
    let mut best: Option<VariantScore<'a>> = None;

    for candidate in score_variants(text, variants) {
        let replace = match &best {
            None => true,
            Some(current) => {
                candidate.score > current.score
                    || (candidate.score == current.score
                        && candidate.variant.id == default_id
                        && current.variant.id != default_id)
            }
        };
        if replace {
            best = Some(candidate);
        }
    }

    let best = best.ok_or(ExtractError::NoVariants)?;
    tracing::debug!(variant = %best.variant.id, score = best.score, "selected variant");
    Ok(best.variant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(id: &str, rules: Vec<DetectionRule>) -> Variant {
        rules
            .into_iter()
            .fold(Variant::new(id, id), |v, rule| v.with_rule(rule))
    }

    #[test]
    fn tie_prefers_default() {
        let variants = vec![
            variant("a", vec![DetectionRule::Contains("alpha".into())]),
            variant("b", vec![DetectionRule::Contains("beta".into())]),
        ];
        let text = "alpha and beta";
        assert_eq!(select_variant(text, &variants, "b").unwrap().id, "b");
        assert_eq!(select_variant(text, &variants, "a").unwrap().id, "a");
    }

    #[test]
    fn tie_without_default_takes_first() {
        let variants = vec![variant("a", vec![]), variant("b", vec![])];
        assert_eq!(select_variant("x", &variants, "zzz").unwrap().id, "a");
    }

    #[test]
    fn regex_rules_weigh_double() {
        let variants = vec![
            variant("contains", vec![DetectionRule::Contains("Build".into())]),
            variant("regex", vec![DetectionRule::Regex(r"\[Build \d+\]".into())]),
        ];
        let text = "[Build 123]";
        let scores = score_variants(text, &variants);
        assert_eq!(scores[0].score, 1);
        assert_eq!(scores[1].score, 2);
        assert_eq!(select_variant(text, &variants, "contains").unwrap().id, "regex");
    }

    #[test]
    fn invalid_regex_scores_zero() {
        let v = variant(
            "v",
            vec![
                DetectionRule::Regex("(broken".into()),
                DetectionRule::Contains("x".into()),
            ],
        );
        assert_eq!(score_variant("x", &v), 1);
    }

    #[test]
    fn empty_list_is_an_error() {
        assert_eq!(select_variant("x", &[], "a"), Err(ExtractError::NoVariants));
    }
}

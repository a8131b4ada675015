//! Ordered substitution table for recurring recognition errors

use crate::error::RollError;
use crate::layout::Template;
use regex::{NoExpand, Regex};

/// Rules for Marathi voter rolls, applied top to bottom, once each.
///
/// Punctuation is unified before the word fixes and colons are padded last.
/// With this order the `नाव !` rule never sees a `!`.
pub const MARATHI_RULES: &[(&str, &str)] = &[
    (r"[;:!：]", ":"),
    (r"\bबय\b", "वय"),
    (r"\bचय\b", "वय"),
    (r"\bमाव\b", "नाव"),
    (r"\bमाब\b", "नाव"),
    (r"\bनाब\b", "नाव"),
    (r"\bनाय\b", "नाव"),
    (r"\bनाव\s*!", "नाव :"),
    (r"\bलिगं\b", "लिंग"),
    (r"\bलिग\b", "लिंग"),
    (r"छायाचत्र", "छायाचित्र"),
    (r":", " : "),
];

#[derive(Debug, Clone)]
struct Substitution {
    pattern: Regex,
    replacement: String,
}

/// Applies `(pattern, replacement)` rules in order, one pass per rule
#[derive(Debug, Clone)]
pub struct Normalizer {
    rules: Vec<Substitution>,
}

impl Normalizer {
    pub fn new<I, P, R>(rules: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = (P, R)>,
        P: AsRef<str>,
        R: Into<String>,
    {
        let rules = rules
            .into_iter()
            .map(|(pattern, replacement)| {
                Ok(Substitution {
                    pattern: Regex::new(pattern.as_ref())?,
                    replacement: replacement.into(),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { rules })
    }

    /// Compile the substitution table of a template
    pub fn for_template(template: &Template) -> Result<Self, RollError> {
        Self::new(
            template
                .substitutions
                .iter()
                .map(|(pattern, replacement)| (pattern.as_str(), replacement.as_str())),
        )
        .map_err(|e| {
            RollError::invalid_template(
                &template.name,
                format!("invalid substitution pattern: {}", e),
            )
        })
    }

    pub fn normalize(&self, raw: &str) -> String {
        let mut text = raw.to_string();
        for rule in &self.rules {
            text = rule
                .pattern
                .replace_all(&text, NoExpand(&rule.replacement))
                .into_owned();
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(text: &str) -> String {
        Normalizer::new(MARATHI_RULES.iter().copied())
            .unwrap()
            .normalize(text)
    }

    #[test]
    fn test_terminal_punctuation_becomes_padded_colon() {
        assert_eq!(normalize("वय;45"), "वय : 45");
        assert_eq!(normalize("वय!45"), "वय : 45");
        assert_eq!(normalize("वय：45"), "वय : 45");
    }

    #[test]
    fn test_age_label_misreads() {
        assert_eq!(normalize("बय 45"), "वय 45");
        assert_eq!(normalize("चय 45"), "वय 45");
    }

    #[test]
    fn test_name_label_misreads() {
        for misread in ["माव", "माब", "नाब", "नाय"] {
            assert_eq!(normalize(&format!("{misread} राम")), "नाव राम");
        }
    }

    #[test]
    fn test_name_bang_is_unified_before_its_own_rule() {
        assert_eq!(normalize("नाव ! राम"), "नाव  :  राम");
    }

    #[test]
    fn test_gender_label_misreads() {
        assert_eq!(normalize("लिगं पुरुष"), "लिंग पुरुष");
        assert_eq!(normalize("लिग स्त्री"), "लिंग स्त्री");
    }

    #[test]
    fn test_photo_caption_completed() {
        assert_eq!(normalize("छायाचत्र"), "छायाचित्र");
    }

    #[test]
    fn test_word_fixes_only_match_whole_words() {
        assert_eq!(normalize("बयाना"), "बयाना");
        assert_eq!(normalize("नायक"), "नायक");
    }

    #[test]
    fn test_rules_run_once_not_to_fixpoint() {
        let once = normalize("वय:45");
        assert_eq!(once, "वय : 45");
        // the padding rule matches its own output
        assert_eq!(normalize(&once), "वय  :  45");
    }

    #[test]
    fn test_text_without_keys_is_unchanged() {
        assert_eq!(normalize("घर क्रमांक 12"), "घर क्रमांक 12");
    }

    #[test]
    fn test_custom_table_in_order() {
        let normalizer = Normalizer::new([("a", "b"), ("b", "c")]).unwrap();
        assert_eq!(normalizer.normalize("a"), "c");
        let reversed = Normalizer::new([("b", "c"), ("a", "b")]).unwrap();
        assert_eq!(reversed.normalize("a"), "b");
    }

    #[test]
    fn test_replacement_is_literal() {
        let normalizer = Normalizer::new([("x", "$1")]).unwrap();
        assert_eq!(normalizer.normalize("x"), "$1");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(Normalizer::new([("(", "")]).is_err());
    }

    #[test]
    fn test_template_table_compiled_in_order() {
        let template = Template {
            substitutions: vec![
                ("नाम".to_string(), "नाव".to_string()),
                (":".to_string(), " - ".to_string()),
            ],
            ..Template::ward_roll()
        };
        let normalizer = Normalizer::for_template(&template).unwrap();
        assert_eq!(normalizer.normalize("नाम: राम"), "नाव -  राम");
    }

    #[test]
    fn test_bad_template_pattern_is_a_template_error() {
        let template = Template {
            substitutions: vec![("[".to_string(), String::new())],
            ..Template::ward_roll()
        };
        let err = Normalizer::for_template(&template).unwrap_err();
        assert!(matches!(err, RollError::InvalidTemplate { template, .. } if template == "ward-roll"));
    }
}

//! Page templates: the geometric constants of a document family

use crate::engine::ScriptProfile;
use crate::error::RollError;
use crate::text::normalize::{Normalizer, MARATHI_RULES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Header rectangle of a page. The right edge is always the page mid-width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeaderRegion {
    pub top_margin: u32,
    /// Distance from the page bottom to the header's lower edge
    pub bottom_margin: u32,
    pub left_margin: u32,
}

/// Fixed grid of entry cards inside each retained column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardGrid {
    pub cards_per_column: u32,
    /// Rows cut from the top of every card (card number, photo caption)
    pub card_top_trim: u32,
    /// Page bottom margin used instead of the template's when cutting cards
    pub bottom_margin: u32,
}

/// Labels of the per-voter fields on an entry card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldLabels {
    pub father: String,
    pub husband: String,
    pub house: String,
    pub age: String,
    pub gender: String,
}

impl Default for FieldLabels {
    fn default() -> Self {
        Self {
            father: "वडिलांचे नाव".to_string(),
            husband: "पतीचे नाव".to_string(),
            house: "घर क्रमांक".to_string(),
            age: "वय".to_string(),
            gender: "लिंग".to_string(),
        }
    }
}

/// Page layout of one document family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub top_margin: u32,
    pub bottom_margin: u32,
    pub left_margin: u32,
    pub right_margin: u32,
    pub column_count: u32,
    /// Share of each column slice kept from the left; the rest holds the photo box
    pub column_retain_fraction: f32,
    /// Pixels dropped from the left of each retained slice (card border)
    pub column_left_trim: u32,
    #[serde(default)]
    pub header: Option<HeaderRegion>,
    #[serde(default)]
    pub cards: Option<CardGrid>,
    /// Label that opens every entry card
    pub record_label: String,
    #[serde(default)]
    pub labels: FieldLabels,
    #[serde(default = "default_roll_part_marker")]
    pub roll_part_marker: String,
    #[serde(default)]
    pub header_profile: ScriptProfile,
    #[serde(default)]
    pub body_profile: ScriptProfile,
    /// Ordered `(pattern, replacement)` fixes for recurring misreads
    #[serde(default = "default_substitutions")]
    pub substitutions: Vec<(String, String)>,
}

fn default_roll_part_marker() -> String {
    "क्र".to_string()
}

fn default_substitutions() -> Vec<(String, String)> {
    MARATHI_RULES
        .iter()
        .map(|(pattern, replacement)| (pattern.to_string(), replacement.to_string()))
        .collect()
}

impl Template {
    /// Three-column ward roll without a parsed header
    pub fn ward_roll() -> Self {
        Self {
            name: "ward-roll".to_string(),
            top_margin: 120,
            bottom_margin: 100,
            left_margin: 45,
            right_margin: 30,
            column_count: 3,
            column_retain_fraction: 2.0 / 3.0,
            column_left_trim: 15,
            header: None,
            cards: Some(CardGrid {
                cards_per_column: 10,
                card_top_trim: 60,
                bottom_margin: 75,
            }),
            record_label: "नाव".to_string(),
            labels: FieldLabels::default(),
            roll_part_marker: default_roll_part_marker(),
            header_profile: ScriptProfile::default(),
            body_profile: ScriptProfile::default(),
            substitutions: default_substitutions(),
        }
    }

    /// Municipal roll whose page header carries ward and booth metadata
    pub fn municipal_roll() -> Self {
        Self {
            name: "municipal-roll".to_string(),
            top_margin: 150,
            header: Some(HeaderRegion {
                top_margin: 20,
                bottom_margin: 3360,
                left_margin: 45,
            }),
            cards: None,
            record_label: "मतदाराचे पूर्ण".to_string(),
            ..Self::ward_roll()
        }
    }

    /// Checks the constraints that do not depend on a page size
    pub fn validate(&self) -> Result<(), RollError> {
        if self.name.trim().is_empty() {
            return Err(RollError::invalid_template(&self.name, "empty name"));
        }
        if self.column_count == 0 {
            return Err(RollError::invalid_template(&self.name, "column_count must be > 0"));
        }
        if !(self.column_retain_fraction > 0.0 && self.column_retain_fraction <= 1.0) {
            return Err(RollError::invalid_template(
                &self.name,
                format!(
                    "column_retain_fraction {} outside (0, 1]",
                    self.column_retain_fraction
                ),
            ));
        }
        if self.record_label.trim().is_empty() {
            return Err(RollError::invalid_template(&self.name, "empty record_label"));
        }
        if let Some(cards) = &self.cards {
            if cards.cards_per_column == 0 {
                return Err(RollError::invalid_template(
                    &self.name,
                    "cards_per_column must be > 0",
                ));
            }
        }
        Normalizer::for_template(self)?;
        Ok(())
    }
}

/// Named templates available to a run
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: BTreeMap<String, Template>,
}

impl TemplateSet {
    pub fn builtin() -> Self {
        let mut set = Self {
            templates: BTreeMap::new(),
        };
        for template in [Template::ward_roll(), Template::municipal_roll()] {
            set.templates.insert(template.name.clone(), template);
        }
        set
    }

    /// Add or replace a template after validating it
    pub fn insert(&mut self, template: Template) -> Result<(), RollError> {
        template.validate()?;
        if self.templates.contains_key(&template.name) {
            tracing::info!("Overriding template '{}'", template.name);
        }
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    /// Load a JSON array of templates and merge it over the current set
    pub fn load_file(&mut self, path: &Path) -> Result<usize, RollError> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            RollError::invalid_template(
                &path.display().to_string(),
                format!("failed to read template file: {}", e),
            )
        })?;
        let templates: Vec<Template> = serde_json::from_str(&data).map_err(|e| {
            RollError::invalid_template(
                &path.display().to_string(),
                format!("failed to parse template file: {}", e),
            )
        })?;

        let count = templates.len();
        for template in templates {
            self.insert(template)?;
        }
        tracing::info!("Loaded {} template(s) from {:?}", count, path);
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Result<&Template, RollError> {
        self.templates
            .get(name)
            .ok_or_else(|| RollError::UnknownTemplate(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_templates_are_valid() {
        let set = TemplateSet::builtin();
        assert_eq!(set.names(), vec!["municipal-roll", "ward-roll"]);
        for template in set.iter() {
            template.validate().unwrap();
        }
    }

    #[test]
    fn test_record_label_differs_between_families() {
        let set = TemplateSet::builtin();
        assert_eq!(set.get("ward-roll").unwrap().record_label, "नाव");
        assert_eq!(
            set.get("municipal-roll").unwrap().record_label,
            "मतदाराचे पूर्ण"
        );
    }

    #[test]
    fn test_unknown_template_is_an_error() {
        let err = TemplateSet::builtin().get("nope").unwrap_err();
        assert!(matches!(err, RollError::UnknownTemplate(name) if name == "nope"));
    }

    #[test]
    fn test_zero_columns_rejected() {
        let template = Template {
            column_count: 0,
            ..Template::ward_roll()
        };
        assert!(matches!(
            template.validate(),
            Err(RollError::InvalidTemplate { .. })
        ));
    }

    #[test]
    fn test_retain_fraction_must_be_positive() {
        let template = Template {
            column_retain_fraction: 0.0,
            ..Template::ward_roll()
        };
        assert!(template.validate().is_err());
    }

    #[test]
    fn test_load_file_adds_templates_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{
                "name": "two-column",
                "top_margin": 10,
                "bottom_margin": 10,
                "left_margin": 5,
                "right_margin": 5,
                "column_count": 2,
                "column_retain_fraction": 0.5,
                "column_left_trim": 2,
                "record_label": "Name"
            }}]"#
        )
        .unwrap();

        let mut set = TemplateSet::builtin();
        assert_eq!(set.load_file(file.path()).unwrap(), 1);

        let template = set.get("two-column").unwrap();
        assert_eq!(template.column_count, 2);
        assert_eq!(template.labels, FieldLabels::default());
        assert_eq!(template.body_profile.as_str(), "mar");
        assert_eq!(template.roll_part_marker, "क्र");
        assert_eq!(template.substitutions, Template::ward_roll().substitutions);
        assert!(template.header.is_none());
    }

    #[test]
    fn test_load_file_rejects_bad_substitution_pattern() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "broken-rules", "top_margin": 0, "bottom_margin": 0,
                "left_margin": 0, "right_margin": 0, "column_count": 3,
                "column_retain_fraction": 0.5, "column_left_trim": 0,
                "record_label": "नाव", "substitutions": [["(", ""]]}}]"#
        )
        .unwrap();

        let mut set = TemplateSet::builtin();
        let err = set.load_file(file.path()).unwrap_err();
        assert!(
            matches!(err, RollError::InvalidTemplate { template, .. } if template == "broken-rules")
        );
    }

    #[test]
    fn test_load_file_rejects_invalid_template() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "bad", "top_margin": 0, "bottom_margin": 0, "left_margin": 0,
                "right_margin": 0, "column_count": 0, "column_retain_fraction": 1.0,
                "column_left_trim": 0, "record_label": "x"}}]"#
        )
        .unwrap();

        let mut set = TemplateSet::builtin();
        assert!(set.load_file(file.path()).is_err());
    }
}

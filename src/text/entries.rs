//! Splitting column text into entry cards and extracting voter fields

use crate::layout::template::{FieldLabels, Template};
use crate::record::{HeaderFields, VoterRecord};
use regex::Regex;

/// Optional colon between a label and its value
const SEPARATOR: &str = r"\s*[:：]?";

pub struct EntryExtractor {
    splitter: Regex,
    father: Regex,
    husband: Regex,
    house: Regex,
    age: Regex,
    gender: Regex,
}

impl EntryExtractor {
    /// Build an extractor for cards opened by `record_label`
    pub fn new(record_label: &str, labels: &FieldLabels) -> Self {
        let label = |text: &str, value: &str| {
            let pattern = format!("{}{}{}", regex::escape(text), SEPARATOR, value);
            Regex::new(&pattern).expect("escaped label forms a valid regex")
        };

        let splitter = format!(
            r"(?:^|\n)\s*{}{}\s*",
            regex::escape(record_label),
            SEPARATOR
        );

        Self {
            splitter: Regex::new(&splitter).expect("escaped label forms a valid regex"),
            father: label(&labels.father, r"\s*(.*)"),
            husband: label(&labels.husband, r"\s*(.*)"),
            // same line only, and a blank value still counts as present
            house: label(&labels.house, r"(.*)"),
            age: label(&labels.age, r"\s*(\d{1,3})"),
            gender: label(&labels.gender, r"\s*([^\n\d]+)"),
        }
    }

    pub fn for_template(template: &Template) -> Self {
        Self::new(&template.record_label, &template.labels)
    }

    /// One record per occurrence of the record label; text before the first is dropped
    pub fn extract(&self, text: &str, header: &HeaderFields) -> Vec<VoterRecord> {
        self.splitter
            .split(text)
            .skip(1)
            .map(|chunk| self.parse_chunk(chunk, header))
            .collect()
    }

    fn parse_chunk(&self, chunk: &str, header: &HeaderFields) -> VoterRecord {
        let name = if chunk.trim().is_empty() {
            String::new()
        } else {
            chunk.lines().next().map(clean).unwrap_or_default()
        };

        VoterRecord {
            name,
            father_name: first_capture(&self.father, chunk),
            husband_name: first_capture(&self.husband, chunk),
            house_number: first_capture(&self.house, chunk),
            age: first_capture(&self.age, chunk),
            gender: first_capture(&self.gender, chunk),
            header: header.clone(),
        }
    }
}

fn first_capture(pattern: &Regex, chunk: &str) -> String {
    pattern
        .captures(chunk)
        .and_then(|caps| caps.get(1))
        .map(|m| clean(m.as_str()))
        .unwrap_or_default()
}

fn clean(value: &str) -> String {
    value
        .trim_matches(|c: char| c == ':' || c == '：' || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn municipal() -> EntryExtractor {
        EntryExtractor::new("मतदाराचे पूर्ण", &FieldLabels::default())
    }

    fn ward() -> EntryExtractor {
        EntryExtractor::for_template(&Template::ward_roll())
    }

    #[test]
    fn test_single_card_all_labels() {
        let text = "मतदाराचे पूर्ण : रमेश\nवय : 45\nलिंग : पुरुष\nघर क्रमांक : 12";
        let records = municipal().extract(text, &HeaderFields::default());
        assert_eq!(
            records,
            vec![VoterRecord {
                name: "रमेश".to_string(),
                father_name: String::new(),
                husband_name: String::new(),
                house_number: "12".to_string(),
                age: "45".to_string(),
                gender: "पुरुष".to_string(),
                header: HeaderFields::default(),
            }]
        );
    }

    #[test]
    fn test_no_record_label_yields_nothing() {
        let text = "यादी भाग क्र. ३\nवय : 45\nलिंग : पुरुष";
        assert!(ward().extract(text, &HeaderFields::default()).is_empty());
    }

    #[test]
    fn test_only_name_and_age() {
        let records = ward().extract("नाव : सीता\nवय : 31", &HeaderFields::default());
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.name, "सीता");
        assert_eq!(record.age, "31");
        assert_eq!(record.father_name, "");
        assert_eq!(record.husband_name, "");
        assert_eq!(record.house_number, "");
        assert_eq!(record.gender, "");
    }

    #[test]
    fn test_leading_noise_is_discarded_and_cards_split() {
        let text = "\
छायाचित्र 1023
नाव : अनिल पाटील
वडिलांचे नाव : सुरेश पाटील
घर क्रमांक : 4/2
वय : 52 लिंग : पुरुष
नाव : सुनीता जाधव
पतीचे नाव : विजय जाधव
घर क्रमांक :
वय : 47 लिंग : स्त्री";
        let records = ward().extract(text, &HeaderFields::default());
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].name, "अनिल पाटील");
        assert_eq!(records[0].father_name, "सुरेश पाटील");
        assert_eq!(records[0].house_number, "4/2");
        assert_eq!(records[0].age, "52");
        assert_eq!(records[0].gender, "पुरुष");

        assert_eq!(records[1].name, "सुनीता जाधव");
        assert_eq!(records[1].husband_name, "विजय जाधव");
        assert_eq!(records[1].father_name, "");
        assert_eq!(records[1].house_number, "");
        assert_eq!(records[1].gender, "स्त्री");
    }

    #[test]
    fn test_label_mid_line_does_not_open_a_record() {
        let text = "नाव : गीता\nवडिलांचे नाव : राम";
        let records = ward().extract(text, &HeaderFields::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].father_name, "राम");
    }

    #[test]
    fn test_gender_stops_before_digits() {
        let records = ward().extract("नाव : क\nलिंग : पुरुष 45", &HeaderFields::default());
        assert_eq!(records[0].gender, "पुरुष");
    }

    #[test]
    fn test_age_takes_at_most_three_digits() {
        let records = ward().extract("नाव : क\nवय : 12345", &HeaderFields::default());
        assert_eq!(records[0].age, "123");
    }

    #[test]
    fn test_father_and_husband_both_kept() {
        let text = "नाव : क\nवडिलांचे नाव : ख\nपतीचे नाव : ग";
        let records = ward().extract(text, &HeaderFields::default());
        assert_eq!(records[0].father_name, "ख");
        assert_eq!(records[0].husband_name, "ग");
    }

    #[test]
    fn test_empty_chunk_still_yields_record() {
        let records = ward().extract("नाव : राम\nनाव :", &HeaderFields::default());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "राम");
        assert_eq!(records[1], VoterRecord::default());
    }

    #[test]
    fn test_header_copied_onto_every_record() {
        let header = HeaderFields {
            area_name: Some("क्षेत्र अ".to_string()),
            sub_division_number: Some("१२".to_string()),
            roll_part_number: None,
            booth_address: Some("शाळा".to_string()),
        };
        let records = ward().extract("नाव : अ\nनाव : ब", &header);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.header == header));
    }

    #[test]
    fn test_normalized_spacing_is_tolerated() {
        let text = "नाव  :  राम\nवय  :  33";
        let records = ward().extract(text, &HeaderFields::default());
        assert_eq!(records[0].name, "राम");
        assert_eq!(records[0].age, "33");
    }
}

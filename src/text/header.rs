//! Page header parsing
//!
//! The header block is three lines: area name, sub-division line, and the
//! roll-part line with the booth address after its colon. Every field is
//! optional; a missing line or an unmatched pattern leaves the field `None`.

use crate::record::HeaderFields;
use regex::Regex;
use std::sync::LazyLock;

/// ASCII or Devanagari digit run
const DIGITS: &str = "[0-9०-९]+";

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DIGITS).expect("valid digit regex"));

pub struct HeaderParser {
    roll_part: Regex,
}

impl HeaderParser {
    /// `marker` is the token printed before the roll-part number (e.g. `क्र`)
    pub fn new(marker: &str) -> Self {
        let pattern = format!(r"{}[\s.:：]*({})", regex::escape(marker), DIGITS);
        Self {
            roll_part: Regex::new(&pattern).expect("escaped marker forms a valid regex"),
        }
    }

    pub fn parse(&self, text: &str) -> HeaderFields {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        let area = lines.next();
        let sub_division = lines.next();
        let roll_part = lines.next();

        HeaderFields {
            area_name: area.map(str::to_string),
            sub_division_number: sub_division
                .and_then(|line| DIGIT_RUN.find(line))
                .map(|m| m.as_str().to_string()),
            roll_part_number: roll_part
                .and_then(|line| self.roll_part.captures(line))
                .map(|caps| caps[1].to_string()),
            booth_address: roll_part.and_then(after_first_colon),
        }
    }
}

impl Default for HeaderParser {
    fn default() -> Self {
        Self::new("क्र")
    }
}

/// Parse with the default `क्र` roll-part marker
pub fn parse_header(text: &str) -> HeaderFields {
    HeaderParser::default().parse(text)
}

fn after_first_colon(line: &str) -> Option<String> {
    line.find([':', '：']).map(|idx| {
        let rest = &line[idx..];
        let colon_len = rest.chars().next().map_or(1, char::len_utf8);
        rest[colon_len..].trim().to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Template;
    use crate::text::normalize::Normalizer;

    #[test]
    fn test_parses_three_line_header() {
        let fields = parse_header("क्षेत्र अ\nवार्ड १२\nक्र. ३ : बूथ पत्ता");
        assert_eq!(
            fields,
            HeaderFields {
                area_name: Some("क्षेत्र अ".to_string()),
                sub_division_number: Some("१२".to_string()),
                roll_part_number: Some("३".to_string()),
                booth_address: Some("बूथ पत्ता".to_string()),
            }
        );
    }

    #[test]
    fn test_parses_normalized_header() {
        let text = Normalizer::for_template(&Template::ward_roll())
            .unwrap()
            .normalize("क्षेत्र अ\nवार्ड १२\nक्र. ३: बूथ पत्ता");
        let fields = parse_header(&text);
        assert_eq!(fields.roll_part_number.as_deref(), Some("३"));
        assert_eq!(fields.booth_address.as_deref(), Some("बूथ पत्ता"));
    }

    #[test]
    fn test_ascii_digits_accepted() {
        let fields = parse_header("Ward A\nPrabhag 7\nक्र.12 : School");
        assert_eq!(fields.sub_division_number.as_deref(), Some("7"));
        assert_eq!(fields.roll_part_number.as_deref(), Some("12"));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let fields = parse_header("\n  नगर परिषद  \n\nप्रभाग क्र : ४\n");
        assert_eq!(fields.area_name.as_deref(), Some("नगर परिषद"));
        assert_eq!(fields.sub_division_number.as_deref(), Some("४"));
        assert_eq!(fields.roll_part_number, None);
        assert_eq!(fields.booth_address, None);
    }

    #[test]
    fn test_missing_everything_is_none() {
        assert_eq!(parse_header(""), HeaderFields::default());
    }

    #[test]
    fn test_no_digits_on_second_line() {
        let fields = parse_header("area\nno number here");
        assert_eq!(fields.sub_division_number, None);
    }

    #[test]
    fn test_booth_absent_without_colon_but_blank_when_empty() {
        let no_colon = parse_header("a\nb 1\nक्र 2 booth");
        assert_eq!(no_colon.booth_address, None);
        assert_eq!(no_colon.roll_part_number.as_deref(), Some("2"));

        let blank = parse_header("a\nb 1\nक्र 2 :   ");
        assert_eq!(blank.booth_address.as_deref(), Some(""));
    }

    #[test]
    fn test_custom_marker() {
        let parser = HeaderParser::new("Part No.");
        let fields = parser.parse("a\nb 1\nPart No. 9 : Hall");
        assert_eq!(fields.roll_part_number.as_deref(), Some("9"));
    }
}

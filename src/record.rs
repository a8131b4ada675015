//! Voter record and page header types

use serde::{Deserialize, Serialize};

/// Page-level administrative metadata, copied onto every record of the page.
///
/// `None` means the field was not found; `Some("")` means it was found blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderFields {
    pub area_name: Option<String>,
    pub sub_division_number: Option<String>,
    pub roll_part_number: Option<String>,
    pub booth_address: Option<String>,
}

/// One voter entry card. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub name: String,
    pub father_name: String,
    pub husband_name: String,
    pub house_number: String,
    pub age: String,
    pub gender: String,
    #[serde(flatten)]
    pub header: HeaderFields,
}

impl VoterRecord {
    /// Age as a number, if one was recognized. Accepts Devanagari digits.
    pub fn age_years(&self) -> Option<u16> {
        let ascii: String = self
            .age
            .trim()
            .chars()
            .map(|c| match c {
                '०'..='९' => char::from(b'0' + (c as u32 - '०' as u32) as u8),
                _ => c,
            })
            .collect();
        ascii.parse().ok()
    }
}

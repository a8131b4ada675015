//! Flat record tables: CSV in either column layout, or JSON

use crate::error::RollError;
use crate::layout::Template;
use crate::record::VoterRecord;
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// English headers, voter fields followed by page header fields
pub const FULL_HEADERS: [&str; 10] = [
    "Name",
    "Father Name",
    "Husband Name",
    "House Number",
    "Age",
    "Gender",
    "Area_Name",
    "SubDivision_Number",
    "RollPart_Number",
    "Booth_Address",
];

/// Marathi headers for rolls read without a header region
pub const REGIONAL_HEADERS: [&str; 6] = ["नाव", "वडिलांचे नाव", "पतीचे नाव", "घर क्रमांक", "वय", "लिंग"];

/// Column set of the CSV table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableLayout {
    Full,
    Regional,
}

/// Requested table layout; `Auto` follows the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutChoice {
    Full,
    Regional,
    #[default]
    Auto,
}

impl LayoutChoice {
    pub fn resolve(self, template: &Template) -> TableLayout {
        match self {
            Self::Full => TableLayout::Full,
            Self::Regional => TableLayout::Regional,
            Self::Auto if template.header.is_some() => TableLayout::Full,
            Self::Auto => TableLayout::Regional,
        }
    }
}

impl FromStr for LayoutChoice {
    type Err = RollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "regional" => Ok(Self::Regional),
            "auto" => Ok(Self::Auto),
            other => Err(RollError::InvalidRequest(format!(
                "Unknown table layout: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = RollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(RollError::InvalidRequest(format!(
                "Unknown output format: {}",
                other
            ))),
        }
    }
}

fn output_error(e: impl std::fmt::Display) -> RollError {
    RollError::Output(e.to_string())
}

/// Write one header row then one row per record
pub fn write_csv<W: Write>(
    records: &[VoterRecord],
    layout: TableLayout,
    writer: W,
) -> Result<(), RollError> {
    let mut wtr = WriterBuilder::new().from_writer(writer);

    let headers = match layout {
        TableLayout::Full => wtr.write_record(FULL_HEADERS),
        TableLayout::Regional => wtr.write_record(REGIONAL_HEADERS),
    };
    headers.map_err(output_error)?;

    for record in records {
        let voter: [&str; 6] = [
            &record.name,
            &record.father_name,
            &record.husband_name,
            &record.house_number,
            &record.age,
            &record.gender,
        ];
        let row = match layout {
            TableLayout::Regional => wtr.write_record(voter),
            TableLayout::Full => {
                let header = &record.header;
                let page = [
                    &header.area_name,
                    &header.sub_division_number,
                    &header.roll_part_number,
                    &header.booth_address,
                ]
                .map(|field| field.as_deref().unwrap_or(""));
                wtr.write_record(voter.iter().chain(page.iter()))
            }
        };
        row.map_err(output_error)?;
    }

    wtr.flush().map_err(output_error)
}

/// Records as a pretty-printed JSON array; absent header fields become `null`
pub fn write_json<W: Write>(records: &[VoterRecord], writer: W) -> Result<(), RollError> {
    serde_json::to_writer_pretty(writer, records).map_err(output_error)
}

/// Write the table for one input document to `path`
pub fn write_file(
    path: &Path,
    records: &[VoterRecord],
    layout: TableLayout,
    format: OutputFormat,
) -> Result<(), RollError> {
    let file = File::create(path)
        .map_err(|e| RollError::Output(format!("Failed to create {:?}: {}", path, e)))?;
    let mut writer = BufWriter::new(file);
    match format {
        OutputFormat::Csv => write_csv(records, layout, &mut writer)?,
        OutputFormat::Json => write_json(records, &mut writer)?,
    }
    writer.flush().map_err(output_error)?;
    tracing::info!("Wrote {} records to {:?}", records.len(), path);
    Ok(())
}

//! Reading the student sheet into typed records.
//!
//! Cells are coerced with fixed defaults: unparsable or missing numbers
//! become `0`, a missing name drops the row, and a `nan` comment becomes
//! empty. Only a table that cannot be read at all is an error.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder, Trim};
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::error::IngestionError;
use crate::models::{CohortMetadata, NormalizedStudent, UNKNOWN};

pub const REQUIRED_COLUMNS: [&str; 8] = [
    "student_name",
    "attendance_percentage",
    "average_grade_0_to_10",
    "rosetta_weekly_hours",
    "teacher_comments",
    "company_name",
    "group_code",
    "report_date",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub metadata: CohortMetadata,
    pub students: Vec<NormalizedStudent>,
}

/// One row with blank cells already mapped to `None`.
#[derive(Debug, Clone, Default)]
struct RawRow {
    student_name: Option<String>,
    attendance_percentage: Option<String>,
    average_grade_0_to_10: Option<String>,
    rosetta_weekly_hours: Option<String>,
    teacher_comments: Option<String>,
    company_name: Option<String>,
    group_code: Option<String>,
    report_date: Option<String>,
}

struct Columns(HashMap<String, usize>);

impl Columns {
    fn from_headers(headers: &ByteRecord) -> Self {
        let mut index = HashMap::new();
        for (position, header) in headers.iter().enumerate() {
            // first occurrence wins on duplicate headers
            index
                .entry(String::from_utf8_lossy(header).trim().to_lowercase())
                .or_insert(position);
        }
        Self(index)
    }

    fn missing(&self) -> Vec<&'static str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !self.0.contains_key(*column))
            .collect()
    }

    /// Cells that are not valid UTF-8 are decoded lossily rather than
    /// rejecting the row.
    fn cell(&self, record: &ByteRecord, column: &str) -> Option<String> {
        let raw = record.get(*self.0.get(column)?)?;
        let value = String::from_utf8_lossy(raw);
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    fn row(&self, record: &ByteRecord) -> RawRow {
        RawRow {
            student_name: self.cell(record, "student_name"),
            attendance_percentage: self.cell(record, "attendance_percentage"),
            average_grade_0_to_10: self.cell(record, "average_grade_0_to_10"),
            rosetta_weekly_hours: self.cell(record, "rosetta_weekly_hours"),
            teacher_comments: self.cell(record, "teacher_comments"),
            company_name: self.cell(record, "company_name"),
            group_code: self.cell(record, "group_code"),
            report_date: self.cell(record, "report_date"),
        }
    }
}

pub fn parse_number(cell: Option<&str>) -> f64 {
    cell.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

pub fn normalize_comment(cell: Option<&str>) -> String {
    match cell.map(str::trim) {
        Some(text) if !text.eq_ignore_ascii_case("nan") => text.to_string(),
        _ => String::new(),
    }
}

fn or_unknown(cell: Option<String>) -> String {
    cell.unwrap_or_else(|| UNKNOWN.to_string())
}

fn metadata_from(row: &RawRow) -> CohortMetadata {
    CohortMetadata {
        company: or_unknown(row.company_name.clone()),
        group: or_unknown(row.group_code.clone()),
        report_date: or_unknown(row.report_date.clone()),
    }
}

fn normalize(row: RawRow) -> Option<NormalizedStudent> {
    let name = row.student_name?;

    Some(NormalizedStudent {
        name,
        attendance: parse_number(row.attendance_percentage.as_deref()),
        grade: parse_number(row.average_grade_0_to_10.as_deref()),
        platform_hours: parse_number(row.rosetta_weekly_hours.as_deref()),
        comments: normalize_comment(row.teacher_comments.as_deref()),
    })
}

/// Parse a CSV table. Metadata comes from the first data row even when that
/// row has no student name.
pub fn parse_table<R: Read>(reader: R) -> Result<Ingested, IngestionError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let columns = Columns::from_headers(reader.byte_headers()?);

    let missing = columns.missing();
    if !missing.is_empty() {
        warn!(columns = ?missing, "sheet is missing expected columns");
    }

    let mut metadata = None;
    let mut students = Vec::new();
    let mut skipped = 0usize;

    for record in reader.byte_records() {
        let row = columns.row(&record?);

        if metadata.is_none() {
            metadata = Some(metadata_from(&row));
        }

        match normalize(row) {
            Some(student) => students.push(student),
            None => skipped += 1,
        }
    }

    info!(students = students.len(), skipped, "sheet ingested");

    Ok(Ingested {
        metadata: metadata.unwrap_or_default(),
        students,
    })
}

/// Resolve the table file for `input`. A directory is treated as a workbook
/// holding one `<sheet>.csv` per sheet.
pub fn locate_sheet(input: &Path, sheet: &str) -> Result<PathBuf, IngestionError> {
    if input.is_dir() {
        let path = input.join(format!("{sheet}.csv"));
        if path.is_file() {
            return Ok(path);
        }
        return Err(IngestionError::SheetNotFound {
            sheet: sheet.to_string(),
            path: input.to_path_buf(),
        });
    }

    if input.is_file() {
        Ok(input.to_path_buf())
    } else {
        Err(IngestionError::SheetNotFound {
            sheet: sheet.to_string(),
            path: input.to_path_buf(),
        })
    }
}

pub fn read_sheet(input: &Path, config: &IngestConfig) -> Result<Ingested, IngestionError> {
    let path = locate_sheet(input, &config.sheet_name)?;
    debug!(path = %path.display(), "reading sheet");

    let size = std::fs::metadata(&path)
        .map_err(|source| IngestionError::Unreadable {
            path: path.clone(),
            source,
        })?
        .len();
    if size > config.max_input_bytes {
        return Err(IngestionError::TooLarge {
            path,
            size,
            limit: config.max_input_bytes,
        });
    }

    let file = File::open(&path).map_err(|source| IngestionError::Unreadable {
        path: path.clone(),
        source,
    })?;
    parse_table(file)
}

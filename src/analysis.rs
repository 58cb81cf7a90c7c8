//! The analysis pipeline: ingested rows → scaled cohort → classified
//! students → cohort statistics → assembled [`Report`].

use std::path::Path;

use tracing::{debug, info};

use crate::config::IngestConfig;
use crate::error::IngestionError;
use crate::ingest::{self, Ingested};
use crate::models::{ClassifiedStudent, CohortMetadata, CohortStats, Report, ReportMeta, StudentEntry};
use crate::risk;
use crate::scale;
use crate::stats::{self, round_to};

impl From<&ClassifiedStudent> for StudentEntry {
    fn from(classified: &ClassifiedStudent) -> Self {
        let student = &classified.student;
        Self {
            name: student.name.clone(),
            issues: classified.issues.clone(),
            tier: classified.tier,
            actions: classified.actions.clone(),
            attendance: round_to(student.attendance, 0),
            grade: round_to(student.grade, 2),
            platform_hours: student.platform_hours,
            comments: student.comments.clone(),
        }
    }
}

/// Combine the parts into a report. Metrics are rounded for display here.
pub fn assemble(metadata: CohortMetadata, stats: CohortStats, students: &[ClassifiedStudent]) -> Report {
    Report {
        success: true,
        meta: ReportMeta {
            company: metadata.company,
            group: metadata.group,
            date: metadata.report_date,
            total: students.len(),
        },
        stats,
        students: students.iter().map(StudentEntry::from).collect(),
        history_filename: None,
    }
}

pub fn analyze(ingested: Ingested) -> Report {
    let cohort = scale::rescale(ingested.students);
    debug!(scale = ?cohort.scale, "attendance scale detected");
    let classified = risk::classify_cohort(&cohort);
    let stats = stats::aggregate(&classified);

    info!(
        total = classified.len(),
        high = stats.high_count,
        medium = stats.medium_count,
        low = stats.low_count,
        "cohort classified"
    );

    assemble(ingested.metadata, stats, &classified)
}

pub fn analyze_path(input: &Path, config: &IngestConfig) -> Result<Report, IngestionError> {
    let ingested = ingest::read_sheet(input, config)?;
    Ok(analyze(ingested))
}

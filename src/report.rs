use std::fmt::Write;

use crate::models::{CohortStats, Report, StudentEntry};

const GRADE_REVIEW_THRESHOLD: f64 = 30.0;

/// Cohort-level recommendations printed in the exported document.
pub fn recommendations(stats: &CohortStats) -> Vec<&'static str> {
    let mut recs = vec![
        "Monitor platform usage weekly.",
        "Reinforce attendance importance.",
    ];
    if stats.pct_low_grade > GRADE_REVIEW_THRESHOLD {
        recs.push("Consider general review session due to low grades.");
    }
    recs
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn metrics_line(student: &StudentEntry) -> String {
    format!(
        "Attendance: {:.0}%  |  Grade: {}  |  Platform: {}h",
        student.attendance, student.grade, student.platform_hours
    )
}

/// Plain-text view of the whole cohort, every student included.
pub fn render_overview(report: &Report) -> String {
    let mut output = String::new();
    let meta = &report.meta;
    let stats = &report.stats;

    let _ = writeln!(output, "{} | group {} | {}", meta.company, meta.group, meta.date);
    let _ = writeln!(
        output,
        "{} students: {} high, {} medium, {} low risk",
        meta.total, stats.high_count, stats.medium_count, stats.low_count
    );
    let _ = writeln!(
        output,
        "Low attendance {}% | low grade {}% | low platform usage {}%",
        stats.pct_low_attendance, stats.pct_low_grade, stats.pct_low_platform
    );

    if let Some(filename) = &report.history_filename {
        let _ = writeln!(output, "Saved as {filename}");
    }

    let _ = writeln!(output);

    if report.students.is_empty() {
        let _ = writeln!(output, "No students found in this sheet.");
        return output;
    }

    for student in &report.students {
        let _ = writeln!(output, "- {} [{}]", student.name, student.tier);
        let _ = writeln!(output, "    {}", metrics_line(student));
        if !student.issues.is_empty() {
            let _ = writeln!(output, "    Issues: {}", join(&student.issues));
        }
        if !student.actions.is_empty() {
            let _ = writeln!(output, "    Actions: {}", join(&student.actions));
        }
    }

    output
}

/// Markdown export: summary cards, recommendations and at-risk students only.
pub fn render_document(report: &Report) -> String {
    let mut output = String::new();
    let meta = &report.meta;
    let stats = &report.stats;

    let _ = writeln!(output, "# Report: {}", meta.company);
    let _ = writeln!(
        output,
        "Group: {}   |   Students: {}   |   Report date: {}",
        meta.group, meta.total, meta.date
    );
    let _ = writeln!(output);

    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "| HIGH RISK | MEDIUM RISK | LOW USAGE | LOW ATT |");
    let _ = writeln!(output, "|:---:|:---:|:---:|:---:|");
    let _ = writeln!(
        output,
        "| {} | {} | {}% | {}% |",
        stats.high_count, stats.medium_count, stats.pct_low_platform, stats.pct_low_attendance
    );
    let _ = writeln!(output);

    let _ = writeln!(output, "## Recommendations");
    for rec in recommendations(stats) {
        let _ = writeln!(output, "- {rec}");
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "## At-Risk Student Analysis");
    let mut at_risk = report.at_risk_students().peekable();

    if at_risk.peek().is_none() {
        let _ = writeln!(output, "No at-risk students in this cohort.");
    } else {
        for student in at_risk {
            let _ = writeln!(output, "### {} ({})", student.name, student.tier);
            let _ = writeln!(output, "{}", metrics_line(student));
            let _ = writeln!(output);
            let _ = writeln!(output, "_{}_", join(&student.issues));
            let _ = writeln!(output);
        }
    }

    output
}

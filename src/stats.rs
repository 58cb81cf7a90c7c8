use crate::models::{ClassifiedStudent, CohortStats, RiskTier};

/// Round the exact binary value half to even at `decimals` places.
/// Goes through decimal formatting so `2.675` (stored just below the tie)
/// rounds down.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

/// Share of `count` in `total` as a percentage with one decimal; 0 for an empty cohort.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(count as f64 / total as f64 * 100.0, 1)
}

fn count_where(students: &[ClassifiedStudent], predicate: impl Fn(&ClassifiedStudent) -> bool) -> usize {
    students.iter().filter(|student| predicate(student)).count()
}

/// Flag percentages count raised flags, independent of the final tier.
pub fn aggregate(students: &[ClassifiedStudent]) -> CohortStats {
    let total = students.len();

    CohortStats {
        high_count: count_where(students, |s| s.tier == RiskTier::High),
        medium_count: count_where(students, |s| s.tier == RiskTier::Medium),
        low_count: count_where(students, |s| s.tier == RiskTier::Low),
        pct_low_attendance: percentage(count_where(students, |s| s.flags.low_attendance), total),
        pct_low_grade: percentage(count_where(students, |s| s.flags.low_grade), total),
        pct_low_platform: percentage(count_where(students, |s| s.flags.low_platform), total),
    }
}

use crate::models::{Action, ClassifiedStudent, Issue, NormalizedStudent, RiskFlags, RiskTier};
use crate::scale::ScaledCohort;

pub const ATTENDANCE_THRESHOLD: f64 = 75.0;
pub const GRADE_THRESHOLD: f64 = 7.0;
pub const PLATFORM_HOURS_THRESHOLD: f64 = 2.0;

/// Lower-case fragments that mark a teacher comment as a concern.
pub const CONCERN_KEYWORDS: [&str; 5] = [
    "demotivation",
    "low engagement",
    "desmotiv",
    "baja partici",
    "poco partici",
];

pub fn comment_raises_concern(comments: &str) -> bool {
    let lowered = comments.to_lowercase();
    CONCERN_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// Flags are computed from unrounded values; attendance must already be in percent.
pub fn evaluate_flags(student: &NormalizedStudent) -> RiskFlags {
    RiskFlags {
        low_attendance: student.attendance < ATTENDANCE_THRESHOLD,
        low_grade: student.grade < GRADE_THRESHOLD,
        low_platform: student.platform_hours < PLATFORM_HOURS_THRESHOLD,
        comment_concern: comment_raises_concern(&student.comments),
    }
}

pub fn issues_for(flags: &RiskFlags) -> Vec<Issue> {
    [
        (flags.low_attendance, Issue::LowAttendance),
        (flags.low_grade, Issue::LowGrade),
        (flags.low_platform, Issue::LowPlatformUsage),
        (flags.comment_concern, Issue::TeacherCommentConcern),
    ]
    .into_iter()
    .filter_map(|(raised, issue)| raised.then_some(issue))
    .collect()
}

pub fn tier_for(flags: &RiskFlags) -> RiskTier {
    match flags.numeric_count() {
        _ if flags.comment_concern => RiskTier::High,
        0 => RiskTier::Low,
        1 => RiskTier::Medium,
        _ => RiskTier::High,
    }
}

pub fn actions_for(flags: &RiskFlags, tier: RiskTier) -> Vec<Action> {
    let mut actions = Vec::new();

    match (flags.low_attendance, flags.low_grade) {
        (true, true) => actions.push(Action::MandatoryReinforcement),
        (true, false) | (false, true) => actions.push(Action::SaturdayReinforcement),
        (false, false) => {}
    }

    if flags.low_platform {
        actions.push(Action::EncouragePractice);
    }

    if tier.is_at_risk() {
        actions.push(Action::ContactStudent);
    }

    actions
}

pub fn classify(student: NormalizedStudent) -> ClassifiedStudent {
    let flags = evaluate_flags(&student);
    let tier = tier_for(&flags);

    ClassifiedStudent {
        issues: issues_for(&flags),
        actions: actions_for(&flags, tier),
        student,
        flags,
        tier,
    }
}

pub fn classify_cohort(cohort: &ScaledCohort) -> Vec<ClassifiedStudent> {
    cohort.students().iter().cloned().map(classify).collect()
}

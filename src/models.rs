use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";

/// Cohort context carried by the first row of the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortMetadata {
    pub company: String,
    pub group: String,
    pub report_date: String,
}

impl Default for CohortMetadata {
    fn default() -> Self {
        Self {
            company: UNKNOWN.to_string(),
            group: UNKNOWN.to_string(),
            report_date: UNKNOWN.to_string(),
        }
    }
}

/// One student row after field coercion. Attendance may still be a fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStudent {
    pub name: String,
    pub attendance: f64,
    pub grade: f64,
    pub platform_hours: f64,
    pub comments: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskFlags {
    pub low_attendance: bool,
    pub low_grade: bool,
    pub low_platform: bool,
    pub comment_concern: bool,
}

impl RiskFlags {
    /// Number of numeric threshold flags raised. The comment flag is not counted.
    pub fn numeric_count(&self) -> usize {
        [self.low_attendance, self.low_grade, self.low_platform]
            .iter()
            .filter(|flag| **flag)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "LOW RISK",
            RiskTier::Medium => "MEDIUM RISK",
            RiskTier::High => "HIGH RISK",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }

    pub fn is_at_risk(&self) -> bool {
        *self != RiskTier::Low
    }

    fn from_css_class(value: &str) -> Option<Self> {
        match value {
            "low" => Some(RiskTier::Low),
            "medium" => Some(RiskTier::Medium),
            "high" => Some(RiskTier::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RiskTier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "LOW RISK" => Ok(RiskTier::Low),
            "MEDIUM RISK" => Ok(RiskTier::Medium),
            "HIGH RISK" => Ok(RiskTier::High),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Issue {
    #[serde(rename = "Low Attendance")]
    LowAttendance,
    #[serde(rename = "Low Grade")]
    LowGrade,
    #[serde(rename = "Low Platform Usage")]
    LowPlatformUsage,
    #[serde(rename = "Teacher Comment Concern")]
    TeacherCommentConcern,
}

impl Issue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Issue::LowAttendance => "Low Attendance",
            Issue::LowGrade => "Low Grade",
            Issue::LowPlatformUsage => "Low Platform Usage",
            Issue::TeacherCommentConcern => "Teacher Comment Concern",
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "Mandatory Saturday reinforcement (2 weeks) + follow-up review")]
    MandatoryReinforcement,
    #[serde(rename = "Saturday reinforcement session 9:00–10:00 AM")]
    SaturdayReinforcement,
    #[serde(rename = "Encourage consistent practice")]
    EncouragePractice,
    #[serde(rename = "Contact student and schedule follow-up")]
    ContactStudent,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::MandatoryReinforcement => {
                "Mandatory Saturday reinforcement (2 weeks) + follow-up review"
            }
            Action::SaturdayReinforcement => "Saturday reinforcement session 9:00–10:00 AM",
            Action::EncouragePractice => "Encourage consistent practice",
            Action::ContactStudent => "Contact student and schedule follow-up",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification result for one student. Metrics are kept unrounded.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedStudent {
    pub student: NormalizedStudent,
    pub flags: RiskFlags,
    pub issues: Vec<Issue>,
    pub tier: RiskTier,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortStats {
    #[serde(rename = "high")]
    pub high_count: usize,
    #[serde(rename = "medium")]
    pub medium_count: usize,
    #[serde(rename = "low")]
    pub low_count: usize,
    #[serde(rename = "pct_att")]
    pub pct_low_attendance: f64,
    #[serde(rename = "pct_grade")]
    pub pct_low_grade: f64,
    #[serde(rename = "pct_rosetta")]
    pub pct_low_platform: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMeta {
    pub company: String,
    pub group: String,
    pub date: String,
    pub total: usize,
}

/// Presentation projection of a classified student, as stored in reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "StudentRecord", try_from = "StudentRecord")]
pub struct StudentEntry {
    pub name: String,
    pub issues: Vec<Issue>,
    pub tier: RiskTier,
    pub actions: Vec<Action>,
    pub attendance: f64,
    pub grade: f64,
    pub platform_hours: f64,
    pub comments: String,
}

#[derive(Serialize, Deserialize)]
struct StudentRecord {
    name: String,
    issues: Vec<Issue>,
    risk: String,
    risk_class: String,
    actions: Vec<Action>,
    att: f64,
    grade: f64,
    rosetta: f64,
    comments: String,
}

impl From<StudentEntry> for StudentRecord {
    fn from(entry: StudentEntry) -> Self {
        Self {
            name: entry.name,
            issues: entry.issues,
            risk: entry.tier.label().to_string(),
            risk_class: entry.tier.css_class().to_string(),
            actions: entry.actions,
            att: entry.attendance,
            grade: entry.grade,
            rosetta: entry.platform_hours,
            comments: entry.comments,
        }
    }
}

impl TryFrom<StudentRecord> for StudentEntry {
    type Error = String;

    fn try_from(record: StudentRecord) -> Result<Self, Self::Error> {
        let tier: RiskTier = record.risk.parse()?;
        match RiskTier::from_css_class(&record.risk_class) {
            Some(class) if class == tier => {}
            _ => {
                return Err(format!(
                    "risk_class {:?} does not match risk {:?}",
                    record.risk_class, record.risk
                ))
            }
        }

        Ok(Self {
            name: record.name,
            issues: record.issues,
            tier,
            actions: record.actions,
            attendance: record.att,
            grade: record.grade,
            platform_hours: record.rosetta,
            comments: record.comments,
        })
    }
}

fn default_success() -> bool {
    true
}

/// One analysis run: what the overview, the exported document and the
/// history store all consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default = "default_success")]
    pub success: bool,
    pub meta: ReportMeta,
    pub stats: CohortStats,
    pub students: Vec<StudentEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_filename: Option<String>,
}

impl Report {
    pub fn at_risk_students(&self) -> impl Iterator<Item = &StudentEntry> {
        self.students.iter().filter(|student| student.tier.is_at_risk())
    }
}

/// Listing projection of a stored report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub filename: String,
    pub date: String,
    pub company: String,
    pub group: String,
    pub high_risk: usize,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tier: RiskTier) -> StudentEntry {
        StudentEntry {
            name: "Ana Ruiz".to_string(),
            issues: vec![Issue::LowGrade],
            tier,
            actions: vec![Action::SaturdayReinforcement, Action::ContactStudent],
            attendance: 88.0,
            grade: 6.25,
            platform_hours: 3.5,
            comments: String::new(),
        }
    }

    #[test]
    fn student_entry_serializes_to_report_shape() {
        let value = serde_json::to_value(entry(RiskTier::Medium)).unwrap();
        assert_eq!(value["risk"], "MEDIUM RISK");
        assert_eq!(value["risk_class"], "medium");
        assert_eq!(value["issues"][0], "Low Grade");
        assert_eq!(value["actions"][0], "Saturday reinforcement session 9:00–10:00 AM");
        assert_eq!(value["att"], 88.0);
        assert_eq!(value["rosetta"], 3.5);
    }

    #[test]
    fn mismatched_risk_class_is_rejected() {
        let mut value = serde_json::to_value(entry(RiskTier::High)).unwrap();
        value["risk_class"] = serde_json::Value::from("low");
        assert!(serde_json::from_value::<StudentEntry>(value).is_err());
    }

    #[test]
    fn stats_use_short_field_names() {
        let stats = CohortStats {
            high_count: 2,
            pct_low_platform: 12.5,
            ..CohortStats::default()
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["high"], 2);
        assert_eq!(value["pct_rosetta"], 12.5);
    }

    #[test]
    fn numeric_count_ignores_comment_flag() {
        let flags = RiskFlags {
            low_grade: true,
            comment_concern: true,
            ..RiskFlags::default()
        };
        assert_eq!(flags.numeric_count(), 1);
    }
}

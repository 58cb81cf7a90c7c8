use tracing::info;

use crate::models::NormalizedStudent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceScale {
    /// Values in `(0, 1]`, rescaled to percentages.
    Fraction,
    Percentage,
}

/// A cohort whose attendance is known to be expressed in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledCohort {
    pub scale: AttendanceScale,
    students: Vec<NormalizedStudent>,
}

impl ScaledCohort {
    pub fn students(&self) -> &[NormalizedStudent] {
        &self.students
    }
}

/// Decide the scale from the whole batch. Only a positive maximum at or
/// below 1.0 marks the column as fractions.
pub fn detect_scale(students: &[NormalizedStudent]) -> AttendanceScale {
    let max = students
        .iter()
        .map(|student| student.attendance)
        .fold(f64::NEG_INFINITY, f64::max);

    if max > 0.0 && max <= 1.0 {
        AttendanceScale::Fraction
    } else {
        AttendanceScale::Percentage
    }
}

pub fn rescale(students: Vec<NormalizedStudent>) -> ScaledCohort {
    let scale = detect_scale(&students);

    let students = match scale {
        AttendanceScale::Fraction => {
            info!(students = students.len(), "attendance looks fractional, scaling by 100");
            students
                .into_iter()
                .map(|student| NormalizedStudent {
                    attendance: student.attendance * 100.0,
                    ..student
                })
                .collect()
        }
        AttendanceScale::Percentage => students,
    };

    ScaledCohort { scale, students }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(attendance: f64) -> NormalizedStudent {
        NormalizedStudent {
            name: "Student".to_string(),
            attendance,
            grade: 8.0,
            platform_hours: 3.0,
            comments: String::new(),
        }
    }

    fn attendances(cohort: &ScaledCohort) -> Vec<f64> {
        cohort.students().iter().map(|s| s.attendance).collect()
    }

    #[test]
    fn fractions_are_scaled_to_percent() {
        let cohort = rescale(vec![student(0.6), student(1.0), student(0.0)]);
        assert_eq!(cohort.scale, AttendanceScale::Fraction);
        assert_eq!(attendances(&cohort), vec![60.0, 100.0, 0.0]);
    }

    #[test]
    fn percentages_pass_through() {
        let cohort = rescale(vec![student(80.0), student(90.0)]);
        assert_eq!(cohort.scale, AttendanceScale::Percentage);
        assert_eq!(attendances(&cohort), vec![80.0, 90.0]);
    }

    #[test]
    fn all_zero_attendance_is_left_alone() {
        let cohort = rescale(vec![student(0.0), student(0.0)]);
        assert_eq!(cohort.scale, AttendanceScale::Percentage);
        assert_eq!(attendances(&cohort), vec![0.0, 0.0]);
    }

    #[test]
    fn empty_batch_is_unchanged() {
        let cohort = rescale(Vec::new());
        assert_eq!(cohort.scale, AttendanceScale::Percentage);
        assert!(cohort.students().is_empty());
    }

    #[test]
    fn decision_uses_batch_maximum() {
        // one percentage value keeps small values from being rescaled
        let cohort = rescale(vec![student(0.5), student(45.0)]);
        assert_eq!(attendances(&cohort), vec![0.5, 45.0]);
    }

    #[test]
    fn rescaling_twice_is_idempotent() {
        let once = rescale(vec![student(0.75), student(0.9)]);
        let twice = rescale(once.students().to_vec());
        assert_eq!(twice.scale, AttendanceScale::Percentage);
        assert_eq!(attendances(&once), attendances(&twice));
    }
}

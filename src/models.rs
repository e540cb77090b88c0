use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder for identity fields the extractor could not find.
pub const UNKNOWN: &str = "Unknown";

/// Grades that count a subject as not passed.
pub const FAILING_GRADES: [&str; 6] = ["F", "FF", "AB", "IC", "ABS", "Fail"];

/// Column order used by the subject grade summary.
pub const GRADE_SCALE: [&str; 8] = ["O", "A+", "A", "B+", "B", "C", "P", "F"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    Pass,
    Fail,
}

impl ResultStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultStatus::Pass => "Pass",
            ResultStatus::Fail => "Fail",
        }
    }
}

impl FromStr for ResultStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pass" => Ok(ResultStatus::Pass),
            "fail" => Ok(ResultStatus::Fail),
            other => Err(format!("unknown result status {other:?}, expected pass or fail")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectGrade {
    pub course_code: String,
    pub course_name: String,
    pub grade: String,
}

impl SubjectGrade {
    pub fn is_passed(&self) -> bool {
        !FAILING_GRADES.contains(&self.grade.as_str())
    }
}

/// One student's result for one uploaded sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub seat_number: String,
    pub name: String,
    pub mother_name: String,
    pub prn: String,
    /// Token exactly as it appeared on the sheet, `--` included.
    pub sgpa_raw: String,
    pub sgpa: f64,
    pub has_valid_sgpa: bool,
    pub credits: u64,
    pub subjects: Vec<SubjectGrade>,
    pub passed_subject_count: usize,
    pub total_subject_count: usize,
    pub result_status: ResultStatus,
}

impl StudentRecord {
    /// Builds a record and derives the SGPA, subject counts and status.
    ///
    /// A `sgpa_raw` that does not parse as a number (the `--` sentinel
    /// among others) yields `sgpa == 0.0`, which reads as `Fail`. An
    /// unreported SGPA and a genuine zero are indistinguishable here;
    /// `sgpa_raw` keeps the original token for callers that care.
    ///
    /// Credits are read as `u64`; a token beyond that range is treated as
    /// unmatched and becomes `0`.
    pub fn new(
        seat_number: String,
        name: String,
        mother_name: String,
        prn: String,
        sgpa_raw: String,
        credits: u64,
        subjects: Vec<SubjectGrade>,
    ) -> Self {
        let sgpa = sgpa_raw.parse::<f64>().unwrap_or(0.0);
        let has_valid_sgpa = sgpa > 0.0;
        let passed_subject_count = subjects.iter().filter(|s| s.is_passed()).count();
        let total_subject_count = subjects.len();

        Self {
            seat_number,
            name,
            mother_name,
            prn,
            sgpa_raw,
            sgpa,
            has_valid_sgpa,
            credits,
            subjects,
            passed_subject_count,
            total_subject_count,
            result_status: if has_valid_sgpa {
                ResultStatus::Pass
            } else {
                ResultStatus::Fail
            },
        }
    }

    pub fn failed_subject_count(&self) -> usize {
        self.total_subject_count - self.passed_subject_count
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub total_students: usize,
    pub passed_students: usize,
    pub failed_students: usize,
    pub average_sgpa: f64,
    pub pass_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectGradeRow {
    pub course_code: String,
    pub course_name: String,
    pub total_students: usize,
    /// One entry per grade in [`GRADE_SCALE`], in that order.
    pub grade_counts: Vec<(String, usize)>,
    pub failure_rate: f64,
}

impl SubjectGradeRow {
    pub fn count(&self, grade: &str) -> usize {
        self.grade_counts
            .iter()
            .find(|(g, _)| g == grade)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

/// Distribution of valid SGPAs within one sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SgpaStatistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p10: f64,
    pub p90: f64,
}

/// Detailed-listing options: minimum SGPA, optional status, sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecordFilter {
    pub min_sgpa: f64,
    pub status: Option<ResultStatus>,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub file_name: String,
    pub exam_tag: String,
    pub department: String,
    pub year: String,
    pub uploaded_by: String,
}

/// A stored upload: the parsed records of one sheet plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    pub id: Uuid,
    pub metadata: UploadMetadata,
    pub uploaded_at: DateTime<Utc>,
    pub summary: ResultSummary,
    pub students: Vec<StudentRecord>,
}

impl ResultFile {
    pub fn exam_label(&self) -> &str {
        if self.metadata.exam_tag.trim().is_empty() {
            &self.metadata.file_name
        } else {
            &self.metadata.exam_tag
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadFilter {
    /// Case-insensitive fragment of the exam tag or file name.
    pub query: Option<String>,
    pub department: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentRollup {
    pub department: String,
    pub total_students: usize,
    pub pass_rate: f64,
    /// Average of each upload's average SGPA, weighted by its student count.
    pub average_sgpa: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearRollup {
    pub year: String,
    pub total_students: usize,
    pub pass_rate: f64,
}

/// Institution-wide rollup over every stored upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollegeOverview {
    pub exams: usize,
    pub total_students: usize,
    pub passed_students: usize,
    pub pass_rate: f64,
    pub average_sgpa: f64,
    pub departments: Vec<DepartmentRollup>,
    pub years: Vec<YearRollup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub exam: String,
    pub uploaded_at: DateTime<Utc>,
    pub sgpa: f64,
    pub result_status: ResultStatus,
    pub credits: u64,
    pub seat_number: String,
    pub subjects: Vec<SubjectGrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentHistory {
    pub name: String,
    pub prn: String,
    pub mother_name: String,
    pub results: Vec<HistoryEntry>,
}

use std::fmt::Write;

use crate::history;
use crate::models::{StudentHistory, StudentRecord, GRADE_SCALE};
use crate::stats;

pub fn build_report(label: &str, records: &[StudentRecord], top: usize) -> String {
    let summary = stats::summarize(records);
    let toppers = stats::top_students(records, top);
    let failed = stats::failed_students(records);
    let subjects = stats::subject_grade_summary(records);
    let distribution = stats::sgpa_statistics(records);

    let mut output = String::new();

    let _ = writeln!(output, "# Result Analysis Report");
    let _ = writeln!(output, "Generated for {}", label);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Students: {}", summary.total_students);
    let _ = writeln!(
        output,
        "- Passed: {} ({:.1}%)",
        summary.passed_students, summary.pass_percentage
    );
    let _ = writeln!(output, "- Failed: {}", summary.failed_students);
    let _ = writeln!(output, "- Average SGPA: {:.2}", summary.average_sgpa);

    let _ = writeln!(output);
    let _ = writeln!(output, "## SGPA Statistics");

    match distribution {
        Some(sgpa) => {
            let _ = writeln!(
                output,
                "- Mean {:.2}, median {:.2}, mode {:.2}",
                sgpa.mean, sgpa.median, sgpa.mode
            );
            let _ = writeln!(output, "- Standard deviation {:.2}", sgpa.std_dev);
            let _ = writeln!(output, "- Range {:.2} to {:.2}", sgpa.min, sgpa.max);
            let _ = writeln!(
                output,
                "- 10th percentile {:.2}, 90th percentile {:.2}",
                sgpa.p10, sgpa.p90
            );
        }
        None => {
            let _ = writeln!(output, "No valid SGPA values.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Students");

    if toppers.is_empty() {
        let _ = writeln!(output, "No students with a valid SGPA.");
    } else {
        for (rank, student) in toppers.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. {} ({}, seat {}) SGPA {:.2}",
                rank + 1,
                student.name,
                student.prn,
                student.seat_number,
                student.sgpa
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Failed Students");

    if failed.is_empty() {
        let _ = writeln!(output, "Every student passed.");
    } else {
        for student in failed.iter() {
            let _ = writeln!(
                output,
                "- {} ({}, seat {}) SGPA {} with {} of {} subjects failed",
                student.name,
                student.prn,
                student.seat_number,
                student.sgpa_raw,
                student.failed_subject_count(),
                student.total_subject_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subject Grades");

    if subjects.is_empty() {
        let _ = writeln!(output, "No subject rows found.");
    } else {
        let _ = writeln!(
            output,
            "| Code | Course | Students | {} | Failure Rate (%) |",
            GRADE_SCALE.join(" | ")
        );
        let _ = writeln!(output, "|{}", "---|".repeat(GRADE_SCALE.len() + 4));
        for row in subjects.iter() {
            let counts: Vec<String> = GRADE_SCALE
                .iter()
                .map(|grade| row.count(grade).to_string())
                .collect();
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {:.1} |",
                row.course_code,
                row.course_name,
                row.total_students,
                counts.join(" | "),
                row.failure_rate
            );
        }
    }

    output
}

pub fn build_history(history: &StudentHistory) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "{} ({}), mother {}", history.name, history.prn, history.mother_name);

    for entry in history.results.iter() {
        let _ = writeln!(
            output,
            "- {} [{}] seat {} SGPA {:.2} {} ({} credits, {} subjects)",
            entry.exam,
            entry.uploaded_at.format("%Y-%m-%d"),
            entry.seat_number,
            entry.sgpa,
            entry.result_status.as_str(),
            entry.credits,
            entry.subjects.len()
        );
    }

    match stats::predict_next_sgpa(&history::sgpa_series(history)) {
        Some(predicted) => {
            let _ = writeln!(output, "Predicted next SGPA: {:.2}", predicted);
        }
        None => {
            let _ = writeln!(output, "Not enough results to predict the next SGPA.");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistoryEntry, ResultStatus, SubjectGrade};
    use chrono::{TimeZone, Utc};

    fn sample_record(seat: &str, name: &str, sgpa_raw: &str, grade: &str) -> StudentRecord {
        StudentRecord::new(
            seat.to_string(),
            name.to_string(),
            "MEENA".to_string(),
            format!("PRN{seat}"),
            sgpa_raw.to_string(),
            20,
            vec![SubjectGrade {
                course_code: "41301".to_string(),
                course_name: "ENGG MATHS III".to_string(),
                grade: grade.to_string(),
            }],
        )
    }

    #[test]
    fn report_lists_summary_toppers_and_failures() {
        let records = vec![
            sample_record("S1", "PATIL ROHAN", "9.20", "O"),
            sample_record("S2", "JOSHI ANAY", "--", "FF"),
        ];
        let report = build_report("TE Computer May 2024", &records, 10);

        assert!(report.contains("Generated for TE Computer May 2024"));
        assert!(report.contains("- Passed: 1 (50.0%)"));
        assert!(report.contains("1. PATIL ROHAN (PRNS1, seat S1) SGPA 9.20"));
        assert!(report.contains("- JOSHI ANAY (PRNS2, seat S2) SGPA -- with 1 of 1 subjects failed"));
        assert!(report.contains("| 41301 | ENGG MATHS III | 2 | 1 | 0 | 0 | 0 | 0 | 0 | 0 | 1 | 50.0 |"));
        assert!(report.contains("- Mean 9.20, median 9.20, mode 9.20"));
        assert!(report.contains("- Standard deviation 0.00"));
        assert!(report.contains("- Range 9.20 to 9.20"));
    }

    #[test]
    fn empty_report_has_placeholders() {
        let report = build_report("empty.pdf", &[], 10);
        assert!(report.contains("- Students: 0"));
        assert!(report.contains("No students with a valid SGPA."));
        assert!(report.contains("No valid SGPA values."));
        assert!(report.contains("Every student passed."));
        assert!(report.contains("No subject rows found."));
    }

    #[test]
    fn history_includes_prediction() {
        let entry = |exam: &str, month: u32, sgpa: f64| HistoryEntry {
            exam: exam.to_string(),
            uploaded_at: Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).unwrap(),
            sgpa,
            result_status: ResultStatus::Pass,
            credits: 20,
            seat_number: "S1".to_string(),
            subjects: Vec::new(),
        };
        let mut history = StudentHistory {
            name: "PATIL ROHAN".to_string(),
            prn: "72034567K".to_string(),
            mother_name: "MEENA".to_string(),
            results: vec![entry("Sem 1", 1, 7.0), entry("Sem 2", 6, 7.5)],
        };

        let text = build_history(&history);
        assert!(text.contains("- Sem 1 [2024-01-01] seat S1 SGPA 7.00 Pass"));
        assert!(text.contains("Predicted next SGPA: 8.00"));

        history.results.truncate(1);
        assert!(build_history(&history).contains("Not enough results"));
    }
}

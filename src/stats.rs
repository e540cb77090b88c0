use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{
    RecordFilter, ResultStatus, ResultSummary, SgpaStatistics, StudentRecord, SubjectGradeRow,
    GRADE_SCALE,
};

/// Grades left out of the subject summary entirely.
const UNCOUNTED_GRADES: [&str; 3] = ["IC", "ABS", "N/A"];

/// Rounds to `decimals` places, exact halves going to the even neighbour.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

pub fn summarize(records: &[StudentRecord]) -> ResultSummary {
    let total = records.len();
    let passed = records
        .iter()
        .filter(|r| r.result_status == ResultStatus::Pass)
        .count();

    let valid: Vec<f64> = records
        .iter()
        .filter(|r| r.has_valid_sgpa)
        .map(|r| r.sgpa)
        .collect();
    let average_sgpa = if valid.is_empty() {
        0.0
    } else {
        valid.iter().sum::<f64>() / valid.len() as f64
    };
    let pass_percentage = if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    };

    ResultSummary {
        total_students: total,
        passed_students: passed,
        failed_students: total - passed,
        average_sgpa: round_to(average_sgpa, 2),
        pass_percentage: round_to(pass_percentage, 1),
    }
}

/// Students with a valid SGPA, best first. Ties keep their input order.
pub fn top_students(records: &[StudentRecord], n: usize) -> Vec<&StudentRecord> {
    let mut ranked: Vec<&StudentRecord> = records.iter().filter(|r| r.has_valid_sgpa).collect();
    ranked.sort_by(|a, b| {
        b.sgpa
            .partial_cmp(&a.sgpa)
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(n);
    ranked
}

pub fn failed_students(records: &[StudentRecord]) -> Vec<&StudentRecord> {
    records
        .iter()
        .filter(|r| r.result_status == ResultStatus::Fail)
        .collect()
}

/// Records with at least `min_sgpa`, optionally of one status, ordered by
/// SGPA. Equal SGPAs keep their input order in either direction.
pub fn filter_records<'a>(
    records: &'a [StudentRecord],
    filter: &RecordFilter,
) -> Vec<&'a StudentRecord> {
    let mut selected: Vec<&StudentRecord> = records
        .iter()
        .filter(|r| r.sgpa >= filter.min_sgpa)
        .filter(|r| filter.status.map_or(true, |status| r.result_status == status))
        .collect();

    if filter.ascending {
        selected.sort_by(|a, b| a.sgpa.partial_cmp(&b.sgpa).unwrap_or(Ordering::Equal));
    } else {
        selected.sort_by(|a, b| b.sgpa.partial_cmp(&a.sgpa).unwrap_or(Ordering::Equal));
    }
    selected
}

/// Linear-interpolated percentile of an ascending slice, `pct` in 0..=100.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

/// Distribution of SGPAs over records with a valid SGPA; `None` when there
/// are none.
///
/// The mode is the most frequent value; on a tie the one seen first wins.
pub fn sgpa_statistics(records: &[StudentRecord]) -> Option<SgpaStatistics> {
    let values: Vec<f64> = records
        .iter()
        .filter(|r| r.has_valid_sgpa)
        .map(|r| r.sgpa)
        .collect();
    if values.is_empty() {
        return None;
    }

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

    let mut mode = values[0];
    let mut mode_count = 0;
    for candidate in &values {
        let seen = values.iter().filter(|v| *v == candidate).count();
        if seen > mode_count {
            mode = *candidate;
            mode_count = seen;
        }
    }

    let mut sorted = values;
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    Some(SgpaStatistics {
        count,
        mean,
        median: percentile(&sorted, 50.0),
        mode,
        std_dev: variance.sqrt(),
        min: sorted[0],
        max: sorted[count - 1],
        p10: percentile(&sorted, 10.0),
        p90: percentile(&sorted, 90.0),
    })
}

/// Per-course grade distribution across all records.
///
/// Rows come out in the order each course code is first seen, labelled with
/// the first course name seen for that code. `FF` and `Fail` count as `F`.
pub fn subject_grade_summary(records: &[StudentRecord]) -> Vec<SubjectGradeRow> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut counts: HashMap<String, (usize, HashMap<&str, usize>)> = HashMap::new();

    for record in records {
        for subject in &record.subjects {
            let grade = subject.grade.as_str();
            if subject.course_code.is_empty() || grade.is_empty() || UNCOUNTED_GRADES.contains(&grade)
            {
                continue;
            }
            let grade = match grade {
                "FF" | "Fail" => "F",
                other => other,
            };

            let entry = counts.entry(subject.course_code.clone()).or_insert_with(|| {
                order.push((subject.course_code.clone(), subject.course_name.clone()));
                (0, HashMap::new())
            });
            entry.0 += 1;
            *entry.1.entry(grade).or_insert(0) += 1;
        }
    }

    order
        .into_iter()
        .filter_map(|(code, name)| {
            let (total, grades) = counts.remove(&code)?;
            let grade_counts: Vec<(String, usize)> = GRADE_SCALE
                .iter()
                .map(|g| (g.to_string(), grades.get(g).copied().unwrap_or(0)))
                .collect();
            let failures = grades.get("F").copied().unwrap_or(0);
            let failure_rate = if total == 0 {
                0.0
            } else {
                round_to(failures as f64 / total as f64 * 100.0, 1)
            };

            Some(SubjectGradeRow {
                course_code: code,
                course_name: name,
                total_students: total,
                grade_counts,
                failure_rate,
            })
        })
        .collect()
}

/// Extrapolates the next SGPA from a chronological series with a
/// least-squares line over the series index.
///
/// Returns `None` for fewer than two points. The result is clamped to
/// `[0.0, 10.0]` and rounded to two decimals.
pub fn predict_next_sgpa(history: &[f64]) -> Option<f64> {
    if history.len() < 2 {
        return None;
    }

    let n = history.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = history.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (idx, y) in history.iter().enumerate() {
        let dx = idx as f64 - mean_x;
        covariance += dx * (y - mean_y);
        variance += dx * dx;
    }

    let slope = covariance / variance;
    let intercept = mean_y - slope * mean_x;
    let predicted = intercept + slope * n;

    Some(round_to(predicted.clamp(0.0, 10.0), 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubjectGrade;

    fn sample_record(seat: &str, sgpa_raw: &str, grades: &[(&str, &str)]) -> StudentRecord {
        let subjects = grades
            .iter()
            .map(|(code, grade)| SubjectGrade {
                course_code: code.to_string(),
                course_name: format!("Course {code}"),
                grade: grade.to_string(),
            })
            .collect();
        StudentRecord::new(
            seat.to_string(),
            format!("Student {seat}"),
            "Unknown".to_string(),
            format!("PRN{seat}"),
            sgpa_raw.to_string(),
            20,
            subjects,
        )
    }

    #[test]
    fn summary_counts_and_rounds() {
        let records = vec![
            sample_record("A", "8.24", &[]),
            sample_record("B", "7.10", &[]),
            sample_record("C", "--", &[]),
        ];
        let summary = summarize(&records);
        assert_eq!(summary.total_students, 3);
        assert_eq!(summary.passed_students, 2);
        assert_eq!(summary.failed_students, 1);
        assert_eq!(summary.average_sgpa, 7.67);
        assert_eq!(summary.pass_percentage, 66.7);
    }

    #[test]
    fn exact_halves_round_to_even() {
        assert_eq!(round_to(8.125, 2), 8.12);
        assert_eq!(round_to(6.25, 1), 6.2);
        assert_eq!(round_to(66.666, 1), 66.7);

        let summary = summarize(&[sample_record("A", "8.25", &[]), sample_record("B", "8.0", &[])]);
        assert_eq!(summary.average_sgpa, 8.12);

        let mut records = vec![sample_record("top", "9.0", &[("41301", "FF")])];
        for idx in 0..15 {
            records.push(sample_record(&format!("S{idx}"), "--", &[("41301", "B")]));
        }
        assert_eq!(summarize(&records).pass_percentage, 6.2);
        assert_eq!(subject_grade_summary(&records)[0].failure_rate, 6.2);
    }

    #[test]
    fn summary_of_nothing_is_zeroed() {
        assert_eq!(summarize(&[]), ResultSummary::default());
        let all_failed = summarize(&[sample_record("A", "--", &[])]);
        assert_eq!(all_failed.average_sgpa, 0.0);
        assert_eq!(all_failed.pass_percentage, 0.0);
    }

    #[test]
    fn top_students_sorted_with_stable_ties() {
        let records = vec![
            sample_record("first", "9.1", &[]),
            sample_record("second", "9.1", &[]),
            sample_record("third", "8.0", &[]),
            sample_record("absent", "--", &[]),
        ];
        let top = top_students(&records, 3);
        let seats: Vec<&str> = top.iter().map(|r| r.seat_number.as_str()).collect();
        assert_eq!(seats, vec!["first", "second", "third"]);

        let reordered = vec![records[2].clone(), records[1].clone(), records[0].clone()];
        let top = top_students(&reordered, 2);
        let seats: Vec<&str> = top.iter().map(|r| r.seat_number.as_str()).collect();
        assert_eq!(seats, vec!["second", "first"]);
    }

    #[test]
    fn failed_students_keep_order() {
        let records = vec![
            sample_record("A", "--", &[]),
            sample_record("B", "9.0", &[("41301", "FF")]),
            sample_record("C", "0.00", &[]),
        ];
        let failed = failed_students(&records);
        let seats: Vec<&str> = failed.iter().map(|r| r.seat_number.as_str()).collect();
        assert_eq!(seats, vec!["A", "C"]);
    }

    #[test]
    fn filter_by_min_sgpa_and_status() {
        let records = vec![
            sample_record("A", "6.5", &[]),
            sample_record("B", "--", &[]),
            sample_record("C", "8.9", &[]),
            sample_record("D", "7.2", &[]),
        ];

        let everyone = filter_records(&records, &RecordFilter::default());
        let seats: Vec<&str> = everyone.iter().map(|r| r.seat_number.as_str()).collect();
        assert_eq!(seats, vec!["C", "D", "A", "B"]);

        let filter = RecordFilter {
            min_sgpa: 7.0,
            status: None,
            ascending: true,
        };
        let seats: Vec<&str> = filter_records(&records, &filter)
            .iter()
            .map(|r| r.seat_number.as_str())
            .collect();
        assert_eq!(seats, vec!["D", "C"]);

        let failed_only = RecordFilter {
            status: Some(ResultStatus::Fail),
            ..RecordFilter::default()
        };
        let seats: Vec<&str> = filter_records(&records, &failed_only)
            .iter()
            .map(|r| r.seat_number.as_str())
            .collect();
        assert_eq!(seats, vec!["B"]);
    }

    #[test]
    fn sgpa_statistics_over_valid_records() {
        let records = vec![
            sample_record("A", "6.0", &[]),
            sample_record("B", "8.0", &[]),
            sample_record("C", "--", &[]),
            sample_record("D", "8.0", &[]),
            sample_record("E", "9.0", &[]),
            sample_record("F", "9.0", &[]),
        ];
        let stats = sgpa_statistics(&records).unwrap();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.mean, 8.0);
        assert_eq!(stats.median, 8.0);
        // 8.0 and 9.0 tie; 8.0 appears first.
        assert_eq!(stats.mode, 8.0);
        assert!((stats.std_dev - 1.095_445).abs() < 1e-6);
        assert_eq!(stats.min, 6.0);
        assert_eq!(stats.max, 9.0);
        assert!((stats.p10 - 6.8).abs() < 1e-9);
        assert!((stats.p90 - 9.0).abs() < 1e-9);
    }

    #[test]
    fn sgpa_statistics_need_a_valid_sgpa() {
        assert_eq!(sgpa_statistics(&[]), None);
        assert_eq!(sgpa_statistics(&[sample_record("A", "--", &[])]), None);

        let single = sgpa_statistics(&[sample_record("A", "7.5", &[])]).unwrap();
        assert_eq!(single.median, 7.5);
        assert_eq!(single.std_dev, 0.0);
        assert_eq!(single.p10, 7.5);
    }

    #[test]
    fn subject_summary_folds_failures() {
        let records = vec![
            sample_record("A", "9.0", &[("41301", "O")]),
            sample_record("B", "--", &[("41301", "FF")]),
        ];
        let rows = subject_grade_summary(&records);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.course_code, "41301");
        assert_eq!(row.total_students, 2);
        assert_eq!(row.count("O"), 1);
        assert_eq!(row.count("F"), 1);
        assert_eq!(row.failure_rate, 50.0);
        assert_eq!(row.grade_counts.len(), GRADE_SCALE.len());
    }

    #[test]
    fn subject_summary_skips_incomplete_and_absent() {
        let records = vec![
            sample_record("A", "9.0", &[("41302", "A+"), ("41301", "IC")]),
            sample_record("B", "8.0", &[("41302", "ABS"), ("41301", "Fail")]),
            sample_record("C", "7.0", &[("41302", "AB"), ("41301", "B")]),
        ];
        let rows = subject_grade_summary(&records);
        let codes: Vec<&str> = rows.iter().map(|r| r.course_code.as_str()).collect();
        assert_eq!(codes, vec!["41302", "41301"]);

        // AB has no column of its own but still counts towards the total.
        assert_eq!(rows[0].total_students, 2);
        assert_eq!(rows[0].count("A+"), 1);
        assert_eq!(rows[0].failure_rate, 0.0);

        assert_eq!(rows[1].total_students, 2);
        assert_eq!(rows[1].count("F"), 1);
        assert_eq!(rows[1].failure_rate, 50.0);
    }

    #[test]
    fn subject_summary_keeps_first_course_name() {
        let mut first = sample_record("A", "9.0", &[("41301", "O")]);
        first.subjects[0].course_name = "ENGG MATHS III".to_string();
        let mut second = sample_record("B", "9.0", &[("41301", "A")]);
        second.subjects[0].course_name = "ENGG MATHS 045/070".to_string();

        let rows = subject_grade_summary(&[first, second]);
        assert_eq!(rows[0].course_name, "ENGG MATHS III");
    }

    #[test]
    fn predicts_linear_trend() {
        assert_eq!(predict_next_sgpa(&[7.0, 7.5, 8.0]), Some(8.5));
        assert_eq!(predict_next_sgpa(&[8.0, 8.0]), Some(8.0));
    }

    #[test]
    fn prediction_needs_two_points() {
        assert_eq!(predict_next_sgpa(&[9.5]), None);
        assert_eq!(predict_next_sgpa(&[]), None);
    }

    #[test]
    fn prediction_is_clamped() {
        assert_eq!(predict_next_sgpa(&[8.0, 9.0, 10.0]), Some(10.0));
        assert_eq!(predict_next_sgpa(&[4.0, 2.0, 0.0]), Some(0.0));
    }
}

use std::collections::{BTreeMap, HashMap};

use crate::models::{
    CollegeOverview, DepartmentRollup, HistoryEntry, ResultFile, StudentHistory, UploadFilter,
    YearRollup,
};
use crate::stats::round_to;

const UNCATEGORIZED: &str = "Uncategorized";
const UNKNOWN_YEAR: &str = "Unknown";

/// Collects every stored result matching `search_term`, grouped by PRN.
///
/// A record matches when the term equals its PRN or appears in its name,
/// both compared case-insensitively. Students come out in the order they are
/// first found in `files`; each student's results are oldest first.
pub fn student_history(files: &[ResultFile], search_term: &str) -> Vec<StudentHistory> {
    let term = search_term.trim().to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }

    let mut histories: Vec<StudentHistory> = Vec::new();
    let mut by_prn: HashMap<String, usize> = HashMap::new();

    for file in files {
        for student in &file.students {
            let prn = student.prn.trim();
            let is_match = term == prn.to_lowercase() || student.name.to_lowercase().contains(&term);
            if !is_match {
                continue;
            }

            let idx = *by_prn.entry(prn.to_string()).or_insert_with(|| {
                histories.push(StudentHistory {
                    name: student.name.clone(),
                    prn: prn.to_string(),
                    mother_name: student.mother_name.clone(),
                    results: Vec::new(),
                });
                histories.len() - 1
            });

            histories[idx].results.push(HistoryEntry {
                exam: file.exam_label().to_string(),
                uploaded_at: file.uploaded_at,
                sgpa: student.sgpa,
                result_status: student.result_status,
                credits: student.credits,
                seat_number: student.seat_number.clone(),
                subjects: student.subjects.clone(),
            });
        }
    }

    for history in &mut histories {
        history.results.sort_by_key(|entry| entry.uploaded_at);
    }

    tracing::debug!(term = %term, students = histories.len(), "built student history");
    histories
}

/// PRN → name across all uploads; later files overwrite earlier names.
pub fn student_directory(files: &[ResultFile]) -> BTreeMap<String, String> {
    let mut directory = BTreeMap::new();
    for file in files {
        for student in &file.students {
            let prn = student.prn.trim();
            if !prn.is_empty() {
                directory.insert(prn.to_string(), student.name.trim().to_string());
            }
        }
    }
    directory
}

/// SGPA values of a history in chronological order.
pub fn sgpa_series(history: &StudentHistory) -> Vec<f64> {
    history.results.iter().map(|entry| entry.sgpa).collect()
}

/// Stored uploads matching every given criterion, in storage order.
///
/// The query is a case-insensitive fragment of the exam tag or file name;
/// department and year must match exactly.
pub fn filter_uploads<'a>(
    files: &'a [ResultFile],
    filter: &UploadFilter,
) -> Vec<&'a ResultFile> {
    let query = filter
        .query
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    files
        .iter()
        .filter(|file| match &query {
            Some(q) => {
                file.metadata.exam_tag.to_lowercase().contains(q)
                    || file.metadata.file_name.to_lowercase().contains(q)
            }
            None => true,
        })
        .filter(|file| {
            filter
                .department
                .as_deref()
                .map_or(true, |department| file.metadata.department == department)
        })
        .filter(|file| {
            filter
                .year
                .as_deref()
                .map_or(true, |year| file.metadata.year == year)
        })
        .collect()
}

#[derive(Default)]
struct Tally {
    students: usize,
    passed: usize,
    sgpa_weight: f64,
    sgpa_students: usize,
}

impl Tally {
    fn add(&mut self, file: &ResultFile) {
        let summary = &file.summary;
        self.students += summary.total_students;
        self.passed += summary.passed_students;
        if summary.total_students > 0 {
            self.sgpa_weight += summary.average_sgpa * summary.total_students as f64;
            self.sgpa_students += summary.total_students;
        }
    }

    fn pass_rate(&self) -> f64 {
        if self.students == 0 {
            0.0
        } else {
            round_to(self.passed as f64 / self.students as f64 * 100.0, 1)
        }
    }

    fn average_sgpa(&self) -> f64 {
        if self.sgpa_students == 0 {
            0.0
        } else {
            round_to(self.sgpa_weight / self.sgpa_students as f64, 2)
        }
    }
}

fn year_rank(year: &str) -> u8 {
    match year {
        "FE" => 1,
        "SE" => 2,
        "TE" => 3,
        "BE" => 4,
        _ => 5,
    }
}

fn label_or(value: &str, fallback: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Rolls every stored upload up by department and by year from the
/// summaries saved alongside them.
///
/// Departments keep the order they are first seen in; years run FE, SE, TE,
/// BE, then anything else in first-seen order.
pub fn college_overview(files: &[ResultFile]) -> CollegeOverview {
    let mut overall = Tally::default();
    let mut departments: Vec<(String, Tally)> = Vec::new();
    let mut years: Vec<(String, Tally)> = Vec::new();

    for file in files {
        overall.add(file);

        let department = label_or(&file.metadata.department, UNCATEGORIZED);
        match departments.iter_mut().find(|(name, _)| *name == department) {
            Some((_, tally)) => tally.add(file),
            None => {
                let mut tally = Tally::default();
                tally.add(file);
                departments.push((department, tally));
            }
        }

        let year = label_or(&file.metadata.year, UNKNOWN_YEAR);
        match years.iter_mut().find(|(name, _)| *name == year) {
            Some((_, tally)) => tally.add(file),
            None => {
                let mut tally = Tally::default();
                tally.add(file);
                years.push((year, tally));
            }
        }
    }

    years.sort_by_key(|(year, _)| year_rank(year));

    CollegeOverview {
        exams: files.len(),
        total_students: overall.students,
        passed_students: overall.passed,
        pass_rate: overall.pass_rate(),
        average_sgpa: overall.average_sgpa(),
        departments: departments
            .into_iter()
            .map(|(department, tally)| DepartmentRollup {
                pass_rate: tally.pass_rate(),
                average_sgpa: tally.average_sgpa(),
                total_students: tally.students,
                department,
            })
            .collect(),
        years: years
            .into_iter()
            .map(|(year, tally)| YearRollup {
                pass_rate: tally.pass_rate(),
                total_students: tally.students,
                year,
            })
            .collect(),
    }
}

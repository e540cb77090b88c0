use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

mod db;
mod history;
mod input;
mod models;
mod parser;
mod report;
mod stats;

use models::{RecordFilter, ResultStatus, StudentRecord, UploadFilter, UploadMetadata};
use parser::{ParserConfig, SEAT_ANCHOR};

#[derive(Parser)]
#[command(name = "result-sheet-analyzer")]
#[command(about = "Extracts student records from university result sheets", long_about = None)]
struct Cli {
    /// Marker that starts each student's block in the extracted text
    #[arg(long, global = true, default_value = SEAT_ANCHOR)]
    anchor: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Parse a result sheet and print what was found
    Parse {
        /// PDF result sheet or already-extracted text
        input: PathBuf,
        /// Print every record as JSON
        #[arg(long)]
        json: bool,
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// List only students with at least this SGPA
        #[arg(long)]
        min_sgpa: Option<f64>,
        /// List only students with this result (pass or fail)
        #[arg(long)]
        status: Option<ResultStatus>,
        /// Sort the listing by SGPA lowest first
        #[arg(long)]
        ascending: bool,
    },
    /// Generate a markdown report for a result sheet
    Report {
        input: PathBuf,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Parse a result sheet and store it
    Upload {
        input: PathBuf,
        #[arg(long)]
        exam: String,
        #[arg(long)]
        department: String,
        #[arg(long)]
        year: String,
        #[arg(long)]
        uploaded_by: String,
    },
    /// List stored uploads
    Uploads {
        /// Part of the exam tag or file name
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        year: Option<String>,
    },
    /// Department and year rollups across every stored upload
    Overview,
    /// List every known student by PRN
    Students,
    /// Show a student's results across uploads
    History {
        /// PRN or part of a name
        search: String,
    },
    /// Remove a stored upload
    Delete { id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = ParserConfig {
        anchor: cli.anchor,
        ..ParserConfig::default()
    };

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Parse {
            input,
            json,
            top,
            min_sgpa,
            status,
            ascending,
        } => {
            let records = load_records(&input, &config)?;
            let filtering = min_sgpa.is_some() || status.is_some() || ascending;
            let filter = RecordFilter {
                min_sgpa: min_sgpa.unwrap_or(0.0),
                status,
                ascending,
            };

            if json {
                if filtering {
                    let selected = stats::filter_records(&records, &filter);
                    println!("{}", serde_json::to_string_pretty(&selected)?);
                } else {
                    println!("{}", serde_json::to_string_pretty(&records)?);
                }
                return Ok(());
            }
            if records.is_empty() {
                println!("No student records found in {}.", input.display());
                return Ok(());
            }

            if filtering {
                let selected = stats::filter_records(&records, &filter);
                println!("{} of {} students match.", selected.len(), records.len());
                for student in selected {
                    println!(
                        "- {} ({}, seat {}) SGPA {} {} ({} of {} subjects passed, {} credits)",
                        student.name,
                        student.prn,
                        student.seat_number,
                        student.sgpa_raw,
                        student.result_status.as_str(),
                        student.passed_subject_count,
                        student.total_subject_count,
                        student.credits
                    );
                }
                return Ok(());
            }

            let summary = stats::summarize(&records);
            println!(
                "{} students: {} passed, {} failed ({:.1}% pass), average SGPA {:.2}",
                summary.total_students,
                summary.passed_students,
                summary.failed_students,
                summary.pass_percentage,
                summary.average_sgpa
            );

            println!("Top students by SGPA:");
            for student in stats::top_students(&records, top) {
                println!(
                    "- {} ({}, seat {}) SGPA {:.2}",
                    student.name, student.prn, student.seat_number, student.sgpa
                );
            }

            let failed = stats::failed_students(&records);
            if !failed.is_empty() {
                println!("Failed students:");
                for student in failed {
                    println!(
                        "- {} ({}, seat {}) SGPA {}",
                        student.name, student.prn, student.seat_number, student.sgpa_raw
                    );
                }
            }
        }
        Commands::Report { input, out, top } => {
            let records = load_records(&input, &config)?;
            let label = input.display().to_string();
            let report = report::build_report(&label, &records, top);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Upload {
            input,
            exam,
            department,
            year,
            uploaded_by,
        } => {
            let records = load_records(&input, &config)?;
            if records.is_empty() {
                println!("No student records found in {}; nothing stored.", input.display());
                return Ok(());
            }

            let metadata = UploadMetadata {
                file_name: file_name(&input),
                exam_tag: exam,
                department,
                year,
                uploaded_by,
            };
            let pool = connect().await?;
            let id = db::save_result_file(&pool, &metadata, &records).await?;
            println!("Stored {} students from {} as {id}.", records.len(), metadata.file_name);
        }
        Commands::Uploads {
            query,
            department,
            year,
        } => {
            let pool = connect().await?;
            let files = db::fetch_result_files(&pool).await?;

            if files.is_empty() {
                println!("No uploads stored yet.");
                return Ok(());
            }

            let filter = UploadFilter {
                query,
                department,
                year,
            };
            let matching = history::filter_uploads(&files, &filter);
            if matching.is_empty() {
                println!("No uploads match.");
                return Ok(());
            }

            for file in matching {
                println!(
                    "- {} {} ({}, {} {}) uploaded {} by {}: {} students, {:.1}% pass, avg SGPA {:.2}",
                    file.id,
                    file.exam_label(),
                    file.metadata.file_name,
                    file.metadata.department,
                    file.metadata.year,
                    file.uploaded_at.format("%Y-%m-%d %H:%M"),
                    file.metadata.uploaded_by,
                    file.summary.total_students,
                    file.summary.pass_percentage,
                    file.summary.average_sgpa
                );
            }
        }
        Commands::Overview => {
            let pool = connect().await?;
            let files = db::fetch_result_files(&pool).await?;

            if files.is_empty() {
                println!("No uploads stored yet.");
                return Ok(());
            }

            let overview = history::college_overview(&files);
            println!(
                "{} exams, {} students, {} passed ({:.1}%), average SGPA {:.2}",
                overview.exams,
                overview.total_students,
                overview.passed_students,
                overview.pass_rate,
                overview.average_sgpa
            );

            println!("By department:");
            for department in overview.departments.iter() {
                println!(
                    "- {}: {} students, {:.1}% pass, avg SGPA {:.2}",
                    department.department,
                    department.total_students,
                    department.pass_rate,
                    department.average_sgpa
                );
            }

            println!("By year:");
            for year in overview.years.iter() {
                println!(
                    "- {}: {} students, {:.1}% pass",
                    year.year, year.total_students, year.pass_rate
                );
            }
        }
        Commands::Students => {
            let pool = connect().await?;
            let files = db::fetch_result_files(&pool).await?;
            let directory = history::student_directory(&files);

            if directory.is_empty() {
                println!("No students stored yet.");
                return Ok(());
            }

            for (prn, name) in directory.iter() {
                println!("{name} | {prn}");
            }
        }
        Commands::History { search } => {
            let pool = connect().await?;
            let files = db::fetch_result_files(&pool).await?;
            let histories = history::student_history(&files, &search);

            if histories.is_empty() {
                println!("No results found for {search:?}.");
                return Ok(());
            }

            for student in histories.iter() {
                print!("{}", report::build_history(student));
            }
        }
        Commands::Delete { id } => {
            let pool = connect().await?;
            if db::delete_result_file(&pool, id).await? {
                println!("Deleted upload {id}.");
            } else {
                println!("No upload with id {id}.");
            }
        }
    }

    Ok(())
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn load_records(path: &Path, config: &ParserConfig) -> anyhow::Result<Vec<StudentRecord>> {
    let text = input::load_text(path)?;
    Ok(parser::parse_records(&text, config))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

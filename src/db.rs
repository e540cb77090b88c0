use anyhow::Context;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{ResultFile, ResultSummary, StudentRecord, UploadMetadata};
use crate::stats;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Stores one parsed upload together with its computed summary.
pub async fn save_result_file(
    pool: &PgPool,
    metadata: &UploadMetadata,
    students: &[StudentRecord],
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let summary = stats::summarize(students);
    let total_students =
        i32::try_from(students.len()).context("too many students for one upload")?;

    sqlx::query(
        r#"
        INSERT INTO result_analyzer.result_files
        (id, file_name, exam_tag, department, year, uploaded_by, uploaded_at,
         total_students, summary, students)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(id)
    .bind(&metadata.file_name)
    .bind(&metadata.exam_tag)
    .bind(&metadata.department)
    .bind(&metadata.year)
    .bind(&metadata.uploaded_by)
    .bind(Utc::now())
    .bind(total_students)
    .bind(Json(&summary))
    .bind(Json(students))
    .execute(pool)
    .await
    .with_context(|| format!("failed to save {}", metadata.file_name))?;

    tracing::info!(%id, file = %metadata.file_name, students = students.len(), "saved result file");
    Ok(id)
}

/// Every stored upload, newest first.
pub async fn fetch_result_files(pool: &PgPool) -> anyhow::Result<Vec<ResultFile>> {
    let rows = sqlx::query(
        "SELECT id, file_name, exam_tag, department, year, uploaded_by, uploaded_at, \
         summary, students \
         FROM result_analyzer.result_files \
         ORDER BY uploaded_at DESC",
    )
    .fetch_all(pool)
    .await?;

    let mut files = Vec::with_capacity(rows.len());

    for row in rows {
        let summary: Json<ResultSummary> = row.try_get("summary")?;
        let students: Json<Vec<StudentRecord>> = row.try_get("students")?;
        files.push(ResultFile {
            id: row.get("id"),
            metadata: UploadMetadata {
                file_name: row.get("file_name"),
                exam_tag: row.get("exam_tag"),
                department: row.get("department"),
                year: row.get("year"),
                uploaded_by: row.get("uploaded_by"),
            },
            uploaded_at: row.get("uploaded_at"),
            summary: summary.0,
            students: students.0,
        });
    }

    Ok(files)
}

pub async fn delete_result_file(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM result_analyzer.result_files WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

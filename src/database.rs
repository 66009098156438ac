use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub index: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Subject {
    pub id: i64,
    pub student_id: i64,
    pub subject: String,
    pub grade: f64,
    pub date_added: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
    pub name: String,
    #[serde(default)]
    pub index: String,
    #[serde(default)]
    pub city: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSubject {
    pub subject: String,
    pub grade: f64,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        let db = Database { pool };
        db.create_tables().await?;
        Ok(db)
    }

    /// Private in-memory database. A single connection keeps every query on the same store.
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
    }

    async fn create_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS students (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                "index" TEXT NOT NULL DEFAULT '',
                city TEXT NOT NULL DEFAULT ''
            )
            "#
        ).execute(&self.pool).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subjects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL,
                subject TEXT NOT NULL,
                grade REAL NOT NULL,
                date_added DATETIME NOT NULL
            )
            "#
        ).execute(&self.pool).await?;

        Ok(())
    }

    pub async fn insert_student(&self, student: &NewStudent) -> Result<Student> {
        let name = student.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Name required!".to_string()));
        }
        let index = student.index.trim();
        let city = student.city.trim();

        let id = sqlx::query(r#"INSERT INTO students (name, "index", city) VALUES (?, ?, ?)"#)
            .bind(name)
            .bind(index)
            .bind(city)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        log::info!("Added student {} ({})", id, name);
        Ok(Student {
            id,
            name: name.to_string(),
            index: index.to_string(),
            city: city.to_string(),
        })
    }

    pub async fn update_student(&self, id: i64, student: &NewStudent) -> Result<Student> {
        let name = student.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Name required!".to_string()));
        }
        let index = student.index.trim();
        let city = student.city.trim();

        let affected = sqlx::query(r#"UPDATE students SET name = ?, "index" = ?, city = ? WHERE id = ?"#)
            .bind(name)
            .bind(index)
            .bind(city)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(Error::NotFound("Student"));
        }

        Ok(Student {
            id,
            name: name.to_string(),
            index: index.to_string(),
            city: city.to_string(),
        })
    }

    /// Removes the student together with all of their subjects.
    pub async fn delete_student(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let affected = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(Error::NotFound("Student"));
        }
        let removed = sqlx::query("DELETE FROM subjects WHERE student_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        log::info!("Deleted student {} and {} subject(s)", id, removed);
        Ok(())
    }

    pub async fn get_student(&self, id: i64) -> Result<Student> {
        sqlx::query_as::<_, Student>(r#"SELECT id, name, "index", city FROM students WHERE id = ?"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound("Student"))
    }

    /// Case-insensitive substring match on name or city; empty search lists everyone.
    pub async fn list_students(&self, search: &str) -> Result<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(
            r#"SELECT id, name, "index", city FROM students ORDER BY id"#
        )
        .fetch_all(&self.pool)
        .await?;

        let needle = fold(search);
        Ok(students
            .into_iter()
            .filter(|s| fold(&s.name).contains(&needle) || fold(&s.city).contains(&needle))
            .collect())
    }

    pub async fn insert_subject(&self, student_id: i64, subject: &NewSubject) -> Result<Subject> {
        let name = subject.subject.trim();
        let date_added = Utc::now();

        let id = sqlx::query(
            "INSERT INTO subjects (student_id, subject, grade, date_added) VALUES (?, ?, ?, ?)"
        )
        .bind(student_id)
        .bind(name)
        .bind(subject.grade)
        .bind(date_added)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        log::debug!("Student {} received {} in {}", student_id, subject.grade, name);
        Ok(Subject {
            id,
            student_id,
            subject: name.to_string(),
            grade: subject.grade,
            date_added,
        })
    }

    pub async fn update_subject(&self, student_id: i64, subject_id: i64, subject: &NewSubject) -> Result<()> {
        let affected = sqlx::query(
            "UPDATE subjects SET subject = ?, grade = ? WHERE id = ? AND student_id = ?"
        )
        .bind(subject.subject.trim())
        .bind(subject.grade)
        .bind(subject_id)
        .bind(student_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(Error::NotFound("Subject"));
        }
        Ok(())
    }

    pub async fn delete_subject(&self, student_id: i64, subject_id: i64) -> Result<()> {
        let affected = sqlx::query("DELETE FROM subjects WHERE id = ? AND student_id = ?")
            .bind(subject_id)
            .bind(student_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(Error::NotFound("Subject"));
        }
        Ok(())
    }

    /// All subjects of a student, oldest first.
    pub async fn subjects_for(&self, student_id: i64) -> Result<Vec<Subject>> {
        self.search_subjects(student_id, "").await
    }

    /// Case-insensitive substring match on the subject name, oldest first.
    pub async fn search_subjects(&self, student_id: i64, search: &str) -> Result<Vec<Subject>> {
        let subjects = sqlx::query_as::<_, Subject>(
            r#"
            SELECT id, student_id, subject, grade, date_added FROM subjects
            WHERE student_id = ?
            ORDER BY date_added ASC, id ASC
            "#
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let needle = fold(search);
        Ok(subjects
            .into_iter()
            .filter(|s| fold(&s.subject).contains(&needle))
            .collect())
    }
}

// SQLite's LOWER() only folds ASCII, so matching happens here.
fn fold(text: &str) -> String {
    text.trim().to_lowercase()
}

//! Postgres backend. Uniqueness lives in the indexes declared in
//! `migrations/`; inserts use `ON CONFLICT DO NOTHING` and report a missing
//! row as a duplicate.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{query, query_as, Pool, Postgres};
use uuid::Uuid;

use super::{CertificateStore, CourseCatalog, Decision, EnrollmentStore, Inserted, PaymentStore};
use crate::error::WorkflowResult;
use crate::models::{Certificate, Course, Enrollment, PaymentRecord, PaymentStatus};
use crate::progress;

pub type Db = Pool<Postgres>;

pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Db> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

fn inserted<T>(row: Option<T>) -> Inserted<T> {
    match row {
        Some(v) => Inserted::New(v),
        None => Inserted::Duplicate,
    }
}

impl CourseCatalog for PgStore {
    async fn get_course(&self, id: Uuid) -> WorkflowResult<Option<Course>> {
        Ok(query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?)
    }

    async fn upsert_course(&self, course: Course) -> WorkflowResult<Course> {
        Ok(query_as::<_, Course>(
            r#"
            INSERT INTO courses (id, title, instructor, price, is_paid, total_duration_minutes, created_at)
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                instructor = EXCLUDED.instructor,
                price = EXCLUDED.price,
                is_paid = EXCLUDED.is_paid,
                total_duration_minutes = EXCLUDED.total_duration_minutes
            RETURNING *
            "#,
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.instructor)
        .bind(course.price)
        .bind(course.is_paid)
        .bind(course.total_duration_minutes)
        .bind(course.created_at)
        .fetch_one(&self.db)
        .await?)
    }
}

impl PaymentStore for PgStore {
    async fn insert_payment(&self, record: PaymentRecord) -> WorkflowResult<Inserted<PaymentRecord>> {
        let row = query_as::<_, PaymentRecord>(
            r#"
            INSERT INTO payment_records (id, user_id, course_id, amount, screenshot_ref, status, submitted_at)
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            ON CONFLICT DO NOTHING
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.course_id)
        .bind(record.amount)
        .bind(&record.screenshot_ref)
        .bind(record.status.as_str())
        .bind(record.submitted_at)
        .fetch_optional(&self.db)
        .await?;
        Ok(inserted(row))
    }

    async fn get_payment(&self, id: Uuid) -> WorkflowResult<Option<PaymentRecord>> {
        Ok(query_as::<_, PaymentRecord>("SELECT * FROM payment_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?)
    }

    async fn find_approved_payment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> WorkflowResult<Option<PaymentRecord>> {
        Ok(query_as::<_, PaymentRecord>(
            "SELECT * FROM payment_records WHERE user_id = $1 AND course_id = $2 AND status = 'approved'",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.db)
        .await?)
    }

    async fn decide_payment(
        &self,
        id: Uuid,
        status: PaymentStatus,
        reviewer_id: Uuid,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> WorkflowResult<Option<Decision>> {
        let applied = query_as::<_, PaymentRecord>(
            r#"
            UPDATE payment_records
            SET status = $2, reviewed_at = $3, reviewer_id = $4, notes = $5
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(at)
        .bind(reviewer_id)
        .bind(notes)
        .fetch_optional(&self.db)
        .await?;

        if let Some(rec) = applied {
            return Ok(Some(Decision::Applied(rec)));
        }
        Ok(self.get_payment(id).await?.map(Decision::AlreadyDecided))
    }

    async fn list_payments_for_user(&self, user_id: Uuid) -> WorkflowResult<Vec<PaymentRecord>> {
        Ok(query_as::<_, PaymentRecord>(
            "SELECT * FROM payment_records WHERE user_id = $1 ORDER BY submitted_at",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?)
    }

    async fn list_pending_payments(&self) -> WorkflowResult<Vec<PaymentRecord>> {
        Ok(query_as::<_, PaymentRecord>(
            "SELECT * FROM payment_records WHERE status = 'pending' ORDER BY submitted_at",
        )
        .fetch_all(&self.db)
        .await?)
    }
}

impl EnrollmentStore for PgStore {
    async fn insert_enrollment(&self, enrollment: Enrollment) -> WorkflowResult<Inserted<Enrollment>> {
        let row = query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (id, user_id, course_id, enrolled_at, watched_minutes, progress_percent, completed, certificate_issued)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            ON CONFLICT (user_id, course_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(enrollment.id)
        .bind(enrollment.user_id)
        .bind(enrollment.course_id)
        .bind(enrollment.enrolled_at)
        .bind(enrollment.watched_minutes)
        .bind(enrollment.progress_percent)
        .bind(enrollment.completed)
        .bind(enrollment.certificate_issued)
        .fetch_optional(&self.db)
        .await?;
        Ok(inserted(row))
    }

    async fn get_enrollment(&self, id: Uuid) -> WorkflowResult<Option<Enrollment>> {
        Ok(query_as::<_, Enrollment>("SELECT * FROM enrollments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?)
    }

    async fn find_enrollment(&self, user_id: Uuid, course_id: Uuid) -> WorkflowResult<Option<Enrollment>> {
        Ok(query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.db)
        .await?)
    }

    async fn advance_progress(
        &self,
        id: Uuid,
        watched_minutes: i64,
        total_duration_minutes: i64,
    ) -> WorkflowResult<Option<Enrollment>> {
        let mut tx = self.db.begin().await?;
        let current = query_as::<_, Enrollment>("SELECT * FROM enrollments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(mut e) = current else {
            return Ok(None);
        };

        progress::advance(&mut e, watched_minutes, total_duration_minutes);
        query("UPDATE enrollments SET watched_minutes = $2, progress_percent = $3 WHERE id = $1")
            .bind(e.id)
            .bind(e.watched_minutes)
            .bind(e.progress_percent)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(e))
    }

    async fn list_enrollments_for_user(&self, user_id: Uuid) -> WorkflowResult<Vec<Enrollment>> {
        Ok(query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE user_id = $1 ORDER BY enrolled_at",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?)
    }
}

impl CertificateStore for PgStore {
    async fn complete_with_certificate(
        &self,
        enrollment_id: Uuid,
        certificate: Certificate,
    ) -> WorkflowResult<Option<Certificate>> {
        let mut tx = self.db.begin().await?;
        let flipped = query(
            r#"
            UPDATE enrollments
            SET completed = TRUE, certificate_issued = TRUE, completed_at = $2
            WHERE id = $1 AND completed = FALSE AND progress_percent >= $3
            "#,
        )
        .bind(enrollment_id)
        .bind(certificate.generated_at)
        .bind(progress::COMPLETION_THRESHOLD)
        .execute(&mut *tx)
        .await?;
        if flipped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let issued = query_as::<_, Certificate>(
            r#"
            INSERT INTO certificates (id, user_id, course_id, enrollment_id, certificate_id, generated_at, download_count)
            VALUES ($1,$2,$3,$4,$5,$6,0)
            ON CONFLICT (user_id, course_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(certificate.id)
        .bind(certificate.user_id)
        .bind(certificate.course_id)
        .bind(certificate.enrollment_id)
        .bind(&certificate.certificate_id)
        .bind(certificate.generated_at)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(issued)
    }

    async fn get_certificate(&self, certificate_id: &str) -> WorkflowResult<Option<Certificate>> {
        Ok(query_as::<_, Certificate>("SELECT * FROM certificates WHERE certificate_id = $1")
            .bind(certificate_id)
            .fetch_optional(&self.db)
            .await?)
    }

    async fn increment_downloads(&self, certificate_id: &str) -> WorkflowResult<Option<Certificate>> {
        Ok(query_as::<_, Certificate>(
            r#"
            UPDATE certificates SET download_count = download_count + 1
            WHERE certificate_id = $1
            RETURNING *
            "#,
        )
        .bind(certificate_id)
        .fetch_optional(&self.db)
        .await?)
    }

    async fn list_certificates_for_user(&self, user_id: Uuid) -> WorkflowResult<Vec<Certificate>> {
        Ok(query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE user_id = $1 ORDER BY generated_at",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?)
    }
}

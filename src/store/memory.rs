//! In-process backend. A single write guard covers every read-modify-write,
//! so the uniqueness keys below are the only source of truth for duplicates.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CertificateStore, CourseCatalog, Decision, EnrollmentStore, Inserted, PaymentStore};
use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{Certificate, Course, Enrollment, PaymentRecord, PaymentStatus};
use crate::progress;

type Pair = (Uuid, Uuid);

#[derive(Default)]
struct Tables {
    courses: HashMap<Uuid, Course>,
    payments: HashMap<Uuid, PaymentRecord>,
    enrollments: HashMap<Uuid, Enrollment>,
    enrollment_by_pair: HashMap<Pair, Uuid>,
    certificates: HashMap<String, Certificate>,
    certificate_by_pair: HashMap<Pair, String>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by<T, K: Ord>(mut v: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    v.sort_by_key(|x| key(x));
    v
}

impl CourseCatalog for MemoryStore {
    async fn get_course(&self, id: Uuid) -> WorkflowResult<Option<Course>> {
        Ok(self.tables.read().await.courses.get(&id).cloned())
    }

    async fn upsert_course(&self, course: Course) -> WorkflowResult<Course> {
        let mut t = self.tables.write().await;
        let stored = match t.courses.get(&course.id) {
            // creation time belongs to the first publish
            Some(existing) => Course {
                created_at: existing.created_at,
                ..course
            },
            None => course,
        };
        t.courses.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

impl PaymentStore for MemoryStore {
    async fn insert_payment(&self, record: PaymentRecord) -> WorkflowResult<Inserted<PaymentRecord>> {
        let mut t = self.tables.write().await;
        let open = t.payments.values().any(|p| {
            p.user_id == record.user_id
                && p.course_id == record.course_id
                && p.status != PaymentStatus::Rejected
        });
        if open {
            return Ok(Inserted::Duplicate);
        }
        t.payments.insert(record.id, record.clone());
        Ok(Inserted::New(record))
    }

    async fn get_payment(&self, id: Uuid) -> WorkflowResult<Option<PaymentRecord>> {
        Ok(self.tables.read().await.payments.get(&id).cloned())
    }

    async fn find_approved_payment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> WorkflowResult<Option<PaymentRecord>> {
        let t = self.tables.read().await;
        Ok(t.payments
            .values()
            .find(|p| {
                p.user_id == user_id
                    && p.course_id == course_id
                    && p.status == PaymentStatus::Approved
            })
            .cloned())
    }

    async fn decide_payment(
        &self,
        id: Uuid,
        status: PaymentStatus,
        reviewer_id: Uuid,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> WorkflowResult<Option<Decision>> {
        let mut t = self.tables.write().await;
        let Some(rec) = t.payments.get_mut(&id) else {
            return Ok(None);
        };
        if rec.status != PaymentStatus::Pending {
            return Ok(Some(Decision::AlreadyDecided(rec.clone())));
        }
        rec.status = status;
        rec.reviewed_at = Some(at);
        rec.reviewer_id = Some(reviewer_id);
        rec.notes = notes;
        Ok(Some(Decision::Applied(rec.clone())))
    }

    async fn list_payments_for_user(&self, user_id: Uuid) -> WorkflowResult<Vec<PaymentRecord>> {
        let t = self.tables.read().await;
        let v: Vec<_> = t.payments.values().filter(|p| p.user_id == user_id).cloned().collect();
        Ok(sorted_by(v, |p: &PaymentRecord| p.submitted_at))
    }

    async fn list_pending_payments(&self) -> WorkflowResult<Vec<PaymentRecord>> {
        let t = self.tables.read().await;
        let v: Vec<_> = t
            .payments
            .values()
            .filter(|p| p.status == PaymentStatus::Pending)
            .cloned()
            .collect();
        Ok(sorted_by(v, |p: &PaymentRecord| p.submitted_at))
    }
}

impl EnrollmentStore for MemoryStore {
    async fn insert_enrollment(&self, enrollment: Enrollment) -> WorkflowResult<Inserted<Enrollment>> {
        let mut t = self.tables.write().await;
        let pair = (enrollment.user_id, enrollment.course_id);
        if t.enrollment_by_pair.contains_key(&pair) {
            return Ok(Inserted::Duplicate);
        }
        t.enrollment_by_pair.insert(pair, enrollment.id);
        t.enrollments.insert(enrollment.id, enrollment.clone());
        Ok(Inserted::New(enrollment))
    }

    async fn get_enrollment(&self, id: Uuid) -> WorkflowResult<Option<Enrollment>> {
        Ok(self.tables.read().await.enrollments.get(&id).cloned())
    }

    async fn find_enrollment(&self, user_id: Uuid, course_id: Uuid) -> WorkflowResult<Option<Enrollment>> {
        let t = self.tables.read().await;
        Ok(t.enrollment_by_pair
            .get(&(user_id, course_id))
            .and_then(|id| t.enrollments.get(id))
            .cloned())
    }

    async fn advance_progress(
        &self,
        id: Uuid,
        watched_minutes: i64,
        total_duration_minutes: i64,
    ) -> WorkflowResult<Option<Enrollment>> {
        let mut t = self.tables.write().await;
        let Some(e) = t.enrollments.get_mut(&id) else {
            return Ok(None);
        };
        progress::advance(e, watched_minutes, total_duration_minutes);
        Ok(Some(e.clone()))
    }

    async fn list_enrollments_for_user(&self, user_id: Uuid) -> WorkflowResult<Vec<Enrollment>> {
        let t = self.tables.read().await;
        let v: Vec<_> = t.enrollments.values().filter(|e| e.user_id == user_id).cloned().collect();
        Ok(sorted_by(v, |e: &Enrollment| e.enrolled_at))
    }
}

impl CertificateStore for MemoryStore {
    async fn complete_with_certificate(
        &self,
        enrollment_id: Uuid,
        certificate: Certificate,
    ) -> WorkflowResult<Option<Certificate>> {
        let mut t = self.tables.write().await;
        let Some(e) = t.enrollments.get(&enrollment_id) else {
            return Ok(None);
        };
        if !progress::ready_to_complete(e) {
            return Ok(None);
        }
        let pair = (e.user_id, e.course_id);
        // codes are unique across all users; nothing is written on a clash
        if t.certificates.contains_key(&certificate.certificate_id) {
            return Err(WorkflowError::Storage(format!(
                "certificate code {} already issued",
                certificate.certificate_id
            )));
        }

        if let Some(e) = t.enrollments.get_mut(&enrollment_id) {
            e.completed = true;
            e.certificate_issued = true;
            e.completed_at = Some(certificate.generated_at);
        }
        if t.certificate_by_pair.contains_key(&pair) {
            return Ok(None);
        }
        t.certificate_by_pair.insert(pair, certificate.certificate_id.clone());
        t.certificates
            .insert(certificate.certificate_id.clone(), certificate.clone());
        Ok(Some(certificate))
    }

    async fn get_certificate(&self, certificate_id: &str) -> WorkflowResult<Option<Certificate>> {
        Ok(self.tables.read().await.certificates.get(certificate_id).cloned())
    }

    async fn increment_downloads(&self, certificate_id: &str) -> WorkflowResult<Option<Certificate>> {
        let mut t = self.tables.write().await;
        Ok(t.certificates.get_mut(certificate_id).map(|c| {
            c.download_count += 1;
            c.clone()
        }))
    }

    async fn list_certificates_for_user(&self, user_id: Uuid) -> WorkflowResult<Vec<Certificate>> {
        let t = self.tables.read().await;
        let v: Vec<_> = t.certificates.values().filter(|c| c.user_id == user_id).cloned().collect();
        Ok(sorted_by(v, |c: &Certificate| c.generated_at))
    }
}

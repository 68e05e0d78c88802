//! Storage seams for the enrollment workflow.
//!
//! Every backend must enforce the per-(user, course) uniqueness of
//! enrollments, certificates and open payment records itself; callers never
//! rely on a prior existence check.

use chrono::{DateTime, Utc};
use std::future::Future;
use uuid::Uuid;

use crate::error::WorkflowResult;
use crate::models::{Certificate, Course, Enrollment, PaymentRecord, PaymentStatus};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Result of an insert guarded by a uniqueness constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Inserted<T> {
    New(T),
    Duplicate,
}

/// Result of applying an admin decision to a payment record.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The record was pending and now carries the decision.
    Applied(PaymentRecord),
    /// The record had been decided before; returned as stored.
    AlreadyDecided(PaymentRecord),
}

pub trait CourseCatalog: Send + Sync {
    fn get_course(&self, id: Uuid) -> impl Future<Output = WorkflowResult<Option<Course>>> + Send;
    fn upsert_course(&self, course: Course) -> impl Future<Output = WorkflowResult<Course>> + Send;
}

pub trait PaymentStore: Send + Sync {
    /// Duplicate when a pending or approved record exists for the pair.
    fn insert_payment(
        &self,
        record: PaymentRecord,
    ) -> impl Future<Output = WorkflowResult<Inserted<PaymentRecord>>> + Send;
    fn get_payment(&self, id: Uuid)
        -> impl Future<Output = WorkflowResult<Option<PaymentRecord>>> + Send;
    fn find_approved_payment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> impl Future<Output = WorkflowResult<Option<PaymentRecord>>> + Send;
    /// Applies `status` only if the record is still pending.
    fn decide_payment(
        &self,
        id: Uuid,
        status: PaymentStatus,
        reviewer_id: Uuid,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> impl Future<Output = WorkflowResult<Option<Decision>>> + Send;
    fn list_payments_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = WorkflowResult<Vec<PaymentRecord>>> + Send;
    /// Oldest first.
    fn list_pending_payments(&self) -> impl Future<Output = WorkflowResult<Vec<PaymentRecord>>> + Send;
}

pub trait EnrollmentStore: Send + Sync {
    fn insert_enrollment(
        &self,
        enrollment: Enrollment,
    ) -> impl Future<Output = WorkflowResult<Inserted<Enrollment>>> + Send;
    fn get_enrollment(&self, id: Uuid)
        -> impl Future<Output = WorkflowResult<Option<Enrollment>>> + Send;
    fn find_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> impl Future<Output = WorkflowResult<Option<Enrollment>>> + Send;
    /// Monotone update of watched minutes, serialized per enrollment.
    fn advance_progress(
        &self,
        id: Uuid,
        watched_minutes: i64,
        total_duration_minutes: i64,
    ) -> impl Future<Output = WorkflowResult<Option<Enrollment>>> + Send;
    fn list_enrollments_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = WorkflowResult<Vec<Enrollment>>> + Send;
}

pub trait CertificateStore: Send + Sync {
    /// Marks the enrollment completed and stores `certificate` in one step.
    /// Returns `None` if the enrollment was already completed (or is below
    /// the threshold), in which case nothing is written.
    fn complete_with_certificate(
        &self,
        enrollment_id: Uuid,
        certificate: Certificate,
    ) -> impl Future<Output = WorkflowResult<Option<Certificate>>> + Send;
    fn get_certificate(
        &self,
        certificate_id: &str,
    ) -> impl Future<Output = WorkflowResult<Option<Certificate>>> + Send;
    fn increment_downloads(
        &self,
        certificate_id: &str,
    ) -> impl Future<Output = WorkflowResult<Option<Certificate>>> + Send;
    fn list_certificates_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = WorkflowResult<Vec<Certificate>>> + Send;
}

/// Everything the workflow needs from a backend.
pub trait Store:
    CourseCatalog + PaymentStore + EnrollmentStore + CertificateStore + Clone + 'static
{
}

impl<T> Store for T where
    T: CourseCatalog + PaymentStore + EnrollmentStore + CertificateStore + Clone + 'static
{
}

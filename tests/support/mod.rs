#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use coursegate::error::{WorkflowError, WorkflowResult};
use coursegate::models::{
    CallerContext, Certificate, Course, Enrollment, Entitlement, PaymentRecord, PaymentStatus,
    PublishCourseReq,
};
use coursegate::notify::{Notification, Notifier};
use coursegate::store::{
    CertificateStore, CourseCatalog, Decision, EnrollmentStore, Inserted, MemoryStore,
    PaymentStore,
};
use coursegate::workflow::Workflow;

/// Collects dispatched notifications so tests can await them.
#[derive(Clone)]
pub struct ChannelNotifier(pub mpsc::UnboundedSender<Notification>);

impl Notifier for ChannelNotifier {
    async fn notify(&self, n: Notification) -> anyhow::Result<()> {
        self.0.send(n)?;
        Ok(())
    }
}

pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    async fn notify(&self, _n: Notification) -> anyhow::Result<()> {
        anyhow::bail!("mail relay unreachable")
    }
}

pub type TestWorkflow = Arc<Workflow<MemoryStore, ChannelNotifier>>;

pub fn workflow() -> (TestWorkflow, mpsc::UnboundedReceiver<Notification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Arc::new(Workflow::new(MemoryStore::new(), ChannelNotifier(tx))),
        rx,
    )
}

pub fn admin() -> CallerContext {
    CallerContext::new(Uuid::new_v4(), "Admin").with(Entitlement::Admin)
}

pub fn student(name: &str) -> CallerContext {
    CallerContext::new(Uuid::new_v4(), name)
}

pub fn course_req(title: &str, price: i64, minutes: i64) -> PublishCourseReq {
    PublishCourseReq {
        title: title.into(),
        instructor: "Dr. Rao".into(),
        price,
        is_paid: false,
        total_duration_minutes: minutes,
    }
}

pub async fn publish<S, N>(wf: &Arc<Workflow<S, N>>, price: i64, minutes: i64) -> Course
where
    S: coursegate::store::Store,
    N: Notifier,
{
    wf.publish_course(&admin(), Uuid::new_v4(), course_req("Rust for Backends", price, minutes))
        .await
        .unwrap()
}

/// Memory store whose enrollment inserts always fail.
#[derive(Clone, Default)]
pub struct BrokenEnrollments(pub MemoryStore);

impl CourseCatalog for BrokenEnrollments {
    async fn get_course(&self, id: Uuid) -> WorkflowResult<Option<Course>> {
        self.0.get_course(id).await
    }
    async fn upsert_course(&self, course: Course) -> WorkflowResult<Course> {
        self.0.upsert_course(course).await
    }
}

impl PaymentStore for BrokenEnrollments {
    async fn insert_payment(&self, r: PaymentRecord) -> WorkflowResult<Inserted<PaymentRecord>> {
        self.0.insert_payment(r).await
    }
    async fn get_payment(&self, id: Uuid) -> WorkflowResult<Option<PaymentRecord>> {
        self.0.get_payment(id).await
    }
    async fn find_approved_payment(&self, u: Uuid, c: Uuid) -> WorkflowResult<Option<PaymentRecord>> {
        self.0.find_approved_payment(u, c).await
    }
    async fn decide_payment(
        &self,
        id: Uuid,
        status: PaymentStatus,
        reviewer_id: Uuid,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> WorkflowResult<Option<Decision>> {
        self.0.decide_payment(id, status, reviewer_id, notes, at).await
    }
    async fn list_payments_for_user(&self, u: Uuid) -> WorkflowResult<Vec<PaymentRecord>> {
        self.0.list_payments_for_user(u).await
    }
    async fn list_pending_payments(&self) -> WorkflowResult<Vec<PaymentRecord>> {
        self.0.list_pending_payments().await
    }
}

impl EnrollmentStore for BrokenEnrollments {
    async fn insert_enrollment(&self, _e: Enrollment) -> WorkflowResult<Inserted<Enrollment>> {
        Err(WorkflowError::Storage("enrollments table unavailable".into()))
    }
    async fn get_enrollment(&self, id: Uuid) -> WorkflowResult<Option<Enrollment>> {
        self.0.get_enrollment(id).await
    }
    async fn find_enrollment(&self, u: Uuid, c: Uuid) -> WorkflowResult<Option<Enrollment>> {
        self.0.find_enrollment(u, c).await
    }
    async fn advance_progress(&self, id: Uuid, w: i64, t: i64) -> WorkflowResult<Option<Enrollment>> {
        self.0.advance_progress(id, w, t).await
    }
    async fn list_enrollments_for_user(&self, u: Uuid) -> WorkflowResult<Vec<Enrollment>> {
        self.0.list_enrollments_for_user(u).await
    }
}

impl CertificateStore for BrokenEnrollments {
    async fn complete_with_certificate(&self, id: Uuid, c: Certificate) -> WorkflowResult<Option<Certificate>> {
        self.0.complete_with_certificate(id, c).await
    }
    async fn get_certificate(&self, code: &str) -> WorkflowResult<Option<Certificate>> {
        self.0.get_certificate(code).await
    }
    async fn increment_downloads(&self, code: &str) -> WorkflowResult<Option<Certificate>> {
        self.0.increment_downloads(code).await
    }
    async fn list_certificates_for_user(&self, u: Uuid) -> WorkflowResult<Vec<Certificate>> {
        self.0.list_certificates_for_user(u).await
    }
}

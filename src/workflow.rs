//! Enrollment, payment review and certification.
//!
//! Each operation takes the caller explicitly and leans on the store for
//! uniqueness: concurrent requests for the same (user, course) pair resolve
//! to one enrollment and at most one certificate.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{
    CallerContext, Certificate, CertificateView, Course, Enrollment, PaymentRecord,
    PaymentStatus, ProgressUpdate, PublishCourseReq, ReviewDecision,
};
use crate::notify::{dispatch, Notification, Notifier};
use crate::progress;
use crate::store::{Decision, Inserted, Store};

pub struct Workflow<S, N> {
    store: S,
    notifier: Arc<N>,
}

impl<S: Store, N: Notifier> Workflow<S, N> {
    pub fn new(store: S, notifier: N) -> Self {
        Self {
            store,
            notifier: Arc::new(notifier),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn course(&self, course_id: Uuid) -> WorkflowResult<Course> {
        self.store
            .get_course(course_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("course", course_id))
    }

    async fn create_enrollment(&self, user_id: Uuid, course_id: Uuid) -> WorkflowResult<Enrollment> {
        match self.store.insert_enrollment(Enrollment::new(user_id, course_id)).await? {
            Inserted::New(e) => {
                tracing::info!(%user_id, %course_id, enrollment_id = %e.id, "enrolled");
                dispatch(
                    &self.notifier,
                    Notification::Enrolled {
                        enrollment_id: e.id,
                        user_id,
                        course_id,
                    },
                );
                Ok(e)
            }
            Inserted::Duplicate => Err(WorkflowError::AlreadyEnrolled),
        }
    }

    // --- catalog ---

    pub async fn get_course(&self, course_id: Uuid) -> WorkflowResult<Course> {
        self.course(course_id).await
    }

    pub async fn publish_course(
        &self,
        caller: &CallerContext,
        course_id: Uuid,
        req: PublishCourseReq,
    ) -> WorkflowResult<Course> {
        if !caller.is_admin() {
            return Err(WorkflowError::Forbidden("only admins can publish courses"));
        }
        if req.price < 0 || req.total_duration_minutes < 0 {
            return Err(WorkflowError::InvalidInput(
                "price and duration must not be negative".into(),
            ));
        }
        let course = Course {
            id: course_id,
            title: req.title,
            instructor: req.instructor,
            price: req.price,
            is_paid: req.is_paid || req.price > 0,
            total_duration_minutes: req.total_duration_minutes,
            created_at: Utc::now(),
        };
        let course = self.store.upsert_course(course).await?;
        tracing::info!(course_id = %course.id, price = course.price, "course published");
        Ok(course)
    }

    // --- enrollment ---

    /// Free courses enroll directly. Paid courses fail with `PaymentRequired`
    /// until an approved payment exists for the pair. The one exception is the
    /// premium entitlement: premium is an all-access subscription, so a premium
    /// caller enrolls in a paid course without a payment record.
    pub async fn request_enrollment(
        &self,
        caller: &CallerContext,
        course_id: Uuid,
    ) -> WorkflowResult<Enrollment> {
        let course = self.course(course_id).await?;
        let user_id = caller.user_id;

        if course.requires_payment() && !caller.is_premium() {
            // an existing enrollment wins over a missing payment
            if self.store.find_enrollment(user_id, course_id).await?.is_some() {
                return Err(WorkflowError::AlreadyEnrolled);
            }
            if self
                .store
                .find_approved_payment(user_id, course_id)
                .await?
                .is_none()
            {
                return Err(WorkflowError::PaymentRequired);
            }
        }
        self.create_enrollment(user_id, course_id).await
    }

    // --- payments ---

    pub async fn submit_payment(
        &self,
        caller: &CallerContext,
        course_id: Uuid,
        amount: i64,
        screenshot_ref: String,
    ) -> WorkflowResult<PaymentRecord> {
        if amount < 0 {
            return Err(WorkflowError::InvalidInput("amount must not be negative".into()));
        }
        if screenshot_ref.trim().is_empty() {
            return Err(WorkflowError::InvalidInput("screenshot_ref is required".into()));
        }
        let course = self.course(course_id).await?;
        if !course.requires_payment() {
            return Err(WorkflowError::InvalidState("course is free".into()));
        }
        if self
            .store
            .find_enrollment(caller.user_id, course_id)
            .await?
            .is_some()
        {
            return Err(WorkflowError::AlreadyEnrolled);
        }

        let record = PaymentRecord {
            id: Uuid::new_v4(),
            user_id: caller.user_id,
            course_id,
            amount,
            screenshot_ref,
            status: PaymentStatus::Pending,
            submitted_at: Utc::now(),
            reviewed_at: None,
            reviewer_id: None,
            notes: None,
        };
        match self.store.insert_payment(record).await? {
            Inserted::New(rec) => {
                tracing::info!(payment_id = %rec.id, user_id = %rec.user_id, %course_id, "payment submitted");
                dispatch(
                    &self.notifier,
                    Notification::PaymentSubmitted {
                        payment_id: rec.id,
                        user_id: rec.user_id,
                        course_id,
                        amount,
                    },
                );
                Ok(rec)
            }
            Inserted::Duplicate => Err(WorkflowError::InvalidState(
                "a payment for this course is already pending or approved".into(),
            )),
        }
    }

    /// Records an admin decision. Repeating the same decision returns the
    /// stored record without side effects; changing a decision is rejected.
    /// Auto-enrollment after approval never fails the review.
    pub async fn review_payment(
        &self,
        caller: &CallerContext,
        payment_id: Uuid,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> WorkflowResult<PaymentRecord> {
        if !caller.is_admin() {
            return Err(WorkflowError::Forbidden("only admins can review payments"));
        }
        let status = PaymentStatus::from(decision);
        let outcome = self
            .store
            .decide_payment(payment_id, status, caller.user_id, notes, Utc::now())
            .await?
            .ok_or_else(|| WorkflowError::not_found("payment", payment_id))?;

        let rec = match outcome {
            Decision::Applied(rec) => rec,
            Decision::AlreadyDecided(rec) if rec.status == status => return Ok(rec),
            Decision::AlreadyDecided(rec) => {
                return Err(WorkflowError::InvalidState(format!(
                    "payment already {}",
                    rec.status.as_str()
                )))
            }
        };
        tracing::info!(%payment_id, reviewer_id = %caller.user_id, status = rec.status.as_str(), "payment reviewed");

        if rec.status == PaymentStatus::Approved {
            match self.create_enrollment(rec.user_id, rec.course_id).await {
                Ok(_) | Err(WorkflowError::AlreadyEnrolled) => {}
                Err(e) => {
                    tracing::warn!(error = %e, %payment_id, user_id = %rec.user_id, "auto-enrollment after approval failed");
                }
            }
        }
        dispatch(
            &self.notifier,
            Notification::PaymentReviewed {
                payment_id,
                user_id: rec.user_id,
                course_id: rec.course_id,
                status: rec.status,
            },
        );
        Ok(rec)
    }

    pub async fn list_pending_payments(&self, caller: &CallerContext) -> WorkflowResult<Vec<PaymentRecord>> {
        if !caller.is_admin() {
            return Err(WorkflowError::Forbidden("only admins can list pending payments"));
        }
        self.store.list_pending_payments().await
    }

    // --- progress & certificates ---

    pub async fn record_progress(
        &self,
        caller: &CallerContext,
        enrollment_id: Uuid,
        watched_minutes: i64,
    ) -> WorkflowResult<ProgressUpdate> {
        if watched_minutes < 0 {
            return Err(WorkflowError::InvalidInput("watched_minutes must not be negative".into()));
        }
        let current = self
            .store
            .get_enrollment(enrollment_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("enrollment", enrollment_id))?;
        if current.user_id != caller.user_id {
            return Err(WorkflowError::Forbidden("enrollment belongs to another user"));
        }
        let course = self.course(current.course_id).await?;

        let mut enrollment = self
            .store
            .advance_progress(enrollment_id, watched_minutes, course.total_duration_minutes)
            .await?
            .ok_or_else(|| WorkflowError::not_found("enrollment", enrollment_id))?;

        let mut certificate = None;
        if progress::ready_to_complete(&enrollment) {
            let minted = progress::mint_certificate(&enrollment, Utc::now());
            if let Some(cert) = self
                .store
                .complete_with_certificate(enrollment_id, minted)
                .await?
            {
                tracing::info!(
                    %enrollment_id,
                    user_id = %cert.user_id,
                    course_id = %cert.course_id,
                    certificate_id = %cert.certificate_id,
                    "certificate issued"
                );
                dispatch(
                    &self.notifier,
                    Notification::CertificateIssued {
                        certificate_id: cert.certificate_id.clone(),
                        user_id: cert.user_id,
                        course_id: cert.course_id,
                    },
                );
                certificate = Some(cert);
            }
            // reread so a concurrent completion is reflected either way
            if let Some(fresh) = self.store.get_enrollment(enrollment_id).await? {
                enrollment = fresh;
            }
        }
        Ok(ProgressUpdate {
            enrollment,
            certificate,
        })
    }

    pub async fn download_certificate(
        &self,
        caller: &CallerContext,
        certificate_id: &str,
    ) -> WorkflowResult<CertificateView> {
        let cert = self
            .store
            .get_certificate(certificate_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("certificate", certificate_id))?;
        if cert.user_id != caller.user_id {
            return Err(WorkflowError::Forbidden("certificate belongs to another user"));
        }
        let course = self.course(cert.course_id).await?;
        let cert = self
            .store
            .increment_downloads(certificate_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("certificate", certificate_id))?;

        Ok(CertificateView {
            student_name: caller.display_name.clone(),
            course_title: course.title,
            instructor: course.instructor,
            completion_date: cert.generated_at,
            certificate_id: cert.certificate_id,
            download_count: cert.download_count,
        })
    }

    // --- dashboard reads ---

    pub async fn my_enrollments(&self, caller: &CallerContext) -> WorkflowResult<Vec<Enrollment>> {
        self.store.list_enrollments_for_user(caller.user_id).await
    }

    pub async fn my_payments(&self, caller: &CallerContext) -> WorkflowResult<Vec<PaymentRecord>> {
        self.store.list_payments_for_user(caller.user_id).await
    }

    pub async fn my_certificates(&self, caller: &CallerContext) -> WorkflowResult<Vec<Certificate>> {
        self.store.list_certificates_for_user(caller.user_id).await
    }
}

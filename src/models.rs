use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub instructor: String,
    pub price: i64, // smallest currency unit
    pub is_paid: bool,
    pub total_duration_minutes: i64,
    pub created_at: DateTime<Utc>,
}

impl Course {
    /// A course needs an approved payment when it has a price or is flagged paid.
    pub fn requires_payment(&self) -> bool {
        self.is_paid || self.price > 0
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = UnknownPaymentStatus;

    fn try_from(v: String) -> Result<Self, Self::Error> {
        match v.as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "approved" => Ok(PaymentStatus::Approved),
            "rejected" => Ok(PaymentStatus::Rejected),
            _ => Err(UnknownPaymentStatus(v)),
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[error("unknown payment status {0:?}")]
pub struct UnknownPaymentStatus(pub String);

/// Outcome an admin can assign to a pending payment.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for PaymentStatus {
    fn from(d: ReviewDecision) -> Self {
        match d {
            ReviewDecision::Approved => PaymentStatus::Approved,
            ReviewDecision::Rejected => PaymentStatus::Rejected,
        }
    }
}

#[skip_serializing_none]
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub amount: i64,
    pub screenshot_ref: String, // opaque pointer into the media store
    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewer_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[skip_serializing_none]
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub watched_minutes: i64,
    pub progress_percent: f64,
    pub completed: bool,
    pub certificate_issued: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    pub fn new(user_id: Uuid, course_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            enrolled_at: Utc::now(),
            watched_minutes: 0,
            progress_percent: 0.0,
            completed: false,
            certificate_issued: false,
            completed_at: None,
        }
    }
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Certificate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub enrollment_id: Uuid,
    pub certificate_id: String,
    pub generated_at: DateTime<Utc>,
    pub download_count: i64,
}

/// Display-ready certificate data. Rendering the document is left to the caller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CertificateView {
    pub student_name: String,
    pub course_title: String,
    pub instructor: String,
    pub completion_date: DateTime<Utc>,
    pub certificate_id: String,
    pub download_count: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Entitlement {
    Admin,
    Premium,
}

impl Entitlement {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "admin" => Some(Entitlement::Admin),
            "premium" => Some(Entitlement::Premium),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Entitlement::Admin => "admin",
            Entitlement::Premium => "premium",
        }
    }
}

/// Authenticated identity an operation runs under, as supplied by the
/// identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub user_id: Uuid,
    pub display_name: String,
    pub entitlements: BTreeSet<Entitlement>,
}

impl CallerContext {
    pub fn new(user_id: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            entitlements: BTreeSet::new(),
        }
    }

    pub fn with(mut self, e: Entitlement) -> Self {
        self.entitlements.insert(e);
        self
    }

    pub fn is_admin(&self) -> bool {
        self.entitlements.contains(&Entitlement::Admin)
    }

    pub fn is_premium(&self) -> bool {
        self.entitlements.contains(&Entitlement::Premium)
    }
}

// --- request / response bodies ---

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PublishCourseReq {
    pub title: String,
    pub instructor: String,
    pub price: i64,
    #[serde(default)]
    pub is_paid: bool,
    pub total_duration_minutes: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SubmitPaymentReq {
    pub amount: i64,
    pub screenshot_ref: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReviewPaymentReq {
    pub decision: ReviewDecision,
    pub notes: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProgressReq {
    pub watched_minutes: i64,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub enrollment: Enrollment,
    /// Set only on the call that issued the certificate.
    pub certificate: Option<Certificate>,
}

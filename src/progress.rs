// Progress arithmetic and certificate minting shared by every store backend.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Certificate, Enrollment};

/// Percentage of a course that counts as finished for certification.
pub const COMPLETION_THRESHOLD: f64 = 80.0;

pub fn progress_percent(watched_minutes: i64, total_duration_minutes: i64) -> f64 {
    if total_duration_minutes <= 0 {
        return 0.0;
    }
    let pct = watched_minutes.max(0) as f64 / total_duration_minutes as f64 * 100.0;
    pct.min(100.0)
}

/// Applies a watch report. Minutes and percentage never go backwards, so
/// replayed reports, out-of-order reports and a course growing longer all
/// leave the recorded progress where it was.
pub fn advance(enrollment: &mut Enrollment, watched_minutes: i64, total_duration_minutes: i64) {
    enrollment.watched_minutes = enrollment.watched_minutes.max(watched_minutes);
    enrollment.progress_percent = enrollment
        .progress_percent
        .max(progress_percent(enrollment.watched_minutes, total_duration_minutes));
}

/// True when the enrollment has reached the threshold but was never completed.
pub fn ready_to_complete(enrollment: &Enrollment) -> bool {
    !enrollment.completed && enrollment.progress_percent >= COMPLETION_THRESHOLD
}

/// `CERT-<yyyymmddHHMMSS>-<12 hex>`
pub fn certificate_code(at: DateTime<Utc>) -> String {
    let entropy = Uuid::new_v4().simple().to_string();
    format!(
        "CERT-{}-{}",
        at.format("%Y%m%d%H%M%S"),
        entropy[..12].to_uppercase()
    )
}

pub fn mint_certificate(enrollment: &Enrollment, at: DateTime<Utc>) -> Certificate {
    Certificate {
        id: Uuid::new_v4(),
        user_id: enrollment.user_id,
        course_id: enrollment.course_id,
        enrollment_id: enrollment.id,
        certificate_id: certificate_code(at),
        generated_at: at,
        download_count: 0,
    }
}

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::models::PaymentStatus;

/// Events handed to the mail relay once the owning transition has committed.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    PaymentSubmitted {
        payment_id: Uuid,
        user_id: Uuid,
        course_id: Uuid,
        amount: i64,
    },
    PaymentReviewed {
        payment_id: Uuid,
        user_id: Uuid,
        course_id: Uuid,
        status: PaymentStatus,
    },
    Enrolled {
        enrollment_id: Uuid,
        user_id: Uuid,
        course_id: Uuid,
    },
    CertificateIssued {
        certificate_id: String,
        user_id: Uuid,
        course_id: Uuid,
    },
}

pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, n: Notification) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Fire-and-forget delivery; failures end up in the log only.
pub fn dispatch<N: Notifier>(notifier: &Arc<N>, n: Notification) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        let event = format!("{n:?}");
        if let Err(e) = notifier.notify(n).await {
            tracing::warn!(error = %e, %event, "notification delivery failed");
        }
    });
}

/// Posts events as JSON to an external relay. Without a URL the event is
/// only logged.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, url })
    }
}

impl Notifier for WebhookNotifier {
    async fn notify(&self, n: Notification) -> anyhow::Result<()> {
        let Some(url) = &self.url else {
            tracing::info!(?n, "notification (no relay configured)");
            return Ok(());
        };
        self.client
            .post(url)
            .json(&n)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

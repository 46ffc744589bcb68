use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::mail::{Mailer, VerificationEmail};

/// Hands emails to a background worker so request handlers never wait on the
/// provider. Delivery failures are logged, not surfaced to the caller.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<VerificationEmail>,
}

impl Outbox {
    pub fn spawn(mailer: Arc<dyn Mailer>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<VerificationEmail>();
        tokio::spawn(async move {
            while let Some(mail) = rx.recv().await {
                match mailer.send(&mail).await {
                    Ok(()) => info!(to = %mail.to, "verification email sent"),
                    Err(e) => error!(error = %e, to = %mail.to, "verification email failed"),
                }
            }
        });
        Self { tx }
    }

    pub fn enqueue(&self, mail: VerificationEmail) {
        if self.tx.send(mail).is_err() {
            warn!("outbox worker is gone, dropping verification email");
        }
    }
}

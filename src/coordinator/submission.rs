use super::client::SubmitTx;
use crate::audit::RecordTx;
use crate::colored::Colorize;
use crate::transaction::CompactTx;

use actix::Recipient;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Hands attested transactions to the coordinator.
///
/// A submission which the coordinator does not accept is retried after `retry_delay`
/// until it is accepted; it is never dropped. Once accepted, the outcome is final.
pub struct Submitter {
    coordinator: Recipient<SubmitTx>,
    retry_delay: Duration,
    audit: Option<Recipient<RecordTx>>,
}

impl Submitter {
    pub fn new(
        coordinator: Recipient<SubmitTx>,
        retry_delay: Duration,
        audit: Option<Recipient<RecordTx>>,
    ) -> Self {
        Submitter { coordinator, retry_delay, audit }
    }

    /// Submits `ctx` and waits for the coordinator's outcome.
    pub async fn submit(&self, ctx: CompactTx) -> Option<bool> {
        let mut retries: u64 = 0;
        let outcome = loop {
            match self.coordinator.send(SubmitTx { ctx: ctx.clone() }).await {
                Ok(Ok(outcome)) => break outcome,
                Ok(Err(err)) => debug!("submission of {} not accepted: {}", ctx, err),
                Err(err) => debug!("coordinator mailbox: {:?}", err),
            }
            retries += 1;
            if retries == 1 || retries % 50 == 0 {
                warn!(
                    "[{}] coordinator did not accept {}, retrying ({})",
                    "sentinel".cyan(),
                    ctx,
                    retries
                );
            }
            sleep(self.retry_delay).await;
        };
        info!("[{}] submitted {}", "sentinel".cyan(), ctx);
        self.record(&ctx);

        match outcome.await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("[{}] outcome for {} was dropped", "sentinel".cyan(), ctx);
                None
            }
        }
    }

    // Auditing must never hold up or fail a submission.
    fn record(&self, ctx: &CompactTx) {
        if let Some(audit) = self.audit.as_ref() {
            if let Err(err) = audit.try_send(RecordTx::from(ctx)) {
                warn!("[{}] could not record {}: {}", "audit".yellow(), ctx, err);
            }
        }
    }
}

use std::{future::Future, sync::Arc, time::Duration};

use immich_common::error::Result;
use tracing::{error, info};

use crate::client::ImmichApi;

pub const CREDENTIAL_RETRY_INTERVAL: Duration = Duration::from_secs(3);
const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Pause after the given failed liveness attempt (1-based).
pub fn liveness_backoff(attempt: u32) -> Duration {
    match attempt {
        0..=60 => Duration::from_secs(1),
        61..=300 => Duration::from_secs(15),
        _ => Duration::from_secs(60),
    }
}

/// Blocks startup until Immich answers and accepts the configured key.
/// Neither phase gives up.
pub struct ReadinessGate {
    api: Arc<dyn ImmichApi>,
    target: String,
}

impl ReadinessGate {
    pub fn new(api: Arc<dyn ImmichApi>, target: impl Into<String>) -> Self {
        Self {
            api,
            target: target.into(),
        }
    }

    pub async fn wait_until_ready(&self) {
        self.wait_for_liveness().await;
        info!(target_url = %self.target, "found immich up and running");
        info!("attempting to connect to immich");
        tokio::time::sleep(SETTLE_DELAY).await;
        self.wait_for_credential().await;
        info!("immich accepted the api key");
    }

    pub async fn wait_for_liveness(&self) -> u32 {
        let api = Arc::clone(&self.api);
        retry_until_ok(
            "liveness",
            "cannot reach immich, is immich up and running?",
            &self.target,
            liveness_backoff,
            || {
                let api = Arc::clone(&api);
                async move { api.ping().await }
            },
        )
        .await
    }

    pub async fn wait_for_credential(&self) -> u32 {
        let api = Arc::clone(&self.api);
        retry_until_ok(
            "credential",
            "connection error, possible api key error",
            &self.target,
            |_| CREDENTIAL_RETRY_INTERVAL,
            || {
                let api = Arc::clone(&api);
                async move { api.verify_credential().await }
            },
        )
        .await
    }
}

/// Runs `probe` until it succeeds and returns the number of attempts made.
async fn retry_until_ok<P, Fut>(
    check: &str,
    failure: &str,
    target: &str,
    backoff: impl Fn(u32) -> Duration,
    mut probe: P,
) -> u32
where
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        match probe().await {
            Ok(()) => return attempt,
            Err(err) => {
                let delay = backoff(attempt);
                error!(
                    check,
                    attempt,
                    target_url = %target,
                    error = %err,
                    retry_in_secs = delay.as_secs(),
                    "{failure}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

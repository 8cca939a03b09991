//! Retry wrapper for rate-limited generation calls.
//!
//! Retries live at the call boundary so the orchestration logic above never
//! sees a transient rate limit. Only `LlmError::RateLimited` is retried;
//! malformed output and authentication failures propagate immediately.

use std::time::Duration;

use rand::RngExt;
use tracing::warn;

use crate::error::LlmError;
use crate::llm::client::{GenerationRequest, GenerationResponse, LlmProvider};

/// Maximum number of attempts per call, including the first.
const MAX_ATTEMPTS: u32 = 6;

/// First backoff delay.
const BASE_DELAY_SECS: u64 = 1;

/// Backoff ceiling.
const MAX_DELAY_SECS: u64 = 60;

/// Issues `request` through `provider`, retrying rate-limit errors with
/// exponential backoff and jitter.
pub async fn generate_with_retry(
    provider: &dyn LlmProvider,
    request: GenerationRequest,
) -> Result<GenerationResponse, LlmError> {
    let mut attempt = 1;
    loop {
        match provider.generate(request.clone()).await {
            Ok(response) => return Ok(response),
            Err(LlmError::RateLimited(message)) if attempt < MAX_ATTEMPTS => {
                let delay = backoff_delay(attempt);
                warn!(
                    attempt,
                    delay_secs = delay.as_secs_f64(),
                    %message,
                    "Rate limited, backing off before retry"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Exponential delay for the given attempt (1-based) with up to 1s of jitter.
fn backoff_delay(attempt: u32) -> Duration {
    let exp = BASE_DELAY_SECS.saturating_mul(1u64 << (attempt - 1).min(16));
    let capped = exp.min(MAX_DELAY_SECS);
    let jitter_ms = rand::rng().random_range(0..1000);
    Duration::from_millis(capped * 1000 + jitter_ms)
}

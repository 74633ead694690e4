//! HTTP retry for transient errors.
//!
//! Every download goes through [`send_bytes`], which retries connection
//! failures, timeouts, HTTP 429 and HTTP 5xx with exponential backoff.
//! Other 4xx responses are permanent and returned immediately as
//! [`FetchError::Status`] so the caller can move on to the next file
//! name.

use std::time::Duration;

use crate::FetchError;

/// Maximum number of retry attempts for transient errors.
///
/// With backoff of 2s, 4s, 8s, 16s the total wait before giving up is
/// 30 seconds.
const MAX_RETRIES: u32 = 4;

/// Sends the request built by `build_request` and returns the response
/// body.
///
/// The closure is called on each attempt since request builders are
/// consumed by `.send()`.
///
/// # Errors
///
/// Returns [`FetchError::Status`] for non-retryable statuses or
/// [`FetchError::Http`] if the request fails after all retries.
#[allow(clippy::future_not_send)]
pub async fn send_bytes<F>(build_request: F) -> Result<Vec<u8>, FetchError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, MAX_RETRIES).await?;
    let bytes = response.bytes().await?;
    Ok(bytes.to_vec())
}

#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<reqwest::Response, FetchError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(FetchError::Http(e));
            }
            Ok(response) => {
                let status = response.status();
                let retryable = status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error();

                if retryable && attempt < max_retries {
                    log::warn!("  HTTP {status}");
                    attempt += 1;
                    continue;
                }

                if status.is_client_error() || status.is_server_error() {
                    return Err(FetchError::Status {
                        url: response.url().to_string(),
                        status: status.as_u16(),
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based): 2s, 4s, 8s, ...
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(6))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_secs(2));
        assert_eq!(backoff(2), Duration::from_secs(4));
        assert_eq!(backoff(4), Duration::from_secs(16));
        assert_eq!(backoff(40), Duration::from_secs(64));
    }
}

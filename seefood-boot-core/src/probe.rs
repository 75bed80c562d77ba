//! Dependency readiness prober.
//!
//! Blocks the bootstrap sequence until the database endpoint accepts TCP
//! connections. The wait is bounded on three axes: attempt count, overall
//! deadline, and a cancellation token wired to shutdown signals. Backoff
//! grows exponentially between attempts instead of hammering the endpoint
//! on a fixed sub-second interval.

use std::time::{Duration, Instant};

use backon::{ExponentialBuilder, Retryable};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{Error, Result};

/// A `(host, port)` endpoint checked repeatedly until it accepts connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub host: String,
    pub port: u16,
}

impl ProbeTarget {
    /// Extract the probe endpoint from a database URL.
    ///
    /// The port defaults to 5432 when the URL omits it.
    pub fn from_database_url(url: &str) -> Result<Self> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::Config(format!("cannot parse database URL: {e}")))?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Config("database URL has no host".to_string()))?
            .to_string();
        let port = parsed.port().unwrap_or(5432);
        Ok(Self { host, port })
    }
}

impl std::fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Bounded backoff schedule for the readiness probe.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub factor: f32,
    pub max_attempts: usize,
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(200),
            max_interval: Duration::from_secs(5),
            factor: 2.0,
            max_attempts: 30,
            deadline: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// `max_times` counts retries, not attempts.
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_interval)
            .with_max_delay(self.max_interval)
            .with_factor(self.factor)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("endpoint {target} not reachable after {attempts} attempt(s): {source}")]
    Exhausted {
        target: String,
        attempts: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("endpoint {target} not reachable within {deadline:?}")]
    DeadlineExceeded { target: String, deadline: Duration },

    #[error("readiness probe cancelled")]
    Cancelled,
}

/// Wait until `target` accepts a TCP connection.
///
/// Returns the elapsed wait on success. Fails when the attempts run out,
/// the deadline passes, or `cancel` fires — the sequence never proceeds
/// past a failed probe.
pub async fn wait_for_endpoint(
    target: &ProbeTarget,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> std::result::Result<Duration, ProbeError> {
    let started = Instant::now();
    let addr = target.to_string();

    let connect = || {
        let addr = addr.clone();
        async move {
            debug!(endpoint = %addr, "probing endpoint");
            TcpStream::connect(addr.as_str()).await.map(|_| ())
        }
    };

    let attempts = policy.max_attempts;
    let probe = connect
        .retry(policy.backoff())
        .when(|e| is_transient_error(e))
        .notify(|err: &std::io::Error, delay: Duration| {
            warn!(
                endpoint = %target,
                error = %err,
                "endpoint not ready, retrying in {}",
                humantime::format_duration(delay)
            );
        });

    tokio::select! {
        () = cancel.cancelled() => Err(ProbeError::Cancelled),
        outcome = tokio::time::timeout(policy.deadline, probe) => match outcome {
            Err(_) => Err(ProbeError::DeadlineExceeded {
                target: target.to_string(),
                deadline: policy.deadline,
            }),
            Ok(Ok(())) => Ok(started.elapsed()),
            Ok(Err(source)) => Err(ProbeError::Exhausted {
                target: target.to_string(),
                attempts,
                source,
            }),
        },
    }
}

/// Whether a connect error is worth another attempt.
///
/// Checks known transient I/O kinds first, then falls back to message
/// matching for errors that don't surface a kind — notably resolver failures
/// while the database container's name is not yet registered.
fn is_transient_error(err: &std::io::Error) -> bool {
    if matches!(
        err.kind(),
        std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
    ) {
        return true;
    }

    let msg = err.to_string().to_lowercase();
    msg.contains("failed to lookup address")
        || msg.contains("name or service not known")
        || msg.contains("temporary failure in name resolution")
        || msg.contains("timed out")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn fast_policy(max_attempts: usize, deadline: Duration) -> RetryPolicy {
        RetryPolicy {
            initial_interval: Duration::from_millis(20),
            max_interval: Duration::from_millis(100),
            factor: 2.0,
            max_attempts,
            deadline,
        }
    }

    #[test]
    fn test_target_from_database_url() {
        let target =
            ProbeTarget::from_database_url("postgresql://seefood:seefood@db:5432/seefood").unwrap();
        assert_eq!(target.host, "db");
        assert_eq!(target.port, 5432);
        assert_eq!(target.to_string(), "db:5432");
    }

    #[test]
    fn test_target_default_port() {
        let target = ProbeTarget::from_database_url("postgresql://seefood@db/seefood").unwrap();
        assert_eq!(target.port, 5432);
    }

    #[test]
    fn test_target_rejects_garbage() {
        assert!(ProbeTarget::from_database_url("not a url").is_err());
        assert!(ProbeTarget::from_database_url("postgresql:///nohost").is_err());
    }

    #[test]
    fn test_transient_classification() {
        let refused =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        assert!(is_transient_error(&refused));

        let dns = std::io::Error::other("failed to lookup address information");
        assert!(is_transient_error(&dns));

        let denied =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        assert!(!is_transient_error(&denied));
    }

    #[tokio::test]
    async fn test_probe_succeeds_against_listening_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let target = ProbeTarget {
            host: "127.0.0.1".to_string(),
            port,
        };

        let elapsed = wait_for_endpoint(
            &target,
            &fast_policy(3, Duration::from_secs(5)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(elapsed < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_probe_recovers_once_endpoint_opens() {
        // Reserve a port, release it, and re-bind it shortly after the
        // probe has started failing against it.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let opener = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            TcpListener::bind(addr).await.unwrap()
        });

        let target = ProbeTarget {
            host: "127.0.0.1".to_string(),
            port: addr.port(),
        };
        let result = wait_for_endpoint(
            &target,
            &fast_policy(50, Duration::from_secs(10)),
            &CancellationToken::new(),
        )
        .await;

        let _listener = opener.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_probe_exhausts_attempts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let target = ProbeTarget {
            host: "127.0.0.1".to_string(),
            port: addr.port(),
        };
        let result = wait_for_endpoint(
            &target,
            &fast_policy(2, Duration::from_secs(10)),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(
            result,
            Err(ProbeError::Exhausted { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_probe_hits_deadline_before_attempts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let target = ProbeTarget {
            host: "127.0.0.1".to_string(),
            port: addr.port(),
        };
        let result = wait_for_endpoint(
            &target,
            &fast_policy(10_000, Duration::from_millis(200)),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(ProbeError::DeadlineExceeded { .. })));
    }

    #[tokio::test]
    async fn test_probe_stops_on_cancellation() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let target = ProbeTarget {
            host: "127.0.0.1".to_string(),
            port: addr.port(),
        };
        let started = Instant::now();
        let result =
            wait_for_endpoint(&target, &fast_policy(10_000, Duration::from_secs(30)), &cancel)
                .await;

        assert!(matches!(result, Err(ProbeError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}

//! Whether the remote store is currently reachable.
//!
//! The original Python checked for a live internet connection before every
//! request that might hit S3, so that a flaky or absent network degraded to
//! "serve the stale copy" instead of hanging or raising a confusing socket
//! error. We keep the same shape: a small trait the cache consults before
//! attempting a download or revalidation, with a real implementation that
//! does a short TCP probe and a test double that is always reachable.

use std::net::ToSocketAddrs;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("internet unreachable")]
pub struct InternetUnreachableError;

/// A reachability check the cache consults before talking to the remote
/// store.
pub trait Reachability: Send + Sync {
    /// Return `Ok(())` if the remote store can plausibly be reached, or
    /// [`InternetUnreachableError`] otherwise.
    fn assert_reachable(&self) -> Result<(), InternetUnreachableError>;

    /// A hint used to decide whether it's worth paying for a revalidation
    /// round-trip at all (e.g. skip it entirely on a known-bad connection).
    /// Defaults to `true`, matching the assumption of full connectivity.
    fn is_trusted_network(&self) -> bool {
        true
    }
}

/// Probes a well-known DNS name and attempts a short TCP connect, mirroring
/// the original's `internet_reachable()` check.
pub struct NetworkReachability {
    probe_host: String,
    timeout: Duration,
}

impl Default for NetworkReachability {
    fn default() -> Self {
        Self {
            probe_host: "s3.amazonaws.com:443".to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}

impl NetworkReachability {
    #[must_use]
    pub fn new(probe_host: impl Into<String>, timeout: Duration) -> Self {
        Self { probe_host: probe_host.into(), timeout }
    }
}

impl Reachability for NetworkReachability {
    fn assert_reachable(&self) -> Result<(), InternetUnreachableError> {
        let mut addrs = self
            .probe_host
            .to_socket_addrs()
            .map_err(|_| InternetUnreachableError)?;
        let addr = addrs.next().ok_or(InternetUnreachableError)?;
        std::net::TcpStream::connect_timeout(&addr, self.timeout)
            .map(|_| ())
            .map_err(|_| InternetUnreachableError)
    }
}

/// Always reachable. Used in tests and anywhere EC2-style environments are
/// known to have unconditional access, mirroring `location_is_ec2()`'s
/// short-circuit in the original.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysReachable;

impl Reachability for AlwaysReachable {
    fn assert_reachable(&self) -> Result<(), InternetUnreachableError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_reachable_never_errors() {
        assert!(AlwaysReachable.assert_reachable().is_ok());
        assert!(AlwaysReachable.is_trusted_network());
    }
}

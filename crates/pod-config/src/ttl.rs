use std::time::Duration;

/// How long a cached file may be trusted before it's revalidated against the
/// remote store.
///
/// The original configuration modeled this as a single `timeout` value where
/// `None` meant "never check again" and any integer meant "check after this
/// many seconds" — but its truthiness-based implementation (`if not
/// timeout: return False`) treated a literal `0` exactly like `None`, so
/// `STATIC_CACHE_TIMEOUT=0` silently disabled checking instead of forcing a
/// check on every access as its own comment claimed. `Ttl` keeps the same
/// three intents but gives zero its own variant, so `Seconds(0)` and `Never`
/// can no longer be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Once cached, never revalidate (barring `force_check`).
    Never,
    /// Revalidate against the remote store on every access.
    Always,
    /// Revalidate once the cached copy is older than this many seconds.
    Seconds(u64),
}

impl Ttl {
    /// Whether a file last checked `age` ago is due for revalidation.
    #[must_use]
    pub fn is_stale(self, age: Option<Duration>) -> bool {
        match self {
            Ttl::Never => false,
            Ttl::Always => true,
            Ttl::Seconds(secs) => match age {
                None => true,
                Some(age) => age.as_secs() > secs,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_is_never_stale() {
        assert!(!Ttl::Never.is_stale(None));
        assert!(!Ttl::Never.is_stale(Some(Duration::from_secs(u64::MAX))));
    }

    #[test]
    fn always_is_always_stale() {
        assert!(Ttl::Always.is_stale(None));
        assert!(Ttl::Always.is_stale(Some(Duration::from_secs(0))));
    }

    #[test]
    fn seconds_compares_against_age() {
        let ttl = Ttl::Seconds(60);
        assert!(!ttl.is_stale(Some(Duration::from_secs(30))));
        assert!(ttl.is_stale(Some(Duration::from_secs(61))));
        assert!(ttl.is_stale(None));
    }

    #[test]
    fn missing_timestamp_is_always_stale_even_under_never_timeout_override() {
        // A file with no timestamp at all has never been downloaded
        // successfully; only `Never` should treat that as fresh, since
        // `Never` means "don't bother checking," not "assume it's fine."
        assert!(Ttl::Seconds(0).is_stale(None));
    }
}

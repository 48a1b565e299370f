//! Expiry policy. No filesystem access here.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// When an entry created at `created_at` expires, or `None` if it never does.
pub(crate) fn expires_at_impl(
    created_at: DateTime<Utc>,
    ttl: Option<Duration>,
) -> Option<DateTime<Utc>> {
    let ttl = chrono::Duration::from_std(ttl?).ok()?;
    created_at.checked_add_signed(ttl)
}

/// An entry is expired once `now` reaches its expiry instant.
pub(crate) fn is_expired_impl(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|at| now >= at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_ttl_never_expires() {
        let created = Utc::now();
        let expires = expires_at_impl(created, None);
        assert!(expires.is_none());
        assert!(!is_expired_impl(expires, created + chrono::Duration::days(3650)));
    }

    #[test]
    fn test_ttl_boundary() {
        let created = Utc::now();
        let expires = expires_at_impl(created, Some(Duration::from_secs(1800)));
        assert_eq!(expires, Some(created + chrono::Duration::seconds(1800)));

        assert!(!is_expired_impl(
            expires,
            created + chrono::Duration::seconds(1799)
        ));
        assert!(is_expired_impl(
            expires,
            created + chrono::Duration::seconds(1800)
        ));
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let created = Utc::now();
        let expires = expires_at_impl(created, Some(Duration::ZERO));
        assert!(is_expired_impl(expires, created));
    }

    #[test]
    fn test_huge_ttl_is_treated_as_no_expiry() {
        let created = Utc::now();
        assert!(expires_at_impl(created, Some(Duration::MAX)).is_none());
    }
}

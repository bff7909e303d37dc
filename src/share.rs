//! Share tokens and the liveness predicate.

use chrono::{DateTime, Duration, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;

use crate::datetime::parse_utc;
use crate::db::FileRecord;

/// Length of an issued share token in characters.
///
/// 32 alphanumeric characters carry ~190 bits of randomness, comfortably
/// above the 128-bit guessing floor; uniqueness among live tokens is
/// entropy-guaranteed rather than checked.
pub const TOKEN_LENGTH: usize = 32;

/// How long a share link stays valid after issuance.
pub const SHARE_TTL_HOURS: i64 = 24;

/// TTL for URLs resolved at retrieval time.
pub const RESOLVE_TTL_SECS: u64 = 15 * 60;

/// Issue a new opaque share token.
pub fn issue_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LENGTH)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect()
}

/// Compute the share expiry for a grant issued at `now`.
pub fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(SHARE_TTL_HOURS)
}

/// The single authority for "is this share link usable".
///
/// True iff the record is public and its expiry, when set, lies in the
/// future. Applied identically at retrieval time and when judging
/// reclamation eligibility; an unparseable stored expiry counts as expired.
pub fn is_live(record: &FileRecord, now: DateTime<Utc>) -> bool {
    if !record.is_public {
        return false;
    }
    match record.expires_at.as_deref() {
        None => true,
        Some(s) => match parse_utc(s) {
            Some(expiry) => expiry > now,
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::fmt_utc;

    fn record(is_public: bool, expires_at: Option<String>) -> FileRecord {
        FileRecord {
            id: 1,
            owner_id: 10,
            name: "report.pdf".to_string(),
            size: 1200,
            content_type: "application/pdf".to_string(),
            locator: "10/ab_report.pdf".to_string(),
            is_public,
            share_token: is_public.then(|| "tok".to_string()),
            expires_at,
            created_at: "2025-01-01 00:00:00".to_string(),
            updated_at: "2025-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_token_length_and_charset() {
        let token = issue_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = issue_token();
        let b = issue_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_expiry_is_24h_out() {
        let now = Utc::now();
        assert_eq!(expiry_from(now) - now, Duration::hours(24));
    }

    #[test]
    fn test_private_is_never_live() {
        let now = Utc::now();
        assert!(!is_live(&record(false, None), now));
        let future = fmt_utc(now + Duration::hours(1));
        assert!(!is_live(&record(false, Some(future)), now));
    }

    #[test]
    fn test_public_without_expiry_is_live() {
        assert!(is_live(&record(true, None), Utc::now()));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let future = fmt_utc(now + Duration::hours(1));
        let past = fmt_utc(now - Duration::seconds(1));

        assert!(is_live(&record(true, Some(future)), now));
        assert!(!is_live(&record(true, Some(past)), now));
    }

    #[test]
    fn test_live_flips_when_clock_passes_expiry() {
        let issued = Utc::now();
        let rec = record(true, Some(fmt_utc(expiry_from(issued))));

        assert!(is_live(&rec, issued));
        assert!(is_live(&rec, issued + Duration::hours(23)));
        assert!(!is_live(&rec, issued + Duration::hours(25)));
    }

    #[test]
    fn test_unparseable_expiry_counts_as_expired() {
        assert!(!is_live(&record(true, Some("garbage".to_string())), Utc::now()));
    }
}

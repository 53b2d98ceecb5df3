use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use time::{Duration, OffsetDateTime};

pub const TOKEN_LEN: usize = 60;

/// Opaque bearer / verification token drawn from the OS CSPRNG.
pub fn generate() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// A fresh token together with its absolute expiry.
pub fn issue(ttl_minutes: i64) -> (String, OffsetDateTime) {
    (
        generate(),
        OffsetDateTime::now_utc() + Duration::minutes(ttl_minutes),
    )
}

pub fn is_expired(expiry: Option<OffsetDateTime>) -> bool {
    match expiry {
        Some(at) => at <= OffsetDateTime::now_utc(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_have_fixed_length_and_charset() {
        let t = generate();
        assert_eq!(t.len(), TOKEN_LEN);
        assert!(t.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn tokens_differ() {
        assert_ne!(generate(), generate());
    }

    #[test]
    fn issue_sets_future_expiry() {
        let (_, exp) = issue(60);
        assert!(exp > OffsetDateTime::now_utc() + Duration::minutes(59));
        assert!(!is_expired(Some(exp)));
    }

    #[test]
    fn missing_or_past_expiry_is_expired() {
        assert!(is_expired(None));
        assert!(is_expired(Some(OffsetDateTime::now_utc() - Duration::seconds(1))));
    }
}

// ============== Authorization ==============

/// Canonical form of a Telegram handle: trimmed, one leading `@` removed,
/// lower-cased.
pub fn normalize_identity(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('@')
        .unwrap_or(trimmed)
        .trim()
        .to_lowercase()
}

/// Whether `username` belongs to one of the configured masters.
///
/// `masters` are expected to be normalized already (see `Config::load`); the
/// inbound handle is normalized here. Senders without a handle never match.
pub fn is_authorized(username: Option<&str>, masters: &[String]) -> bool {
    let Some(username) = username else {
        return false;
    };
    let handle = normalize_identity(username);
    if handle.is_empty() {
        return false;
    }
    masters.iter().any(|m| *m == handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masters(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| normalize_identity(s)).collect()
    }

    #[test]
    fn matching_ignores_case_and_leading_at() {
        let m = masters(&["@bob", "Alice"]);
        assert!(is_authorized(Some("Bob"), &m));
        assert!(is_authorized(Some("@BOB"), &m));
        assert!(is_authorized(Some("alice"), &m));
        assert!(is_authorized(Some("@alice"), &m));
    }

    #[test]
    fn rejects_unknown_missing_and_empty_handles() {
        let m = masters(&["@bob"]);
        assert!(!is_authorized(Some("mallory"), &m));
        assert!(!is_authorized(Some("bobby"), &m));
        assert!(!is_authorized(None, &m));
        assert!(!is_authorized(Some("@"), &m));
        assert!(!is_authorized(Some("bob"), &[]));
    }

    #[test]
    fn only_one_leading_at_is_stripped() {
        assert_eq!(normalize_identity("  @Bob "), "bob");
        assert_eq!(normalize_identity("@@bob"), "@bob");
        assert!(!is_authorized(Some("@@bob"), &masters(&["bob"])));
    }
}

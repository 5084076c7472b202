//! Shadow-account username derivation.

/// Maximum length of a derived Gitea login.
pub const MAX_SHADOW_USERNAME_LEN: usize = 20;

/// Derive a Gitea login from a local username.
///
/// Spaces and `@` are removed, `.` becomes `_`, any other character Gitea
/// would reject is dropped, and the result is cut to
/// [`MAX_SHADOW_USERNAME_LEN`] characters. Falls back to `user{id}` when
/// nothing usable is left. Collisions are not checked here; the remote
/// uniqueness constraint rejects them.
pub fn derive_shadow_username(local_username: &str, user_id: i32) -> String {
    let derived: String = local_username
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '@')
        .map(|c| if c == '.' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_SHADOW_USERNAME_LEN)
        .collect();

    if derived.is_empty() {
        format!("user{}", user_id)
    } else {
        derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_spaces_and_at_signs() {
        assert_eq!(derive_shadow_username("Alice Smith", 1), "AliceSmith");
        assert_eq!(derive_shadow_username("bob@example", 2), "bobexample");
    }

    #[test]
    fn dots_become_underscores() {
        assert_eq!(derive_shadow_username("j.doe", 3), "j_doe");
        assert_eq!(
            derive_shadow_username("first.last@corp.example", 4),
            "first_lastcorp_examp"
        );
    }

    #[test]
    fn truncates_to_twenty_characters() {
        let derived = derive_shadow_username("abcdefghijklmnopqrstuvwxyz", 5);
        assert_eq!(derived, "abcdefghijklmnopqrst");
        assert_eq!(derived.len(), MAX_SHADOW_USERNAME_LEN);
    }

    #[test]
    fn falls_back_to_user_id() {
        assert_eq!(derive_shadow_username(" @ ", 42), "user42");
        assert_eq!(derive_shadow_username("ümlaut", 7), "mlaut");
        assert_eq!(derive_shadow_username("日本", 8), "user8");
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(
            derive_shadow_username("Carol.King", 9),
            derive_shadow_username("Carol.King", 9)
        );
    }
}

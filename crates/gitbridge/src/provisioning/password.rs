//! Transient password generation for shadow accounts.
//!
//! The password only lives long enough to create the account and mint a
//! token; it is never stored.

use rand::Rng;
use rand::seq::SliceRandom;

/// Length of generated passwords.
pub const PASSWORD_LEN: usize = 24;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!#$%&*+-=?^_~";

/// Generate a random password containing at least one lowercase letter, one
/// uppercase letter, one digit and one symbol.
pub fn generate_password() -> String {
    let mut rng = rand::rng();
    let classes = [LOWER, UPPER, DIGITS, SYMBOLS];
    let all: Vec<u8> = classes.concat();

    let mut chars: Vec<u8> = classes
        .iter()
        .map(|class| class[rng.random_range(0..class.len())])
        .collect();
    while chars.len() < PASSWORD_LEN {
        chars.push(all[rng.random_range(0..all.len())]);
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_expected_length_and_classes() {
        for _ in 0..50 {
            let password = generate_password();
            assert_eq!(password.len(), PASSWORD_LEN);
            assert!(password.bytes().any(|b| LOWER.contains(&b)));
            assert!(password.bytes().any(|b| UPPER.contains(&b)));
            assert!(password.bytes().any(|b| DIGITS.contains(&b)));
            assert!(password.bytes().any(|b| SYMBOLS.contains(&b)));
        }
    }

    #[test]
    fn passwords_differ() {
        assert_ne!(generate_password(), generate_password());
    }
}

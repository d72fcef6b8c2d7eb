//! Human-readable document references of the form `FI-2024-7QX2`.

use std::fmt;

use chrono::{Datelike, Local};
use rand::Rng;
use serde::{Deserialize, Serialize};

const BASE36_UPPER: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SUFFIX_LEN: usize = 4;
const PREFIX_LEN: usize = 2;

/// Label stored as a requirement's `documentReference` and used as the base
/// name of its evidence file. Not globally unique on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentReference(pub String);

impl DocumentReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds a fresh reference for `department` using the local calendar year.
pub fn generate(department: &str) -> DocumentReference {
    generate_with(department, Local::now().year(), &mut rand::thread_rng())
}

/// Deterministic seam for tests: the caller supplies the year and RNG.
pub fn generate_with<R: Rng + ?Sized>(
    department: &str,
    year: i32,
    rng: &mut R,
) -> DocumentReference {
    DocumentReference(format!(
        "{}-{}-{}",
        department_prefix(department),
        year,
        random_suffix(rng)
    ))
}

/// Up to the first two characters, upper-cased; shorter names are not padded.
fn department_prefix(department: &str) -> String {
    department
        .chars()
        .take(PREFIX_LEN)
        .flat_map(char::to_uppercase)
        .collect()
}

fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| BASE36_UPPER[rng.gen_range(0..BASE36_UPPER.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use regex::Regex;

    #[test]
    fn finance_token_matches_expected_shape() {
        let pattern = Regex::new(r"^FI-2024-[A-Z0-9]{4}$").expect("pattern");
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let token = generate_with("finance", 2024, &mut rng);
            assert!(pattern.is_match(token.as_str()), "unexpected token {token}");
        }
    }

    #[test]
    fn short_department_is_not_padded() {
        let token = generate_with("x", 2025, &mut StepRng::new(0, 0));
        assert_eq!(token.as_str(), "X-2025-0000");
    }

    #[test]
    fn prefix_takes_leading_characters_as_given() {
        let token = generate_with(" finance", 2025, &mut StepRng::new(0, 0));
        assert_eq!(token.as_str(), " F-2025-0000");
    }

    #[test]
    fn empty_department_yields_bare_prefix() {
        let token = generate_with("", 2025, &mut StepRng::new(0, 0));
        assert_eq!(token.as_str(), "-2025-0000");
    }

    #[test]
    fn uses_current_year_by_default() {
        let token = generate("Human Resources");
        let year = Local::now().year().to_string();
        assert!(token.as_str().starts_with(&format!("HU-{year}-")));
    }
}

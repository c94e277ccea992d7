// MIT License
// Copyright (c) 2024 Graham King

use crate::error::IsbnError;

/// Strip spaces and hyphens, upper-case, and check the ISBN-10 / ISBN-13 check digit.
/// Returns the normalized form.
pub fn normalize(raw: &str) -> Result<String, IsbnError> {
    let normalized: String = raw
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect::<String>()
        .to_uppercase();

    // Length in characters, so multi-byte input is a length error not a panic
    match normalized.chars().count() {
        10 if is_valid_isbn10(&normalized) => Ok(normalized),
        13 if is_valid_isbn13(&normalized) => Ok(normalized),
        10 | 13 => Err(IsbnError::FailedChecksum),
        _ => Err(IsbnError::WrongLength),
    }
}

/// As `normalize` for an untyped request field. Anything but a JSON string is `NotString`.
pub fn normalize_value(raw: &serde_json::Value) -> Result<String, IsbnError> {
    match raw {
        serde_json::Value::String(s) => normalize(s),
        _ => Err(IsbnError::NotString),
    }
}

/// True if `s` would pass `normalize`. Used to route search queries.
pub fn looks_like_isbn(s: &str) -> bool {
    normalize(s).is_ok()
}

fn is_valid_isbn10(s: &str) -> bool {
    let mut sum = 0;
    for (i, c) in s.chars().enumerate() {
        let digit = match c {
            '0'..='9' => c as u32 - '0' as u32,
            'X' if i == 9 => 10,
            _ => return false,
        };
        sum += (10 - i as u32) * digit;
    }
    sum % 11 == 0
}

fn is_valid_isbn13(s: &str) -> bool {
    if !(s.starts_with("978") || s.starts_with("979")) {
        return false;
    }
    let mut sum = 0;
    for (i, c) in s.chars().enumerate() {
        let Some(digit) = c.to_digit(10) else {
            return false;
        };
        sum += if i % 2 == 0 { digit } else { 3 * digit };
    }
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &[&str] = &[
        "9791166832598",
        "9788949114118",
        "0306406152",
        "080442957X",
        "9780306406157",
    ];

    #[test]
    fn accepts_valid() {
        for isbn in VALID {
            assert_eq!(normalize(isbn).as_deref(), Ok(*isbn));
        }
    }

    #[test]
    fn strips_separators_and_uppercases() {
        assert_eq!(
            normalize("978-89-491 1411-8").as_deref(),
            Ok("9788949114118")
        );
        assert_eq!(normalize("0-8044-2957-x").as_deref(), Ok("080442957X"));
    }

    #[test]
    fn wrong_length() {
        assert_eq!(normalize("979116683259"), Err(IsbnError::WrongLength));
        assert_eq!(normalize(""), Err(IsbnError::WrongLength));
        assert_eq!(normalize("97911668325981"), Err(IsbnError::WrongLength));
    }

    #[test]
    fn failed_checksum() {
        assert_eq!(normalize("9791166832599"), Err(IsbnError::FailedChecksum));
        assert_eq!(normalize("0306406153"), Err(IsbnError::FailedChecksum));
        // Right length, not digits
        assert_eq!(normalize("97911668325A8"), Err(IsbnError::FailedChecksum));
        assert_eq!(normalize("X306406152"), Err(IsbnError::FailedChecksum));
        // Valid EAN-13 but not a book prefix
        assert_eq!(normalize("4006381333931"), Err(IsbnError::FailedChecksum));
    }

    #[test]
    fn any_single_digit_change_fails() {
        for isbn in VALID {
            let chars: Vec<char> = isbn.chars().collect();
            for pos in 0..chars.len() {
                for replacement in '0'..='9' {
                    if chars[pos] == replacement {
                        continue;
                    }
                    let mut mutated = chars.clone();
                    mutated[pos] = replacement;
                    let mutated: String = mutated.into_iter().collect();
                    assert!(
                        normalize(&mutated).is_err(),
                        "{mutated} (from {isbn}) should fail"
                    );
                }
            }
        }
    }

    #[test]
    fn non_string_values() {
        assert_eq!(
            normalize_value(&serde_json::json!(9791166832598u64)),
            Err(IsbnError::NotString)
        );
        assert_eq!(
            normalize_value(&serde_json::Value::Null),
            Err(IsbnError::NotString)
        );
        assert_eq!(
            normalize_value(&serde_json::json!("979-11-6683-259-8")).as_deref(),
            Ok("9791166832598")
        );
    }

    #[test]
    fn multibyte_input_is_rejected() {
        assert!(normalize("９７９１１６６８３２５９８").is_err());
        assert!(!looks_like_isbn("여름이 온다"));
    }
}

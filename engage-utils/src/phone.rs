use crate::error::Error;

/// Normalizes a phone number to the canonical 10-digit national form used
/// for the unique constraint on `users.phone`.
///
/// Separators are stripped, then a leading `7` or `8` country prefix on an
/// 11-digit number is dropped. Anything that does not reduce to 10 digits
/// is rejected; lookups and inserts always go through this one function, so
/// there is no suffix matching anywhere else.
pub fn normalize_phone(raw: &str) -> Result<String, Error> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    let national = match digits.len() {
        10 => digits,
        11 if digits.starts_with('7') || digits.starts_with('8') => digits[1..].to_string(),
        _ => {
            return Err(Error::InvalidPhone(format!(
                "phone number {raw:?} is not a valid 10-digit national number"
            )));
        }
    };

    Ok(national)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_separators_and_country_code() {
        assert_eq!(normalize_phone("+7 (999) 123-45-67").unwrap(), "9991234567");
        assert_eq!(normalize_phone("89991234567").unwrap(), "9991234567");
        assert_eq!(normalize_phone("9991234567").unwrap(), "9991234567");
    }

    #[test]
    fn equivalent_spellings_collapse_to_one_form() {
        let spellings = ["+79991234567", "8 999 123 45 67", "999-123-45-67"];
        for s in spellings {
            assert_eq!(normalize_phone(s).unwrap(), "9991234567");
        }
    }

    #[test]
    fn rejects_wrong_lengths() {
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("").is_err());
        // 11 digits with a prefix that is not a country code
        assert!(normalize_phone("19991234567").is_err());
    }
}

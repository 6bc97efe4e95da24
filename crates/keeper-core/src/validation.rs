//! Input validation for registration and secret records.
//!
//! Each check returns a [`ValidationError`] naming the offending field.

use crate::error::ValidationError;

const MAX_LOGIN_LEN: usize = 254;
const MAX_TITLE_LEN: usize = 256;

/// Require an email-shaped login: one `@`, a non-empty local part, a dotted
/// domain, no whitespace.
///
/// # Errors
///
/// Returns a [`ValidationError`] for `login`.
pub fn login(value: &str) -> Result<(), ValidationError> {
    let invalid = |reason| Err(ValidationError::new("login", reason));
    if value.is_empty() {
        return invalid("must not be empty");
    }
    if value.len() > MAX_LOGIN_LEN {
        return invalid("too long");
    }
    if value.chars().any(char::is_whitespace) {
        return invalid("must not contain whitespace");
    }
    let Some((local, domain)) = value.split_once('@') else {
        return invalid("must be an email address");
    };
    let domain_ok = !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..");
    if local.is_empty() || !domain_ok {
        return invalid("must be an email address");
    }
    Ok(())
}

/// Require a title of 1 to 256 characters that is not only whitespace.
///
/// # Errors
///
/// Returns a [`ValidationError`] for `title`.
pub fn title(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("title", "must not be empty"));
    }
    if value.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::new("title", "too long"));
    }
    Ok(())
}

/// Require a non-empty value.
///
/// # Errors
///
/// Returns a [`ValidationError`] for `field`.
pub fn required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

fn digits(
    field: &'static str,
    value: &str,
    len: usize,
    reason: &'static str,
) -> Result<(), ValidationError> {
    if value.len() == len && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new(field, reason))
    }
}

/// Require a 16-digit card number with a valid Luhn checksum.
///
/// # Errors
///
/// Returns a [`ValidationError`] for `num`.
pub fn card_number(value: &str) -> Result<(), ValidationError> {
    digits("num", value, 16, "must be 16 digits")?;
    if !luhn(value) {
        return Err(ValidationError::new("num", "fails the card checksum"));
    }
    Ok(())
}

/// Require a 4-digit `MMYY` expiry.
///
/// # Errors
///
/// Returns a [`ValidationError`] for `expires_at`.
pub fn card_expiry(value: &str) -> Result<(), ValidationError> {
    digits("expires_at", value, 4, "must be 4 digits")
}

/// Require a 3-digit card verification code.
///
/// # Errors
///
/// Returns a [`ValidationError`] for `cvc`.
pub fn card_cvc(value: &str) -> Result<(), ValidationError> {
    digits("cvc", value, 3, "must be 3 digits")
}

/// Luhn checksum over an all-digit string.
fn luhn(value: &str) -> bool {
    let sum: u32 = value
        .bytes()
        .rev()
        .map(|b| u32::from(b - b'0'))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Strip any directory part from an uploaded file name.
///
/// # Errors
///
/// Returns a [`ValidationError`] for `fname` if nothing remains.
pub fn file_name(value: &str) -> Result<String, ValidationError> {
    let base = value.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(ValidationError::new("fname", "must name a file"));
    }
    Ok(base.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn logins() {
        for ok in ["a@b.com", "first.last@sub.example.org"] {
            assert!(login(ok).is_ok(), "{ok}");
        }
        for bad in ["", "ab.com", "@b.com", "a@b", "a@.com", "a@b.com.", "a b@c.com", "a@b@c.com"] {
            assert_eq!(login(bad).unwrap_err().field, "login", "{bad}");
        }
    }

    #[test]
    fn card_numbers() {
        assert!(card_number("4111111111111111").is_ok());
        assert!(card_number("5500000000000004").is_ok());
        assert_eq!(
            card_number("4111111111111112").unwrap_err().reason,
            "fails the card checksum"
        );
        assert!(card_number("411111111111111").is_err());
        assert!(card_number("41111111111111x1").is_err());
    }

    #[test]
    fn expiry_and_cvc() {
        assert!(card_expiry("1230").is_ok());
        assert!(card_expiry("123").is_err());
        assert!(card_expiry("12/3").is_err());
        assert!(card_cvc("123").is_ok());
        assert!(card_cvc("12a").is_err());
        assert!(card_cvc("1234").is_err());
    }

    #[test]
    fn titles() {
        assert!(title("visa").is_ok());
        assert!(title("   ").is_err());
        assert!(title(&"x".repeat(257)).is_err());
    }

    #[test]
    fn file_names_lose_directories() {
        assert_eq!(file_name("/home/u/report.pdf").unwrap(), "report.pdf");
        assert_eq!(file_name("C:\\docs\\a.txt").unwrap(), "a.txt");
        assert!(file_name("dir/").is_err());
        assert!(file_name("..").is_err());
    }
}

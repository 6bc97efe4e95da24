//! Request and response shapes for secret records.
//!
//! Field names follow the wire format of the HTTP API (`pwd`, `num`,
//! `expires_at`, `fname`). Types that carry plaintext secrets redact them in
//! `Debug`.

use serde::{Deserialize, Serialize};

/// Mask shown in place of all but the last four card digits.
pub const CARD_MASK: &str = "************";

/// Replace all but the last four characters of a card number with
/// [`CARD_MASK`]. Numbers of four characters or fewer are masked entirely.
#[must_use]
pub fn mask_card_number(number: &str) -> String {
    let chars: Vec<char> = number.chars().collect();
    if chars.len() <= 4 {
        return CARD_MASK.to_owned();
    }
    let last4: String = chars[chars.len() - 4..].iter().collect();
    format!("{CARD_MASK}{last4}")
}

// ── Registration ─────────────────────────────────────────────────────

/// A registration request.
#[derive(Clone, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub name: String,
    pub login: String,
    #[serde(rename = "masterPassword", alias = "masterpassword")]
    pub master_password: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

// ── Passwords ────────────────────────────────────────────────────────

/// A password to store.
#[derive(Clone, Deserialize)]
pub struct NewPassword {
    pub title: String,
    #[serde(rename = "pwd")]
    pub secret: String,
    #[serde(default)]
    pub description: String,
}

impl std::fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewPassword")
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// A decrypted password record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordEntry {
    pub title: String,
    #[serde(rename = "pwd")]
    pub secret: String,
    pub description: String,
}

/// List view of a password record. Carries no secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordSummary {
    pub title: String,
    pub description: String,
}

/// Partial update of a password record. `None` leaves a field unchanged.
#[derive(Clone, Default, Deserialize)]
pub struct PasswordPatch {
    #[serde(rename = "pwd")]
    pub secret: Option<String>,
    pub description: Option<String>,
}

impl std::fmt::Debug for PasswordPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordPatch")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("description", &self.description)
            .finish()
    }
}

// ── Cards ────────────────────────────────────────────────────────────

/// A payment card to store.
#[derive(Clone, Deserialize)]
pub struct NewCard {
    pub title: String,
    #[serde(rename = "num")]
    pub number: String,
    #[serde(rename = "expires_at")]
    pub expiry: String,
    pub cvc: String,
    #[serde(default)]
    pub description: String,
}

impl std::fmt::Debug for NewCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewCard")
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// A decrypted card record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardEntry {
    pub title: String,
    #[serde(rename = "num")]
    pub number: String,
    #[serde(rename = "expires_at")]
    pub expiry: String,
    pub cvc: String,
    pub description: String,
}

/// List view of a card record: the number is masked, expiry and cvc absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardSummary {
    pub title: String,
    #[serde(rename = "num")]
    pub masked_number: String,
    pub description: String,
}

/// Partial update of a card record. `None` leaves a field unchanged.
#[derive(Clone, Default, Deserialize)]
pub struct CardPatch {
    #[serde(rename = "num")]
    pub number: Option<String>,
    #[serde(rename = "expires_at")]
    pub expiry: Option<String>,
    pub cvc: Option<String>,
    pub description: Option<String>,
}

impl std::fmt::Debug for CardPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("CardPatch")
            .field("number", &redact(&self.number))
            .field("expiry", &redact(&self.expiry))
            .field("cvc", &redact(&self.cvc))
            .field("description", &self.description)
            .finish()
    }
}

// ── Files ────────────────────────────────────────────────────────────

/// Metadata of a file to store. The payload travels separately.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFile {
    pub title: String,
    #[serde(rename = "fname")]
    pub file_name: String,
    #[serde(default)]
    pub description: String,
}

/// File metadata as listed and returned alongside downloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub title: String,
    #[serde(rename = "fname")]
    pub file_name: String,
    pub description: String,
}

/// A file record together with its payload.
#[derive(Clone)]
pub struct FileDownload {
    pub summary: FileSummary,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for FileDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDownload")
            .field("summary", &self.summary)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Partial update of file metadata. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilePatch {
    #[serde(rename = "fname")]
    pub file_name: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn masking_keeps_at_most_four_digits() {
        assert_eq!(mask_card_number("4111111111111111"), "************1111");
        assert_eq!(mask_card_number("1234"), CARD_MASK);
        assert_eq!(mask_card_number(""), CARD_MASK);
        assert_eq!(mask_card_number("12345"), "************2345");
    }

    #[test]
    fn missing_and_null_are_both_absent() {
        let patch: CardPatch =
            serde_json::from_str(r#"{"num": null, "description": ""}"#).unwrap();
        assert!(patch.number.is_none());
        assert!(patch.expiry.is_none());
        assert_eq!(patch.description.as_deref(), Some(""));
    }

    #[test]
    fn registration_accepts_both_spellings() {
        let a: Registration =
            serde_json::from_str(r#"{"login":"a@b.com","masterPassword":"x"}"#).unwrap();
        let b: Registration =
            serde_json::from_str(r#"{"login":"a@b.com","masterpassword":"x"}"#).unwrap();
        assert_eq!(a.master_password, b.master_password);
        assert!(a.name.is_empty());
    }

    #[test]
    fn debug_never_prints_secrets() {
        let card = NewCard {
            title: "visa".into(),
            number: "4111111111111111".into(),
            expiry: "1230".into(),
            cvc: "123".into(),
            description: String::new(),
        };
        assert!(!format!("{card:?}").contains("4111"));
        let patch = PasswordPatch {
            secret: Some("hunter2".into()),
            description: None,
        };
        assert!(!format!("{patch:?}").contains("hunter2"));
    }
}

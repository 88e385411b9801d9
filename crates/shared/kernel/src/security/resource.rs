use std::borrow::Cow;

/// Longest identifier accepted from clients.
pub const MAX_ID_LEN: usize = 64;

#[fauna_derive::fauna_error]
pub enum ResourceGuardError {
    #[error("Invalid {field}: {message}")]
    Validation { field: Cow<'static, str>, message: Cow<'static, str> },
}

impl ResourceGuardError {
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Validation { field, .. } => field,
        }
    }
}

/// Checks client supplied identifiers before they reach storage.
#[derive(Debug)]
pub struct ResourceGuard;

impl ResourceGuard {
    /// Returns the trimmed id when it is non-empty, at most [`MAX_ID_LEN`] characters
    /// long and made of ASCII letters, digits, `-` or `_`.
    ///
    /// `field` names the offending input in the error.
    ///
    /// # Errors
    /// Returns [`ResourceGuardError::Validation`] describing the first broken rule.
    pub fn verify<I, F>(id: I, field: F) -> Result<String, ResourceGuardError>
    where
        I: AsRef<str>,
        F: Into<Cow<'static, str>>,
    {
        let id = id.as_ref().trim();
        let reject = |message: &'static str| ResourceGuardError::Validation {
            field: field.into(),
            message: message.into(),
        };

        if id.is_empty() {
            return Err(reject("must not be empty"));
        }
        if id.len() > MAX_ID_LEN {
            return Err(reject("is too long"));
        }
        if !id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
            return Err(reject("contains unsupported characters"));
        }

        Ok(id.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_verification() {
        assert_eq!(ResourceGuard::verify(" abc_12-Z ", "player").unwrap(), "abc_12-Z");

        let err = ResourceGuard::verify("", "player").unwrap_err();
        assert_eq!(err.field(), "player");
        assert_eq!(err.to_string(), "Invalid player: must not be empty");

        assert!(ResourceGuard::verify("branch:1", "id").is_err());
        assert!(ResourceGuard::verify("x".repeat(MAX_ID_LEN + 1), "id").is_err());
    }
}

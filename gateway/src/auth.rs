//! Registration-time input validation (spec.md §6.1): password policy and
//! email format. Credential storage itself belongs to the external identity
//! provider (spec.md §6.3 treats it as a black box); this module only keeps
//! obviously-bad input from ever reaching it, the same division of labor
//! `report_service::validation` draws for submitted reports.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthValidationError {
    #[error("password must be at least 8 characters")]
    PasswordTooShort,
    #[error("password must contain an uppercase letter")]
    PasswordMissingUppercase,
    #[error("password must contain a lowercase letter")]
    PasswordMissingLowercase,
    #[error("password must contain a digit")]
    PasswordMissingDigit,
    #[error("password must contain a special character")]
    PasswordMissingSpecial,
    #[error("invalid email format")]
    InvalidEmail,
    #[error("email address is too long")]
    EmailTooLong,
}

const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";
const MAX_EMAIL_LEN: usize = 254;

pub fn validate_password(password: &str) -> Result<(), AuthValidationError> {
    if password.len() < 8 {
        return Err(AuthValidationError::PasswordTooShort);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AuthValidationError::PasswordMissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(AuthValidationError::PasswordMissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthValidationError::PasswordMissingDigit);
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(AuthValidationError::PasswordMissingSpecial);
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), AuthValidationError> {
    if email.len() > MAX_EMAIL_LEN {
        return Err(AuthValidationError::EmailTooLong);
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(AuthValidationError::InvalidEmail);
    };
    let local_ok = !local.is_empty() && local.chars().all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let domain_ok = domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
        && domain.chars().all(|c| c.is_ascii_alphanumeric() || ".-".contains(c))
        && domain.rsplit('.').next().map(|tld| tld.len() >= 2).unwrap_or(false);

    if local_ok && domain_ok {
        Ok(())
    } else {
        Err(AuthValidationError::InvalidEmail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_password() {
        assert_eq!(validate_password("Ab1!"), Err(AuthValidationError::PasswordTooShort));
    }

    #[test]
    fn rejects_password_missing_special_char() {
        assert_eq!(validate_password("Abcdefg1"), Err(AuthValidationError::PasswordMissingSpecial));
    }

    #[test]
    fn accepts_strong_password() {
        assert!(validate_password("Abcdef1!").is_ok());
    }

    #[test]
    fn rejects_malformed_email() {
        assert_eq!(validate_email("not-an-email"), Err(AuthValidationError::InvalidEmail));
    }

    #[test]
    fn accepts_well_formed_email() {
        assert!(validate_email("user@example.com").is_ok());
    }
}

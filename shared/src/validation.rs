use rustrict::CensorStr;
use crate::draw::DrawError;

pub const MAX_NICKNAME_LENGTH: usize = 40;
pub const MAX_NAME_LENGTH: usize = 60;
pub const MAX_EMAIL_LENGTH: usize = 254;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Nickname is required")]
    EmptyNickname,
    #[error("Nickname exceeds maximum length of {MAX_NICKNAME_LENGTH}")]
    NicknameTooLong,
    #[error("Nickname already taken: {0}")]
    DuplicateNickname(String),
    #[error("Name is required")]
    EmptyName,
    #[error("Name exceeds maximum length of {MAX_NAME_LENGTH}")]
    NameTooLong,
    #[error("Email is required")]
    EmptyEmail,
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),
    #[error("Possible profanity detected: {0}")]
    Inappropriate(String),
    #[error("Points cannot go negative ({current} + {delta} = {result})")]
    NegativeBalance { current: i64, delta: i64, result: i64 },
    #[error("Points change of {delta} overflows a balance of {current}")]
    PointsOverflow { current: i64, delta: i64 },
    #[error(transparent)]
    DrawCount(#[from] DrawError),
}

impl ValidationError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateNickname(_) | Self::DuplicateEmail(_))
    }
}

/// Returns the trimmed nickname if it may be registered.
pub fn validate_nickname(raw: &str) -> Result<String, ValidationError> {
    let nickname = raw.trim();
    if nickname.is_empty() { return Err(ValidationError::EmptyNickname); }
    if nickname.chars().count() > MAX_NICKNAME_LENGTH { return Err(ValidationError::NicknameTooLong); }
    if nickname.is_inappropriate() { return Err(ValidationError::Inappropriate(nickname.to_string())); }
    Ok(nickname.to_string())
}

/// Returns the trimmed `(name, email)` pair. Email case is preserved; uniqueness is case-sensitive.
pub fn validate_entrant(name: &str, email: &str) -> Result<(String, String), ValidationError> {
    let (name, email) = (name.trim(), email.trim());
    if name.is_empty() { return Err(ValidationError::EmptyName); }
    if email.is_empty() { return Err(ValidationError::EmptyEmail); }
    if name.chars().count() > MAX_NAME_LENGTH { return Err(ValidationError::NameTooLong); }
    if name.is_inappropriate() { return Err(ValidationError::Inappropriate(name.to_string())); }
    if !is_plausible_email(email) { return Err(ValidationError::InvalidEmail(email.to_string())); }
    Ok((name.to_string(), email.to_string()))
}

fn is_plausible_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LENGTH || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|label| !label.is_empty())
        }
        None => false,
    }
}

/// Computes `current + delta`, refusing any result below zero.
pub fn apply_points_delta(current: i64, delta: i64) -> Result<i64, ValidationError> {
    let result = current
        .checked_add(delta)
        .ok_or(ValidationError::PointsOverflow { current, delta })?;
    if result < 0 {
        return Err(ValidationError::NegativeBalance { current, delta, result });
    }
    Ok(result)
}

use crate::auth::tokens::generate_token;

/// Prefix marking a hash that can never verify.
const UNUSABLE_PREFIX: char = '!';

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

/// Stand-in hash for accounts created without a password.
pub fn unusable_password() -> String {
    format!("{}{}", UNUSABLE_PREFIX, generate_token())
}

pub fn has_usable_password(hash: &str) -> bool {
    !hash.starts_with(UNUSABLE_PREFIX)
}

/// Verify plaintext against a stored hash - constant-time via bcrypt
pub fn verify_password(password: &str, hash: &str) -> bool {
    has_usable_password(hash) && bcrypt::verify(password, hash).unwrap_or(false)
}

/// Trim and lowercase the domain part; the local part is case-sensitive.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && (domain.contains('.') || domain == "localhost")
        }
        None => false,
    }
}

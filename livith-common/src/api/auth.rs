//! Admin session primitives
//!
//! Pure helpers for the password login and cookie session. No HTTP framework
//! dependencies; the dashboard wraps these in axum middleware.

use sha2::{Digest, Sha256};

/// Session cookie name
pub const SESSION_COOKIE: &str = "admin-auth";

/// Session lifetime (7 days)
pub const SESSION_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

/// SHA-256 digest of a password, hex encoded
pub fn password_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Compare a submitted password with the configured one
///
/// Compares digests in constant time so the check does not leak the length
/// of the matching prefix.
pub fn verify_password(submitted: &str, expected: &str) -> bool {
    let a = password_digest(submitted);
    let b = password_digest(expected);
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Fresh opaque session token
pub fn generate_session_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// `Set-Cookie` value establishing a session
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, SESSION_MAX_AGE_SECS
    )
}

/// `Set-Cookie` value expiring the session cookie
pub fn clear_session_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE)
}

/// Extract a cookie value from a `Cookie` header
pub fn parse_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_digest_is_hex_sha256() {
        let digest = password_digest("admin");
        assert_eq!(digest.len(), 64);
        assert_eq!(
            digest,
            "8c6976e5b5410415bde908bd4dee15dfb167a9c873fc4bb8a81f6f2ab448a918"
        );
    }

    #[test]
    fn test_verify_password() {
        assert!(verify_password("letmein", "letmein"));
        assert!(!verify_password("letmein", "letmeout"));
        assert!(!verify_password("", "letmein"));
    }

    #[test]
    fn test_session_tokens_unique() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc");
        assert!(cookie.starts_with("admin-auth=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_parse_cookie() {
        let header = "theme=dark; admin-auth=tok123; other=1";
        assert_eq!(parse_cookie(header, "admin-auth"), Some("tok123"));
        assert_eq!(parse_cookie(header, "missing"), None);
        assert_eq!(parse_cookie("admin-auth=", "admin-auth"), None);
        assert_eq!(parse_cookie("", "admin-auth"), None);
    }
}

// SPDX-License-Identifier: Apache-2.0

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use shiftbook_model::ValidationError;

type HmacSha256 = Hmac<Sha256>;

/// Accounts are provisioned with this password; logging in with it forces a
/// password change.
pub const DEFAULT_PASSWORD: &str = "1234";

pub const PBKDF2_ITERATIONS: u32 = 200_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const SCHEME: &str = "pbkdf2";

pub const SESSION_COOKIE: &str = "shiftbook_session";

/// `pbkdf2$<iterations>$<salt_b64>$<hash_b64>`.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut hash);
    format!(
        "{SCHEME}${PBKDF2_ITERATIONS}${}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(hash)
    )
}

/// True when the stored value carries the hash scheme prefix. Anything else
/// is a legacy plaintext password awaiting upgrade on the next login.
#[must_use]
pub fn is_hashed(stored: &str) -> bool {
    stored.starts_with(&format!("{SCHEME}$"))
}

#[must_use]
pub fn verify_password(stored: &str, password: &str) -> bool {
    if !is_hashed(stored) {
        return stored == password;
    }
    let mut parts = stored.splitn(4, '$');
    let (Some(_), Some(iters), Some(salt), Some(hash)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Ok(iterations) = iters.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (URL_SAFE_NO_PAD.decode(salt), URL_SAFE_NO_PAD.decode(hash))
    else {
        return false;
    };
    let mut actual = vec![0u8; expected.len().max(1)];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut actual);
    actual == expected
}

/// New-password rules: exactly 4 ASCII digits and not the employee id.
pub fn validate_new_password(password: &str, employee_id: &str) -> Result<(), ValidationError> {
    if password.len() != 4 || !password.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError(
            "password must be exactly 4 digits".to_string(),
        ));
    }
    if password == employee_id {
        return Err(ValidationError(
            "password must differ from the employee id".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub employee_id: String,
    pub name: String,
    pub expires_at_unix: i64,
}

fn signature(secret: &[u8], payload: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    Some(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// `employee_id.name_b64.expiry_unix.sig`, HMAC-SHA256 over the first three
/// segments.
#[must_use]
pub fn issue_session_cookie(secret: &[u8], session: &Session) -> Option<String> {
    let payload = format!(
        "{}.{}.{}",
        session.employee_id,
        URL_SAFE_NO_PAD.encode(session.name.as_bytes()),
        session.expires_at_unix
    );
    let sig = signature(secret, &payload)?;
    Some(format!("{payload}.{sig}"))
}

/// Rejects malformed, tampered and expired cookies.
#[must_use]
pub fn verify_session_cookie(secret: &[u8], cookie: &str, now_unix: i64) -> Option<Session> {
    let mut parts = cookie.split('.');
    let (Some(id), Some(name_b64), Some(expiry), Some(sig), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return None;
    };
    let payload = format!("{id}.{name_b64}.{expiry}");
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let sig_bytes = URL_SAFE_NO_PAD.decode(sig).ok()?;
    mac.verify_slice(&sig_bytes).ok()?;

    let expires_at_unix: i64 = expiry.parse().ok()?;
    if expires_at_unix <= now_unix {
        return None;
    }
    let name = String::from_utf8(URL_SAFE_NO_PAD.decode(name_b64).ok()?).ok()?;
    Some(Session {
        employee_id: id.to_string(),
        name,
        expires_at_unix,
    })
}

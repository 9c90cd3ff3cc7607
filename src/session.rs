//! Session tokens
//!
//! Tokens are random, handed to the client once, and stored only as a
//! SHA-256 hash mapped to `player|created_at|expires_at`.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::Store;
use crate::error::{err, BanError, Result};
use crate::model::{now, PlayerId};

/// Generate a cryptographically secure token (32 bytes, hex encoded)
pub fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes).map_err(|e| BanError::Storage(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Hash token with SHA-256 for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

mod hex {
    pub fn encode(data: impl AsRef<[u8]>) -> String {
        data.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Create a session, returns token. `ttl_secs = None` never expires.
pub fn create_session(store: &Store, player: &PlayerId, ttl_secs: Option<u64>) -> Result<String> {
    let token = generate_token()?;
    let hash = hash_token(&token);
    let created = now();
    let expires = ttl_secs.map(|t| created.saturating_add(t)).unwrap_or(0);
    let value = format!("{}|{}|{}", player, created, expires);

    store.transact(|tx| tx.put_session(&hash, &value))?;
    Ok(token)
}

/// Validate token, returns the player it belongs to
pub fn validate_session(store: &Store, token: &str) -> Result<PlayerId> {
    let hash = hash_token(token);
    store.read(|d, tx| {
        let value = d.sessions
            .get(tx, &hash)
            .map_err(err)?
            .ok_or_else(|| BanError::Invalid("Invalid session".into()))?;

        let parts: Vec<&str> = value.split('|').collect();
        if parts.len() != 3 {
            return Err(BanError::Storage("Corrupted session".into()));
        }
        let expires: u64 = parts[2].parse().unwrap_or(0);
        if expires > 0 && expires < now() {
            return Err(BanError::Invalid("Session expired".into()));
        }
        Uuid::parse_str(parts[0]).map_err(err)
    })
}

/// Revoke a session by token
pub fn revoke_session(store: &Store, token: &str) -> Result<bool> {
    let hash = hash_token(token);
    store.transact(|tx| tx.delete_session(&hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_hex() {
        let a = generate_token().unwrap();
        let b = generate_token().unwrap();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
        assert_ne!(hash_token(&a), a);
    }
}

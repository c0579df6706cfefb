//! Short-lived reconnection tokens, minted on `client_ready` and redeemed to
//! resume a seat in a still-open room. Not a login system — authentication
//! proper is out of scope here.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use liap_core::{Id, Position, Room, SequenceNumber};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Payload of a reconnection token: enough to re-seat a client without a
/// database lookup, scoped to one room and stamped with the sequence number
/// the client last saw so the server can decide replay vs. full sync.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReconnectClaims {
    pub room: Id<Room>,
    pub position: Position,
    pub name: String,
    pub last_seen_seq: SequenceNumber,
    pub iat: i64,
    pub exp: i64,
}

impl ReconnectClaims {
    pub fn new(room: Id<Room>, position: Position, name: String, last_seen_seq: SequenceNumber) -> Self {
        let now = now_secs();
        Self { room, position, name, last_seen_seq, iat: now, exp: now + Crypto::duration().as_secs() as i64 }
    }

    pub fn expired(&self) -> bool {
        self.exp < now_secs()
    }
}

fn now_secs() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).expect("time").as_secs() as i64
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("reconnection token is malformed or its signature does not match")]
    Invalid,
    #[error("reconnection token has expired")]
    Expired,
}

/// HMAC-SHA256 JWT encode/decode for [`ReconnectClaims`], plus a non-secret
/// content hash used to key short-lived lookup tables without storing the
/// raw token.
pub struct Crypto {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Crypto {
    pub fn new(secret: &[u8]) -> Self {
        Self { encoding: EncodingKey::from_secret(secret), decoding: DecodingKey::from_secret(secret) }
    }

    /// How long a minted reconnection token remains valid.
    pub fn duration() -> Duration {
        Duration::from_secs(5 * 60)
    }

    pub fn encode(&self, claims: &ReconnectClaims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(|_| TokenError::Invalid)
    }

    pub fn decode(&self, token: &str) -> Result<ReconnectClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let data = jsonwebtoken::decode::<ReconnectClaims>(token, &self.decoding, &validation)
            .map_err(|_| TokenError::Invalid)?;
        if data.claims.expired() {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }

    pub fn hash(material: &str) -> String {
        let digest = Sha256::digest(material.as_bytes());
        hex_encode(&digest)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_round_trips() {
        let crypto = Crypto::new(b"test-secret");
        let room: Id<Room> = Id::default();
        let claims = ReconnectClaims::new(room, 2, "Alice".into(), 7);
        let token = crypto.encode(&claims).unwrap();
        let decoded = crypto.decode(&token).unwrap();
        assert_eq!(decoded.position, 2);
        assert_eq!(decoded.name, "Alice");
        assert_eq!(decoded.last_seen_seq, 7);
    }

    #[test]
    fn decode_rejects_tampered_token() {
        let crypto = Crypto::new(b"test-secret");
        let room: Id<Room> = Id::default();
        let claims = ReconnectClaims::new(room, 0, "Bob".into(), 0);
        let mut token = crypto.encode(&claims).unwrap();
        token.push('x');
        assert!(matches!(crypto.decode(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn decode_rejects_expired_claims() {
        let crypto = Crypto::new(b"test-secret");
        let room: Id<Room> = Id::default();
        let mut claims = ReconnectClaims::new(room, 0, "Eve".into(), 0);
        claims.exp = claims.iat - 1;
        let token = crypto.encode(&claims).unwrap();
        assert!(matches!(crypto.decode(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(Crypto::hash("room-1"), Crypto::hash("room-1"));
        assert_ne!(Crypto::hash("room-1"), Crypto::hash("room-2"));
    }
}

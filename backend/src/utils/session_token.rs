//! Signing and verification of the client-side session token.
//!
//! The session is a per-request snapshot carried in a signed cookie; the
//! server keeps no session table. Anything a handler wants to persist into
//! the session must be re-encoded and flushed as a Set-Cookie header before
//! the response body starts.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::session::Session;

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // username
    pub session: Session,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    pub fn new(session: Session, expiration_hours: u64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(expiration_hours as i64);

        Self {
            sub: session.username.clone(),
            session,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

pub fn encode_session(
    session: &Session,
    secret: &str,
    expiration_hours: u64,
) -> anyhow::Result<String> {
    let claims = SessionClaims::new(session.clone(), expiration_hours);
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

pub fn decode_session(token: &str, secret: &str) -> anyhow::Result<Session> {
    let validation = Validation::default();
    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;

    Ok(token_data.claims.session)
}

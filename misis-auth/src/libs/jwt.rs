//! HS256 signing of bearer tokens.

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error,
};
use serde::{Deserialize, Serialize};

use misis_corelib::strings;

/// Signer and verifier of access/refresh tokens.
#[derive(Clone)]
pub struct Signer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

/// Self-contained token claims.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    /// [`TokenType::ACCESS`] or [`TokenType::REFRESH`].
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

pub struct TokenType;

impl TokenType {
    pub const ACCESS: &'static str = "access_token";
    pub const REFRESH: &'static str = "refresh_token";
}

const JTI_LEN: usize = 16;

impl Signer {
    pub fn new(secret: &[u8]) -> Self {
        Signer {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// To mint a token valid for `ttl` seconds from `now`.
    pub fn sign(
        &self,
        user_id: &str,
        client_id: &str,
        scopes: &[String],
        token_type: &str,
        now: &DateTime<Utc>,
        ttl: i64,
    ) -> Result<String, Error> {
        let iat = now.timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            client_id: client_id.to_string(),
            scopes: scopes.to_vec(),
            token_type: token_type.to_string(),
            iat,
            exp: iat + ttl,
            jti: strings::randomstring(JTI_LEN),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// To verify the signature, expiry and type of a token.
    ///
    /// Returns `None` for any invalid token.
    pub fn verify(&self, token: &str, token_type: &str) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        let claims = match decode::<Claims>(token, &self.decoding_key, &validation) {
            Err(_) => return None,
            Ok(data) => data.claims,
        };
        match claims.token_type.as_str() == token_type {
            false => None,
            true => Some(claims),
        }
    }
}

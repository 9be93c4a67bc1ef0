//! JWT issuance and validation.

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::models::AuthError;
use crate::config::AuthConfig;
use crate::errors::{Error, Result};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,       // Subject (user name)
    pub role: Vec<String>, // One entry per assigned role
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    pub jti: String,
}

/// Signs and validates bearer tokens with a shared secret
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
    audience: String,
    expiry_seconds: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expiry_seconds", &self.expiry_seconds)
            .finish()
    }
}

impl TokenIssuer {
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let algorithm = config.algorithm()?;
        let secret = config.jwt_secret.as_bytes();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            expiry_seconds: config.token_expiry().as_secs() as i64,
        })
    }

    /// Sign a token for `subject` carrying one `role` entry per role
    pub fn issue(&self, subject: &str, roles: &[String]) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            role: roles.to_vec(),
            iat: now,
            nbf: now,
            exp: now + self.expiry_seconds,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key).map_err(|e| {
            Error::Token { source: e, context: "Failed to sign access token".to_string() }
        })
    }

    /// Validate signature, issuer, audience and lifetime, returning the claims
    pub fn validate_token(&self, token: &str) -> std::result::Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);
        validation.validate_nbf = true;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::from_config(&AuthConfig::default()).unwrap()
    }

    #[test]
    fn issued_token_round_trips() {
        let issuer = issuer();
        let token = issuer.issue("jdoe", &["Manager".to_string()]).unwrap();

        let claims = issuer.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "jdoe");
        assert_eq!(claims.role, vec!["Manager".to_string()]);
        assert_eq!(claims.iss, "SchoolAPI");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = issuer();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "jdoe".into(),
            role: vec![],
            iat: now - 7200,
            nbf: now - 7200,
            exp: now - 3600,
            iss: "SchoolAPI".into(),
            aud: "https://localhost:5001".into(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = issuer.sign(&claims).unwrap();

        assert!(matches!(issuer.validate_token(&token), Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let other = TokenIssuer::from_config(&AuthConfig {
            jwt_secret: "a-completely-different-secret-of-32-bytes!".into(),
            ..Default::default()
        })
        .unwrap();
        let token = other.issue("jdoe", &[]).unwrap();

        assert!(matches!(issuer().validate_token(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let other = TokenIssuer::from_config(&AuthConfig {
            jwt_audience: "https://elsewhere".into(),
            ..Default::default()
        })
        .unwrap();
        let token = other.issue("jdoe", &[]).unwrap();

        assert!(matches!(issuer().validate_token(&token), Err(AuthError::InvalidToken)));
        assert!(matches!(issuer().validate_token("garbage"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn configured_algorithm_is_used() {
        let issuer = TokenIssuer::from_config(&AuthConfig {
            jwt_algorithm: "HS512".into(),
            ..Default::default()
        })
        .unwrap();
        let token = issuer.issue("jdoe", &[]).unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS512);
        assert!(issuer.validate_token(&token).is_ok());
    }
}

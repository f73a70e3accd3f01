use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::claims::Claims;
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::jwks::JwkSet;

/// The header segment of a token, read before any signature check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnverifiedHeader {
    pub kid: String,
    #[serde(default)]
    pub alg: Option<String>,
}

/// Decodes the first segment of `token` without verifying anything.
pub fn decode_unverified_header(token: &str) -> AuthResult<UnverifiedHeader> {
    let mut segments = token.split('.');
    let header = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(header), Some(_), Some(_), None) => header,
        _ => return Err(AuthError::MalformedToken),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header.trim_end_matches('='))
        .map_err(|_| AuthError::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken)
}

/// Verifies bearer tokens against a key set using a fixed policy.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    config: AuthConfig,
}

impl TokenVerifier {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn verify(&self, token: &str, keys: &JwkSet) -> AuthResult<Claims> {
        let header = decode_unverified_header(token)?;
        let jwk = keys.find(&header.kid).ok_or(AuthError::KeyNotFound)?;

        let algorithm = header
            .alg
            .as_deref()
            .and_then(|alg| alg.parse::<Algorithm>().ok())
            .filter(|alg| self.config.allows(*alg))
            .ok_or(AuthError::InvalidHeader)?;
        let key = jwk.decoding_key()?;

        let token_data = decode::<Value>(token, &key, &self.validation(algorithm))?;
        let claims = Claims::try_from(token_data.claims)?;
        debug!(kid = %header.kid, alg = ?algorithm, "verified JWT successfully");
        Ok(claims)
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.algorithms = self.config.algorithms.clone();
        validation.set_issuer(&[self.config.issuer()]);
        validation.set_audience(&[self.config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);
        validation.leeway = self.config.leeway_seconds;
        validation.validate_nbf = true;
        validation
    }
}

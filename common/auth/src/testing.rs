//! RSA key material and token minting for tests.
//!
//! Compiled for this crate's own tests and, behind the `test-helpers`
//! feature, for dependants' test suites.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use once_cell::sync::Lazy;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};

use crate::config::AuthConfig;
use crate::jwks::{Jwk, JwkSet};

pub const DOMAIN: &str = "fsnd-python.us.auth0.com";
pub const AUDIENCE: &str = "library";
pub const KID: &str = "library-signing-key";
pub const SUBJECT: &str = "auth0|librarian";

pub struct KeyMaterial {
    pub encoding: EncodingKey,
    pub modulus: String,
    pub exponent: String,
}

impl KeyMaterial {
    pub fn jwk(&self, kid: &str) -> Jwk {
        Jwk::rsa(kid, self.modulus.clone(), self.exponent.clone())
    }

    pub fn key_set(&self, kid: &str) -> JwkSet {
        JwkSet {
            keys: vec![self.jwk(kid)],
        }
    }
}

fn generate_key_material() -> KeyMaterial {
    let mut rng = OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
    let public_key = private_key.to_public_key();

    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .expect("private pem");

    KeyMaterial {
        encoding: EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("encoding key"),
        modulus: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
        exponent: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
    }
}

static PRIMARY: Lazy<KeyMaterial> = Lazy::new(generate_key_material);
static SECONDARY: Lazy<KeyMaterial> = Lazy::new(generate_key_material);

pub fn primary_key() -> &'static KeyMaterial {
    &PRIMARY
}

pub fn secondary_key() -> &'static KeyMaterial {
    &SECONDARY
}

/// The primary key published under [`KID`].
pub fn key_set() -> JwkSet {
    primary_key().key_set(KID)
}

pub fn jwks_body(keys: &JwkSet) -> Value {
    serde_json::to_value(keys).expect("jwks json")
}

pub fn fixture_config() -> AuthConfig {
    AuthConfig::new(DOMAIN, AUDIENCE)
}

pub fn valid_claims(permissions: &[&str]) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "iss": format!("https://{DOMAIN}/"),
        "aud": AUDIENCE,
        "sub": SUBJECT,
        "iat": now,
        "exp": now + 600,
        "permissions": permissions,
    })
}

pub fn issue_token(material: &KeyMaterial, kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &material.encoding).expect("sign token")
}

/// `Authorization` value carrying `claims` signed by the primary key.
pub fn bearer(claims: &Value) -> String {
    format!("Bearer {}", issue_token(primary_key(), KID, claims))
}

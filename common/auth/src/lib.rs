pub mod authorizer;
pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod guards;
pub mod jwks;
pub mod verifier;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use authorizer::Authorizer;
pub use claims::Claims;
pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use extractors::{enforce_permission, extract_bearer, AuthContext, PermissionGuard};
pub use guards::ensure_permission;
pub use jwks::{CachedKeySet, Jwk, JwkSet, JwksFetcher, KeySetResolver, StaticKeySet};
pub use verifier::{decode_unverified_header, TokenVerifier, UnverifiedHeader};

pub use jsonwebtoken::Algorithm;

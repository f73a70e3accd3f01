use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};

/// Checks that verified claims grant `required`.
///
/// An empty requirement always passes. A token without any `permissions`
/// claim is malformed for this API and reported separately from a token
/// whose permission list simply lacks the entry.
pub fn ensure_permission(claims: &Claims, required: &str) -> AuthResult<()> {
    if required.is_empty() {
        return Ok(());
    }

    let granted = claims
        .permissions()
        .ok_or(AuthError::PermissionsClaimMissing)?;

    if granted.iter().any(|permission| *permission == required) {
        Ok(())
    } else {
        Err(AuthError::PermissionDenied(required.to_string()))
    }
}

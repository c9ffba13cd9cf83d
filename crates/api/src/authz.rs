//! API-side ownership guard for mutations.
//!
//! Runs after the record is loaded and before any change is validated or
//! applied, keeping the domain crates HTTP-agnostic.

use storefront_auth::{OwnedAction, OwnedResource, authorize_owner};

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

pub fn ensure_owner<R: OwnedResource>(
    resource: &R,
    principal: &PrincipalContext,
    action: OwnedAction,
) -> Result<(), ApiError> {
    authorize_owner(resource, principal.user_id(), action).map_err(|e| {
        tracing::warn!(caller = %principal.user_id(), owner = %resource.owner_id(), %action, "ownership check failed");
        ApiError::forbidden(e.to_string())
    })
}

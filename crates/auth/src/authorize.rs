use thiserror::Error;

use storefront_core::UserId;

/// Mutations that require ownership of the target record.
///
/// Reads and creation are never ownership-checked: any authenticated caller
/// may read, and creation always assigns the caller as owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnedAction {
    Update,
    Delete,
}

impl OwnedAction {
    pub fn as_str(self) -> &'static str {
        match self {
            OwnedAction::Update => "update",
            OwnedAction::Delete => "delete",
        }
    }
}

impl core::fmt::Display for OwnedAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record with an immutable recorded owner.
pub trait OwnedResource {
    /// Singular noun used in denial messages (e.g. "product").
    const KIND: &'static str;

    fn owner_id(&self) -> UserId;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("you can only {action} your own {kind}s")]
    NotOwner { action: OwnedAction, kind: &'static str },
}

/// Permit `action` on `resource` iff `subject` is its recorded owner.
///
/// - No IO
/// - No panics
pub fn authorize_owner<R: OwnedResource>(
    resource: &R,
    subject: UserId,
    action: OwnedAction,
) -> Result<(), AuthzError> {
    if resource.owner_id() == subject {
        Ok(())
    } else {
        Err(AuthzError::NotOwner { action, kind: R::KIND })
    }
}

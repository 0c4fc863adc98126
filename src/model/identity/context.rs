use std::ops::Deref;

use crate::model::mongodb::Id;

use super::{Identity, Role};

/// The identity on whose behalf a request is made, loaded fresh from storage
/// for every request and handed explicitly to the operations that need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity(Identity);

impl AuthenticatedIdentity {
    pub fn new(identity: Identity) -> Self {
        Self(identity)
    }

    pub fn id(&self) -> Id {
        self.0.id
    }

    pub fn is_admin(&self) -> bool {
        self.0.role == Role::Admin
    }

    pub fn into_inner(self) -> Identity {
        self.0
    }
}

impl Deref for AuthenticatedIdentity {
    type Target = Identity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

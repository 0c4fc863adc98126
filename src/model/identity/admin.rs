use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::store::IdentityStore;

use super::{IdentityCore, Role};

/// Credentials of the administrator created on first launch.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

/// Create the bootstrap administrator unless an identity with that username
/// already exists.
///
/// This operation is idempotent.
pub async fn ensure_admin_exists(
    identities: &dyn IdentityStore,
    credentials: &AdminCredentials,
) -> Result<()> {
    if identities
        .identity_by_username(&credentials.username)
        .await?
        .is_some()
    {
        debug!("Admin '{}' already exists", credentials.username);
        return Ok(());
    }

    let admin = IdentityCore::new(
        credentials.username.clone(),
        "Administrator SmartPol".to_string(),
        format!("{}@smartpol.id", credentials.username),
        IdentityCore::hash_password(&credentials.password)?,
        Role::Admin,
    );
    identities.insert_identity(admin).await?;
    info!("Created admin '{}'", credentials.username);
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::MemoryStore;

    #[rocket::async_test]
    async fn admin_is_created_once() {
        let store = MemoryStore::default();
        let credentials = AdminCredentials::example();
        ensure_admin_exists(&store, &credentials).await.unwrap();
        ensure_admin_exists(&store, &credentials).await.unwrap();

        let admin = store.identity_by_username("admin").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(admin.verify_password("rahasia-admin"));
        assert!(!admin.verify_password("salah"));
    }
}

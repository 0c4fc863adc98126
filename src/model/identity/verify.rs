use log::info;
use thiserror::Error;

use crate::model::{
    district::{DistrictRegistry, ResolveError},
    store::{IdentityStore, StorageError, VerificationCommit},
};

use super::{AuthenticatedIdentity, Verification};

/// Reasons a NIK verification is refused.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("NIK is already verified by another user")]
    NikInUse,
    #[error("Identity no longer exists")]
    UnknownIdentity,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl VerifyError {
    /// Stable name of the failure, for the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Resolve(e) => e.code(),
            Self::NikInUse => "NikInUse",
            Self::UnknownIdentity => "UnknownIdentity",
            Self::Storage(_) => "StorageFailure",
        }
    }
}

/// Resolve the given NIK and, on success, record the placement on the
/// requesting identity. Re-verifying with a different NIK overwrites the
/// previous placement; a NIK verified by another identity is refused.
pub async fn verify_identity(
    registry: &DistrictRegistry,
    identities: &dyn IdentityStore,
    ctx: &AuthenticatedIdentity,
    nik: &str,
    hint: Option<&str>,
) -> Result<Verification, VerifyError> {
    let resolution = registry.resolve(nik, hint)?;
    let verification = Verification {
        nik: resolution.nik,
        locality: resolution.locality,
        district: resolution.district,
    };
    match identities.set_verification(ctx.id(), &verification).await? {
        VerificationCommit::Recorded => {}
        VerificationCommit::NikInUse => return Err(VerifyError::NikInUse),
        VerificationCommit::UnknownIdentity => return Err(VerifyError::UnknownIdentity),
    }
    info!(
        "Identity {} verified in {} ({})",
        ctx.id(),
        verification.district,
        verification.locality
    );
    Ok(verification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        district::Nik,
        identity::{IdentityCore, NewIdentity},
        store::MemoryStore,
    };

    async fn context(store: &MemoryStore, identity: NewIdentity) -> AuthenticatedIdentity {
        AuthenticatedIdentity::new(store.insert_identity(identity).await.unwrap())
    }

    #[rocket::async_test]
    async fn verifies_and_persists() {
        let store = MemoryStore::default();
        let registry = DistrictRegistry::reference();
        let ctx = context(&store, IdentityCore::example()).await;

        let verification = verify_identity(&registry, &store, &ctx, "3573040101900001", None)
            .await
            .unwrap();
        assert_eq!(verification.locality, "Sukun");
        assert_eq!(verification.district, "JAWA TIMUR VI");

        let stored = store.identity(ctx.id()).await.unwrap().unwrap();
        assert_eq!(stored.verification(), Some(verification));
    }

    #[rocket::async_test]
    async fn failed_resolution_changes_nothing() {
        let store = MemoryStore::default();
        let registry = DistrictRegistry::reference();
        let ctx = context(&store, IdentityCore::example()).await;

        let result = verify_identity(&registry, &store, &ctx, "3573", None).await;
        assert!(matches!(
            result,
            Err(VerifyError::Resolve(ResolveError::MalformedIdentifier))
        ));
        let result =
            verify_identity(&registry, &store, &ctx, "3578010101900001", Some("JAWA TIMUR VI"))
                .await;
        assert!(matches!(
            result,
            Err(VerifyError::Resolve(ResolveError::PrefixNotInDistrict { .. }))
        ));

        let stored = store.identity(ctx.id()).await.unwrap().unwrap();
        assert!(!stored.nik_verified);
        assert_eq!(stored.nik, None);
    }

    #[rocket::async_test]
    async fn nik_cannot_be_shared() {
        let store = MemoryStore::default();
        let registry = DistrictRegistry::reference();
        let first = context(&store, IdentityCore::example()).await;
        let mut other = IdentityCore::example();
        other.username = "tetangga".to_string();
        other.email = "tetangga@example.com".to_string();
        let second = context(&store, other).await;

        let nik = "3573010101900001";
        verify_identity(&registry, &store, &first, nik, None)
            .await
            .unwrap();
        // Verifying again as the same identity is fine.
        verify_identity(&registry, &store, &first, nik, None)
            .await
            .unwrap();
        let result = verify_identity(&registry, &store, &second, nik, None).await;
        assert!(matches!(result, Err(VerifyError::NikInUse)));
    }

    #[rocket::async_test]
    async fn reverification_overwrites() {
        let store = MemoryStore::default();
        let registry = DistrictRegistry::reference();
        let ctx = context(&store, IdentityCore::example_verified()).await;

        verify_identity(&registry, &store, &ctx, "3578020101900001", None)
            .await
            .unwrap();
        let stored = store.identity(ctx.id()).await.unwrap().unwrap();
        assert_eq!(stored.nik.as_ref().map(Nik::as_str), Some("3578020101900001"));
        assert_eq!(stored.district.as_deref(), Some("JAWA TIMUR I"));
        assert_eq!(stored.locality.as_deref(), Some("JAWA TIMUR I"));
    }

    #[test]
    fn concurrent_claims_on_one_nik() {
        let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let store = std::sync::Arc::new(MemoryStore::default());
            let registry = std::sync::Arc::new(DistrictRegistry::reference());
            let mut contexts = Vec::new();
            for i in 0..8 {
                let mut identity = IdentityCore::example();
                identity.username = format!("warga{i}");
                identity.email = format!("warga{i}@example.com");
                contexts.push(context(&store, identity).await);
            }

            let tasks = contexts
                .into_iter()
                .map(|ctx| {
                    let store = store.clone();
                    let registry = registry.clone();
                    rocket::tokio::spawn(async move {
                        verify_identity(&registry, &*store, &ctx, "3573010101900001", None).await
                    })
                })
                .collect::<Vec<_>>();

            let mut verified = 0;
            for task in tasks {
                match task.await.unwrap() {
                    Ok(_) => verified += 1,
                    Err(VerifyError::NikInUse) => {}
                    Err(e) => panic!("unexpected failure: {e}"),
                }
            }
            assert_eq!(verified, 1);
        });
    }
}

#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use log::info;
use rocket::{figment::Figment, Build, Rocket};

use crate::config::{AdminFairing, ConfigFairing, DatabaseFairing, RegistryFairing};
use crate::logging::LoggerFairing;
use crate::model::{district::DistrictRegistry, store::Storage};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;

/// Build the server from `Rocket.toml` and `ROCKET_*` environment variables.
///
/// Storage is MongoDB unless `in_memory` is set, in which case everything
/// lives in process and is lost on shutdown.
pub fn build() -> Rocket<Build> {
    let figment = rocket::Config::figment();
    let in_memory = figment.extract_inner::<bool>("in_memory").unwrap_or(false);
    if in_memory {
        info!("Using in-memory storage; nothing will be persisted");
        return rocket_for_storage(figment, Storage::memory(), DistrictRegistry::reference());
    }

    rocket_for_mongo(figment)
}

/// Build the server over the MongoDB database at `db_uri`.
pub fn rocket_for_mongo(figment: Figment) -> Rocket<Build> {
    mount(rocket::custom(figment))
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(AdminFairing)
}

/// Build the server over the given storage and reference data.
pub fn rocket_for_storage(
    figment: Figment,
    storage: Storage,
    registry: DistrictRegistry,
) -> Rocket<Build> {
    mount(rocket::custom(figment))
        .attach(ConfigFairing)
        .attach(RegistryFairing(registry))
        .manage(storage)
        .attach(AdminFairing)
}

fn mount(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/", api::routes())
        .register("/", api::catchers())
        .attach(LoggerFairing)
}

/// Configuration for tests, layered over the debug profile.
#[cfg(test)]
pub(crate) fn test_figment() -> Figment {
    rocket::Config::figment()
        .merge(("jwt_secret", "test jwt secret"))
        .merge(("auth_ttl", 3600))
        .merge(("admin_username", "admin"))
        .merge(("admin_password", "rahasia-admin"))
        .merge(("close_poll_on_first_vote", false))
        .merge(("strict_districts", false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::district::District;

    fn district(name: &str, prefixes: &[&str]) -> District {
        District {
            name: name.to_string(),
            description: String::new(),
            province: "Jawa Timur".to_string(),
            cities: vec![],
            localities: vec![],
            nik_prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            locality_codes: vec![],
        }
    }

    #[rocket::async_test]
    async fn strict_districts_without_database() {
        let overlapping = DistrictRegistry::new(
            vec![
                district("D1", &["357301", "357302"]),
                district("D2", &["357302"]),
            ],
            vec![],
        )
        .unwrap();

        let figment = test_figment().merge(("strict_districts", true));
        let strict = rocket_for_storage(figment, Storage::memory(), overlapping.clone());
        assert!(strict.ignite().await.is_err());

        let lenient = rocket_for_storage(test_figment(), Storage::memory(), overlapping);
        let rocket = lenient.ignite().await.unwrap();
        let registry = rocket.state::<DistrictRegistry>().unwrap();
        assert_eq!(registry.overlaps().len(), 1);
    }
}

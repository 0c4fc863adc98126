use chrono::Duration;
use log::{error, info};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::error::Result;
use crate::model::{
    district::DistrictRegistry,
    identity::{ensure_admin_exists, AdminCredentials},
    mongodb::{ensure_indexes_exist, ensure_reference_data_exists, load_registry},
    poll::VotePolicy,
    store::{MongoStore, Storage},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    #[serde(default)]
    close_poll_on_first_vote: bool,
    #[serde(default)]
    strict_districts: bool,
    // secrets
    jwt_secret: String,
    admin_username: String,
    admin_password: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to encrypt JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// How ballots are cast.
    pub fn vote_policy(&self) -> VotePolicy {
        VotePolicy {
            close_on_first_vote: self.close_poll_on_first_vote,
        }
    }

    /// Refuse to launch if two districts claim the same NIK prefix.
    pub fn strict_districts(&self) -> bool {
        self.strict_districts
    }

    /// The administrator created on first launch.
    pub fn admin_credentials(&self) -> AdminCredentials {
        AdminCredentials {
            username: self.admin_username.clone(),
            password: self.admin_password.clone(),
        }
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places the [`Storage`] handles and the
/// [`DistrictRegistry`] into managed state.
///
/// Must be attached after [`ConfigFairing`].
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let Some(app_config) = rocket.state::<Config>() else {
            error!("Application config must be loaded before the database");
            return Err(rocket);
        };
        info!("Loaded database config, connecting...");

        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&get_database_name());

        // Indexes and reference data.
        let setup = async {
            ensure_indexes_exist(&db).await?;
            ensure_reference_data_exists(&db).await?;
            load_registry(&db, app_config.strict_districts()).await
        };
        let registry: Result<DistrictRegistry> = setup.await;
        let registry = match registry {
            Ok(registry) => registry,
            Err(e) => {
                error!("Failed to set up database: {e}");
                return Err(rocket);
            }
        };
        info!("...database connection online!");
        let storage = Storage::mongo(MongoStore::new(client.clone(), db.clone()));

        // Manage the state.
        rocket = rocket.manage(client).manage(db).manage(storage).manage(registry);
        Ok(rocket)
    }
}

/// A fairing that places reference data loaded without a database into
/// managed state, refusing overlapping prefixes if `strict_districts` is set.
///
/// Must be attached after [`ConfigFairing`].
pub struct RegistryFairing(pub DistrictRegistry);

#[rocket::async_trait]
impl Fairing for RegistryFairing {
    fn info(&self) -> Info {
        Info {
            name: "District registry",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = rocket.state::<Config>() else {
            error!("Application config must be loaded before the district registry");
            return Err(rocket);
        };

        let registry = if config.strict_districts() {
            match self.0.clone().strict() {
                Ok(registry) => registry,
                Err(e) => {
                    error!("Refusing to load districts: {e}");
                    return Err(rocket);
                }
            }
        } else {
            self.0.clone()
        };
        Ok(rocket.manage(registry))
    }
}

/// A fairing that creates the configured administrator if it does not exist yet.
///
/// Must be attached after [`ConfigFairing`] and whichever fairing manages [`Storage`].
pub struct AdminFairing;

#[rocket::async_trait]
impl Fairing for AdminFairing {
    fn info(&self) -> Info {
        Info {
            name: "Admin bootstrap",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let (Some(config), Some(storage)) = (rocket.state::<Config>(), rocket.state::<Storage>())
        else {
            error!("Config and storage must be loaded before the admin bootstrap");
            return Err(rocket);
        };

        let result =
            ensure_admin_exists(storage.identities.as_ref(), &config.admin_credentials()).await;
        match result {
            Ok(()) => Ok(rocket),
            Err(e) => {
                error!("Failed to create admin: {e}");
                Err(rocket)
            }
        }
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
fn get_database_name() -> String {
    "smartpol".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

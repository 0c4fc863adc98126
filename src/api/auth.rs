use log::info;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{AuthToken, LoginRequest, RegisterRequest, AUTH_TOKEN_COOKIE},
            profile::ProfileView,
        },
        mongodb::is_duplicate_key_error,
        store::{Storage, StorageError},
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![register, login, logout]
}

#[post("/auth/register", data = "<registration>", format = "json")]
pub async fn register(
    registration: Json<RegisterRequest>,
    storage: &State<Storage>,
) -> Result<(Status, Json<ProfileView>)> {
    let identity = registration.into_inner().into_identity()?;

    // Check uniqueness up front for a friendly message; the store enforces it regardless.
    if storage
        .identities
        .identity_by_username(&identity.username)
        .await?
        .is_some()
    {
        return Err(conflict("Username already exists"));
    }
    if storage
        .identities
        .identity_by_email(&identity.email)
        .await?
        .is_some()
    {
        return Err(conflict("Email already exists"));
    }

    let identity = match storage.identities.insert_identity(identity).await {
        Ok(identity) => identity,
        Err(StorageError::Constraint(_)) => {
            return Err(conflict("Username or email already exists"))
        }
        Err(StorageError::Db(e)) if is_duplicate_key_error(&e) => {
            return Err(conflict("Username or email already exists"))
        }
        Err(e) => return Err(e.into()),
    };
    info!("Registered identity {} ({})", identity.id, identity.username);

    Ok((Status::Created, Json(identity.into())))
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<LoginRequest>,
    storage: &State<Storage>,
    config: &State<Config>,
) -> Result<Json<ProfileView>> {
    let identity = storage
        .identities
        .identity_by_username(credentials.username.trim())
        .await?
        .filter(|identity| identity.is_active && identity.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Status(
                Status::Unauthorized,
                "No user found with the provided username and password combination.".to_string(),
            )
        })?;

    let token = AuthToken::new(&identity);
    cookies.add(token.into_cookie(config));

    Ok(Json(identity.into()))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar<'_>) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

fn conflict(message: &str) -> Error {
    Error::Status(Status::Conflict, message.to_string())
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::{json, serde_json},
    };

    use crate::model::{identity::Role, store::Storage};

    use super::*;

    #[backend_test]
    async fn register_then_login(client: Client, storage: Storage) {
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(RegisterRequest::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        // Registration alone does not log in.
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());

        let profile: ProfileView =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(profile.username, "warga");
        assert_eq!(profile.role, "konstituen");
        assert!(!profile.nik_verified);

        let stored = storage
            .identities
            .identity_by_username("warga")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.role, Role::Konstituen);
        assert_ne!(stored.password_hash, RegisterRequest::example().password);

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(LoginRequest::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
    }

    #[backend_test(konstituen)]
    async fn duplicate_registration(client: Client) {
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(RegisterRequest::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());

        let mut same_email = RegisterRequest::example2();
        same_email.email = RegisterRequest::example().email;
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(same_email).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());
    }

    #[backend_test]
    async fn invalid_registration(client: Client) {
        let mut short_password = RegisterRequest::example();
        short_password.password = "1234".to_string();
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(short_password).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(konstituen)]
    async fn bad_password(client: Client) {
        client.delete(uri!(logout)).dispatch().await;

        let mut credentials = LoginRequest::example();
        credentials.password = "bukan kata sandi".to_string();
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(credentials).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test(admin)]
    async fn admin_login(client: Client) {
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());

        let response = client.delete(uri!(logout)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());
    }
}

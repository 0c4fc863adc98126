use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, punctuated::Punctuated, spanned::Spanned, FnArg, Ident, ItemFn, Pat,
    Signature, Token, Type,
};

/// Transform an asynchronous test into a synchronous one running against a
/// fresh in-memory server, and inject dependencies.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`] and
/// `crate::model::store::Storage` (the same storage the server uses).
///
/// The client can be logged in before the test starts:
///
/// - `#[backend_test(admin)]` logs in as the bootstrap administrator.
/// - `#[backend_test(konstituen)]` registers and logs in an unverified constituent.
/// - `#[backend_test(verified)]` does the same and then verifies their NIK.
///
/// Adding `mongo` (e.g. `#[backend_test(verified, mongo)]`) runs the server
/// against a fresh MongoDB database at the configured `db_uri` instead, which
/// is dropped afterwards. These tests need a replica set, so they are ignored
/// unless run with `cargo test -- --ignored`.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the injected arguments and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    let register = quote! {
        rocket_client
            .post(uri!(crate::api::auth::register))
            .header(rocket::http::ContentType::JSON)
            .body(rocket::serde::json::json!(crate::model::api::auth::RegisterRequest::example()).to_string())
            .dispatch()
            .await;
        rocket_client
            .post(uri!(crate::api::auth::login))
            .header(rocket::http::ContentType::JSON)
            .body(rocket::serde::json::json!(crate::model::api::auth::LoginRequest::example()).to_string())
            .dispatch()
            .await;
    };

    let args = parse_macro_input!(args with Punctuated::<Ident, Token![,]>::parse_terminated);
    let mut mongo = false;
    let mut login = None;
    for arg in args {
        if arg == "mongo" && !mongo {
            mongo = true;
        } else if login.is_none() && (arg == "admin" || arg == "konstituen" || arg == "verified") {
            login = Some(arg);
        } else {
            return syn::Error::new(
                arg.span(),
                "Expected at most one of `admin`, `konstituen` or `verified`, and optionally `mongo`",
            )
            .into_compile_error()
            .into();
        }
    }

    // Log in the client if needed.
    let maybe_login = match login {
        Some(arg) if arg == "admin" => quote! {
            let credentials = crate::model::identity::AdminCredentials::example();
            rocket_client
                .post(uri!(crate::api::auth::login))
                .header(rocket::http::ContentType::JSON)
                .body(rocket::serde::json::json!({
                    "username": credentials.username,
                    "password": credentials.password,
                }).to_string())
                .dispatch()
                .await;
        },
        Some(arg) if arg == "konstituen" => register,
        Some(_) => quote! {
            #register
            rocket_client
                .post(uri!(crate::api::profile::verify_nik))
                .header(rocket::http::ContentType::JSON)
                .body(rocket::serde::json::json!(crate::model::api::profile::VerifyNikRequest::example()).to_string())
                .dispatch()
                .await;
        },
        None => TokenStream2::new(),
    };

    let init_logging = quote! {
        log4rs_test_utils::test_logging::init_logging_once_for(
            ["smartpol_backend"],
            None,
            None,
        );
    };

    if mongo {
        return quote! {
            #[test]
            #[ignore = "needs a MongoDB replica set at the configured db_uri"]
            fn #name() {
                /// Test setup.
                async fn setup() -> (
                    rocket::local::asynchronous::Client,
                    crate::model::store::Storage,
                    ::mongodb::Database,
                ) {
                    #init_logging

                    let rocket = crate::rocket_for_mongo(crate::test_figment());
                    let rocket_client = rocket::local::asynchronous::Client::tracked(rocket)
                        .await
                        .unwrap();
                    let storage = rocket_client
                        .rocket()
                        .state::<crate::model::store::Storage>()
                        .unwrap()
                        .clone();
                    let db = rocket_client
                        .rocket()
                        .state::<::mongodb::Database>()
                        .unwrap()
                        .clone();

                    #maybe_login

                    (rocket_client, storage, db)
                }

                /// The test itself.
                #item_fn

                /// Test cleanup.
                async fn cleanup(db: ::mongodb::Database) {
                    db.drop(None).await.unwrap();
                }

                // Create an async runtime. We need a separate one for inside and
                // outside the `catch_unwind`.
                let outer_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                    .thread_name("test-setup-cleanup")
                    .worker_threads(1)
                    .enable_all()
                    .build()
                    .unwrap();
                let inner_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                    .thread_name("rocket-worker-test-thread")
                    .worker_threads(2)
                    .enable_all()
                    .build()
                    .unwrap();

                let (rocket_client, storage, db) = outer_runtime.block_on(setup());

                // Run the test, catching any panics.
                // Use mutexes to safely transfer `!UnwindSafe` data.
                let client_mutex = std::sync::Mutex::new(rocket_client);
                let storage_mutex = std::sync::Mutex::new(storage);
                let runtime_mutex = std::sync::Mutex::new(inner_runtime);
                let result = std::panic::catch_unwind(|| {
                    #[allow(unused_variables)]
                    let rocket_client = client_mutex.into_inner().unwrap();
                    #[allow(unused_variables)]
                    let storage = storage_mutex.into_inner().unwrap();
                    let runtime = runtime_mutex.into_inner().unwrap();
                    runtime.block_on(#new_name(#(#test_args),*));
                });

                outer_runtime.block_on(cleanup(db));

                // If the test panicked, re-raise the panic.
                if let Err(cause) = result {
                    std::panic::panic_any(cause);
                }
            }
        }
        .into();
    }

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (rocket::local::asynchronous::Client, crate::model::store::Storage) {
                #init_logging

                let storage = crate::model::store::Storage::memory();
                let rocket = crate::rocket_for_storage(
                    crate::test_figment(),
                    storage.clone(),
                    crate::model::district::DistrictRegistry::reference(),
                );
                let rocket_client = rocket::local::asynchronous::Client::tracked(rocket)
                    .await
                    .unwrap();

                #maybe_login

                (rocket_client, storage)
            }

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                #[allow(unused_variables)]
                let (rocket_client, storage) = setup().await;
                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_storage = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                if let Some(type_ident) = type_path.path.get_ident() {
                    if type_ident == "Client" {
                        if has_client {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                            ));
                        }
                        has_client = true;
                        args.push(quote! { rocket_client });
                        continue;
                    } else if type_ident == "Storage" {
                        if has_storage {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `Storage`",
                            ));
                        }
                        has_storage = true;
                        args.push(quote! { storage });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `storage_ident: Storage`",
        ));
    }

    Ok(args)
}

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat, PathArguments,
    Signature, Type,
};

/// A dependency the test function asks for, by the type name it uses.
enum Injected {
    /// `rocket::local::asynchronous::Client`, with the API mounted.
    RocketClient,
    /// `mongodb::Client`, imported as `MongoClient`.
    MongoClient,
    /// `mongodb::Database`, freshly created for this test.
    Database,
    /// `crate::model::question::QuestionWriter` over the test database.
    Writer,
    /// `crate::model::question::QuestionReader` over the test database.
    Reader,
    /// `crate::model::mongodb::Coll<T>` over the test database.
    Collection(Ident),
}

impl Injected {
    fn from_type(ty: &Type) -> Option<Self> {
        let Type::Path(type_path) = ty else {
            return None;
        };
        // Valid as the last path segment for any type is itself.
        let last = type_path.path.segments.last()?;
        match last.ident.to_string().as_str() {
            "Client" => Some(Self::RocketClient),
            "MongoClient" => Some(Self::MongoClient),
            "Database" => Some(Self::Database),
            "QuestionWriter" => Some(Self::Writer),
            "QuestionReader" => Some(Self::Reader),
            "Coll" => {
                let PathArguments::AngleBracketed(generics) = &last.arguments else {
                    return None;
                };
                let Some(GenericArgument::Type(Type::Path(inner))) = generics.args.first() else {
                    return None;
                };
                inner.path.get_ident().cloned().map(Self::Collection)
            }
            _ => None,
        }
    }

    /// Expression producing this dependency inside the test body.
    fn expr(&self) -> TokenStream2 {
        match self {
            Self::RocketClient => quote! { rocket_client },
            Self::MongoClient => quote! { db_client.clone() },
            Self::Database => quote! { db.clone() },
            Self::Writer => quote! {
                crate::model::question::QuestionWriter::new(db_client.clone(), &db)
            },
            Self::Reader => quote! { crate::model::question::QuestionReader::new(&db) },
            Self::Collection(ty) => quote! {
                crate::model::mongodb::Coll::<#ty>::from_db(&db)
            },
        }
    }

    /// Only one of these can be handed out per test.
    fn is_unique(&self) -> bool {
        matches!(self, Self::RocketClient)
    }
}

/// Transform an asynchronous test into a synchronous one, inject dependencies,
/// and ensure that the database is dropped regardless of how the test terminates.
///
/// Every test gets its own randomly-named database on the server given by
/// `db_uri`, which must support transactions (i.e. be a replica set).
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// `MongoClient` (a [`mongodb::Client`]), [`mongodb::Database`],
/// `QuestionWriter`, `QuestionReader`, and `Coll<T>`.
#[proc_macro_attribute]
pub fn backend_test(_args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let injected = match check_sig(&item_fn.sig) {
        Ok(injected) => injected,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };
    let test_args = injected.iter().map(Injected::expr).collect::<Vec<_>>();

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (rocket::local::asynchronous::Client, mongodb::Client, mongodb::Database) {
                let db_client = crate::db_client().await;
                let db_name = crate::database();
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_db(db_client.clone(), &db_name).await,
                )
                .await
                .unwrap();
                let db = db_client.database(&db_name);
                (rocket_client, db_client, db)
            }

            /// The test itself.
            #item_fn

            /// Test cleanup.
            async fn cleanup(db: mongodb::Database) {
                db.drop(None).await.unwrap();
            }

            log4rs_test_utils::test_logging::init_logging_once_for(
                ["question_bank"],
                None,
                None,
            );

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
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            // Run the setup.
            let (rocket_client, db_client, db) = outer_runtime.block_on(setup());

            // Run the test, catching any panics.
            // Use mutexes to safely transfer `!UnwindSafe` data.
            let client_mutex = std::sync::Mutex::new(rocket_client);
            let db_client_mutex = std::sync::Mutex::new(db_client);
            let db_mutex = std::sync::Mutex::new(db.clone());
            let runtime_mutex = std::sync::Mutex::new(inner_runtime);
            let result = std::panic::catch_unwind(|| {
                let rocket_client = client_mutex.into_inner().unwrap();
                let db_client = db_client_mutex.into_inner().unwrap();
                let db = db_mutex.into_inner().unwrap();
                let runtime = runtime_mutex.into_inner().unwrap();

                // Not every test uses every handle.
                let _ = (&rocket_client, &db_client, &db);

                runtime.block_on(#new_name(#(#test_args),*));
            });

            // Run the cleanup.
            outer_runtime.block_on(cleanup(db));

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::panic_any(cause);
            }
        }
    }
    .into()
}

/// Ensure the wrapped test is async, work out what to inject, and reject unknown parameters.
fn check_sig(sig: &Signature) -> Result<Vec<Injected>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut injected = Vec::new();
    for input in &sig.inputs {
        let FnArg::Typed(pat_type) = input else {
            return Err(syn::Error::new(input.span(), "Test cannot take `self`"));
        };
        let Pat::Ident(_) = &*pat_type.pat else {
            return Err(syn::Error::new(
                pat_type.pat.span(),
                "Test arguments must be plain identifiers",
            ));
        };
        let Some(dependency) = Injected::from_type(&pat_type.ty) else {
            return Err(syn::Error::new(
                input.span(),
                "Expected one of `Client`, `MongoClient`, `Database`, `QuestionWriter`, \
`QuestionReader` or `Coll<T>`",
            ));
        };
        if dependency.is_unique() && injected.iter().any(Injected::is_unique) {
            return Err(syn::Error::new(
                input.span(),
                "Test cannot accept more than one `rocket::local::asynchronous::Client`",
            ));
        }
        injected.push(dependency);
    }

    Ok(injected)
}

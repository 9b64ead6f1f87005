use std::sync::Arc;

use actix_identity::{CookieIdentityPolicy, IdentityService};
use actix_web::{get, middleware, web, App, HttpRequest, HttpResponse, HttpServer};

use crate::admin;
use crate::auth;
use crate::config::Config;
use crate::conversation;
use crate::errors::ServiceError;
use crate::limits;
use crate::schedule;
use crate::shifts::{self, SlotCatalog};
use crate::stats;
use crate::store::RecordStore;
use crate::teams;
use crate::users;
use crate::weeks;

pub type Response = Result<HttpResponse, ServiceError>;

/// Shared by every worker.
pub struct State {
    pub store: Arc<dyn RecordStore>,
    pub catalog: SlotCatalog,
    /// "postgres" or "memory", reported on the stats page
    pub backend: &'static str,
}

#[get("/health")]
async fn health(_: HttpRequest) -> &'static str {
    "ok"
}

pub async fn launch(state: State) -> std::io::Result<()> {
    let state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::DefaultHeaders::new().header("X-Version", env!("CARGO_PKG_VERSION")))
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::default())
            .wrap(stats::Middleware::default())
            .wrap(IdentityService::new(
                CookieIdentityPolicy::new(Config::session_private_key().as_bytes())
                    .name("shiftboard")
                    .secure(false),
            ))
            .app_data(web::JsonConfig::default().limit(65_536))
            .service(
                web::scope("/api")
                    .configure(auth::routes::register)
                    .configure(teams::routes::register)
                    .configure(users::routes::register)
                    .configure(weeks::routes::register)
                    .configure(limits::routes::register)
                    .configure(shifts::routes::register)
                    .configure(schedule::routes::register)
                    .configure(conversation::routes::register)
                    .configure(admin::routes::register)
                    .service(health),
            )
    })
    .bind(format!("{}:{}", Config::api_host(), Config::api_port()))?
    .run()
    .await
}

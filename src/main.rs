//! Weekly shift scheduling for small hospitality teams, driven from a chat client.
#![warn(missing_debug_implementations, rust_2018_idioms)]

#[macro_use]
extern crate diesel;

#[macro_use]
extern crate diesel_migrations;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate log;

#[macro_use]
extern crate serde_derive;

use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;

use anyhow::Error;
use dotenv::dotenv;
use shiftboard_sessions::Sessions;

#[macro_use]
mod macros;

mod admin;
mod auth;
mod config;
mod conversation;
mod db;
mod errors;
mod limits;
mod schedule;
mod schema;
mod server;
mod shifts;
mod stats;
mod store;
mod teams;
mod users;
mod validator;
mod weeks;

use config::Config;
use shifts::SlotCatalog;
use store::{MemoryStore, PgStore, RecordStore};

#[actix_web::main]
async fn main() -> anyhow::Result<(), Error> {
    init().await?;

    Ok(())
}

async fn init() -> anyhow::Result<(), Error> {
    dotenv().ok();

    let (tracer, _uninstall) = opentelemetry_jaeger::new_pipeline()
        .with_service_name("shiftboard")
        .with_agent_endpoint(Config::opentelemetry_endpoint())
        .install()
        .map_err(|e| anyhow::anyhow!("unable to connect to opentelemetry agent: {}", e))?;

    let opentelemetry = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(opentelemetry)
        .try_init()
        .map_err(|e| anyhow::anyhow!("unable to initialize the tracer: {}", e))?;

    let (store, backend): (Arc<dyn RecordStore>, &'static str) = match Config::database_url() {
        Some(database_url) => {
            debug!("running migrations");
            db::migrate(database_url)?;
            let pool = db::build_connection_pool(database_url)?;
            (Arc::new(PgStore::new(pool)), "postgres")
        }
        None => {
            warn!("DATABASE_URL is not set, records are kept in memory and lost on restart");
            (Arc::new(MemoryStore::default()), "memory")
        }
    };

    Sessions::init(Config::redis_url().map(String::from), Config::session_ttl()).await?;

    let catalog = SlotCatalog::new(&Config::slot_catalog())
        .map_err(|e| anyhow::anyhow!("invalid SLOT_CATALOG: {}", e))?;
    info!("members pick from {}", catalog.slots().join(", "));

    debug!("launching the actix webserver");
    server::launch(server::State {
        store,
        catalog,
        backend,
    })
    .await?;

    Ok(())
}

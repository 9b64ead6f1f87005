embed_migrations!("migrations/");

use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, PooledConnection};
use diesel::PgConnection;

pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type Conn = PooledConnection<ConnectionManager<PgConnection>>;

/// Bring the schedule tables up to date before any connection is pooled.
pub fn migrate(database_url: &str) -> anyhow::Result<()> {
    let connection = PgConnection::establish(database_url)?;
    embedded_migrations::run_with_output(&connection, &mut std::io::stdout())?;

    Ok(())
}

pub fn build_connection_pool(database_url: &str) -> anyhow::Result<Pool> {
    let pool = r2d2::Pool::builder().build(ConnectionManager::<PgConnection>::new(database_url))?;
    info!("connected to postgres with {} pooled connections", pool.max_size());

    Ok(pool)
}

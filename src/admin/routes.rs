use actix_identity::Identity;
use actix_web::web::Data;
use actix_web::{get, web};
use shiftboard_sessions::{SessionStatus, Sessions};

use crate::auth;
use crate::server::{Response, State};
use crate::stats::{LoadedStats, Stats};

#[derive(Serialize, Debug)]
struct ServerStats {
    server: LoadedStats,
    sessions: shiftboard_sessions::LoadedStats,
    session_backend: SessionStatus,
    /// "postgres" or "memory"
    store: &'static str,
}

#[get("/admin/stats")]
async fn server_stats(state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let store = state.store.clone();

    web::block(move || auth::manager(user_id, store.as_ref())).await?;

    http_ok_json!(ServerStats {
        server: Stats::load(),
        sessions: shiftboard_sessions::Stats::load(),
        session_backend: Sessions::status().await,
        store: state.backend,
    });
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(server_stats);
}

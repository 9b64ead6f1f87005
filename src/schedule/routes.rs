use actix_identity::Identity;
use actix_web::web::Data;
use actix_web::{get, web, HttpResponse};

use crate::auth;
use crate::errors::ServiceError;
use crate::schedule::active_grid;
use crate::server::{Response, State};

/// answers `null` while the team has no active week
#[get("/schedule")]
async fn find(state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let store = state.store.clone();

    let grid = web::block(move || {
        let (_, team_id) = auth::member(user_id, store.as_ref())?;
        active_grid(team_id, store.as_ref())
    })
    .await?;

    http_ok_json!(grid);
}

#[get("/schedule/csv")]
async fn export_csv(state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let store = state.store.clone();

    let grid = web::block(move || {
        let (_, team_id) = auth::member(user_id, store.as_ref())?;
        active_grid(team_id, store.as_ref())
    })
    .await?
    .ok_or(ServiceError::NotFound)?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .header("Content-Disposition", "attachment; filename=\"schedule.csv\"")
        .body(grid.to_csv()?))
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find);
    cfg.service(export_csv);
}

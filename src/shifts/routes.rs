use actix_identity::Identity;
use actix_web::web::{Data, Json, Query};
use actix_web::{get, post, web};
use chrono::NaiveDate;

use crate::auth;
use crate::errors::ServiceError;
use crate::server::{Response, State};
use crate::shifts::{PickShift, Shift};
use crate::store::RecordStore;
use crate::weeks::{parse_date, Week};

/// **GET /api/shifts/admission**, whether the caller could pick this slot right now
#[get("/shifts/admission")]
async fn admission(query: Query<PickShift>, state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let date = parse_date(&query.date)?;
    let slot = state.catalog.parse(&query.slot)?;
    let store = state.store.clone();

    let decision = web::block(move || {
        let (user, team_id) = auth::member(user_id, store.as_ref())?;
        Shift::admission_for(&user, team_id, date, &slot, store.as_ref())
    })
    .await?;

    http_ok_json!(decision);
}

/// shifts can only be picked inside the team's active week
fn ensure_in_active_week(
    team_id: i64,
    date: NaiveDate,
    store: &dyn RecordStore,
) -> Result<(), ServiceError> {
    match Week::active(team_id, store)? {
        Some(week) if week.contains(date) => Ok(()),
        Some(week) => Err(ServiceError::BadRequest(format!(
            "{} is outside the active week {} - {}",
            date, week.start_date, week.end_date
        ))),
        None => Err(ServiceError::BadRequest(
            "there is no active week to pick shifts for".to_string(),
        )),
    }
}

#[post("/shifts")]
async fn assign(request: Json<PickShift>, state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let date = parse_date(&request.date)?;
    let slot = state.catalog.parse(&request.slot)?;
    let store = state.store.clone();

    let result = web::block(move || {
        let (user, team_id) = auth::member(user_id, store.as_ref())?;
        ensure_in_active_week(team_id, date, store.as_ref())?;
        Shift::assign(user.id, team_id, date, slot, store.as_ref())
    })
    .await?;

    http_ok_json!(result);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(admission);
    cfg.service(assign);
}

use actix_identity::Identity;
use actix_web::web::{Data, Json, Query};
use actix_web::{get, put, web};

use crate::auth;
use crate::limits::{Limit, LimitQuery, NewLimit, SetLimit};
use crate::server::{Response, State};
use crate::weeks::{parse_date, Week};

/// limits of the active week, empty while no week is active
#[get("/limits")]
async fn find_all(state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let store = state.store.clone();

    let limits = web::block(move || {
        let (_, team_id) = auth::member(user_id, store.as_ref())?;
        match Week::active(team_id, store.as_ref())? {
            Some(week) => Limit::between(team_id, week.start_date, week.end_date, store.as_ref()),
            None => Ok(vec![]),
        }
    })
    .await?;

    http_ok_json!(limits);
}

#[put("/limits")]
async fn set(request: Json<SetLimit>, state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let request = request.into_inner();
    let date = parse_date(&request.date)?;
    let slot = match &request.slot {
        Some(slot) => Some(state.catalog.parse_working(slot)?),
        None => None,
    };
    let store = state.store.clone();

    let limit = web::block(move || {
        let (_, team_id) = auth::manager(user_id, store.as_ref())?;
        Limit::set(
            &NewLimit {
                team_id,
                date,
                slot,
                role: request.role,
                max_count: request.max_count,
            },
            store.as_ref(),
        )
    })
    .await?;

    http_ok_json!(limit);
}

#[get("/limits/resolve")]
async fn resolve(query: Query<LimitQuery>, state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let query = query.into_inner();
    let date = parse_date(&query.date)?;
    let slot = state.catalog.parse_working(&query.slot)?;
    let store = state.store.clone();

    let resolved = web::block(move || {
        let (_, team_id) = auth::member(user_id, store.as_ref())?;
        Limit::resolve(team_id, date, query.role, &slot, store.as_ref())
    })
    .await?;

    http_ok_json!(resolved);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_all);
    cfg.service(set);
    cfg.service(resolve);
}

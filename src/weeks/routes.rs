use actix_identity::Identity;
use actix_web::web::{Data, Json};
use actix_web::{get, post, web};

use crate::auth;
use crate::server::{Response, State};
use crate::weeks::{parse_date, ActivateWeek, ActiveWeek, Week};

/// answers `null` while the team has no active week
#[get("/weeks/active")]
async fn active(state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let store = state.store.clone();

    let week = web::block(move || {
        let (_, team_id) = auth::member(user_id, store.as_ref())?;
        Week::active(team_id, store.as_ref())
    })
    .await?;

    http_ok_json!(week.map(|week| ActiveWeek {
        days: week.days(),
        week,
    }));
}

#[post("/weeks")]
async fn activate(request: Json<ActivateWeek>, state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let date = parse_date(&request.date)?;
    let store = state.store.clone();

    let week = web::block(move || {
        let (_, team_id) = auth::manager(user_id, store.as_ref())?;
        Week::activate(team_id, date, store.as_ref())
    })
    .await?;

    http_created_json!(ActiveWeek {
        days: week.days(),
        week,
    });
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(active);
    cfg.service(activate);
}

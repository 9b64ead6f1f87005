use actix_identity::Identity;
use actix_web::web::{Data, Json};
use actix_web::{get, post, web};
use serde_json::json;

use crate::auth;
use crate::errors::ServiceError;
use crate::server::{Response, State};
use crate::teams::{CreateTeam, JoinTeam, Team};
use crate::users::User;

#[post("/teams")]
async fn create(request: Json<CreateTeam>, state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let request = request.into_inner();
    let store = state.store.clone();

    let team = web::block(move || {
        let mut owner = User::find(user_id, store.as_ref())?;
        Team::create(&request.name, &mut owner, store.as_ref())
    })
    .await?;

    http_created_json!(team);
}

#[post("/teams/join")]
async fn join(request: Json<JoinTeam>, state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let request = request.into_inner();
    let store = state.store.clone();

    let team = web::block(move || {
        let mut user = User::find(user_id, store.as_ref())?;
        Team::join(&request.invite_code, &mut user, store.as_ref())
    })
    .await?
    .ok_or(ServiceError::NotFound)?;

    http_ok_json!(team);
}

#[get("/teams/invite")]
async fn invite(state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let store = state.store.clone();

    let team = web::block(move || {
        let (_, team_id) = auth::member(user_id, store.as_ref())?;
        Team::find(team_id, store.as_ref())
    })
    .await?;

    http_ok_json!(json!({ "invite_code": team.invite_code }));
}

#[post("/teams/invite/rotate")]
async fn rotate_invite(state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let store = state.store.clone();

    let team = web::block(move || {
        let (_, team_id) = auth::manager(user_id, store.as_ref())?;
        Team::find(team_id, store.as_ref())?.rotate_invite_code(store.as_ref())
    })
    .await?;

    http_ok_json!(json!({ "invite_code": team.invite_code }));
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(create);
    cfg.service(join);
    cfg.service(invite);
    cfg.service(rotate_invite);
}

use actix_identity::Identity;
use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, put, web};

use crate::auth;
use crate::errors::ServiceError;
use crate::server::{Response, State};
use crate::store::RecordStore;
use crate::users::{RoleChange, User};

#[get("/teams/members")]
async fn find_members(state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let store = state.store.clone();

    let members = web::block(move || {
        let (_, team_id) = auth::member(user_id, store.as_ref())?;
        User::members(team_id, store.as_ref())
    })
    .await?;

    http_ok_json!(members);
}

/// a member of the manager's own team, anyone else is reported missing
fn teammate(team_id: i64, member_id: i64, store: &dyn RecordStore) -> Result<User, ServiceError> {
    let member = User::find(member_id, store)?;
    if member.team_id != Some(team_id) {
        return Err(ServiceError::NotFound);
    }
    Ok(member)
}

#[put("/teams/members/{id}/role")]
async fn set_role(
    member_id: Path<i64>,
    change: Json<RoleChange>,
    state: Data<State>,
    id: Identity,
) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let member_id = member_id.into_inner();
    let role = change.into_inner().role;
    let store = state.store.clone();

    let member = web::block(move || {
        let (_, team_id) = auth::manager(user_id, store.as_ref())?;
        let mut member = teammate(team_id, member_id, store.as_ref())?;
        member.set_role(role, store.as_ref())
    })
    .await?;

    info!("user {} gave {} the role {}", user_id, member.id, role);

    http_ok_json!(member);
}

#[delete("/teams/members/{id}")]
async fn deactivate(member_id: Path<i64>, state: Data<State>, id: Identity) -> Response {
    let user_id = auth::get_user_id(&id)?;
    let member_id = member_id.into_inner();
    let store = state.store.clone();

    let member = web::block(move || {
        let (_, team_id) = auth::manager(user_id, store.as_ref())?;
        let mut member = teammate(team_id, member_id, store.as_ref())?;
        member.deactivate(store.as_ref())
    })
    .await?;

    info!("user {} deactivated {}", user_id, member.id);

    http_ok_json!(member);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_members);
    cfg.service(set_role);
    cfg.service(deactivate);
}

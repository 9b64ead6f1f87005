use actix_identity::Identity;
use actix_web::web::{Data, Json};
use actix_web::{post, web, HttpResponse};
use serde_json::json;

use crate::server::{Response, State};
use crate::users::{NewUser, User};

/// **POST /api/start**, registers the chat account on first contact
#[post("/start")]
async fn start(request: Json<NewUser>, id: Identity, state: Data<State>) -> Response {
    let request = request.into_inner();
    let store = state.store.clone();

    let user = web::block(move || {
        User::ensure(&request.external_identity, &request.display_name, store.as_ref())
    })
    .await?;

    id.remember(user.id.to_string());

    http_ok_json!(user);
}

#[post("/logout")]
async fn logout(id: Identity) -> Response {
    crate::auth::get_user_id(&id)?;

    id.forget();

    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully signed out" })))
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(start);
    cfg.service(logout);
}

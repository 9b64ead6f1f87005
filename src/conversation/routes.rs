use actix_web::web::{Data, Json};
use actix_web::{post, web};
use shiftboard_sessions::Sessions;

use crate::conversation::{handle, ChatMessage, Context, Pending};
use crate::server::{Response, State};

/// Answer a message from a chat client.
///
/// The sender is identified by `external_identity`, no session cookie is needed.
/// When the message fails, the conversation stays where it was.
#[post("/chat")]
async fn chat(message: Json<ChatMessage>, state: Data<State>) -> Response {
    let message = message.into_inner();
    if message.conversation_id.trim().is_empty() {
        bad_request!("conversation_id can't be empty");
    }

    let conversation_id = message.conversation_id.clone();
    let pending = Sessions::get::<Pending, _>(&conversation_id)
        .await
        .unwrap_or_default();

    let state = state.into_inner();
    let step = web::block(move || {
        let context = Context {
            store: state.store.as_ref(),
            catalog: &state.catalog,
        };
        handle(&context, &message, pending)
    })
    .await?;

    if step.next == Pending::Idle {
        Sessions::delete::<Pending, _>(&conversation_id).await;
    } else {
        Sessions::set(&step.next, &conversation_id).await;
    }

    http_ok_json!(step.reply);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(chat);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{test, App};
    use serde_json::{json, Value};

    use super::*;
    use crate::shifts::SlotCatalog;
    use crate::store::MemoryStore;

    fn message(conversation_id: &str, text: &str) -> Value {
        json!({
            "conversation_id": conversation_id,
            "external_identity": format!("tg:{}", conversation_id),
            "display_name": "Anna",
            "text": text,
        })
    }

    #[actix_rt::test]
    async fn pending_input_survives_between_messages() {
        let state = State {
            store: Arc::new(MemoryStore::default()),
            catalog: SlotCatalog::default(),
            backend: "memory",
        };
        let mut app =
            test::init_service(App::new().data(state).configure(register)).await;

        let request = test::TestRequest::post()
            .uri("/chat")
            .set_json(&message("routes-1", "create team"))
            .to_request();
        let reply: Value = test::read_response_json(&mut app, request).await;
        assert!(reply["text"].as_str().unwrap().contains("name"));

        let request = test::TestRequest::post()
            .uri("/chat")
            .set_json(&message("routes-1", "Bar Central"))
            .to_request();
        let reply: Value = test::read_response_json(&mut app, request).await;
        assert!(reply["text"].as_str().unwrap().contains("is created"));

        let pending = Sessions::get::<Pending, _>("routes-1").await;
        assert_eq!(pending, None);
    }

    #[actix_rt::test]
    async fn empty_conversation_ids_are_rejected() {
        let state = State {
            store: Arc::new(MemoryStore::default()),
            catalog: SlotCatalog::default(),
            backend: "memory",
        };
        let mut app =
            test::init_service(App::new().data(state).configure(register)).await;

        let request = test::TestRequest::post()
            .uri("/chat")
            .set_json(&message("", "start"))
            .to_request();
        let response = test::call_service(&mut app, request).await;

        assert_eq!(response.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }
}

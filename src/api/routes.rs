use actix_web::http::header;
use actix_web::{error::InternalError, get, post, web, HttpResponse, Result as WebResult};
use bytes::Bytes;
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{error, info};

use crate::api::models::{
    ChatMessageRequest, CreateSessionRequest, ErrorResponse, HistoryQuery, JokeErrorResponse, JokeRequest,
    JokeResponse, SessionResponse,
};
use crate::chat::{ChatRelay, ChatTurn};
use crate::comedy::{JokeService, COMEDIANS};
use crate::db::Store;
use crate::error::AppError;
use crate::persona::PersonaCatalog;

fn error_response(err: &AppError) -> HttpResponse {
    let status = err.status_code();
    let body = if status.is_server_error() {
        ErrorResponse {
            error: "Internal server error".to_string(),
            details: Some(err.user_message()),
        }
    } else {
        ErrorResponse {
            error: err.user_message(),
            details: None,
        }
    };
    HttpResponse::build(status).json(body)
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "healthy"}))
}

// --- Catalogs ---

#[get("/personas")]
pub async fn list_personas(personas: web::Data<PersonaCatalog>) -> HttpResponse {
    HttpResponse::Ok().json(personas.all())
}

#[get("/comedians")]
pub async fn list_comedians() -> HttpResponse {
    HttpResponse::Ok().json(COMEDIANS)
}

// --- Chat ---

#[post("/chat/session")]
pub async fn create_session(
    store: web::Data<Arc<dyn Store>>,
    personas: web::Data<PersonaCatalog>,
    req: web::Json<CreateSessionRequest>,
) -> WebResult<HttpResponse> {
    let persona_id = match req.into_inner().persona_id.filter(|p| !p.is_empty()) {
        Some(p) => p,
        None => return Ok(error_response(&AppError::Validation("Missing required fields".to_string()))),
    };

    if let Err(e) = personas.system_prompt(&persona_id) {
        return Ok(error_response(&e));
    }

    match store.create_session(&persona_id).await {
        Ok(session) => {
            info!(session_id = %session.id, persona_id = %persona_id, "Created chat session");
            Ok(HttpResponse::Ok().json(SessionResponse {
                session_id: session.id,
                persona_id: session.persona_id,
            }))
        }
        Err(e) => {
            error!(persona_id = %persona_id, "Failed to create session: {}", e);
            Ok(error_response(&AppError::from(e)))
        }
    }
}

#[get("/chat/session/{id}/messages")]
pub async fn get_messages(
    store: web::Data<Arc<dyn Store>>,
    id: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> WebResult<HttpResponse> {
    let id = id.into_inner();

    match store.get_session(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Ok(error_response(&AppError::NotFound("Session not found".to_string()))),
        Err(e) => return Ok(error_response(&AppError::from(e))),
    }

    match store.recent_messages(&id, query.limit).await {
        Ok(messages) => Ok(HttpResponse::Ok().json(messages)),
        Err(e) => {
            error!(session_id = %id, "Failed to load messages: {}", e);
            Ok(error_response(&AppError::from(e)))
        }
    }
}

#[post("/chat/message")]
pub async fn chat_message(
    relay: web::Data<ChatRelay>,
    req: web::Json<ChatMessageRequest>,
) -> WebResult<HttpResponse> {
    let req = req.into_inner();

    let turn = match ChatTurn::new(req.session_id, req.persona_id, req.message) {
        Ok(turn) => turn,
        Err(e) => return Ok(error_response(&e)),
    };

    let events = match relay.start(turn).await {
        Ok(events) => events,
        Err(e) => {
            error!("Error in message route: {}", e);
            return Ok(error_response(&e));
        }
    };

    let body = events.map(|event| Ok::<Bytes, actix_web::Error>(event.to_sse_frame()));

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(body))
}

// --- Comedy ---

#[post("/comedy/joke")]
pub async fn generate_joke(jokes: web::Data<JokeService>, req: web::Json<JokeRequest>) -> WebResult<HttpResponse> {
    let req = req.into_inner();
    let comedian = req.comedian.unwrap_or_default();
    let category = req.category.unwrap_or_default();

    match jokes.get_or_generate(&comedian, &category).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(JokeResponse { joke: outcome.joke })),
        Err(e @ AppError::Validation(_)) => Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: e.user_message(),
            details: None,
        })),
        Err(e) => Ok(HttpResponse::InternalServerError().json(JokeErrorResponse {
            error: e.user_message(),
            joke: None,
        })),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_cfg = web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(ErrorResponse {
            error: format!("Invalid request body: {}", err),
            details: None,
        });
        InternalError::from_response(err, response).into()
    });

    cfg.app_data(json_cfg).service(health).service(
        web::scope("/api/office")
            .service(list_personas)
            .service(list_comedians)
            .service(create_session)
            .service(get_messages)
            .service(chat_message)
            .service(generate_joke),
    );
}

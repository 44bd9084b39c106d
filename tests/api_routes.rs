mod common;

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    use crate::common::{test_config, Failure, Faults, Harness, Script};
    use office::config::UnknownPersonaPolicy;
    use office::db::Role;
    use office::api::routes;

    fn reply(text: &str) -> Script {
        Script::Chunks(vec![text.to_string()])
    }

    macro_rules! app {
        ($h:expr) => {{
            let state = $h.state.clone();
            test::init_service(
                App::new()
                    .configure(move |cfg| state.register(cfg))
                    .configure(routes::configure),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn health_reports_healthy() {
        let h = Harness::new(reply("x"));
        let app = app!(h);

        let resp: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp, json!({"status": "healthy"}));
    }

    #[actix_web::test]
    async fn chat_message_streams_sse_frames() {
        let h = Harness::new(Script::Chunks(vec!["Good ".into(), "evening.".into()]));
        h.store.add_session("s1", "sean-connery");
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/office/chat/message")
            .set_json(json!({"sessionId": "s1", "personaId": "sean-connery", "message": "Hello"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap().to_str().unwrap(),
            "text/event-stream"
        );
        let body = test::read_body(resp).await;
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "data: {\"content\":\"Good \"}\n\ndata: {\"content\":\"evening.\"}\n\ndata: [DONE]\n\n"
        );
        assert_eq!(h.store.messages("s1").len(), 2);
    }

    #[actix_web::test]
    async fn chat_message_stream_reports_provider_error_in_band() {
        let h = Harness::new(Script::Fail(Failure::Unauthorized));
        h.store.add_session("s1", "sean-connery");
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/office/chat/message")
            .set_json(json!({"sessionId": "s1", "personaId": "sean-connery", "message": "Hello"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = test::read_body(resp).await;
        let text = std::str::from_utf8(&body).unwrap();
        let payload: Value = serde_json::from_str(text.strip_prefix("data: ").unwrap().trim_end()).unwrap();
        assert_eq!(payload["status"], 401);
        assert!(payload["error"].is_string());
        assert!(!text.contains("[DONE]"));
    }

    #[actix_web::test]
    async fn chat_message_missing_message_is_400_without_writes() {
        let h = Harness::new(reply("x"));
        h.store.add_session("s1", "sean-connery");
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/office/chat/message")
            .set_json(json!({"sessionId": "s1", "personaId": "sean-connery"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Missing required fields");
        assert_eq!(h.store.write_count(), 0);
        assert!(h.llm.calls().is_empty());
    }

    #[actix_web::test]
    async fn chat_message_user_write_failure_is_500() {
        let h = Harness::new(reply("x"));
        h.store.add_session("s1", "sean-connery");
        h.store.set_faults(Faults {
            fail_message_insert: true,
            ..Default::default()
        });
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/office/chat/message")
            .set_json(json!({"sessionId": "s1", "personaId": "sean-connery", "message": "Hi"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Internal server error");
        assert!(body["details"].is_string());
    }

    #[actix_web::test]
    async fn chat_message_unknown_session_is_404() {
        let h = Harness::new(reply("x"));
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/office/chat/message")
            .set_json(json!({"sessionId": "nope", "personaId": "sean-connery", "message": "Hi"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn malformed_json_is_400_with_json_body() {
        let h = Harness::new(reply("x"));
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/office/comedy/joke")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
    }

    #[actix_web::test]
    async fn joke_cache_hit_returns_stored_text() {
        let h = Harness::new(reply("unused"));
        h.store.seed_joke("rodney", "no_respect", "I get no respect.");
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/office/comedy/joke")
            .set_json(json!({"comedian": "rodney", "category": "no_respect"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body, json!({"joke": "I get no respect."}));
        assert!(h.llm.calls().is_empty());
    }

    #[actix_web::test]
    async fn joke_write_failure_still_200() {
        let h = Harness::new(reply("What a crowd."));
        h.store.set_faults(Faults {
            fail_joke_insert: true,
            ..Default::default()
        });
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/office/comedy/joke")
            .set_json(json!({"comedian": "don", "category": "roast"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["joke"], "What a crowd.");
    }

    #[actix_web::test]
    async fn joke_missing_category_is_400() {
        let h = Harness::new(reply("x"));
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/office/comedy/joke")
            .set_json(json!({"comedian": "don"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Comedian and category are required");
    }

    #[actix_web::test]
    async fn joke_empty_generation_is_500_with_null_joke() {
        let h = Harness::new(reply("  "));
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/office/comedy/joke")
            .set_json(json!({"comedian": "george", "category": "aging"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["joke"].is_null());
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn joke_rate_limit_message() {
        let h = Harness::new(Script::Fail(Failure::RateLimited));
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/office/comedy/joke")
            .set_json(json!({"comedian": "george", "category": "truth"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"error": "Rate limit exceeded. Please try again later.", "joke": null}));
    }

    #[actix_web::test]
    async fn session_create_then_history() {
        let h = Harness::new(reply("Splendid."));
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/office/chat/session")
            .set_json(json!({"personaId": "winston-churchill"}))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let session_id = created["sessionId"].as_str().unwrap().to_string();
        assert_eq!(created["personaId"], "winston-churchill");

        let req = test::TestRequest::post()
            .uri("/api/office/chat/message")
            .set_json(json!({"sessionId": session_id, "personaId": "winston-churchill", "message": "Courage?"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        test::read_body(resp).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/office/chat/session/{}/messages", session_id))
            .to_request();
        let history: Value = test::call_and_read_body_json(&app, req).await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["role"], "user");
        assert_eq!(history[0]["content"], "Courage?");
        assert_eq!(history[1]["role"], "assistant");
        assert_eq!(history[1]["content"], "Splendid.");
    }

    #[actix_web::test]
    async fn session_create_rejects_unknown_persona_when_configured() {
        let mut config = test_config();
        config.chat.unknown_persona = UnknownPersonaPolicy::Reject;
        let h = Harness::with_config(reply("x"), config);
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/office/chat/session")
            .set_json(json!({"personaId": "elvis"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn session_create_accepts_unknown_persona_by_default() {
        let h = Harness::new(reply("x"));
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/office/chat/session")
            .set_json(json!({"personaId": "elvis"}))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(created["personaId"], "elvis");
        assert!(created["sessionId"].is_string());
    }

    #[actix_web::test]
    async fn history_with_oversized_limit_still_answers() {
        let h = Harness::new(reply("x"));
        h.store.add_session("s1", "sean-connery");
        h.store.seed_message("s1", Role::User, "Shaken?");
        let app = app!(h);

        let req = test::TestRequest::get()
            .uri("/api/office/chat/session/s1/messages?limit=18446744073709551615")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let history: Value = test::read_body_json(resp).await;
        assert_eq!(history.as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn history_of_unknown_session_is_404() {
        let h = Harness::new(reply("x"));
        let app = app!(h);

        let req = test::TestRequest::get()
            .uri("/api/office/chat/session/missing/messages")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn catalogs_list_personas_and_comedians() {
        let h = Harness::new(reply("x"));
        let app = app!(h);

        let personas: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/office/personas").to_request()).await;
        assert_eq!(personas.as_array().unwrap().len(), 14);
        assert!(personas[0].get("prompt").is_none());

        let comedians: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/office/comedians").to_request())
                .await;
        let ids: Vec<&str> = comedians
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["rodney", "george", "don"]);
        assert_eq!(comedians[2]["tagline"], "The Roast Master");
    }
}

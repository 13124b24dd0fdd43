use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;

use crate::api::not_found;
use crate::config::DispatchPolicy;
use crate::error::{AppError, Result};
use crate::mail::{render_notification, DeliveryReceipt, Routing, TransportError};
use crate::models::{SendEmailResponse, Submission, SubmissionRequest};
use crate::state::AppState;

/// Submission routes
pub fn submission_routes() -> Router<AppState> {
    Router::new().route("/send-email", post(send_email).fallback(not_found))
}

/// POST /send-email - validate a dealer application and forward it to the operator
async fn send_email(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubmissionRequest>, JsonRejection>,
) -> Result<Json<SendEmailResponse>> {
    let Json(request) = payload.inspect_err(|rejection| {
        tracing::warn!(reason = %rejection.body_text(), "Submission body rejected");
    })?;

    let submission = request.validate().inspect_err(|e| {
        tracing::warn!(reason = %e, "Submission rejected");
    })?;

    match state.config.dispatch_policy {
        DispatchPolicy::Synchronous => {
            let receipt = dispatch(&state, &submission).await.map_err(|e| {
                AppError::Transport {
                    details: (!state.config.is_production()).then(|| e.to_string()),
                }
            })?;

            Ok(Json(SendEmailResponse {
                success: true,
                message: Some("Email inviata con successo".to_string()),
                message_id: receipt.message_id,
            }))
        }
        DispatchPolicy::FireAndForget => {
            let background = Arc::clone(&state.background);
            background.spawn(async move {
                // failures are already logged inside dispatch
                let _ = dispatch(&state, &submission).await;
            });

            Ok(Json(SendEmailResponse {
                success: true,
                message: Some("Richiesta ricevuta".to_string()),
                message_id: None,
            }))
        }
    }
}

/// Format and send exactly one notification, logging the outcome
async fn dispatch(
    state: &AppState,
    submission: &Submission,
) -> std::result::Result<DeliveryReceipt, TransportError> {
    let message = render_notification(
        submission,
        Routing {
            from: &state.config.mail_from,
            to: &state.config.mail_receiver,
            subject_prefix: &state.config.subject_prefix,
        },
        Utc::now(),
    );

    match state.mailer.send(message).await {
        Ok(receipt) => {
            tracing::info!(
                transport = state.mailer.name(),
                dealer_type = submission.dealer_type.as_str(),
                reply_to = %submission.email,
                message_id = receipt.message_id.as_deref().unwrap_or("-"),
                "Submission dispatched"
            );
            Ok(receipt)
        }
        Err(e) => {
            tracing::error!(
                transport = state.mailer.name(),
                reply_to = %submission.email,
                error = %e,
                "Mail transport failure"
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::api::create_router;
    use crate::config::{DispatchPolicy, Environment};
    use crate::mail::testing::RecordingMailer;
    use crate::state::test_state;

    fn mario() -> Value {
        json!({
            "type": "business",
            "name": "Mario Rossi",
            "email": "Mario.Rossi+test@GMAIL.com",
            "phone": "3331234567",
            "address": "Via Roma 1",
            "activityName": "Bar Roma",
            "activityType": "bar"
        })
    }

    async fn post(router: axum::Router, body: Body) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/send-email")
                    .header("content-type", "application/json")
                    .body(body)
                    .expect("request"),
            )
            .await
            .expect("router dispatch");

        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        (status, serde_json::from_slice(&body).expect("json"))
    }

    async fn post_json(router: axum::Router, payload: &Value) -> (StatusCode, Value) {
        post(
            router,
            Body::from(serde_json::to_vec(payload).expect("serialize")),
        )
        .await
    }

    fn sync_router(mailer: Arc<RecordingMailer>, environment: Environment) -> axum::Router {
        create_router(test_state(
            environment,
            DispatchPolicy::Synchronous,
            mailer,
        ))
    }

    #[tokio::test]
    async fn test_valid_submission_sends_one_email() {
        let mailer = Arc::new(RecordingMailer::new());
        let (status, body) =
            post_json(sync_router(mailer.clone(), Environment::Development), &mario()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["messageId"], "<test-message@sobrio30.it>");

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        let message = &sent[0];
        assert_eq!(message.reply_to, "mariorossi@gmail.com");
        assert_eq!(message.from, "noreply@sobrio30.it");
        assert_eq!(message.to, "rivenditori@sobrio30.it");
        assert!(message.subject.contains("Mario Rossi"));
        assert!(message.html.contains("<td>Bar Roma</td>"));
        assert!(message.html.contains("<td>bar</td>"));
        assert!(!message.html.contains("Messaggio"));
    }

    #[tokio::test]
    async fn test_invalid_type_is_rejected_without_sending() {
        let mailer = Arc::new(RecordingMailer::new());
        let mut payload = mario();
        payload["type"] = json!("associazione");

        let (status, body) =
            post_json(sync_router(mailer.clone(), Environment::Development), &payload).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "success": false, "error": "Tipo utente non valido" })
        );
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected_without_sending() {
        for field in ["type", "name", "email", "phone", "address"] {
            let mailer = Arc::new(RecordingMailer::new());
            let mut payload = mario();
            payload.as_object_mut().expect("object").remove(field);

            let (status, body) =
                post_json(sync_router(mailer.clone(), Environment::Development), &payload).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "missing {field}");
            assert_eq!(body["error"], "Compila tutti i campi obbligatori");
            assert!(mailer.sent().is_empty());
        }
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected_without_sending() {
        for email in ["mario", "mario@localhost", "mario@[192.168.1.1]"] {
            let mailer = Arc::new(RecordingMailer::new());
            let mut payload = mario();
            payload["email"] = json!(email);

            let (status, body) =
                post_json(sync_router(mailer.clone(), Environment::Development), &payload).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "email {email}");
            assert_eq!(body["error"], "Indirizzo email non valido");
            assert!(mailer.sent().is_empty());
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let mailer = Arc::new(RecordingMailer::new());
        let (status, body) = post(
            sync_router(mailer.clone(), Environment::Development),
            Body::from("{not json"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Richiesta non valida");
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_empty_object_is_missing_fields() {
        let mailer = Arc::new(RecordingMailer::new());
        let (status, body) =
            post_json(sync_router(mailer, Environment::Development), &json!({})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Compila tutti i campi obbligatori");
    }

    #[tokio::test]
    async fn test_transport_failure_details_outside_production() {
        let mailer = Arc::new(RecordingMailer::failing("535 bad credentials"));
        let (status, body) =
            post_json(sync_router(mailer.clone(), Environment::Development), &mario()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(
            body["error"],
            "Errore durante l'invio dell'email, riprova più tardi"
        );
        assert!(body["details"]
            .as_str()
            .expect("details")
            .contains("535 bad credentials"));
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_hides_details_in_production() {
        let mailer = Arc::new(RecordingMailer::failing("535 bad credentials"));
        let (status, body) =
            post_json(sync_router(mailer.clone(), Environment::Production), &mario()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.get("details").is_none());
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_fire_and_forget_acknowledges_then_sends() {
        let (mailer, mut sent) = RecordingMailer::failing("connection refused").with_channel();
        let router = create_router(test_state(
            Environment::Development,
            DispatchPolicy::FireAndForget,
            Arc::new(mailer),
        ));

        let (status, body) = post_json(router, &mario()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "success": true, "message": "Richiesta ricevuta" })
        );

        let message = tokio::time::timeout(Duration::from_secs(5), sent.recv())
            .await
            .expect("send attempted")
            .expect("channel open");
        assert_eq!(message.reply_to, "mariorossi@gmail.com");
    }

    #[tokio::test]
    async fn test_fire_and_forget_send_completes_on_drain() {
        let mailer = Arc::new(RecordingMailer::new());
        let state = test_state(
            Environment::Development,
            DispatchPolicy::FireAndForget,
            mailer.clone(),
        );

        let (status, _) = post_json(create_router(state.clone()), &mario()).await;
        assert_eq!(status, StatusCode::OK);

        state.background.drain().await;

        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(state.background.pending(), 0);
    }

    #[tokio::test]
    async fn test_fire_and_forget_rejects_invalid_input_synchronously() {
        let (mailer, mut sent) = RecordingMailer::new().with_channel();
        let router = create_router(test_state(
            Environment::Development,
            DispatchPolicy::FireAndForget,
            Arc::new(mailer),
        ));
        let mut payload = mario();
        payload["type"] = json!("associazione");

        let (status, _) = post_json(router, &payload).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(sent.try_recv().is_err());
    }
}

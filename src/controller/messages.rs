use crate::{
    configuration::{AppState, State},
    error::Error,
    model::{Channel, SystemMessage},
    push::{self, DispatchSummary},
};
use actix_web::{get, post, web, HttpRequest, HttpResponse, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[get("/messages")]
pub async fn get_index(
    state: web::Data<AppState<State>>,
) -> Result<HttpResponse, Error> {
    let items = state.database.system_message.get_all().await?;
    let messages = items.into_iter().map(MessageBody::from).collect();

    Ok(HttpResponse::Ok().json(ListResponse { messages }))
}

#[post("/messages")]
pub async fn post_index(
    state: web::Data<AppState<State>>,
    data: web::Json<PostRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    let token = req
        .headers()
        .get("x-admin-token")
        .and_then(|value| value.to_str().ok());

    if !state.authorizer.authorize(token) {
        return Err(Error::Unauthorized(String::from("Unauthorized")));
    }

    let text = data.text.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(Error::Validation(String::from(
            "Message text is required",
        )));
    }

    let message = state.database.system_message.insert(text.to_owned()).await?;

    let payload = push::broadcast_payload(&message.text);
    let summary =
        match push::dispatch(state.as_ref(), Channel::WebPush, &payload).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("system message {} push dispatch failed: {}", message.id, e);
                DispatchSummary::default()
            },
        };

    Ok(HttpResponse::Created().json(PostResponse {
        message: MessageBody::from(message),
        push_notification: PushNotificationBody::from(summary),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub id: String,
    pub text: String,
    pub timestamp: String,
}

impl From<SystemMessage> for MessageBody {
    fn from(message: SystemMessage) -> Self {
        MessageBody {
            id: message.id.to_string(),
            text: message.text,
            timestamp: message.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub messages: Vec<MessageBody>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PushNotificationBody {
    #[serde(rename = "sentCount")]
    pub sent_count: i64,
    #[serde(rename = "failedCount")]
    pub failed_count: i64,
    #[serde(rename = "totalSubscriptions")]
    pub total_subscriptions: i64,
}

impl From<DispatchSummary> for PushNotificationBody {
    fn from(summary: DispatchSummary) -> Self {
        PushNotificationBody {
            sent_count: summary.sent,
            failed_count: summary.failed,
            total_subscriptions: summary.total,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub message: MessageBody,
    #[serde(rename = "pushNotification")]
    pub push_notification: PushNotificationBody,
}

#[cfg(test)]
mod tests {
    use actix_web::{test, web, App};
    use chrono::{TimeZone, Utc};

    use super::{post_index, MessageBody};
    use crate::{configuration::test_state, model::SystemMessage};

    #[actix_web::test]
    async fn wrong_admin_token_is_rejected_before_insert() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state("letmein")))
                .service(post_index),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/messages")
            .insert_header(("x-admin-token", "guess"))
            .set_json(serde_json::json!({ "text": "Отключение воды" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 403);
    }

    #[actix_web::test]
    async fn missing_admin_token_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state("letmein")))
                .service(post_index),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/messages")
            .set_json(serde_json::json!({ "text": "Отключение воды" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 403);
    }

    #[actix_web::test]
    async fn bad_token_with_blank_text_reports_authorization_first() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state("letmein")))
                .service(post_index),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/messages")
            .insert_header(("x-admin-token", "guess"))
            .set_json(serde_json::json!({ "text": "  " }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 403);
    }

    #[actix_web::test]
    async fn blank_text_is_rejected_after_authorization() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state("letmein")))
                .service(post_index),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/messages")
            .insert_header(("x-admin-token", "letmein"))
            .set_json(serde_json::json!({ "text": "  " }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Message text is required");
    }

    #[actix_web::test]
    async fn message_body_uses_string_id_and_rfc3339_timestamp() {
        let created_at = Utc.with_ymd_and_hms(2025, 3, 8, 12, 30, 0).unwrap();
        let body = MessageBody::from(SystemMessage {
            id: 42,
            text: String::from("Ярмарка в клубе"),
            created_at,
        });

        assert_eq!(body.id, "42");
        assert_eq!(body.text, "Ярмарка в клубе");
        assert_eq!(body.timestamp, "2025-03-08T12:30:00+00:00");
    }
}

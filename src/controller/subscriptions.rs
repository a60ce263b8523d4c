use crate::{
    configuration::{AppState, State},
    error::Error,
    model::{Channel, NewSubscription},
    types,
};
use actix_web::{delete, post, web, HttpRequest, HttpResponse, Result};
use serde::{Deserialize, Serialize};

#[post("/subscriptions")]
pub async fn post_index(
    state: web::Data<AppState<State>>,
    data: web::Json<SubscribeRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    let user_id = data.user_id.as_deref().map(str::trim).unwrap_or_default();
    let subscription = match &data.subscription {
        Some(subscription) if !user_id.is_empty() => subscription,
        _ => {
            return Err(Error::Validation(String::from(
                "userId and subscription are required",
            )));
        },
    };

    let endpoint = subscription.endpoint.trim();
    let keys = &subscription.keys;
    if endpoint.is_empty() || keys.p256dh.is_empty() || keys.auth.is_empty() {
        return Err(Error::Validation(String::from(
            "Invalid subscription data",
        )));
    }

    let user_agent = if let Some(item) = req.headers().get("user-agent") {
        Some(item.to_str()?.to_string())
    } else {
        None
    };

    let subscription = NewSubscription {
        channel: Channel::WebPush,
        sub_key: endpoint.to_owned(),
        owner_id: Some(user_id.to_owned()),
        p256dh: Some(keys.p256dh.to_owned()),
        auth: Some(keys.auth.to_owned()),
        owner_info: serde_json::json!({}),
        user_agent,
    };

    let id = state.database.subscription.upsert(subscription).await?;

    Ok(HttpResponse::Ok().json(SubscribeResponse {
        success: true,
        subscription_id: id.to_string(),
    }))
}

#[delete("/subscriptions")]
pub async fn delete_index(
    state: web::Data<AppState<State>>,
    data: web::Json<UnsubscribeRequest>,
) -> Result<HttpResponse, Error> {
    let user_id = data.user_id.as_deref().map(str::trim).unwrap_or_default();
    if user_id.is_empty() {
        return Err(Error::Validation(String::from("userId is required")));
    }

    let result = state
        .database
        .subscription
        .deactivate_by_owner(Channel::WebPush, user_id.to_owned())
        .await?;

    Ok(HttpResponse::Ok().json(UnsubscribeResponse {
        success: true,
        unsubscribed_count: result.rows_affected(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
    pub subscription: Option<types::Subscription>,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub success: bool,
    #[serde(rename = "subscriptionId")]
    pub subscription_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnsubscribeResponse {
    pub success: bool,
    #[serde(rename = "unsubscribedCount")]
    pub unsubscribed_count: u64,
}

#[cfg(test)]
mod tests {
    use actix_web::{test, web, App};

    use super::{post_index, SubscribeRequest};
    use crate::configuration::test_state;

    fn browser_body(user_id: &str, endpoint: &str) -> serde_json::Value {
        serde_json::json!({
            "userId": user_id,
            "subscription": {
                "endpoint": endpoint,
                "expirationTime": null,
                "keys": {
                    "p256dh": "BPnW6yvd0jqT4R5cVnN0",
                    "auth": "5S1lT4cOPI6bHyWvYw"
                }
            }
        })
    }

    #[actix_web::test]
    async fn blank_user_id_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state("secret")))
                .service(post_index),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/subscriptions")
            .set_json(browser_body(" ", "https://push.example/send/1"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn missing_subscription_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state("secret")))
                .service(post_index),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/subscriptions")
            .set_json(serde_json::json!({ "userId": "user-1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "userId and subscription are required");
    }

    #[actix_web::test]
    async fn empty_endpoint_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state("secret")))
                .service(post_index),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/subscriptions")
            .set_json(browser_body("user-1", ""))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid subscription data");
    }

    #[actix_web::test]
    async fn browser_subscription_json_parses() {
        let request: SubscribeRequest =
            serde_json::from_value(browser_body("user-1", "https://push.example/send/1"))
                .expect("browser body should parse");

        assert_eq!(request.user_id.as_deref(), Some("user-1"));
        let subscription = request.subscription.expect("subscription should be present");
        assert_eq!(subscription.endpoint, "https://push.example/send/1");
        assert_eq!(subscription.expiration_time, None);
        assert_eq!(subscription.keys.p256dh, "BPnW6yvd0jqT4R5cVnN0");
        assert_eq!(subscription.keys.auth, "5S1lT4cOPI6bHyWvYw");
    }
}

use crate::{
    configuration::{AppState, State},
    error::Error,
    model::{Channel, NewSubscription},
};
use actix_web::{get, post, web, HttpRequest, HttpResponse, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[post("/subscribers")]
pub async fn post_index(
    state: web::Data<AppState<State>>,
    data: web::Json<SubscribeRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    let push_token = data.push_token.as_deref().map(str::trim).unwrap_or_default();
    if push_token.is_empty() {
        return Err(Error::Validation(String::from("Push token is required")));
    }

    let user_agent = if let Some(item) = req.headers().get("user-agent") {
        Some(item.to_str()?.to_string())
    } else {
        None
    };

    let subscription = NewSubscription {
        channel: Channel::Token,
        sub_key: push_token.to_owned(),
        owner_id: None,
        p256dh: None,
        auth: None,
        owner_info: data
            .user_info
            .clone()
            .unwrap_or_else(|| serde_json::json!({})),
        user_agent,
    };

    let id = state.database.subscription.upsert(subscription).await?;

    Ok(HttpResponse::Ok().json(SubscribeResponse {
        success: true,
        subscriber_id: id.to_string(),
    }))
}

#[get("/subscribers")]
pub async fn get_index(
    state: web::Data<AppState<State>>,
) -> Result<HttpResponse, Error> {
    let (total, active) =
        state.database.subscription.stats(Channel::Token).await?;

    Ok(HttpResponse::Ok().json(StatsResponse {
        total_subscribers: total,
        active_subscribers: active,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(alias = "pushToken")]
    pub push_token: Option<String>,
    #[serde(alias = "userInfo")]
    pub user_info: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub success: bool,
    #[serde(rename = "subscriberId")]
    pub subscriber_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(rename = "totalSubscribers")]
    pub total_subscribers: i64,
    #[serde(rename = "activeSubscribers")]
    pub active_subscribers: i64,
}

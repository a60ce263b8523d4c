use std::{fmt, io, str::FromStr};

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;

/// Delivery channel a row belongs to. Token rows carry an opaque client
/// token and are never pushed to; web-push rows carry endpoint plus keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Token,
    WebPush,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Channel::Token => write!(f, "token"),
            Channel::WebPush => write!(f, "web-push"),
        }
    }
}

impl FromStr for Channel {
    type Err = io::Error;

    fn from_str(value: &str) -> Result<Channel, Self::Err> {
        match value {
            "token" => Ok(Channel::Token),
            "web-push" => Ok(Channel::WebPush),
            _ => Err(io::Error::other("Channel not supported")),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub channel: String,
    pub sub_key: String,
    pub owner_id: Option<String>,
    pub p256dh: Option<String>,
    pub auth: Option<String>,
    pub owner_info: Value,
    pub user_agent: Option<String>,
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,
    pub last_notification_at: Option<DateTime<Utc>>,
}

/// Insert payload. The database assigns id, activity flag and timestamps.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub channel: Channel,
    pub sub_key: String,
    pub owner_id: Option<String>,
    pub p256dh: Option<String>,
    pub auth: Option<String>,
    pub owner_info: Value,
    pub user_agent: Option<String>,
}

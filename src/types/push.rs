//! Push notification types
//!
//! Types for Web Push delivery: payload body, protocol headers and VAPID
//! claims.

use serde::{Deserialize, Serialize};
use std::{fmt, io, str::FromStr};

#[derive(Debug, Clone)]
pub struct PushHeader {
    pub ttl: i64,
    pub urgency: Urgency,
}

/// Notification body the service worker renders. Serialized as the encrypted
/// push message payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub url: String,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Urgency {
    VeryLow,
    Low,
    Normal,
    High,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Urgency::VeryLow => write!(f, "very-low"),
            Urgency::Low => write!(f, "low"),
            Urgency::Normal => write!(f, "normal"),
            Urgency::High => write!(f, "high"),
        }
    }
}

impl FromStr for Urgency {
    type Err = io::Error;

    fn from_str(value: &str) -> Result<Urgency, Self::Err> {
        match value {
            "very-low" => Ok(Urgency::VeryLow),
            "low" => Ok(Urgency::Low),
            "normal" => Ok(Urgency::Normal),
            "high" => Ok(Urgency::High),
            _ => Err(io::Error::other("Urgency not supported")),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub aud: String,
    pub sub: String,
    pub exp: i64,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{Claims, PushPayload, Urgency};

    #[test]
    fn urgency_survives_wire_round_trip() {
        let variants = [
            Urgency::VeryLow,
            Urgency::Low,
            Urgency::Normal,
            Urgency::High,
        ];

        for urgency in variants {
            let parsed = Urgency::from_str(&urgency.to_string())
                .expect("known urgency should parse");
            assert_eq!(parsed, urgency);
        }

        assert!(Urgency::from_str("immediate").is_err());
    }

    #[test]
    fn payload_serializes_notification_fields() {
        let payload = PushPayload {
            title: String::from("Горхон.Online"),
            body: String::from("Объявление"),
            icon: String::from("/icons/icon-192.png"),
            url: String::from("/"),
            tag: String::from("system-message"),
        };

        let value = serde_json::to_value(&payload).expect("payload to json");
        assert_eq!(value["title"], "Горхон.Online");
        assert_eq!(value["body"], "Объявление");
        assert_eq!(value["icon"], "/icons/icon-192.png");
        assert_eq!(value["url"], "/");
        assert_eq!(value["tag"], "system-message");
    }

    #[test]
    fn claims_keep_registered_names() {
        let claims = Claims {
            aud: String::from("https://push.example"),
            sub: String::from("mailto:admin@example.org"),
            exp: 1_700_000_000,
        };

        let value = serde_json::to_value(&claims).expect("claims to json");
        assert_eq!(value["aud"], "https://push.example");
        assert_eq!(value["sub"], "mailto:admin@example.org");
        assert_eq!(value["exp"], 1_700_000_000_i64);
    }
}

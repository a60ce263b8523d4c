use serde::Deserialize;

/// Browser `PushSubscription` as serialized by `subscription.toJSON()`.
/// Fields default to empty so half-formed payloads reach handler
/// validation instead of dying in the JSON extractor.
#[derive(Debug, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub endpoint: String,
    #[serde(alias = "expirationTime")]
    pub expiration_time: Option<i64>,
    #[serde(default)]
    pub keys: Keys,
}

#[derive(Debug, Default, Deserialize)]
pub struct Keys {
    #[serde(default)]
    pub p256dh: String,
    #[serde(default)]
    pub auth: String,
}

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use chrono::Local;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Url;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::{
    configuration::{AppState, Config, State},
    error::Error,
    model::{Channel, Subscription},
    provider::HTTP,
    types::{Claims, PushHeader, PushPayload, Urgency},
};

pub const BROADCAST_TITLE: &str = "Горхон.Online";
pub const BROADCAST_ICON: &str = "/icons/icon-192.png";
pub const BROADCAST_URL: &str = "/";
pub const BROADCAST_TAG: &str = "system-message";

/// Delivers one encrypted message to one subscription and reports the
/// gateway status code.
#[async_trait]
pub trait PushSender: Send + Sync + fmt::Debug {
    async fn send(
        &self,
        subscription: &Subscription,
        push_header: &PushHeader,
        payload: &PushPayload,
    ) -> Result<u16, Error>;
}

/// VAPID-signed Web Push over the shared HTTP client.
#[derive(Debug)]
pub struct WebPushSender {
    config: Config,
    http: HTTP,
}

impl WebPushSender {
    pub fn new(config: Config, http: HTTP) -> WebPushSender {
        WebPushSender { config, http }
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    async fn send(
        &self,
        subscription: &Subscription,
        push_header: &PushHeader,
        payload: &PushPayload,
    ) -> Result<u16, Error> {
        let url = Url::parse(&subscription.sub_key)?;
        let exp = Local::now().timestamp_millis() / 1000 + push_header.ttl;

        let scheme = url.scheme();
        let host = if let Some(h) = url.host() {
            h.to_string()
        } else {
            return Err(Error::InvalidOption {
                option: String::from("host"),
            });
        };

        let aud = format!("{}://{}", scheme, host);
        let sub = format!("mailto:{}", &self.config.contact_email);

        let key = EncodingKey::from_ec_pem(&self.config.vapid_private_key)?;
        let claims = Claims { aud, sub, exp };
        let token = encode(&Header::new(Algorithm::ES256), &claims, &key)?;

        let p256dh = subscription.p256dh.as_deref().ok_or(Error::InvalidOption {
            option: String::from("p256dh"),
        })?;
        let auth = subscription.auth.as_deref().ok_or(Error::InvalidOption {
            option: String::from("auth"),
        })?;

        let p256dh = BASE64_URL.decode(p256dh)?;
        let auth = BASE64_URL.decode(auth)?;

        let data = ece::encrypt(&p256dh, &auth, &serde_json::to_vec(payload)?)?;

        self.http
            .post_push(
                subscription.sub_key.to_owned(),
                token,
                push_header.clone(),
                data,
            )
            .await
    }
}

/// Disposition of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Delivered(u16),
    Gone(u16),
    Retryable(String),
}

pub fn classify(result: Result<u16, Error>, gone_status_codes: &[u16]) -> Outcome {
    match result {
        Ok(status) if (200..300).contains(&status) => Outcome::Delivered(status),
        Ok(status) if gone_status_codes.contains(&status) => Outcome::Gone(status),
        Ok(status) => Outcome::Retryable(format!("push gateway returned {}", status)),
        Err(e) => Outcome::Retryable(e.to_string()),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: i64,
    pub failed: i64,
    pub total: i64,
}

impl DispatchSummary {
    pub fn from_outcomes<'a, I>(outcomes: I) -> DispatchSummary
    where
        I: IntoIterator<Item = &'a Outcome>,
    {
        let mut summary = DispatchSummary::default();

        for outcome in outcomes {
            summary.total += 1;
            match outcome {
                Outcome::Delivered(_) => summary.sent += 1,
                Outcome::Gone(_) | Outcome::Retryable(_) => summary.failed += 1,
            }
        }

        summary
    }
}

/// Fans one payload out to every given subscription, one spawned task per
/// row with concurrency capped by the semaphore, and pairs each row id with
/// its disposition. A panicking task is reported as retryable and never
/// takes the batch down.
pub async fn collect_outcomes(
    sender: Arc<dyn PushSender>,
    subscriptions: Vec<Subscription>,
    push_header: PushHeader,
    payload: PushPayload,
    gone_status_codes: Vec<u16>,
    permits: Arc<Semaphore>,
) -> Vec<(i64, Outcome)> {
    let payload = Arc::new(payload);
    let gone_status_codes = Arc::new(gone_status_codes);

    let mut handles = Vec::with_capacity(subscriptions.len());
    for subscription in subscriptions {
        let sender = sender.clone();
        let permits = permits.clone();
        let payload = payload.clone();
        let gone_status_codes = gone_status_codes.clone();
        let push_header = push_header.clone();
        let id = subscription.id;

        let handle = tokio::spawn(async move {
            let _permit = match permits.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!("Push notification semaphore closed");
                    return Outcome::Retryable(String::from(
                        "push semaphore closed",
                    ));
                },
            };
            let result = sender.send(&subscription, &push_header, &payload).await;
            classify(result, &gone_status_codes)
        });
        handles.push((id, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (id, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Retryable(format!("push task aborted: {}", e)),
        };
        outcomes.push((id, outcome));
    }

    outcomes
}

/// Sends `payload` to every active subscription on `channel` and applies
/// per-row bookkeeping: delivered rows get their notification timestamp
/// touched, gone rows are deactivated, transient failures stay active for
/// the next broadcast. Only an unreachable store fails the call; bookkeeping
/// errors are logged and the counters still reflect the dispositions.
pub async fn dispatch(
    state: &AppState<State>,
    channel: Channel,
    payload: &PushPayload,
) -> Result<DispatchSummary, Error> {
    let items = state.database.subscription.get_active(channel).await?;

    let push_header = PushHeader {
        ttl: 24 * 60 * 60,
        urgency: Urgency::High,
    };

    let outcomes = collect_outcomes(
        state.push_sender.clone(),
        items,
        push_header,
        payload.clone(),
        state.config.gone_status_codes.clone(),
        state.push_permits.clone(),
    )
    .await;

    let summary =
        DispatchSummary::from_outcomes(outcomes.iter().map(|(_, outcome)| outcome));

    for (id, outcome) in &outcomes {
        match outcome {
            Outcome::Delivered(_) => {
                if let Err(e) =
                    state.database.subscription.touch_notified(*id).await
                {
                    warn!("subscription {} notified-at update failed: {}", id, e);
                }
            },
            Outcome::Gone(status) => {
                info!("subscription {} gone ({}), deactivating", id, status);
                if let Err(e) = state.database.subscription.deactivate(*id).await
                {
                    warn!("subscription {} deactivate failed: {}", id, e);
                }
            },
            Outcome::Retryable(reason) => {
                warn!("subscription {} push failed: {}", id, reason);
            },
        }
    }

    Ok(summary)
}

pub fn broadcast_payload(text: &str) -> PushPayload {
    PushPayload {
        title: String::from(BROADCAST_TITLE),
        body: text.to_owned(),
        icon: String::from(BROADCAST_ICON),
        url: String::from(BROADCAST_URL),
        tag: String::from(BROADCAST_TAG),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Semaphore;

    use super::{
        broadcast_payload, classify, collect_outcomes, DispatchSummary,
        Outcome, PushSender,
    };
    use crate::{
        error::Error,
        model::Subscription,
        types::{PushHeader, PushPayload, Urgency},
    };

    fn subscription(id: i64) -> Subscription {
        Subscription {
            id,
            channel: String::from("web-push"),
            sub_key: format!("https://push.example/send/{}", id),
            owner_id: Some(format!("user-{}", id)),
            p256dh: Some(String::from("BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA_0QTpQtUbVlUls0VJXg7A8u-Ts1XbjhazAkj7I99e8QcYP7DkM")),
            auth: Some(String::from("tBHItJI5svbpez7KI4CCXg")),
            owner_info: serde_json::json!({}),
            user_agent: None,
            is_active: true,
            subscribed_at: Utc::now(),
            last_notification_at: None,
        }
    }

    fn push_header() -> PushHeader {
        PushHeader {
            ttl: 60,
            urgency: Urgency::High,
        }
    }

    fn payload() -> PushPayload {
        broadcast_payload("Отключение электроэнергии с 10:00 до 14:00")
    }

    #[derive(Debug, Default)]
    struct ScriptedSender {
        gone_ids: Vec<i64>,
        error_ids: Vec<i64>,
    }

    #[async_trait]
    impl PushSender for ScriptedSender {
        async fn send(
            &self,
            subscription: &Subscription,
            _push_header: &PushHeader,
            _payload: &PushPayload,
        ) -> Result<u16, Error> {
            if self.error_ids.contains(&subscription.id) {
                return Err(Error::InvalidOption {
                    option: String::from("endpoint"),
                });
            }
            if self.gone_ids.contains(&subscription.id) {
                return Ok(410);
            }
            Ok(201)
        }
    }

    #[test]
    fn classify_splits_status_families() {
        let gone = vec![404, 410];

        assert_eq!(classify(Ok(200), &gone), Outcome::Delivered(200));
        assert_eq!(classify(Ok(201), &gone), Outcome::Delivered(201));
        assert_eq!(classify(Ok(404), &gone), Outcome::Gone(404));
        assert_eq!(classify(Ok(410), &gone), Outcome::Gone(410));

        assert!(matches!(classify(Ok(500), &gone), Outcome::Retryable(_)));
        assert!(matches!(classify(Ok(429), &gone), Outcome::Retryable(_)));

        let error = Error::InvalidOption {
            option: String::from("host"),
        };
        assert!(matches!(classify(Err(error), &gone), Outcome::Retryable(_)));
    }

    #[tokio::test]
    async fn fan_out_counts_match_dispositions() {
        let sender = ScriptedSender {
            gone_ids: vec![2, 4],
            error_ids: vec![5],
        };
        let subscriptions = (1..=5).map(subscription).collect();

        let outcomes = collect_outcomes(
            Arc::new(sender),
            subscriptions,
            push_header(),
            payload(),
            vec![404, 410],
            Arc::new(Semaphore::new(8)),
        )
        .await;

        let summary = DispatchSummary::from_outcomes(
            outcomes.iter().map(|(_, outcome)| outcome),
        );
        assert_eq!(summary.total, 5);
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.sent + summary.failed, summary.total);

        let gone_ids: Vec<i64> = outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, Outcome::Gone(_)))
            .map(|(id, _)| *id)
            .collect();
        assert_eq!(gone_ids, vec![2, 4]);
    }

    #[tokio::test]
    async fn semaphore_caps_concurrent_sends() {
        #[derive(Debug, Default)]
        struct GaugeSender {
            active: AtomicUsize,
            peak: AtomicUsize,
        }

        #[async_trait]
        impl PushSender for GaugeSender {
            async fn send(
                &self,
                _subscription: &Subscription,
                _push_header: &PushHeader,
                _payload: &PushPayload,
            ) -> Result<u16, Error> {
                let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(running, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.active.fetch_sub(1, Ordering::SeqCst);
                Ok(201)
            }
        }

        let sender = Arc::new(GaugeSender::default());
        let subscriptions = (1..=8).map(subscription).collect();

        let outcomes = collect_outcomes(
            sender.clone(),
            subscriptions,
            push_header(),
            payload(),
            vec![404, 410],
            Arc::new(Semaphore::new(2)),
        )
        .await;

        assert_eq!(outcomes.len(), 8);
        assert!(
            sender.peak.load(Ordering::SeqCst) <= 2,
            "more than 2 sends ran at once"
        );
    }

    #[tokio::test]
    async fn panicking_send_does_not_abort_the_batch() {
        #[derive(Debug)]
        struct PanickySender;

        #[async_trait]
        impl PushSender for PanickySender {
            async fn send(
                &self,
                subscription: &Subscription,
                _push_header: &PushHeader,
                _payload: &PushPayload,
            ) -> Result<u16, Error> {
                if subscription.id == 3 {
                    panic!("poisoned row");
                }
                Ok(201)
            }
        }

        let subscriptions = (1..=4).map(subscription).collect();
        let outcomes = collect_outcomes(
            Arc::new(PanickySender),
            subscriptions,
            push_header(),
            payload(),
            vec![404, 410],
            Arc::new(Semaphore::new(8)),
        )
        .await;

        assert_eq!(outcomes.len(), 4);

        let summary = DispatchSummary::from_outcomes(
            outcomes.iter().map(|(_, outcome)| outcome),
        );
        assert_eq!(summary.sent, 3);
        assert_eq!(summary.failed, 1);

        let (id, outcome) = outcomes
            .iter()
            .find(|(_, outcome)| matches!(outcome, Outcome::Retryable(_)))
            .expect("panicked row should be retryable");
        assert_eq!(*id, 3);
        assert!(matches!(outcome, Outcome::Retryable(_)));
    }

    #[test]
    fn empty_batch_yields_zero_summary() {
        let summary =
            DispatchSummary::from_outcomes(std::iter::empty::<&Outcome>());
        assert_eq!(summary, DispatchSummary::default());
    }

    #[test]
    fn broadcast_payload_carries_site_branding() {
        let payload = broadcast_payload("Ярмарка в субботу");

        assert_eq!(payload.title, "Горхон.Online");
        assert_eq!(payload.body, "Ярмарка в субботу");
        assert_eq!(payload.icon, "/icons/icon-192.png");
        assert_eq!(payload.url, "/");
        assert_eq!(payload.tag, "system-message");
    }
}

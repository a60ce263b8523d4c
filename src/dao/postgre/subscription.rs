use super::QueryResult;
use crate::model::{Channel, NewSubscription, Subscription, Table};
use sqlx::error::Error;

impl Table<Subscription> {
    /// Inserts or refreshes a row keyed by (channel, sub_key). Resubscribing
    /// reactivates and restamps the row instead of duplicating it.
    pub async fn upsert(
        &self,
        subscription: NewSubscription,
    ) -> Result<i64, Error> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO subscription (channel, sub_key, owner_id, p256dh, auth, owner_info, user_agent)
            VALUES($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (channel, sub_key) DO UPDATE SET
                owner_id = EXCLUDED.owner_id,
                p256dh = EXCLUDED.p256dh,
                auth = EXCLUDED.auth,
                owner_info = EXCLUDED.owner_info,
                user_agent = EXCLUDED.user_agent,
                is_active = true,
                subscribed_at = NOW()
            RETURNING id
            "#,
        )
        .bind(subscription.channel.to_string())
        .bind(&subscription.sub_key)
        .bind(&subscription.owner_id)
        .bind(&subscription.p256dh)
        .bind(&subscription.auth)
        .bind(&subscription.owner_info)
        .bind(&subscription.user_agent)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn get_active(
        &self,
        channel: Channel,
    ) -> Result<Vec<Subscription>, Error> {
        let data = sqlx::query_as(
            r#"
            SELECT * FROM subscription WHERE is_active = true AND channel=$1
            "#,
        )
        .bind(channel.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(data)
    }

    pub async fn deactivate(&self, id: i64) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            UPDATE subscription SET is_active = false WHERE id=$1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
    }

    pub async fn deactivate_by_owner(
        &self,
        channel: Channel,
        owner_id: String,
    ) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            UPDATE subscription SET is_active = false WHERE channel=$1 AND owner_id=$2 AND is_active = true
            "#,
        )
        .bind(channel.to_string())
        .bind(owner_id)
        .execute(&self.pool)
        .await
    }

    pub async fn touch_notified(&self, id: i64) -> Result<QueryResult, Error> {
        sqlx::query(
            r#"
            UPDATE subscription SET last_notification_at = NOW() WHERE id=$1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
    }

    /// Returns (total, active) for one channel.
    pub async fn stats(&self, channel: Channel) -> Result<(i64, i64), Error> {
        sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE is_active)
            FROM "subscription"
            WHERE
                channel=$1
            "#,
        )
        .bind(channel.to_string())
        .persistent(true)
        .fetch_one(&self.pool)
        .await
    }
}

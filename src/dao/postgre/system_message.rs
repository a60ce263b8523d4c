use crate::model::{SystemMessage, Table};
use sqlx::error::Error;

impl Table<SystemMessage> {
    pub async fn insert(&self, text: String) -> Result<SystemMessage, Error> {
        sqlx::query_as(
            r#"
            INSERT INTO system_message (text)
            VALUES($1)
            RETURNING id, text, created_at
            "#,
        )
        .bind(text)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_all(&self) -> Result<Vec<SystemMessage>, Error> {
        let data = sqlx::query_as(
            r#"
            SELECT * FROM system_message ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(data)
    }
}

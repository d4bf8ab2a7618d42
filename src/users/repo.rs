use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::DietError;

/// Maps the opaque customer identifier carried by tokens to the internal idx.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn resolve(&self, customer_id: &str) -> Result<i64, DietError>;
}

#[derive(Clone)]
pub struct PgUserDirectory {
    db: PgPool,
}

impl PgUserDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn resolve(&self, customer_id: &str) -> Result<i64, DietError> {
        let idx = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT idx
              FROM customers
             WHERE id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.db)
        .await?;

        idx.ok_or(DietError::UserNotFound)
    }
}

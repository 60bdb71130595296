//! Donation repository

use crate::db::DynDatabasePool;
use crate::models::Donation;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait DonationRepository: Send + Sync {
    async fn create(&self, donation: &Donation) -> Result<Donation>;

    /// Newest first
    async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<Donation>, i64)>;

    /// Sum of all recorded amounts in cents
    async fn total_cents(&self) -> Result<i64>;
}

pub struct SqlxDonationRepository {
    pool: DynDatabasePool,
}

impl SqlxDonationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn DonationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl DonationRepository for SqlxDonationRepository {
    async fn create(&self, donation: &Donation) -> Result<Donation> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO donations (donor_name, email, amount_cents, message, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&donation.donor_name)
        .bind(&donation.email)
        .bind(donation.amount_cents)
        .bind(&donation.message)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to record donation")?;

        Ok(Donation {
            id: result.last_insert_rowid(),
            created_at: now,
            ..donation.clone()
        })
    }

    async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<Donation>, i64)> {
        let per_page = per_page.clamp(1, 100);
        let offset = (page.max(1) - 1) * per_page;

        let rows = sqlx::query(
            "SELECT id, donor_name, email, amount_cents, message, created_at
             FROM donations ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(per_page)
        .bind(offset)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list donations")?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM donations")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count donations")?;

        let donations = rows
            .into_iter()
            .map(|r| Donation {
                id: r.get("id"),
                donor_name: r.get("donor_name"),
                email: r.get("email"),
                amount_cents: r.get("amount_cents"),
                message: r.get("message"),
                created_at: r.get("created_at"),
            })
            .collect();
        Ok((donations, total))
    }

    async fn total_cents(&self) -> Result<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(amount_cents), 0) FROM donations")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to sum donations")?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    fn donation(cents: i64) -> Donation {
        Donation {
            id: 0,
            donor_name: Some("Friend".into()),
            email: None,
            amount_cents: cents,
            message: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_total_starts_at_zero_and_sums() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxDonationRepository::boxed(pool);

        assert_eq!(repo.total_cents().await.unwrap(), 0);
        repo.create(&donation(2500)).await.unwrap();
        repo.create(&donation(1050)).await.unwrap();
        assert_eq!(repo.total_cents().await.unwrap(), 3550);

        let (items, total) = repo.list(1, 1).await.unwrap();
        assert_eq!((items.len(), total), (1, 2));
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected_by_schema() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxDonationRepository::boxed(pool);

        assert!(repo.create(&donation(0)).await.is_err());
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::db::{CardCatalog, RecommendationStore, SpendingStore};
use crate::error::AppResult;
use crate::models::{
    BenefitRule, Card, Category, NewRecommendation, RecommendationRecord, SpendingRecord,
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Spending history backed by the `user_spending` table.
#[derive(Clone)]
pub struct PgSpendingStore {
    pool: PgPool,
}

impl PgSpendingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SpendingStore for PgSpendingStore {
    async fn list_by_user(&self, user_id: i64) -> AppResult<Vec<SpendingRecord>> {
        let records = sqlx::query_as::<_, SpendingRecord>(
            "SELECT id, user_id, category_id, amount, month, year \
             FROM user_spending \
             WHERE user_id = $1 \
             ORDER BY year, month, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

/// Card catalog backed by the `credit_cards`, `card_benefits` and
/// `categories` tables.
#[derive(Clone)]
pub struct PgCardCatalog {
    pool: PgPool,
}

impl PgCardCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CardCatalog for PgCardCatalog {
    async fn list_active_cards(&self) -> AppResult<Vec<Card>> {
        let mut cards = sqlx::query_as::<_, Card>(
            "SELECT id, name, bank, annual_fee, is_active \
             FROM credit_cards \
             WHERE is_active \
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let rules = sqlx::query_as::<_, BenefitRule>(
            "SELECT b.id, b.card_id, b.category_id, b.cashback_rate, b.points_rate, \
                    b.miles_rate, b.cap, b.min_spend \
             FROM card_benefits b \
             JOIN credit_cards c ON c.id = b.card_id \
             WHERE c.is_active \
             ORDER BY b.card_id, b.id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_card: HashMap<i64, Vec<BenefitRule>> = HashMap::new();
        for rule in rules {
            by_card.entry(rule.card_id).or_default().push(rule);
        }
        for card in &mut cards {
            if let Some(benefits) = by_card.remove(&card.id) {
                card.benefits = benefits;
            }
        }

        Ok(cards)
    }

    async fn get_category(&self, id: i64) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }
}

/// Recommendation persistence backed by the `recommendations` table.
#[derive(Clone)]
pub struct PgRecommendationStore {
    pool: PgPool,
}

impl PgRecommendationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const LIST_COLUMNS: &str = "r.id, r.user_id, r.score, r.estimated_reward, r.reason, r.created_at, \
     r.card_id, c.name AS card_name, c.bank, c.annual_fee, \
     r.category_id, cat.name AS category_name, cat.description AS category_description";

#[async_trait]
impl RecommendationStore for PgRecommendationStore {
    async fn replace_for_user(
        &self,
        user_id: i64,
        recommendations: &[NewRecommendation],
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM recommendations WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for rec in recommendations {
            sqlx::query(
                "INSERT INTO recommendations \
                     (user_id, category_id, card_id, score, estimated_reward, reason) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(rec.user_id)
            .bind(rec.category_id)
            .bind(rec.card_id)
            .bind(rec.score)
            .bind(rec.estimated_reward)
            .bind(&rec.reason)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_by_user(&self, user_id: i64) -> AppResult<Vec<RecommendationRecord>> {
        let records = sqlx::query_as::<_, RecommendationRecord>(&format!(
            "SELECT {LIST_COLUMNS} \
             FROM recommendations r \
             JOIN credit_cards c ON c.id = r.card_id \
             JOIN categories cat ON cat.id = r.category_id \
             WHERE r.user_id = $1 \
             ORDER BY r.score DESC, c.annual_fee, r.card_id, r.category_id",
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn list_by_user_and_category(
        &self,
        user_id: i64,
        category_id: i64,
    ) -> AppResult<Vec<RecommendationRecord>> {
        let records = sqlx::query_as::<_, RecommendationRecord>(&format!(
            "SELECT {LIST_COLUMNS} \
             FROM recommendations r \
             JOIN credit_cards c ON c.id = r.card_id \
             JOIN categories cat ON cat.id = r.category_id \
             WHERE r.user_id = $1 AND r.category_id = $2 \
             ORDER BY r.score DESC, c.annual_fee, r.card_id, r.category_id",
        ))
        .bind(user_id)
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

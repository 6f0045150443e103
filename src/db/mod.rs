pub mod postgres;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{Card, Category, NewRecommendation, RecommendationRecord, SpendingRecord};

/// Read access to a user's categorized spending history.
///
/// An unknown user is not an error; it simply has no rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpendingStore: Send + Sync {
    async fn list_by_user(&self, user_id: i64) -> AppResult<Vec<SpendingRecord>>;
}

/// Read access to the card catalog and category lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardCatalog: Send + Sync {
    /// Active cards with their benefit rules embedded.
    async fn list_active_cards(&self) -> AppResult<Vec<Card>>;

    async fn get_category(&self, id: i64) -> AppResult<Option<Category>>;
}

/// Persistence for generated recommendation sets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Atomically replaces the user's entire recommendation set: the
    /// delete and every insert commit together or nothing changes.
    async fn replace_for_user(
        &self,
        user_id: i64,
        recommendations: &[NewRecommendation],
    ) -> AppResult<()>;

    async fn list_by_user(&self, user_id: i64) -> AppResult<Vec<RecommendationRecord>>;

    async fn list_by_user_and_category(
        &self,
        user_id: i64,
        category_id: i64,
    ) -> AppResult<Vec<RecommendationRecord>>;
}

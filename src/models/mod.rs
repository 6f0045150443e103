use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A spending category (Dining, Groceries, Travel, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Reward policy for one (card, category) pair.
///
/// Rates are non-negative percentages. `cap = 0` means spend credit is
/// uncapped and `min_spend = 0` means there is no qualifying floor. A card
/// carries at most one rule per category by convention, though nothing
/// enforces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BenefitRule {
    pub id: i64,
    pub card_id: i64,
    pub category_id: i64,
    pub cashback_rate: f64,
    pub points_rate: f64,
    pub miles_rate: f64,
    pub cap: f64,
    pub min_spend: f64,
}

/// A credit card from the catalog, with its benefit rules embedded when
/// loaded through the card catalog store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Card {
    pub id: i64,
    pub name: String,
    pub bank: String,
    pub annual_fee: f64,
    pub is_active: bool,
    #[serde(default)]
    #[sqlx(skip)]
    pub benefits: Vec<BenefitRule>,
}

/// One historical spending row for a user. Immutable once created;
/// multiple rows per user/category/month are allowed and summed by the
/// aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SpendingRecord {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub amount: f64,
    pub month: i32,
    pub year: i32,
}

/// A scored card suggestion for one spending category, produced by a
/// generation run before persistence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationCandidate {
    pub card: Card,
    pub category: Category,
    pub score: f64,
    pub estimated_reward: f64,
    pub reason: String,
}

impl RecommendationCandidate {
    /// Flattens the candidate into its persisted row shape.
    pub fn to_row(&self, user_id: i64) -> NewRecommendation {
        NewRecommendation {
            user_id,
            category_id: self.category.id,
            card_id: self.card.id,
            score: self.score,
            estimated_reward: self.estimated_reward,
            reason: self.reason.clone(),
        }
    }
}

/// Insert shape for one recommendation row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecommendation {
    pub user_id: i64,
    pub category_id: i64,
    pub card_id: i64,
    pub score: f64,
    pub estimated_reward: f64,
    pub reason: String,
}

/// A persisted recommendation row joined with its card and category
/// columns, as the recommendation store returns it.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RecommendationRecord {
    pub id: i64,
    pub user_id: i64,
    pub score: f64,
    pub estimated_reward: f64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub card_id: i64,
    pub card_name: String,
    pub bank: String,
    pub annual_fee: f64,
    pub category_id: i64,
    pub category_name: String,
    pub category_description: String,
}

/// Card fields denormalized into read responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSummary {
    pub id: i64,
    pub name: String,
    pub bank: String,
    pub annual_fee: f64,
}

impl From<&Card> for CardSummary {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id,
            name: card.name.clone(),
            bank: card.bank.clone(),
            annual_fee: card.annual_fee,
        }
    }
}

/// Response shape for persisted recommendations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationView {
    pub id: i64,
    pub card: CardSummary,
    pub category: Category,
    pub score: f64,
    pub estimated_reward: f64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl From<RecommendationRecord> for RecommendationView {
    fn from(record: RecommendationRecord) -> Self {
        Self {
            id: record.id,
            card: CardSummary {
                id: record.card_id,
                name: record.card_name,
                bank: record.bank,
                annual_fee: record.annual_fee,
            },
            category: Category {
                id: record.category_id,
                name: record.category_name,
                description: record.category_description,
            },
            score: record.score,
            estimated_reward: record.estimated_reward,
            reason: record.reason,
            created_at: record.created_at,
        }
    }
}

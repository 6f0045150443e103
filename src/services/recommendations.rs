use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::db::{CardCatalog, RecommendationStore, SpendingStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    Card, Category, NewRecommendation, RecommendationCandidate, RecommendationView,
};
use crate::services::aggregation::aggregate_spending;
use crate::services::locks::UserLocks;
use crate::services::rewards::calculate_reward;
use crate::services::scoring::{build_reason, calculate_score};

/// Maximum number of recommendations persisted and returned per user.
pub const MAX_RECOMMENDATIONS: usize = 10;

/// Read-only view of the catalog for one generation run.
///
/// Built from the stores before any scoring happens; candidate generation
/// is a pure function over this snapshot and the aggregated spend totals,
/// so the stores are only touched during load and the final replace.
pub struct CatalogSnapshot {
    pub cards: Vec<Card>,
    pub categories: HashMap<i64, Category>,
}

/// Orchestrates recommendation generation and reads over the three
/// collaborator stores.
pub struct RecommendationEngine {
    spending: Arc<dyn SpendingStore>,
    catalog: Arc<dyn CardCatalog>,
    recommendations: Arc<dyn RecommendationStore>,
    locks: UserLocks,
}

impl RecommendationEngine {
    pub fn new(
        spending: Arc<dyn SpendingStore>,
        catalog: Arc<dyn CardCatalog>,
        recommendations: Arc<dyn RecommendationStore>,
    ) -> Self {
        Self {
            spending,
            catalog,
            recommendations,
            locks: UserLocks::new(),
        }
    }

    /// Generates, persists, and returns the ranked recommendation set for
    /// one user.
    ///
    /// Load failures abort before any mutation. A failure inside the
    /// replace step rolls back and leaves the previously persisted set
    /// authoritative, so callers must not assume new scores were saved
    /// merely because the computation succeeded.
    pub async fn generate(&self, user_id: i64) -> AppResult<Vec<RecommendationCandidate>> {
        let start = Instant::now();

        let spendings = self
            .spending
            .list_by_user(user_id)
            .await
            .map_err(|e| AppError::Dependency(format!("failed to load user spending: {e}")))?;

        let cards = self
            .catalog
            .list_active_cards()
            .await
            .map_err(|e| AppError::Dependency(format!("failed to load active cards: {e}")))?;

        let totals = aggregate_spending(&spendings);
        let snapshot = self.build_snapshot(cards, &totals).await?;

        let mut candidates = build_candidates(&totals, &snapshot);
        rank_candidates(&mut candidates);
        candidates.truncate(MAX_RECOMMENDATIONS);

        let rows: Vec<NewRecommendation> =
            candidates.iter().map(|c| c.to_row(user_id)).collect();
        {
            let _guard = self.locks.acquire(user_id).await;
            self.recommendations
                .replace_for_user(user_id, &rows)
                .await
                .map_err(|e| {
                    AppError::Persistence(format!("failed to save recommendations: {e}"))
                })?;
        }

        tracing::info!(
            user_id,
            categories = totals.len(),
            saved = candidates.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "recommendations generated"
        );

        Ok(candidates)
    }

    /// Returns the persisted recommendation set, best-ranked first.
    /// An empty set is not an error.
    pub async fn get_existing(&self, user_id: i64) -> AppResult<Vec<RecommendationView>> {
        let records = self.recommendations.list_by_user(user_id).await?;
        Ok(records.into_iter().map(RecommendationView::from).collect())
    }

    /// Returns the persisted recommendations for one category only.
    pub async fn get_existing_for_category(
        &self,
        user_id: i64,
        category_id: i64,
    ) -> AppResult<Vec<RecommendationView>> {
        let records = self
            .recommendations
            .list_by_user_and_category(user_id, category_id)
            .await?;
        Ok(records.into_iter().map(RecommendationView::from).collect())
    }

    /// Resolves the categories that carry spend and pairs them with the
    /// active cards into the per-run snapshot. A spending row referencing
    /// a category the catalog no longer knows is skipped, not an error.
    async fn build_snapshot(
        &self,
        cards: Vec<Card>,
        totals: &HashMap<i64, f64>,
    ) -> AppResult<CatalogSnapshot> {
        let mut categories = HashMap::new();
        for &category_id in totals.keys() {
            let category = self.catalog.get_category(category_id).await.map_err(|e| {
                AppError::Dependency(format!("failed to load category {category_id}: {e}"))
            })?;

            match category {
                Some(category) => {
                    categories.insert(category_id, category);
                }
                None => {
                    tracing::warn!(category_id, "spending references unknown category, skipping");
                }
            }
        }

        Ok(CatalogSnapshot { cards, categories })
    }
}

/// Evaluates every (spending category, active card with a matching rule)
/// pair into a scored candidate.
///
/// Categories with zero aggregated spend are skipped, as are cards without
/// a rule for the category: no zero-score filler entries. A card with
/// rules in several spending categories yields one candidate per category.
pub fn build_candidates(
    totals: &HashMap<i64, f64>,
    snapshot: &CatalogSnapshot,
) -> Vec<RecommendationCandidate> {
    let mut candidates = Vec::new();

    for (&category_id, &total_spent) in totals {
        if total_spent <= 0.0 {
            continue;
        }
        let Some(category) = snapshot.categories.get(&category_id) else {
            continue;
        };

        for card in &snapshot.cards {
            // First rule for the category wins; one per category is the
            // catalog convention.
            let Some(rule) = card.benefits.iter().find(|b| b.category_id == category_id)
            else {
                continue;
            };

            let reward = calculate_reward(total_spent, rule);
            let score = calculate_score(card, rule, reward);
            let reason = build_reason(card, rule, reward);

            candidates.push(RecommendationCandidate {
                card: card.clone(),
                category: category.clone(),
                score,
                estimated_reward: reward,
                reason,
            });
        }
    }

    candidates
}

/// Orders candidates best-first. Score descends; ties break by annual fee
/// ascending, then card ID, then category ID, so equal scores always
/// order the same way.
pub fn rank_candidates(candidates: &mut [RecommendationCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.card.annual_fee.total_cmp(&b.card.annual_fee))
            .then_with(|| a.card.id.cmp(&b.card.id))
            .then_with(|| a.category.id.cmp(&b.category.id))
    });
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use gotocard_api::db::{CardCatalog, RecommendationStore, SpendingStore};
use gotocard_api::error::{AppError, AppResult};
use gotocard_api::models::{
    BenefitRule, Card, Category, NewRecommendation, RecommendationRecord, SpendingRecord,
};
use gotocard_api::services::recommendations::RecommendationEngine;

// In-memory collaborator fakes. The recommendation fake applies a replace
// all-or-nothing, mirroring the transactional contract of the real store.

struct FakeSpendingStore {
    records: Mutex<Vec<SpendingRecord>>,
    fail: AtomicBool,
}

impl FakeSpendingStore {
    fn new(records: Vec<SpendingRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            fail: AtomicBool::new(false),
        }
    }

    fn set_records(&self, records: Vec<SpendingRecord>) {
        *self.records.lock().unwrap() = records;
    }
}

#[async_trait]
impl SpendingStore for FakeSpendingStore {
    async fn list_by_user(&self, user_id: i64) -> AppResult<Vec<SpendingRecord>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolClosed));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}

struct FakeCardCatalog {
    cards: Vec<Card>,
    categories: HashMap<i64, Category>,
}

#[async_trait]
impl CardCatalog for FakeCardCatalog {
    async fn list_active_cards(&self) -> AppResult<Vec<Card>> {
        Ok(self.cards.iter().filter(|c| c.is_active).cloned().collect())
    }

    async fn get_category(&self, id: i64) -> AppResult<Option<Category>> {
        Ok(self.categories.get(&id).cloned())
    }
}

#[derive(Default)]
struct FakeRecommendationStore {
    rows: Mutex<Vec<NewRecommendation>>,
    reads: Mutex<Vec<RecommendationRecord>>,
    fail_replace: AtomicBool,
    replace_calls: AtomicUsize,
}

impl FakeRecommendationStore {
    fn stored(&self) -> Vec<NewRecommendation> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecommendationStore for FakeRecommendationStore {
    async fn replace_for_user(
        &self,
        user_id: i64,
        recommendations: &[NewRecommendation],
    ) -> AppResult<()> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_replace.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolClosed));
        }
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|r| r.user_id != user_id);
        rows.extend(recommendations.iter().cloned());
        Ok(())
    }

    async fn list_by_user(&self, user_id: i64) -> AppResult<Vec<RecommendationRecord>> {
        Ok(self
            .reads
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_by_user_and_category(
        &self,
        user_id: i64,
        category_id: i64,
    ) -> AppResult<Vec<RecommendationRecord>> {
        Ok(self
            .reads
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id && r.category_id == category_id)
            .cloned()
            .collect())
    }
}

// Fixture helpers.

fn spending(user_id: i64, category_id: i64, amount: f64, month: i32) -> SpendingRecord {
    SpendingRecord {
        id: 0,
        user_id,
        category_id,
        amount,
        month,
        year: 2024,
    }
}

fn category(id: i64, name: &str) -> Category {
    Category {
        id,
        name: name.to_string(),
        description: String::new(),
    }
}

fn cashback_rule(card_id: i64, category_id: i64, rate: f64, cap: f64) -> BenefitRule {
    BenefitRule {
        id: card_id * 100 + category_id,
        card_id,
        category_id,
        cashback_rate: rate,
        points_rate: 0.0,
        miles_rate: 0.0,
        cap,
        min_spend: 0.0,
    }
}

fn card(id: i64, name: &str, annual_fee: f64, benefits: Vec<BenefitRule>) -> Card {
    Card {
        id,
        name: name.to_string(),
        bank: "First Bank".to_string(),
        annual_fee,
        is_active: true,
        benefits,
    }
}

struct Fixture {
    spending: Arc<FakeSpendingStore>,
    store: Arc<FakeRecommendationStore>,
    engine: RecommendationEngine,
}

fn fixture(records: Vec<SpendingRecord>, cards: Vec<Card>, categories: Vec<Category>) -> Fixture {
    let spending = Arc::new(FakeSpendingStore::new(records));
    let catalog = Arc::new(FakeCardCatalog {
        cards,
        categories: categories.into_iter().map(|c| (c.id, c)).collect(),
    });
    let store = Arc::new(FakeRecommendationStore::default());
    let engine = RecommendationEngine::new(spending.clone(), catalog, store.clone());
    Fixture {
        spending,
        store,
        engine,
    }
}

/// Two categories, three cards. Card 1 and card 3 hit the score ceiling
/// with no fee, card 2 hits it with a $95 fee in one category and bottoms
/// out in the other.
fn standard_fixture(user_id: i64) -> Fixture {
    let mut miles_rule = cashback_rule(3, 2, 0.0, 0.0);
    miles_rule.miles_rate = 200.0;

    fixture(
        vec![
            spending(user_id, 1, 400.0, 1),
            spending(user_id, 1, 200.0, 2),
            spending(user_id, 2, 300.0, 1),
        ],
        vec![
            card(1, "Dining Elite", 0.0, vec![cashback_rule(1, 1, 6.0, 500.0)]),
            card(
                2,
                "Everyday",
                95.0,
                vec![
                    cashback_rule(2, 1, 3.0, 0.0),
                    cashback_rule(2, 2, 2.0, 0.0),
                ],
            ),
            card(3, "Miles One", 0.0, vec![miles_rule]),
        ],
        vec![category(1, "Dining"), category(2, "Groceries")],
    )
}

#[tokio::test]
async fn test_generate_returns_ranked_candidates_and_persists_them() {
    let fx = standard_fixture(42);

    let result = fx.engine.generate(42).await.unwrap();

    // Three candidates tie at the ceiling; fee then card ID break the tie.
    let order: Vec<(i64, i64)> = result.iter().map(|c| (c.card.id, c.category.id)).collect();
    assert_eq!(order, vec![(1, 1), (3, 2), (2, 1), (2, 2)]);

    assert_eq!(result[0].score, 100.0);
    assert_eq!(result[0].estimated_reward, 30.0);
    assert_eq!(
        result[0].reason,
        "Earn 6.00% on this category. Expected monthly reward: $30.00, Net annual benefit: $360.00"
    );
    assert_eq!(result[3].score, 0.0);

    // Persisted rows match the returned candidates one for one.
    let stored = fx.store.stored();
    assert_eq!(stored.len(), result.len());
    for (row, candidate) in stored.iter().zip(&result) {
        assert_eq!(row.user_id, 42);
        assert_eq!(row.card_id, candidate.card.id);
        assert_eq!(row.category_id, candidate.category.id);
        assert_eq!(row.score, candidate.score);
        assert_eq!(row.estimated_reward, candidate.estimated_reward);
        assert_eq!(row.reason, candidate.reason);
    }
}

#[tokio::test]
async fn test_generate_replaces_the_previous_set() {
    let fx = standard_fixture(42);

    fx.engine.generate(42).await.unwrap();
    assert_eq!(fx.store.stored().len(), 4);

    // Dining spending disappears; only the groceries candidates remain.
    fx.spending.set_records(vec![spending(42, 2, 300.0, 1)]);
    let result = fx.engine.generate(42).await.unwrap();

    assert_eq!(result.len(), 2);
    let stored = fx.store.stored();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|r| r.category_id == 2));
}

#[tokio::test]
async fn test_failed_replace_keeps_the_previous_set() {
    let fx = standard_fixture(42);

    fx.engine.generate(42).await.unwrap();
    let before = fx.store.stored();

    fx.spending.set_records(vec![spending(42, 2, 300.0, 1)]);
    fx.store.fail_replace.store(true, Ordering::SeqCst);

    let err = fx.engine.generate(42).await.unwrap_err();
    assert!(matches!(err, AppError::Persistence(_)), "got {err:?}");
    assert_eq!(fx.store.stored(), before);
}

#[tokio::test]
async fn test_dependency_failure_aborts_without_touching_the_store() {
    let fx = standard_fixture(42);
    fx.spending.fail.store(true, Ordering::SeqCst);

    let err = fx.engine.generate(42).await.unwrap_err();
    assert!(matches!(err, AppError::Dependency(_)), "got {err:?}");
    assert_eq!(fx.store.replace_calls.load(Ordering::SeqCst), 0);
    assert!(fx.store.stored().is_empty());
}

#[tokio::test]
async fn test_generate_is_idempotent_on_unchanged_inputs() {
    let fx = standard_fixture(42);

    fx.engine.generate(42).await.unwrap();
    let first = fx.store.stored();

    fx.engine.generate(42).await.unwrap();
    let second = fx.store.stored();

    let tuples = |rows: &[NewRecommendation]| {
        rows.iter()
            .map(|r| (r.card_id, r.category_id, r.score, r.estimated_reward))
            .collect::<Vec<_>>()
    };
    assert_eq!(tuples(&first), tuples(&second));
}

#[tokio::test]
async fn test_no_spending_yields_an_empty_replace() {
    let fx = standard_fixture(42);

    fx.engine.generate(42).await.unwrap();
    assert!(!fx.store.stored().is_empty());

    // All spending gone: the set is replaced with nothing, not left stale.
    fx.spending.set_records(vec![]);
    let result = fx.engine.generate(42).await.unwrap();

    assert!(result.is_empty());
    assert!(fx.store.stored().is_empty());
}

#[tokio::test]
async fn test_result_is_truncated_to_ten() {
    let categories: Vec<Category> = (1..=12).map(|id| category(id, "Cat")).collect();
    let rules: Vec<BenefitRule> = (1..=12).map(|id| cashback_rule(1, id, 5.0, 0.0)).collect();
    let records: Vec<SpendingRecord> = (1..=12).map(|id| spending(42, id, 100.0, 1)).collect();

    let fx = fixture(records, vec![card(1, "Wide", 0.0, rules)], categories);

    let result = fx.engine.generate(42).await.unwrap();
    assert_eq!(result.len(), 10);
    assert_eq!(fx.store.stored().len(), 10);

    // Equal scores everywhere: the category ID tie-break keeps 1 through 10.
    let kept: Vec<i64> = result.iter().map(|c| c.category.id).collect();
    assert_eq!(kept, (1..=10).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_concurrent_generation_for_different_users() {
    let fx = standard_fixture(42);
    fx.spending.set_records(vec![
        spending(42, 1, 600.0, 1),
        spending(43, 2, 300.0, 1),
    ]);

    let (a, b) = tokio::join!(fx.engine.generate(42), fx.engine.generate(43));
    let a = a.unwrap();
    let b = b.unwrap();

    assert!(a.iter().all(|c| c.category.id == 1));
    assert!(b.iter().all(|c| c.category.id == 2));

    let stored = fx.store.stored();
    assert_eq!(
        stored.iter().filter(|r| r.user_id == 42).count(),
        a.len()
    );
    assert_eq!(
        stored.iter().filter(|r| r.user_id == 43).count(),
        b.len()
    );
}

#[tokio::test]
async fn test_get_existing_returns_empty_when_nothing_persisted() {
    let fx = standard_fixture(42);
    let views = fx.engine.get_existing(42).await.unwrap();
    assert!(views.is_empty());
}

#[tokio::test]
async fn test_get_existing_maps_rows_and_filters_by_category() {
    let fx = standard_fixture(42);
    {
        let mut reads = fx.store.reads.lock().unwrap();
        for (id, category_id, score) in [(1, 1, 90.0), (2, 2, 80.0), (3, 1, 70.0)] {
            reads.push(RecommendationRecord {
                id,
                user_id: 42,
                score,
                estimated_reward: 10.0,
                reason: "r".to_string(),
                created_at: Utc::now(),
                card_id: 1,
                card_name: "Dining Elite".to_string(),
                bank: "First Bank".to_string(),
                annual_fee: 0.0,
                category_id,
                category_name: "Dining".to_string(),
                category_description: String::new(),
            });
        }
    }

    let all = fx.engine.get_existing(42).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].card.name, "Dining Elite");

    let dining = fx.engine.get_existing_for_category(42, 1).await.unwrap();
    assert_eq!(dining.len(), 2);
    assert!(dining.iter().all(|v| v.category.id == 1));

    let other = fx.engine.get_existing_for_category(42, 9).await.unwrap();
    assert!(other.is_empty());
}

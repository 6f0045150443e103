use std::collections::HashMap;

use crate::models::SpendingRecord;

/// Collapses a user's spending history into one total per category.
///
/// Every persisted record contributes; there is no date window. An empty
/// input produces an empty map, which downstream yields zero
/// recommendations.
pub fn aggregate_spending(records: &[SpendingRecord]) -> HashMap<i64, f64> {
    let mut totals: HashMap<i64, f64> = HashMap::new();
    for record in records {
        *totals.entry(record.category_id).or_insert(0.0) += record.amount;
    }
    totals
}

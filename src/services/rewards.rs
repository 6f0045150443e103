use crate::models::BenefitRule;

/// Currency value credited per reward point.
pub const POINT_VALUE: f64 = 0.01;

/// Currency value credited per airline mile.
pub const MILE_VALUE: f64 = 0.015;

/// Computes the monthly monetary reward a benefit rule yields for the
/// given monthly spend.
///
/// Policy order: the minimum-spend gate first (spend below the floor earns
/// nothing, no partial credit), then the cap clamp when `cap > 0`, then
/// unit selection. Exactly one unit is ever credited per rule: cashback
/// takes precedence over points, points over miles.
pub fn calculate_reward(monthly_spend: f64, rule: &BenefitRule) -> f64 {
    if monthly_spend < rule.min_spend {
        return 0.0;
    }

    let effective_spend = if rule.cap > 0.0 && monthly_spend > rule.cap {
        rule.cap
    } else {
        monthly_spend
    };

    if rule.cashback_rate > 0.0 {
        return effective_spend * rule.cashback_rate / 100.0;
    }

    if rule.points_rate > 0.0 {
        return effective_spend * rule.points_rate / 100.0 * POINT_VALUE;
    }

    if rule.miles_rate > 0.0 {
        return effective_spend * rule.miles_rate / 100.0 * MILE_VALUE;
    }

    0.0
}

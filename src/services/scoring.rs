use crate::models::{BenefitRule, Card};

/// Upper bound of the composite score.
const SCORE_CEILING: f64 = 100.0;

/// Incentive weight per percentage point of each unit's rate.
const CASHBACK_WEIGHT: f64 = 10.0;
const POINTS_WEIGHT: f64 = 8.0;
const MILES_WEIGHT: f64 = 12.0;

/// Share of the annual fee subtracted as the fee-aversion penalty.
const FEE_PENALTY: f64 = 0.5;

/// Computes the bounded composite ranking score for a card given the
/// monthly reward one of its rules earns.
///
/// The score starts from the net annual benefit. Every positive rate on
/// the rule then adds its incentive weight: all set units contribute here
/// even though only one was credited as reward. The annual fee enters
/// twice, once inside the net benefit and once more scaled by
/// `FEE_PENALTY`. The result is clamped to [0, 100] and rounded to two
/// decimals. It is a ranking signal, not a currency amount.
pub fn calculate_score(card: &Card, rule: &BenefitRule, monthly_reward: f64) -> f64 {
    let annual_reward = monthly_reward * 12.0;
    let net_benefit = annual_reward - card.annual_fee;

    let mut score = net_benefit;
    if rule.cashback_rate > 0.0 {
        score += rule.cashback_rate * CASHBACK_WEIGHT;
    }
    if rule.points_rate > 0.0 {
        score += rule.points_rate * POINTS_WEIGHT;
    }
    if rule.miles_rate > 0.0 {
        score += rule.miles_rate * MILES_WEIGHT;
    }
    score -= card.annual_fee * FEE_PENALTY;

    let clamped = score.clamp(0.0, SCORE_CEILING);
    (clamped * 100.0).round() / 100.0
}

/// Builds the justification string for a recommendation.
///
/// The template is part of the response contract and must be reproducible
/// byte-for-byte from the same inputs: credited unit and rate, expected
/// monthly reward, the annual fee when there is one, and the net annual
/// benefit. The unit named is the one `calculate_reward` credited
/// (cashback over points over miles); a rule with no positive rate reads
/// as a 0.00% cashback offer.
pub fn build_reason(card: &Card, rule: &BenefitRule, monthly_reward: f64) -> String {
    let annual_reward = monthly_reward * 12.0;
    let net_benefit = annual_reward - card.annual_fee;

    let mut reason = if rule.cashback_rate > 0.0 {
        format!("Earn {:.2}% on this category.", rule.cashback_rate)
    } else if rule.points_rate > 0.0 {
        format!("Earn {:.1}x points on this category.", rule.points_rate)
    } else if rule.miles_rate > 0.0 {
        format!("Earn {:.1}x miles on this category.", rule.miles_rate)
    } else {
        format!("Earn {:.2}% on this category.", rule.cashback_rate)
    };

    reason.push_str(&format!(
        " Expected monthly reward: ${:.2}",
        monthly_reward
    ));

    if card.annual_fee > 0.0 {
        reason.push_str(&format!(", Annual fee: ${:.0}", card.annual_fee));
    }

    reason.push_str(&format!(", Net annual benefit: ${:.2}", net_benefit));

    reason
}

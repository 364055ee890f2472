// Priority-weighted aggregation of triggered filter results into one
// recommendation.
//
// Two deliberately separate weight tables are in play:
// 1. Winning action: priority action_weight (4/3/2/1) multiplied by each
//    result's confidence, accumulated per proposed action.
// 2. Overall confidence: a plain weighted average over priority
//    confidence_weight (1.0/0.8/0.6/0.4), with no confidence product.
// The first answers "which action wins", the second "how sure are we".

use crate::evaluators::{coerce_numeric, FieldMap, FilterResult};
use crate::filter_rule::FilterAction;

/// Opportunity field consulted for the contract-size multiplier.
const ESTIMATED_VALUE_FIELD: &str = "estimated_value";

// Contract-size multiplier bands for the time-saved estimate.
const LARGE_CONTRACT_VALUE: f64 = 5_000_000.0;
const MEDIUM_CONTRACT_VALUE: f64 = 1_000_000.0;
const LARGE_CONTRACT_MULTIPLIER: f64 = 2.0;
const MEDIUM_CONTRACT_MULTIPLIER: f64 = 1.5;

/// Computes the overall recommendation from triggered results.
///
/// No findings default to Warn: proceed with caution, nothing else surfaced.
/// Ties between accumulated scores break toward the more conservative
/// action (Exclude > Flag > Deprioritize > Warn).
pub fn overall_recommendation(triggered: &[FilterResult]) -> FilterAction {
    if triggered.is_empty() {
        return FilterAction::Warn;
    }

    // Score bucket per action, held in conservative order so the first
    // strictly-greater winner implements the tie-break.
    let actions = FilterAction::conservative_order();
    let mut scores = [0.0f64; 4];

    for result in triggered {
        let weight = result.priority.action_weight();
        let idx = actions
            .iter()
            .position(|a| *a == result.action)
            .unwrap_or(3);
        scores[idx] += weight * result.confidence_score;
    }

    let mut winner = FilterAction::Warn;
    let mut best = 0.0f64;
    for (action, score) in actions.iter().zip(scores.iter()) {
        if *score > best {
            best = *score;
            winner = *action;
        }
    }

    // Degenerate all-zero scores fall through to the conservative default.
    winner
}

/// Weighted-average confidence over triggered results, weighted by priority
/// alone. Returns 0.0 when nothing triggered.
pub fn overall_confidence(triggered: &[FilterResult]) -> f64 {
    if triggered.is_empty() {
        return 0.0;
    }

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for result in triggered {
        let weight = result.priority.confidence_weight();
        weighted_sum += result.confidence_score * weight;
        weight_total += weight;
    }

    if weight_total == 0.0 {
        0.0
    } else {
        weighted_sum / weight_total
    }
}

/// Builds the one-sentence narrative for the assessment. The primary finding
/// is the first triggered result proposing the winning action.
pub fn business_rationale(recommendation: FilterAction, triggered: &[FilterResult]) -> String {
    let primary = triggered
        .iter()
        .find(|r| r.action == recommendation)
        .or_else(|| triggered.first());

    match primary {
        Some(result) => match recommendation {
            FilterAction::Exclude => format!(
                "Opportunity excluded from pursuit: {}",
                result.reasoning
            ),
            FilterAction::Flag => format!(
                "Opportunity flagged for manual review: {}",
                result.reasoning
            ),
            FilterAction::Deprioritize => format!(
                "Opportunity deprioritized in the pipeline: {}",
                result.reasoning
            ),
            FilterAction::Warn => {
                format!("Proceed with caution: {}", result.reasoning)
            }
        },
        None => {
            "No significant concerns identified; proceed with standard evaluation.".to_string()
        }
    }
}

/// Estimates proposal-effort hours saved by acting on the recommendation.
///
/// Base hours come from the action; larger contracts save proportionally
/// more, so the base is scaled by a contract-size multiplier. A missing or
/// non-numeric estimated value earns no multiplier bonus.
pub fn estimated_time_saved(recommendation: FilterAction, opportunity: &FieldMap) -> u32 {
    let value = opportunity
        .get(ESTIMATED_VALUE_FIELD)
        .and_then(coerce_numeric)
        .unwrap_or(0.0);

    let multiplier = if value > LARGE_CONTRACT_VALUE {
        LARGE_CONTRACT_MULTIPLIER
    } else if value > MEDIUM_CONTRACT_VALUE {
        MEDIUM_CONTRACT_MULTIPLIER
    } else {
        1.0
    };

    (recommendation.base_hours_saved() as f64 * multiplier).round() as u32
}

// Assessment record produced for each screened opportunity.
//
// Carries the decision, the evidence behind it, and a tamper-evident hash
// so downstream consumers (HTTP layer, audit trail) can verify a stored
// assessment was not altered after the fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::evaluators::FilterResult;
use crate::filter_rule::FilterAction;

/// Result of screening one opportunity against the full enabled rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastFailAssessment {
    /// Unique id of this assessment run.
    pub assessment_id: Uuid,
    /// Identifier of the screened opportunity, as supplied by the caller.
    pub opportunity_id: String,
    /// When the assessment was produced.
    pub assessed_at: DateTime<Utc>,
    /// The winning action.
    pub overall_recommendation: FilterAction,
    /// Aggregate confidence, 0.0 to 1.0.
    pub confidence_score: f64,
    /// Triggered results in evaluation order.
    pub triggered_rules: Vec<FilterResult>,
    /// Human strings derived from triggered FLAG/WARN results.
    pub warning_flags: Vec<String>,
    /// Human strings derived from triggered EXCLUDE results.
    pub exclusion_reasons: Vec<String>,
    /// One-sentence narrative for the decision.
    pub business_rationale: String,
    /// Estimated proposal-effort hours saved by acting on the decision.
    pub estimated_time_saved: u32,
    /// SHA-256 over the decision fields, for tamper detection.
    pub decision_hash: String,
}

impl FastFailAssessment {
    /// Computes the tamper-detection hash over the decision fields.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.opportunity_id.as_bytes());
        hasher.update(self.overall_recommendation.to_string().as_bytes());
        hasher.update(self.assessed_at.timestamp_millis().to_le_bytes());
        for result in &self.triggered_rules {
            hasher.update(result.rule_id.as_str().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Verifies the stored hash against a recomputation.
    pub fn verify_hash(&self) -> bool {
        self.decision_hash == self.compute_hash()
    }

    /// One-line summary for logs and list views.
    pub fn summary(&self) -> String {
        format!(
            "{} ({} rules, confidence {:.2})",
            self.overall_recommendation,
            self.triggered_rules.len(),
            self.confidence_score
        )
    }
}

// Assessment orchestrator.
//
// Runs every enabled rule against one opportunity, records rule usage,
// aggregates the triggered results into a recommendation, and packages the
// FastFailAssessment. No error inside a rule can abort the assessment: the
// evaluator's Err branch is downgraded to a non-triggered result per rule.
//
// Concurrency: evaluation takes &mut self because it mutates rule usage
// counters. One engine instance is single-writer by construction; batch
// callers wrap the engine in a Mutex or run per-worker engines.

use chrono::Utc;
use uuid::Uuid;

use crate::assessment::FastFailAssessment;
use crate::evaluators::{evaluate_rule, FieldMap, FilterResult};
use crate::filter_rule::{FilterAction, FilterRule};
use crate::recommendation::{
    business_rationale, estimated_time_saved, overall_confidence, overall_recommendation,
};
use crate::rule_registry::{RegistryStats, RuleRegistry};

/// Opportunity keys consulted, in order, for the assessment's opportunity id.
const OPPORTUNITY_ID_FIELDS: &[&str] = &["id", "opportunity_id"];

/// Fast-fail screening engine: the public entry point of the crate.
pub struct FastFailEngine {
    registry: RuleRegistry,
}

impl FastFailEngine {
    /// Creates an engine loaded with the default screening policy.
    pub fn new() -> Self {
        FastFailEngine {
            registry: RuleRegistry::with_default_rules(),
        }
    }

    /// Creates an engine over a caller-assembled registry.
    pub fn with_registry(registry: RuleRegistry) -> Self {
        FastFailEngine { registry }
    }

    /// Read access to the underlying registry.
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Screens one opportunity against all enabled rules.
    ///
    /// Never fails: malformed rules and malformed opportunity data degrade
    /// to non-triggered results, and an empty rule set yields the
    /// conservative WARN default.
    pub fn evaluate_opportunity(
        &mut self,
        opportunity: &FieldMap,
        company_profile: Option<&FieldMap>,
    ) -> FastFailAssessment {
        let opportunity_id = extract_opportunity_id(opportunity);

        let mut triggered: Vec<FilterResult> = Vec::new();
        let mut warning_flags: Vec<String> = Vec::new();
        let mut exclusion_reasons: Vec<String> = Vec::new();

        for rule_id in self.registry.enabled_rule_ids() {
            let result = {
                let rule = match self.registry.get_rule(rule_id.as_str()) {
                    Some(rule) => rule,
                    None => continue,
                };
                match evaluate_rule(rule, opportunity, company_profile) {
                    Ok(result) => result,
                    Err(diagnostic) => {
                        log::debug!(
                            "rule '{}' did not evaluate cleanly: {}",
                            rule_id,
                            diagnostic
                        );
                        FilterResult::not_triggered(rule, diagnostic.to_string())
                    }
                }
            };

            self.registry.record_application(&rule_id, result.triggered);

            if result.triggered {
                match result.action {
                    FilterAction::Exclude => {
                        exclusion_reasons
                            .push(format!("{}: {}", result.rule_name, result.reasoning));
                    }
                    FilterAction::Flag | FilterAction::Warn => {
                        warning_flags.push(format!("{}: {}", result.rule_name, result.reasoning));
                    }
                    FilterAction::Deprioritize => {}
                }
                triggered.push(result);
            }
        }

        let recommendation = overall_recommendation(&triggered);
        let confidence = overall_confidence(&triggered);
        let rationale = business_rationale(recommendation, &triggered);
        let time_saved = estimated_time_saved(recommendation, opportunity);

        let mut assessment = FastFailAssessment {
            assessment_id: Uuid::new_v4(),
            opportunity_id,
            assessed_at: Utc::now(),
            overall_recommendation: recommendation,
            confidence_score: confidence,
            triggered_rules: triggered,
            warning_flags,
            exclusion_reasons,
            business_rationale: rationale,
            estimated_time_saved: time_saved,
            decision_hash: String::new(),
        };
        assessment.decision_hash = assessment.compute_hash();

        log::info!(
            "assessed opportunity '{}': {}",
            assessment.opportunity_id,
            assessment.summary()
        );

        assessment
    }

    // ------------------------------------------------------------------
    // Rule administration, delegated to the registry
    // ------------------------------------------------------------------

    /// Inserts or replaces a rule.
    pub fn add_rule(&mut self, rule: FilterRule) {
        self.registry.add_rule(rule);
    }

    /// Removes a rule. Returns whether it existed.
    pub fn remove_rule(&mut self, rule_id: &str) -> bool {
        self.registry.remove_rule(rule_id)
    }

    /// Looks up a rule by id.
    pub fn get_rule(&self, rule_id: &str) -> Option<&FilterRule> {
        self.registry.get_rule(rule_id)
    }

    /// Enables or disables a rule. Returns false for an unknown id.
    pub fn set_rule_enabled(&mut self, rule_id: &str, enabled: bool) -> bool {
        self.registry.set_enabled(rule_id, enabled)
    }

    /// Lists rules sorted by (priority, name).
    pub fn list_rules(&self, enabled_only: bool) -> Vec<&FilterRule> {
        self.registry.list_rules(enabled_only)
    }

    /// Aggregate rule usage statistics.
    pub fn rule_statistics(&self) -> RegistryStats {
        self.registry.statistics()
    }
}

impl Default for FastFailEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulls the opportunity identifier out of the caller's mapping.
fn extract_opportunity_id(opportunity: &FieldMap) -> String {
    for field in OPPORTUNITY_ID_FIELDS {
        if let Some(id) = opportunity.get(*field) {
            match id {
                serde_json::Value::String(s) if !s.is_empty() => return s.clone(),
                serde_json::Value::Number(n) => return n.to_string(),
                _ => {}
            }
        }
    }
    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_map(value: serde_json::Value) -> FieldMap {
        value.as_object().expect("object").clone()
    }

    #[test]
    fn test_opportunity_id_extraction() {
        assert_eq!(
            extract_opportunity_id(&field_map(json!({"id": "opp-1"}))),
            "opp-1"
        );
        assert_eq!(
            extract_opportunity_id(&field_map(json!({"opportunity_id": 42}))),
            "42"
        );
        assert_eq!(extract_opportunity_id(&field_map(json!({}))), "unknown");
    }

    #[test]
    fn test_deprioritize_produces_no_derived_strings() {
        let mut engine = FastFailEngine::with_registry(RuleRegistry::new());
        engine.add_rule(
            FilterRule::builder()
                .id("depri")
                .name("Deprioritizer")
                .action(FilterAction::Deprioritize)
                .conditions(crate::filter_rule::RuleConditions::Threshold(
                    crate::filter_rule::ThresholdConditions {
                        field: "estimated_value".to_string(),
                        operator: crate::filter_rule::ComparisonOp::Lt,
                        threshold: 100_000.0,
                    },
                ))
                .build(),
        );

        let opp = field_map(json!({"id": "opp-d", "estimated_value": 10_000}));
        let assessment = engine.evaluate_opportunity(&opp, None);

        assert_eq!(
            assessment.overall_recommendation,
            FilterAction::Deprioritize
        );
        assert!(assessment.warning_flags.is_empty());
        assert!(assessment.exclusion_reasons.is_empty());
        assert_eq!(assessment.triggered_rules.len(), 1);
    }
}

// In-memory store for the working rule set.
//
// The registry owns every FilterRule, answers the queries the orchestrator
// and admin tooling need, and is the only place rule usage counters are
// mutated. Single-writer by design: all mutation goes through &mut self, so
// concurrent evaluation over one registry requires an external lock or
// per-worker registries (see DESIGN.md).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::filter_rule::{
    BusinessLogicConditions, ComparisonOp, ExclusionConditions, FilterAction, FilterRule,
    PastPerformanceConditions, PatternConditions, RequirementConditions, RuleConditions, RuleId,
    RulePriority, RuleType, ThresholdConditions,
};

/// Usage summary for one rule, as reported by registry statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleUsageSummary {
    pub rule_id: RuleId,
    pub name: String,
    pub success_count: u64,
    pub total_applications: u64,
    pub success_rate: f64,
}

impl RuleUsageSummary {
    fn from_rule(rule: &FilterRule) -> Self {
        RuleUsageSummary {
            rule_id: rule.id.clone(),
            name: rule.name.clone(),
            success_count: rule.success_count,
            total_applications: rule.total_applications,
            success_rate: rule.success_rate(),
        }
    }
}

/// Aggregate report over the whole registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_rules: usize,
    pub enabled_rules: usize,
    pub disabled_rules: usize,
    /// Rule with the highest success_count, among rules that have triggered.
    pub most_triggered: Option<RuleUsageSummary>,
    /// Rule with the best success ratio, among rules that have been applied.
    pub highest_success_rate: Option<RuleUsageSummary>,
    /// Rule count per category tag.
    pub rules_by_type: HashMap<RuleType, usize>,
}

/// Working set of screening rules, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<RuleId, FilterRule>,
}

impl RuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        RuleRegistry {
            rules: HashMap::new(),
        }
    }

    /// Creates a registry loaded with the default screening policy.
    pub fn with_default_rules() -> Self {
        let mut registry = RuleRegistry::new();
        for rule in default_rules() {
            registry.add_rule(rule);
        }
        registry
    }

    /// Inserts a rule, overwriting any existing rule with the same id.
    pub fn add_rule(&mut self, rule: FilterRule) {
        log::debug!("registering rule '{}' ({})", rule.id, rule.rule_type());
        self.rules.insert(rule.id.clone(), rule);
    }

    /// Removes a rule. Returns whether a rule existed under that id.
    pub fn remove_rule(&mut self, rule_id: &str) -> bool {
        let removed = self.rules.remove(&RuleId::from(rule_id)).is_some();
        if removed {
            log::debug!("removed rule '{}'", rule_id);
        }
        removed
    }

    /// Looks up a rule by id.
    pub fn get_rule(&self, rule_id: &str) -> Option<&FilterRule> {
        self.rules.get(&RuleId::from(rule_id))
    }

    /// Enables or disables a rule. Returns false for an unknown id.
    pub fn set_enabled(&mut self, rule_id: &str, enabled: bool) -> bool {
        match self.rules.get_mut(&RuleId::from(rule_id)) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Lists rules sorted by (priority, name) for deterministic display and
    /// evaluation order.
    pub fn list_rules(&self, enabled_only: bool) -> Vec<&FilterRule> {
        let mut rules: Vec<&FilterRule> = self
            .rules
            .values()
            .filter(|r| !enabled_only || r.enabled)
            .collect();
        rules.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.name.cmp(&b.name))
        });
        rules
    }

    /// Ids of enabled rules in evaluation order.
    pub fn enabled_rule_ids(&self) -> Vec<RuleId> {
        self.list_rules(true).iter().map(|r| r.id.clone()).collect()
    }

    /// Records one evaluation against a rule's usage counters.
    pub fn record_application(&mut self, rule_id: &RuleId, triggered: bool) {
        if let Some(rule) = self.rules.get_mut(rule_id) {
            rule.record_application(triggered);
        }
    }

    /// Total rule count.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the registry holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Builds the aggregate statistics report.
    pub fn statistics(&self) -> RegistryStats {
        let enabled_rules = self.rules.values().filter(|r| r.enabled).count();

        let most_triggered = self
            .rules
            .values()
            .filter(|r| r.success_count > 0)
            .max_by_key(|r| r.success_count)
            .map(RuleUsageSummary::from_rule);

        let highest_success_rate = self
            .rules
            .values()
            .filter(|r| r.total_applications > 0)
            .max_by(|a, b| {
                a.success_rate()
                    .partial_cmp(&b.success_rate())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(RuleUsageSummary::from_rule);

        let mut rules_by_type: HashMap<RuleType, usize> = HashMap::new();
        for rule in self.rules.values() {
            *rules_by_type.entry(rule.rule_type()).or_insert(0) += 1;
        }

        RegistryStats {
            total_rules: self.rules.len(),
            enabled_rules,
            disabled_rules: self.rules.len() - enabled_rules,
            most_triggered,
            highest_success_rate,
            rules_by_type,
        }
    }
}

// ============================================================================
// DEFAULT SCREENING POLICY
// ============================================================================

/// The default rule set loaded at engine construction. These payloads are
/// the de-facto screening policy; tests pin the thresholds and pattern
/// lists, so treat any change here as a policy change.
pub fn default_rules() -> Vec<FilterRule> {
    vec![
        FilterRule::new(
            "min_contract_value",
            "Minimum Contract Value",
            "Contracts below the minimum viable value are not worth proposal effort",
            RulePriority::High,
            FilterAction::Exclude,
            RuleConditions::Threshold(ThresholdConditions {
                field: "estimated_value".to_string(),
                operator: ComparisonOp::Lt,
                threshold: 50_000.0,
            }),
        ),
        FilterRule::new(
            "max_contract_value",
            "Maximum Contract Value",
            "Very large contracts need capacity review before pursuit",
            RulePriority::Medium,
            FilterAction::Flag,
            RuleConditions::Threshold(ThresholdConditions {
                field: "estimated_value".to_string(),
                operator: ComparisonOp::Gt,
                threshold: 10_000_000.0,
            }),
        ),
        FilterRule::new(
            "international_work",
            "International Work",
            "Work performed outside the continental US is out of delivery range",
            RulePriority::High,
            FilterAction::Exclude,
            RuleConditions::Pattern(PatternConditions {
                fields: vec![
                    "title".to_string(),
                    "description".to_string(),
                    "place_of_performance".to_string(),
                ],
                exclude_patterns: vec![
                    r"\binternational\b".to_string(),
                    r"\boverseas\b".to_string(),
                    r"\boconus\b".to_string(),
                    r"outside\s+the\s+(?:continental\s+)?(?:u\.?s\.?|united\s+states)".to_string(),
                    r"foreign\s+(?:country|nation|government)".to_string(),
                    r"\bembassy\b".to_string(),
                    r"\bconsulate\b".to_string(),
                ],
                case_sensitive: false,
                match_threshold: 1,
            }),
        ),
        FilterRule::new(
            "security_clearance_mismatch",
            "Security Clearance Mismatch",
            "Opportunity demands a clearance level the company does not hold",
            RulePriority::Critical,
            FilterAction::Exclude,
            RuleConditions::Requirement(RequirementConditions::SecurityClearance {
                fields: vec![
                    "title".to_string(),
                    "description".to_string(),
                    "requirements".to_string(),
                ],
            }),
        ),
        FilterRule::new(
            "excluded_industries",
            "Excluded Industries",
            "Industries outside the company's service lines",
            RulePriority::High,
            FilterAction::Exclude,
            RuleConditions::Exclusion(ExclusionConditions {
                excluded_keywords: vec![
                    "construction".to_string(),
                    "janitorial".to_string(),
                    "landscaping".to_string(),
                    "food service".to_string(),
                    "catering".to_string(),
                    "laundry".to_string(),
                    "grounds maintenance".to_string(),
                    "custodial".to_string(),
                ],
                fields: vec!["title".to_string(), "description".to_string()],
                threshold: 0.1,
            }),
        ),
        FilterRule::new(
            "unsupported_technology",
            "Unsupported Technology",
            "Technology stacks the company does not staff for",
            RulePriority::Medium,
            FilterAction::Flag,
            RuleConditions::Pattern(PatternConditions {
                fields: vec!["description".to_string(), "requirements".to_string()],
                exclude_patterns: vec![
                    r"\bmainframe\b".to_string(),
                    r"\bcobol\b".to_string(),
                    r"\bfortran\b".to_string(),
                    r"embedded\s+systems?".to_string(),
                    r"\bfpga\b".to_string(),
                    r"\basic\s+design\b".to_string(),
                    r"hardware\s+design".to_string(),
                    r"rf\s+engineering".to_string(),
                ],
                case_sensitive: false,
                match_threshold: 1,
            }),
        ),
        FilterRule::new(
            "insufficient_timeline",
            "Insufficient Response Timeline",
            "Not enough runway to produce a competitive proposal",
            RulePriority::High,
            FilterAction::Exclude,
            RuleConditions::Threshold(ThresholdConditions {
                field: "days_until_deadline".to_string(),
                operator: ComparisonOp::Lt,
                threshold: 7.0,
            }),
        ),
        FilterRule::new(
            "set_aside_eligibility",
            "Set-Aside Eligibility",
            "Opportunity is restricted to certifications the company lacks",
            RulePriority::Critical,
            FilterAction::Exclude,
            RuleConditions::BusinessLogic(BusinessLogicConditions::SetAsideEligibility {
                fields: vec!["title".to_string(), "description".to_string()],
            }),
        ),
        FilterRule::new(
            "past_performance_gap",
            "Past Performance Gap",
            "Solicitation demands more contract history than the company shows",
            RulePriority::Medium,
            FilterAction::Flag,
            RuleConditions::Requirement(RequirementConditions::PastPerformance(
                PastPerformanceConditions {
                    fields: vec!["description".to_string(), "requirements".to_string()],
                    trigger_patterns: vec![
                        r"past\s+performance".to_string(),
                        r"prior\s+experience\s+required".to_string(),
                        r"demonstrated\s+experience".to_string(),
                        r"relevant\s+contract\s+history".to_string(),
                    ],
                    min_contracts: 3,
                    min_total_value: 1_000_000.0,
                },
            )),
        ),
        FilterRule::new(
            "high_competition",
            "High Competition",
            "Crowded fields lower the expected win probability",
            RulePriority::Low,
            FilterAction::Warn,
            RuleConditions::Threshold(ThresholdConditions {
                field: "expected_bidders".to_string(),
                operator: ComparisonOp::Ge,
                threshold: 10.0,
            }),
        ),
    ]
}

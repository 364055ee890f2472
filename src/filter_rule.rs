// Configuration entity for fast-fail screening rules.
//
// This module defines the rule structure that drives opportunity screening:
// identity, priority, the action proposed on trigger, the typed condition
// payload, and the usage counters that back rule-performance reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Type aliases and newtypes for identity. Instead of passing String
// everywhere we create specific types that convey semantic meaning.

/// Unique identifier for a filter rule.
/// A human-readable stable key such as "min_contract_value". The id persists
/// across enable/disable and condition updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(String);

impl RuleId {
    /// Creates a new rule id from a string key.
    pub fn new(id: impl Into<String>) -> Self {
        RuleId(id.into())
    }

    /// Returns a reference to the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RuleId {
    fn from(s: String) -> Self {
        RuleId(s)
    }
}

impl From<&str> for RuleId {
    fn from(s: &str) -> Self {
        RuleId(s.to_string())
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Priority tier of a rule, used as a weight during aggregation.
///
/// Variant order is significant: Critical sorts before Low, so an ascending
/// sort lists the most important rules first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RulePriority {
    Critical,
    High,
    Medium,
    Low,
}

impl RulePriority {
    /// Weight applied when scoring which action wins the assessment.
    /// Multiplied by the triggered result's confidence score.
    pub fn action_weight(&self) -> f64 {
        match self {
            RulePriority::Critical => 4.0,
            RulePriority::High => 3.0,
            RulePriority::Medium => 2.0,
            RulePriority::Low => 1.0,
        }
    }

    /// Weight applied when averaging overall assessment confidence.
    ///
    /// Intentionally a different table from `action_weight`: this one answers
    /// "how sure are we overall", not "how strong is the vote".
    pub fn confidence_weight(&self) -> f64 {
        match self {
            RulePriority::Critical => 1.0,
            RulePriority::High => 0.8,
            RulePriority::Medium => 0.6,
            RulePriority::Low => 0.4,
        }
    }
}

impl std::fmt::Display for RulePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RulePriority::Critical => write!(f, "CRITICAL"),
            RulePriority::High => write!(f, "HIGH"),
            RulePriority::Medium => write!(f, "MEDIUM"),
            RulePriority::Low => write!(f, "LOW"),
        }
    }
}

/// Action a rule proposes when it triggers.
///
/// Variant order encodes the conservative tie-break: Exclude beats Flag
/// beats Deprioritize beats Warn when aggregation scores are equal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterAction {
    /// Disqualify the opportunity outright.
    Exclude,
    /// Surface for manual review before any pursuit decision.
    Flag,
    /// Keep in the pipeline but rank it down.
    Deprioritize,
    /// Proceed with caution.
    Warn,
}

impl FilterAction {
    /// Base proposal-effort hours saved when this action is the outcome,
    /// before the contract-size multiplier.
    pub fn base_hours_saved(&self) -> u32 {
        match self {
            FilterAction::Exclude => 40,
            FilterAction::Flag => 8,
            FilterAction::Deprioritize => 4,
            FilterAction::Warn => 2,
        }
    }

    /// All actions in conservative order (most protective first).
    pub fn conservative_order() -> [FilterAction; 4] {
        [
            FilterAction::Exclude,
            FilterAction::Flag,
            FilterAction::Deprioritize,
            FilterAction::Warn,
        ]
    }
}

impl std::fmt::Display for FilterAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterAction::Exclude => write!(f, "EXCLUDE"),
            FilterAction::Flag => write!(f, "FLAG"),
            FilterAction::Deprioritize => write!(f, "DEPRIORITIZE"),
            FilterAction::Warn => write!(f, "WARN"),
        }
    }
}

/// Category tag of a rule, derived from its condition payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Threshold,
    Pattern,
    Exclusion,
    Requirement,
    BusinessLogic,
}

impl std::fmt::Display for RuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleType::Threshold => write!(f, "threshold"),
            RuleType::Pattern => write!(f, "pattern"),
            RuleType::Exclusion => write!(f, "exclusion"),
            RuleType::Requirement => write!(f, "requirement"),
            RuleType::BusinessLogic => write!(f, "business_logic"),
        }
    }
}

/// Comparison operators for threshold rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl ComparisonOp {
    /// Applies the operator as `actual <op> threshold`.
    pub fn compare(&self, actual: f64, threshold: f64) -> bool {
        match self {
            ComparisonOp::Lt => actual < threshold,
            ComparisonOp::Le => actual <= threshold,
            ComparisonOp::Gt => actual > threshold,
            ComparisonOp::Ge => actual >= threshold,
            ComparisonOp::Eq => actual == threshold,
            ComparisonOp::Ne => actual != threshold,
        }
    }
}

impl std::fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonOp::Lt => write!(f, "lt"),
            ComparisonOp::Le => write!(f, "le"),
            ComparisonOp::Gt => write!(f, "gt"),
            ComparisonOp::Ge => write!(f, "ge"),
            ComparisonOp::Eq => write!(f, "eq"),
            ComparisonOp::Ne => write!(f, "ne"),
        }
    }
}

// ============================================================================
// TYPED CONDITION PAYLOADS
// ============================================================================

/// Parameters for a numeric threshold comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConditions {
    /// Opportunity field holding the value to compare.
    pub field: String,
    /// Comparison applied as `value <op> threshold`.
    pub operator: ComparisonOp,
    /// Reference threshold.
    pub threshold: f64,
}

/// Parameters for regex pattern screening over opportunity text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConditions {
    /// Opportunity fields concatenated into the search text.
    pub fields: Vec<String>,
    /// Regex patterns searched against the text.
    pub exclude_patterns: Vec<String>,
    /// Whether patterns match case-sensitively.
    pub case_sensitive: bool,
    /// Minimum number of distinct matching patterns required to trigger.
    pub match_threshold: usize,
}

/// Parameters for literal keyword exclusion screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionConditions {
    /// Keywords checked by lowercase containment.
    pub excluded_keywords: Vec<String>,
    /// Opportunity fields concatenated into the search text.
    pub fields: Vec<String>,
    /// Fraction of keywords (0..=1) that must match to trigger.
    pub threshold: f64,
}

/// Parameters for the past-performance requirement check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PastPerformanceConditions {
    /// Opportunity fields searched for requirement language.
    pub fields: Vec<String>,
    /// Regex patterns that gate the check; no match means the rule never
    /// triggers for this opportunity.
    pub trigger_patterns: Vec<String>,
    /// Minimum historical contract count the company must show.
    pub min_contracts: u64,
    /// Minimum combined historical contract value the company must show.
    pub min_total_value: f64,
}

/// Requirement sub-checks, dispatched by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum RequirementConditions {
    /// Clearance-level language in the opportunity versus the company's
    /// declared clearances.
    SecurityClearance {
        /// Opportunity fields searched for clearance language.
        fields: Vec<String>,
    },
    /// Performance-history requirements versus the company's project history.
    PastPerformance(PastPerformanceConditions),
}

/// Business-logic checks. Currently set-aside eligibility; the enum keeps
/// the evaluator set closed so new checks are compiler-enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum BusinessLogicConditions {
    /// Restrictive set-aside language versus the company's SBA
    /// certifications.
    SetAsideEligibility {
        /// Opportunity fields searched for set-aside language.
        fields: Vec<String>,
    },
}

/// Typed condition payload of a rule. The variant selects the evaluator, so
/// a rule can never carry a payload its evaluator does not understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleConditions {
    Threshold(ThresholdConditions),
    Pattern(PatternConditions),
    Exclusion(ExclusionConditions),
    Requirement(RequirementConditions),
    BusinessLogic(BusinessLogicConditions),
}

impl RuleConditions {
    /// Returns the category tag for this payload.
    pub fn rule_type(&self) -> RuleType {
        match self {
            RuleConditions::Threshold(_) => RuleType::Threshold,
            RuleConditions::Pattern(_) => RuleType::Pattern,
            RuleConditions::Exclusion(_) => RuleType::Exclusion,
            RuleConditions::Requirement(_) => RuleType::Requirement,
            RuleConditions::BusinessLogic(_) => RuleType::BusinessLogic,
        }
    }
}

// ============================================================================
// FILTER RULE
// ============================================================================

/// One configured screening criterion.
///
/// Conditions are read-only during evaluation; only the usage counters and
/// `last_applied` are mutated, and only through `record_application`, which
/// keeps `success_count <= total_applications` at all times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Unique identifier (persists across updates).
    pub id: RuleId,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description of what the rule screens for.
    pub description: String,
    /// Weight tier used during aggregation.
    pub priority: RulePriority,
    /// Action proposed when the rule triggers.
    pub action: FilterAction,
    /// Typed evaluator parameters.
    pub conditions: RuleConditions,
    /// Whether the orchestrator considers this rule.
    pub enabled: bool,
    /// Immutable creation timestamp.
    pub created_date: DateTime<Utc>,
    /// Timestamp of the most recent evaluation.
    pub last_applied: Option<DateTime<Utc>>,
    /// Number of evaluations in which the rule triggered.
    pub success_count: u64,
    /// Total number of evaluations of the rule.
    pub total_applications: u64,
}

impl FilterRule {
    /// Creates an enabled rule with fresh counters.
    pub fn new(
        id: impl Into<RuleId>,
        name: impl Into<String>,
        description: impl Into<String>,
        priority: RulePriority,
        action: FilterAction,
        conditions: RuleConditions,
    ) -> Self {
        FilterRule {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            priority,
            action,
            conditions,
            enabled: true,
            created_date: Utc::now(),
            last_applied: None,
            success_count: 0,
            total_applications: 0,
        }
    }

    /// Creates a builder for finer-grained rule construction.
    pub fn builder() -> FilterRuleBuilder {
        FilterRuleBuilder::default()
    }

    /// Returns the category tag derived from the condition payload.
    pub fn rule_type(&self) -> RuleType {
        self.conditions.rule_type()
    }

    /// Records one evaluation of this rule.
    pub fn record_application(&mut self, triggered: bool) {
        self.total_applications += 1;
        self.last_applied = Some(Utc::now());
        if triggered {
            self.success_count += 1;
        }
    }

    /// Fraction of evaluations in which the rule triggered (0.0 to 1.0).
    pub fn success_rate(&self) -> f64 {
        if self.total_applications == 0 {
            0.0
        } else {
            self.success_count as f64 / self.total_applications as f64
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "Rule[{} '{}', type: {}, priority: {}, action: {}, enabled: {}, {}/{} triggered]",
            self.id,
            self.name,
            self.rule_type(),
            self.priority,
            self.action,
            self.enabled,
            self.success_count,
            self.total_applications
        )
    }
}

// BUILDER PATTERN FOR FILTER RULES
/// Builder for creating a FilterRule step by step. Id, name, and conditions
/// are required; priority defaults to Medium, action to Warn.
#[derive(Debug, Default)]
pub struct FilterRuleBuilder {
    id: Option<RuleId>,
    name: Option<String>,
    description: Option<String>,
    priority: Option<RulePriority>,
    action: Option<FilterAction>,
    conditions: Option<RuleConditions>,
    enabled: Option<bool>,
    created_date: Option<DateTime<Utc>>,
}

impl FilterRuleBuilder {
    /// Creates a new builder instance with all fields unset.
    pub fn new() -> Self {
        FilterRuleBuilder::default()
    }

    /// Sets the rule id.
    pub fn id(mut self, id: impl Into<RuleId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the rule name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the rule description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the priority tier.
    pub fn priority(mut self, priority: RulePriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the proposed action.
    pub fn action(mut self, action: FilterAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Sets the condition payload.
    pub fn conditions(mut self, conditions: RuleConditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Sets whether the rule starts enabled.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Sets the creation timestamp.
    pub fn created_date(mut self, created_date: DateTime<Utc>) -> Self {
        self.created_date = Some(created_date);
        self
    }

    /// Builds the FilterRule instance.
    pub fn build(self) -> FilterRule {
        FilterRule {
            id: self.id.expect("Rule id is required"),
            name: self.name.expect("Rule name is required"),
            description: self.description.unwrap_or_default(),
            priority: self.priority.unwrap_or(RulePriority::Medium),
            action: self.action.unwrap_or(FilterAction::Warn),
            conditions: self.conditions.expect("Rule conditions are required"),
            enabled: self.enabled.unwrap_or(true),
            created_date: self.created_date.unwrap_or_else(Utc::now),
            last_applied: None,
            success_count: 0,
            total_applications: 0,
        }
    }
}

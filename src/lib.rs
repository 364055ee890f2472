// Fast-fail screening engine for government contract opportunities.
//
// Screens incoming opportunities against a configurable set of heuristic
// rules (threshold, pattern, exclusion, requirement, business logic) and
// recommends EXCLUDE / FLAG / DEPRIORITIZE / WARN with confidence scoring,
// priority-weighted conflict resolution, and rule performance statistics.
//
// Evaluation proceeds registry -> evaluators -> aggregation:
// the orchestrator walks enabled rules in priority order, each rule is
// dispatched to the evaluator for its condition type, and the triggered
// results are folded into one recommendation.

pub mod assessment;
pub mod engine;
pub mod evaluators;
pub mod filter_rule;
pub mod recommendation;
pub mod rule_registry;

pub use filter_rule::{
    BusinessLogicConditions, ComparisonOp, ExclusionConditions, FilterAction, FilterRule,
    FilterRuleBuilder, PastPerformanceConditions, PatternConditions, RequirementConditions,
    RuleConditions, RuleId, RulePriority, RuleType, ThresholdConditions,
};

pub use evaluators::{
    coerce_numeric, evaluate_rule, EvalDiagnostic, FieldMap, FilterResult,
};

pub use recommendation::{
    business_rationale, estimated_time_saved, overall_confidence, overall_recommendation,
};

pub use rule_registry::{
    default_rules,          // The default screening policy
    RegistryStats,          // Aggregate usage report
    RuleRegistry,           // In-memory rule store
    RuleUsageSummary,       // Per-rule usage entry
};

pub use assessment::FastFailAssessment;

pub use engine::FastFailEngine;

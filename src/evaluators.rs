// Evaluation strategies for each rule type.
//
// Each evaluator is a pure function of (rule, opportunity, company profile)
// producing a FilterResult. Evaluators never panic across the dispatch
// boundary: configuration and data problems come back as an EvalDiagnostic
// on the Err branch, which the orchestrator downgrades to a non-triggered
// result with the diagnostic as its reasoning.
//
// Evaluation order of concerns per evaluator:
// 1. Resolve the opportunity fields the rule reads
// 2. Apply the rule-type specific check
// 3. Report confidence, matched criteria and extracted values for audit

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::filter_rule::{
    BusinessLogicConditions, ExclusionConditions, FilterAction, FilterRule, PatternConditions,
    PastPerformanceConditions, RequirementConditions, RuleConditions, RuleId, RulePriority,
    ThresholdConditions,
};

/// Caller-supplied opportunity / company-profile mapping shape.
pub type FieldMap = serde_json::Map<String, Value>;

// Confidence assigned by evaluators that have no graded signal of their own.
const THRESHOLD_CONFIDENCE: f64 = 0.95;
const CLEARANCE_CONFIDENCE: f64 = 0.9;
const PAST_PERFORMANCE_CONFIDENCE: f64 = 0.75;
const SET_ASIDE_CONFIDENCE: f64 = 0.9;

// Pattern confidence grows with match count, capped below certainty.
const PATTERN_CONFIDENCE_CAP: f64 = 0.95;
const PATTERN_CONFIDENCE_PER_MATCH: f64 = 0.3;

/// Clearance levels in rank order (highest first). A level is detected when
/// any of its patterns matches the opportunity text; the first matching
/// level wins. The pattern lists are the behavioral contract for clearance
/// screening.
const CLEARANCE_LEVELS: &[(&str, &[&str])] = &[
    ("Top Secret/SCI", &[r"top\s*secret\s*/\s*sci", r"\bts\s*/\s*sci\b"]),
    ("Top Secret", &[r"top\s*secret"]),
    (
        "Secret",
        &[r"\bsecret\s+clearance", r"clearance\s+level\s*:?\s*secret"],
    ),
    (
        "Confidential",
        &[
            r"confidential\s+clearance",
            r"clearance\s+level\s*:?\s*confidential",
        ],
    ),
];

/// Set-aside program families, most specific first so SDVOSB language is not
/// claimed by the broader VOSB patterns. Each entry: display name, detection
/// patterns over opportunity text, certification tokens matched against the
/// company's declared SBA certifications by lowercase containment.
const SET_ASIDE_PROGRAMS: &[(&str, &[&str], &[&str])] = &[
    ("8(a)", &[r"8\s*\(\s*a\s*\)"], &["8(a)", "8a"]),
    ("HUBZone", &[r"hub\s*zone"], &["hubzone"]),
    (
        "SDVOSB",
        &[r"service[\s-]disabled\s+veteran", r"\bsdvosb\b"],
        &["sdvosb", "service-disabled"],
    ),
    (
        "VOSB",
        &[r"veteran[\s-]owned", r"\bvosb\b"],
        &["vosb", "veteran-owned", "veteran owned"],
    ),
    (
        "WOSB",
        &[r"women[\s-]owned", r"\bwosb\b"],
        &["wosb", "women-owned", "women owned"],
    ),
];

/// Language that marks a set-aside mention as restrictive rather than
/// informational.
const RESTRICTION_PATTERNS: &[&str] = &[
    r"set[\s-]aside",
    r"\bonly\b",
    r"restricted\s+to",
    r"\bexclusively\b",
    r"reserved\s+for",
];

// ============================================================================
// FILTER RESULT
// ============================================================================

/// Outcome of evaluating one rule against one opportunity.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FilterResult {
    /// Rule that produced this result.
    pub rule_id: RuleId,
    /// Rule name at evaluation time.
    pub rule_name: String,
    /// Rule priority, carried for aggregation weighting.
    pub priority: RulePriority,
    /// Whether the rule's condition held.
    pub triggered: bool,
    /// Action the rule proposes if triggered.
    pub action: FilterAction,
    /// Confidence in the result, 0.0 to 1.0. Always > 0 when triggered.
    pub confidence_score: f64,
    /// Human-readable explanation of the outcome.
    pub reasoning: String,
    /// Tokens or patterns that matched.
    pub matched_criteria: Vec<String>,
    /// Field values the decision was based on, for audit.
    pub extracted_values: HashMap<String, Value>,
}

impl FilterResult {
    /// Creates a non-triggered result with zero confidence.
    pub fn not_triggered(rule: &FilterRule, reasoning: impl Into<String>) -> Self {
        FilterResult {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            priority: rule.priority,
            triggered: false,
            action: rule.action,
            confidence_score: 0.0,
            reasoning: reasoning.into(),
            matched_criteria: Vec::new(),
            extracted_values: HashMap::new(),
        }
    }

    /// Creates a triggered result carrying the rule's proposed action.
    pub fn triggered(rule: &FilterRule, confidence: f64, reasoning: impl Into<String>) -> Self {
        FilterResult {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            priority: rule.priority,
            triggered: true,
            action: rule.action,
            confidence_score: confidence,
            reasoning: reasoning.into(),
            matched_criteria: Vec::new(),
            extracted_values: HashMap::new(),
        }
    }

    /// Attaches the matched tokens or patterns.
    pub fn with_criteria(mut self, criteria: Vec<String>) -> Self {
        self.matched_criteria = criteria;
        self
    }

    /// Attaches one extracted field value.
    pub fn with_extracted(mut self, field: impl Into<String>, value: Value) -> Self {
        self.extracted_values.insert(field.into(), value);
        self
    }
}

// ============================================================================
// EVALUATION DIAGNOSTICS
// ============================================================================

/// Soft-failure diagnostics from rule evaluation. None of these abort an
/// assessment: the orchestrator converts them to non-triggered results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalDiagnostic {
    #[error("Field '{0}' not found in opportunity")]
    FieldMissing(String),

    #[error("Field '{field}' is not numeric: '{value}'")]
    NonNumeric { field: String, value: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Rule has no keywords configured")]
    NoKeywords,
}

// ============================================================================
// DISPATCH
// ============================================================================

/// Evaluates one rule against one opportunity. The conditions variant is the
/// dispatch tag, so the evaluator set is closed and exhaustively checked.
pub fn evaluate_rule(
    rule: &FilterRule,
    opportunity: &FieldMap,
    profile: Option<&FieldMap>,
) -> Result<FilterResult, EvalDiagnostic> {
    match &rule.conditions {
        RuleConditions::Threshold(c) => evaluate_threshold(rule, c, opportunity),
        RuleConditions::Pattern(c) => evaluate_pattern(rule, c, opportunity),
        RuleConditions::Exclusion(c) => evaluate_exclusion(rule, c, opportunity),
        RuleConditions::Requirement(RequirementConditions::SecurityClearance { fields }) => {
            evaluate_clearance(rule, fields, opportunity, profile)
        }
        RuleConditions::Requirement(RequirementConditions::PastPerformance(c)) => {
            evaluate_past_performance(rule, c, opportunity, profile)
        }
        RuleConditions::BusinessLogic(BusinessLogicConditions::SetAsideEligibility { fields }) => {
            evaluate_set_aside(rule, fields, opportunity, profile)
        }
    }
}

// ============================================================================
// FIELD ACCESS HELPERS
// ============================================================================

/// Coerces a JSON value to a number. Strings are stripped down to digits,
/// sign and decimal point before parsing, so "$1,500,000.00" reads as
/// 1500000.0. Anything else is treated as absent.
pub fn coerce_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                cleaned.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// Renders a field value as searchable text. Arrays of scalars are joined
/// with spaces; structured values are skipped.
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(field_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        _ => None,
    }
}

/// Concatenates the named opportunity fields into one search text. Missing
/// fields are skipped rather than reported; pattern-style rules search
/// whatever text is present.
fn concat_fields(map: &FieldMap, fields: &[String]) -> String {
    fields
        .iter()
        .filter_map(|f| map.get(f).and_then(field_text))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compiles a case-insensitive regex from a built-in table pattern. Table
/// patterns are fixed literals, so a failure only skips that pattern.
fn table_regex(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern).case_insensitive(true).build().ok()
}

/// Reads an array-of-strings profile field such as `security_clearances`.
fn profile_strings(profile: Option<&FieldMap>, field: &str) -> Vec<String> {
    profile
        .and_then(|p| p.get(field))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// THRESHOLD EVALUATOR
// ============================================================================

fn evaluate_threshold(
    rule: &FilterRule,
    conditions: &ThresholdConditions,
    opportunity: &FieldMap,
) -> Result<FilterResult, EvalDiagnostic> {
    let raw = opportunity
        .get(&conditions.field)
        .ok_or_else(|| EvalDiagnostic::FieldMissing(conditions.field.clone()))?;

    let actual = coerce_numeric(raw).ok_or_else(|| EvalDiagnostic::NonNumeric {
        field: conditions.field.clone(),
        value: raw.to_string(),
    })?;

    let criterion = format!(
        "{} {} {}",
        conditions.field, conditions.operator, conditions.threshold
    );

    if conditions.operator.compare(actual, conditions.threshold) {
        let reasoning = format!(
            "Field '{}' value {} satisfies {} {}",
            conditions.field, actual, conditions.operator, conditions.threshold
        );
        Ok(FilterResult::triggered(rule, THRESHOLD_CONFIDENCE, reasoning)
            .with_criteria(vec![criterion])
            .with_extracted(conditions.field.clone(), Value::from(actual)))
    } else {
        let reasoning = format!(
            "Field '{}' value {} does not satisfy {} {}",
            conditions.field, actual, conditions.operator, conditions.threshold
        );
        Ok(FilterResult::not_triggered(rule, reasoning)
            .with_extracted(conditions.field.clone(), Value::from(actual)))
    }
}

// ============================================================================
// PATTERN EVALUATOR
// ============================================================================

fn evaluate_pattern(
    rule: &FilterRule,
    conditions: &PatternConditions,
    opportunity: &FieldMap,
) -> Result<FilterResult, EvalDiagnostic> {
    let text = concat_fields(opportunity, &conditions.fields);

    let mut matched: Vec<String> = Vec::new();
    for pattern in &conditions.exclude_patterns {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(!conditions.case_sensitive)
            .build()
            .map_err(|e| EvalDiagnostic::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        if regex.is_match(&text) {
            matched.push(pattern.clone());
        }
    }

    let matches = matched.len();
    if matches >= conditions.match_threshold {
        let confidence = (matches as f64 * PATTERN_CONFIDENCE_PER_MATCH).min(PATTERN_CONFIDENCE_CAP);
        let reasoning = format!(
            "Matched {} of {} screening patterns in fields {:?}",
            matches,
            conditions.exclude_patterns.len(),
            conditions.fields
        );
        Ok(FilterResult::triggered(rule, confidence, reasoning)
            .with_criteria(matched)
            .with_extracted("pattern_matches", Value::from(matches)))
    } else {
        let reasoning = format!(
            "Matched {} screening patterns, below threshold of {}",
            matches, conditions.match_threshold
        );
        Ok(FilterResult::not_triggered(rule, reasoning))
    }
}

// ============================================================================
// EXCLUSION EVALUATOR
// ============================================================================

fn evaluate_exclusion(
    rule: &FilterRule,
    conditions: &ExclusionConditions,
    opportunity: &FieldMap,
) -> Result<FilterResult, EvalDiagnostic> {
    if conditions.excluded_keywords.is_empty() {
        return Err(EvalDiagnostic::NoKeywords);
    }

    let text = concat_fields(opportunity, &conditions.fields).to_lowercase();

    let matched: Vec<String> = conditions
        .excluded_keywords
        .iter()
        .filter(|kw| text.contains(&kw.to_lowercase()))
        .cloned()
        .collect();

    let ratio = matched.len() as f64 / conditions.excluded_keywords.len() as f64;

    if ratio >= conditions.threshold {
        let reasoning = format!(
            "Excluded keywords present: {} ({:.0}% of keyword list)",
            matched.join(", "),
            ratio * 100.0
        );
        Ok(FilterResult::triggered(rule, ratio, reasoning)
            .with_criteria(matched)
            .with_extracted("keyword_match_ratio", Value::from(ratio)))
    } else {
        let reasoning = format!(
            "Keyword match ratio {:.2} below threshold {:.2}",
            ratio, conditions.threshold
        );
        Ok(FilterResult::not_triggered(rule, reasoning))
    }
}

// ============================================================================
// REQUIREMENT EVALUATOR - SECURITY CLEARANCE
// ============================================================================

/// Finds the highest clearance level mentioned in the text. Returns the
/// level's rank (lower = higher clearance) and display name.
fn detect_required_clearance(text: &str) -> Option<(usize, &'static str)> {
    for (rank, (name, patterns)) in CLEARANCE_LEVELS.iter().enumerate() {
        for pattern in *patterns {
            if let Some(regex) = table_regex(pattern) {
                if regex.is_match(text) {
                    return Some((rank, *name));
                }
            }
        }
    }
    None
}

/// Best (highest) clearance rank among the company's declared clearances,
/// matched by level-name containment.
fn declared_clearance_rank(declared: &[String]) -> Option<usize> {
    let lowered: Vec<String> = declared.iter().map(|c| c.to_lowercase()).collect();
    for (rank, (name, _)) in CLEARANCE_LEVELS.iter().enumerate() {
        let name_lower = name.to_lowercase();
        if lowered.iter().any(|c| c.contains(&name_lower)) {
            return Some(rank);
        }
    }
    None
}

fn evaluate_clearance(
    rule: &FilterRule,
    fields: &[String],
    opportunity: &FieldMap,
    profile: Option<&FieldMap>,
) -> Result<FilterResult, EvalDiagnostic> {
    let text = concat_fields(opportunity, fields);

    // Gate: rules that only matter when explicitly invoked never trigger on
    // silent opportunities.
    let (required_rank, required_name) = match detect_required_clearance(&text) {
        Some(found) => found,
        None => {
            return Ok(FilterResult::not_triggered(
                rule,
                "No security clearance requirement detected in opportunity text",
            ))
        }
    };

    let declared = profile_strings(profile, "security_clearances");
    let satisfied = matches!(
        declared_clearance_rank(&declared),
        Some(rank) if rank <= required_rank
    );

    if satisfied {
        let reasoning = format!(
            "Required {} clearance is covered by the company's declared clearances",
            required_name
        );
        Ok(FilterResult::not_triggered(rule, reasoning))
    } else {
        let reasoning = format!(
            "Opportunity requires {} clearance; company profile does not list a matching clearance",
            required_name
        );
        Ok(FilterResult::triggered(rule, CLEARANCE_CONFIDENCE, reasoning)
            .with_criteria(vec![required_name.to_string()])
            .with_extracted("required_clearance", Value::from(required_name))
            .with_extracted(
                "company_clearances",
                Value::from(declared),
            ))
    }
}

// ============================================================================
// REQUIREMENT EVALUATOR - PAST PERFORMANCE
// ============================================================================

fn evaluate_past_performance(
    rule: &FilterRule,
    conditions: &PastPerformanceConditions,
    opportunity: &FieldMap,
    profile: Option<&FieldMap>,
) -> Result<FilterResult, EvalDiagnostic> {
    let text = concat_fields(opportunity, &conditions.fields);

    let mut gate_pattern: Option<String> = None;
    for pattern in &conditions.trigger_patterns {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| EvalDiagnostic::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        if regex.is_match(&text) {
            gate_pattern = Some(pattern.clone());
            break;
        }
    }

    let gate_pattern = match gate_pattern {
        Some(p) => p,
        None => {
            return Ok(FilterResult::not_triggered(
                rule,
                "No past performance requirement detected in opportunity text",
            ))
        }
    };

    // History shape: project_history is an array of contract entries, each
    // carrying its value under "value" or "contract_value".
    let history = profile
        .and_then(|p| p.get("project_history"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let contract_count = history.len() as u64;
    let total_value: f64 = history
        .iter()
        .filter_map(|entry| {
            entry
                .get("value")
                .or_else(|| entry.get("contract_value"))
                .and_then(coerce_numeric)
        })
        .sum();

    if contract_count < conditions.min_contracts || total_value < conditions.min_total_value {
        let reasoning = format!(
            "Past performance requirement detected; company history shows {} contracts totaling ${:.0} (minimums: {} contracts, ${:.0})",
            contract_count, total_value, conditions.min_contracts, conditions.min_total_value
        );
        Ok(
            FilterResult::triggered(rule, PAST_PERFORMANCE_CONFIDENCE, reasoning)
                .with_criteria(vec![gate_pattern])
                .with_extracted("contract_count", Value::from(contract_count))
                .with_extracted("total_contract_value", Value::from(total_value)),
        )
    } else {
        let reasoning = format!(
            "Company history of {} contracts totaling ${:.0} meets the past performance requirement",
            contract_count, total_value
        );
        Ok(FilterResult::not_triggered(rule, reasoning))
    }
}

// ============================================================================
// BUSINESS LOGIC EVALUATOR - SET-ASIDE ELIGIBILITY
// ============================================================================

fn evaluate_set_aside(
    rule: &FilterRule,
    fields: &[String],
    opportunity: &FieldMap,
    profile: Option<&FieldMap>,
) -> Result<FilterResult, EvalDiagnostic> {
    let text = concat_fields(opportunity, fields);

    // Most specific program first; the first family with a matching pattern
    // claims the restriction.
    let detected = SET_ASIDE_PROGRAMS.iter().find(|(_, patterns, _)| {
        patterns
            .iter()
            .any(|p| table_regex(p).is_some_and(|r| r.is_match(&text)))
    });

    let (program, _, cert_tokens) = match detected {
        Some(entry) => entry,
        None => {
            return Ok(FilterResult::not_triggered(
                rule,
                "No set-aside program language detected in opportunity text",
            ))
        }
    };

    let restrictive = RESTRICTION_PATTERNS
        .iter()
        .any(|p| table_regex(p).is_some_and(|r| r.is_match(&text)));
    if !restrictive {
        return Ok(FilterResult::not_triggered(
            rule,
            format!(
                "{} program mentioned without restrictive set-aside language",
                program
            ),
        ));
    }

    let certifications = profile_strings(profile, "sba_certifications");
    let certified = certifications.iter().any(|cert| {
        let cert_lower = cert.to_lowercase();
        cert_tokens.iter().any(|token| cert_lower.contains(token))
    });

    if certified {
        let reasoning = format!(
            "Opportunity is set aside for {} and the company holds a matching certification",
            program
        );
        Ok(FilterResult::not_triggered(rule, reasoning))
    } else {
        let reasoning = format!(
            "Opportunity is set aside for {} certified businesses; company certifications do not include it",
            program
        );
        Ok(FilterResult::triggered(rule, SET_ASIDE_CONFIDENCE, reasoning)
            .with_criteria(vec![program.to_string()])
            .with_extracted("set_aside_program", Value::from(*program))
            .with_extracted("company_certifications", Value::from(certifications)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter_rule::ComparisonOp;
    use serde_json::json;

    fn field_map(value: Value) -> FieldMap {
        value.as_object().expect("object").clone()
    }

    fn threshold_rule(field: &str, operator: ComparisonOp, threshold: f64) -> FilterRule {
        FilterRule::new(
            "t1",
            "Threshold rule",
            "",
            RulePriority::High,
            FilterAction::Exclude,
            RuleConditions::Threshold(ThresholdConditions {
                field: field.to_string(),
                operator,
                threshold,
            }),
        )
    }

    fn clearance_rule() -> FilterRule {
        FilterRule::new(
            "c1",
            "Clearance rule",
            "",
            RulePriority::Critical,
            FilterAction::Exclude,
            RuleConditions::Requirement(RequirementConditions::SecurityClearance {
                fields: vec!["description".to_string()],
            }),
        )
    }

    fn set_aside_rule() -> FilterRule {
        FilterRule::new(
            "s1",
            "Set-aside rule",
            "",
            RulePriority::Critical,
            FilterAction::Exclude,
            RuleConditions::BusinessLogic(BusinessLogicConditions::SetAsideEligibility {
                fields: vec!["description".to_string()],
            }),
        )
    }

    #[test]
    fn test_threshold_triggers_below_minimum() {
        let rule = threshold_rule("estimated_value", ComparisonOp::Lt, 50_000.0);
        let opp = field_map(json!({"estimated_value": 25_000}));

        let result = evaluate_rule(&rule, &opp, None).unwrap();
        assert!(result.triggered);
        assert!((result.confidence_score - 0.95).abs() < f64::EPSILON);
        assert_eq!(result.extracted_values["estimated_value"], json!(25_000.0));
    }

    #[test]
    fn test_threshold_not_triggered_above_minimum() {
        let rule = threshold_rule("estimated_value", ComparisonOp::Lt, 50_000.0);
        let opp = field_map(json!({"estimated_value": 500_000}));

        let result = evaluate_rule(&rule, &opp, None).unwrap();
        assert!(!result.triggered);
        assert_eq!(result.confidence_score, 0.0);
    }

    #[test]
    fn test_threshold_coerces_currency_strings() {
        let rule = threshold_rule("estimated_value", ComparisonOp::Gt, 1_000_000.0);
        let opp = field_map(json!({"estimated_value": "$1,500,000.00"}));

        let result = evaluate_rule(&rule, &opp, None).unwrap();
        assert!(result.triggered);
        assert_eq!(
            result.extracted_values["estimated_value"],
            json!(1_500_000.0)
        );
    }

    #[test]
    fn test_threshold_missing_field_is_diagnostic() {
        let rule = threshold_rule("estimated_value", ComparisonOp::Lt, 50_000.0);
        let opp = field_map(json!({}));

        let diag = evaluate_rule(&rule, &opp, None).unwrap_err();
        assert_eq!(
            diag,
            EvalDiagnostic::FieldMissing("estimated_value".to_string())
        );
    }

    #[test]
    fn test_threshold_non_numeric_is_diagnostic() {
        let rule = threshold_rule("estimated_value", ComparisonOp::Lt, 50_000.0);
        let opp = field_map(json!({"estimated_value": "to be determined"}));

        let diag = evaluate_rule(&rule, &opp, None).unwrap_err();
        assert!(matches!(diag, EvalDiagnostic::NonNumeric { .. }));
    }

    #[test]
    fn test_pattern_counts_distinct_matches() {
        let rule = FilterRule::new(
            "p1",
            "Pattern rule",
            "",
            RulePriority::High,
            FilterAction::Exclude,
            RuleConditions::Pattern(PatternConditions {
                fields: vec!["description".to_string()],
                exclude_patterns: vec![
                    r"\binternational\b".to_string(),
                    r"\boverseas\b".to_string(),
                    r"\bembassy\b".to_string(),
                ],
                case_sensitive: false,
                match_threshold: 2,
            }),
        );
        let opp = field_map(json!({
            "description": "International logistics support for overseas installations"
        }));

        let result = evaluate_rule(&rule, &opp, None).unwrap();
        assert!(result.triggered);
        assert_eq!(result.matched_criteria.len(), 2);
        // Two matches at 0.3 each.
        assert!((result.confidence_score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_pattern_confidence_is_capped() {
        let patterns: Vec<String> = (0..4).map(|i| format!("word{}", i)).collect();
        let rule = FilterRule::new(
            "p2",
            "Pattern rule",
            "",
            RulePriority::High,
            FilterAction::Exclude,
            RuleConditions::Pattern(PatternConditions {
                fields: vec!["description".to_string()],
                exclude_patterns: patterns,
                case_sensitive: false,
                match_threshold: 1,
            }),
        );
        let opp = field_map(json!({"description": "word0 word1 word2 word3"}));

        let result = evaluate_rule(&rule, &opp, None).unwrap();
        assert!(result.triggered);
        assert!((result.confidence_score - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pattern_below_threshold_does_not_trigger() {
        let rule = FilterRule::new(
            "p3",
            "Pattern rule",
            "",
            RulePriority::Medium,
            FilterAction::Flag,
            RuleConditions::Pattern(PatternConditions {
                fields: vec!["description".to_string()],
                exclude_patterns: vec![r"\bmainframe\b".to_string(), r"\bcobol\b".to_string()],
                case_sensitive: false,
                match_threshold: 2,
            }),
        );
        let opp = field_map(json!({"description": "Legacy mainframe modernization"}));

        let result = evaluate_rule(&rule, &opp, None).unwrap();
        assert!(!result.triggered);
    }

    #[test]
    fn test_pattern_invalid_regex_is_diagnostic() {
        let rule = FilterRule::new(
            "p4",
            "Pattern rule",
            "",
            RulePriority::Medium,
            FilterAction::Flag,
            RuleConditions::Pattern(PatternConditions {
                fields: vec!["description".to_string()],
                exclude_patterns: vec!["(unclosed".to_string()],
                case_sensitive: false,
                match_threshold: 1,
            }),
        );
        let opp = field_map(json!({"description": "anything"}));

        let diag = evaluate_rule(&rule, &opp, None).unwrap_err();
        assert!(matches!(diag, EvalDiagnostic::InvalidPattern { .. }));
    }

    #[test]
    fn test_exclusion_ratio_and_threshold() {
        let rule = FilterRule::new(
            "e1",
            "Exclusion rule",
            "",
            RulePriority::High,
            FilterAction::Exclude,
            RuleConditions::Exclusion(ExclusionConditions {
                excluded_keywords: vec![
                    "construction".to_string(),
                    "janitorial".to_string(),
                    "landscaping".to_string(),
                    "catering".to_string(),
                ],
                fields: vec!["description".to_string()],
                threshold: 0.25,
            }),
        );
        let opp = field_map(json!({
            "description": "Construction and landscaping services for the base"
        }));

        let result = evaluate_rule(&rule, &opp, None).unwrap();
        assert!(result.triggered);
        assert!((result.confidence_score - 0.5).abs() < f64::EPSILON);
        assert_eq!(result.matched_criteria.len(), 2);
    }

    #[test]
    fn test_exclusion_empty_keywords_is_diagnostic() {
        let rule = FilterRule::new(
            "e2",
            "Exclusion rule",
            "",
            RulePriority::High,
            FilterAction::Exclude,
            RuleConditions::Exclusion(ExclusionConditions {
                excluded_keywords: vec![],
                fields: vec!["description".to_string()],
                threshold: 0.5,
            }),
        );
        let opp = field_map(json!({"description": "anything"}));

        assert_eq!(
            evaluate_rule(&rule, &opp, None).unwrap_err(),
            EvalDiagnostic::NoKeywords
        );
    }

    #[test]
    fn test_clearance_mismatch_triggers() {
        let rule = clearance_rule();
        let opp = field_map(json!({
            "description": "Top Secret clearance required for all personnel"
        }));
        let profile = field_map(json!({"security_clearances": []}));

        let result = evaluate_rule(&rule, &opp, Some(&profile)).unwrap();
        assert!(result.triggered);
        assert_eq!(
            result.extracted_values["required_clearance"],
            json!("Top Secret")
        );
    }

    #[test]
    fn test_clearance_satisfied_does_not_trigger() {
        let rule = clearance_rule();
        let opp = field_map(json!({
            "description": "Top Secret clearance required for all personnel"
        }));
        let profile = field_map(json!({"security_clearances": ["Top Secret"]}));

        let result = evaluate_rule(&rule, &opp, Some(&profile)).unwrap();
        assert!(!result.triggered);
    }

    #[test]
    fn test_clearance_higher_declared_level_satisfies_lower_requirement() {
        let rule = clearance_rule();
        let opp = field_map(json!({
            "description": "Personnel must hold an active Secret clearance"
        }));
        let profile = field_map(json!({"security_clearances": ["Top Secret"]}));

        let result = evaluate_rule(&rule, &opp, Some(&profile)).unwrap();
        assert!(!result.triggered);
    }

    #[test]
    fn test_clearance_lower_declared_level_triggers() {
        let rule = clearance_rule();
        let opp = field_map(json!({
            "description": "Top Secret clearance required"
        }));
        let profile = field_map(json!({"security_clearances": ["Secret"]}));

        let result = evaluate_rule(&rule, &opp, Some(&profile)).unwrap();
        assert!(result.triggered);
    }

    #[test]
    fn test_clearance_silent_opportunity_never_triggers() {
        let rule = clearance_rule();
        let opp = field_map(json!({
            "description": "Routine software maintenance services"
        }));

        let result = evaluate_rule(&rule, &opp, None).unwrap();
        assert!(!result.triggered);
    }

    #[test]
    fn test_past_performance_insufficient_history_triggers() {
        let rule = FilterRule::new(
            "pp1",
            "Past performance rule",
            "",
            RulePriority::Medium,
            FilterAction::Flag,
            RuleConditions::Requirement(RequirementConditions::PastPerformance(
                PastPerformanceConditions {
                    fields: vec!["description".to_string()],
                    trigger_patterns: vec![r"past\s+performance".to_string()],
                    min_contracts: 3,
                    min_total_value: 1_000_000.0,
                },
            )),
        );
        let opp = field_map(json!({
            "description": "Offerors must submit past performance references"
        }));
        let profile = field_map(json!({
            "project_history": [{"value": 200_000}]
        }));

        let result = evaluate_rule(&rule, &opp, Some(&profile)).unwrap();
        assert!(result.triggered);
        assert_eq!(result.extracted_values["contract_count"], json!(1));
    }

    #[test]
    fn test_past_performance_adequate_history_does_not_trigger() {
        let rule = FilterRule::new(
            "pp2",
            "Past performance rule",
            "",
            RulePriority::Medium,
            FilterAction::Flag,
            RuleConditions::Requirement(RequirementConditions::PastPerformance(
                PastPerformanceConditions {
                    fields: vec!["description".to_string()],
                    trigger_patterns: vec![r"past\s+performance".to_string()],
                    min_contracts: 2,
                    min_total_value: 500_000.0,
                },
            )),
        );
        let opp = field_map(json!({
            "description": "Past performance will be evaluated"
        }));
        let profile = field_map(json!({
            "project_history": [
                {"value": 400_000},
                {"contract_value": "250,000"}
            ]
        }));

        let result = evaluate_rule(&rule, &opp, Some(&profile)).unwrap();
        assert!(!result.triggered);
    }

    #[test]
    fn test_past_performance_silent_opportunity_never_triggers() {
        let rule = FilterRule::new(
            "pp3",
            "Past performance rule",
            "",
            RulePriority::Medium,
            FilterAction::Flag,
            RuleConditions::Requirement(RequirementConditions::PastPerformance(
                PastPerformanceConditions {
                    fields: vec!["description".to_string()],
                    trigger_patterns: vec![r"past\s+performance".to_string()],
                    min_contracts: 3,
                    min_total_value: 1_000_000.0,
                },
            )),
        );
        let opp = field_map(json!({"description": "Routine supply order"}));

        // No history at all, but also no requirement language.
        let result = evaluate_rule(&rule, &opp, None).unwrap();
        assert!(!result.triggered);
    }

    #[test]
    fn test_set_aside_restriction_without_certification_triggers() {
        let rule = set_aside_rule();
        let opp = field_map(json!({
            "description": "restricted to 8(a) certified small businesses only"
        }));
        let profile = field_map(json!({"sba_certifications": ["Small Business"]}));

        let result = evaluate_rule(&rule, &opp, Some(&profile)).unwrap();
        assert!(result.triggered);
        assert_eq!(result.extracted_values["set_aside_program"], json!("8(a)"));
    }

    #[test]
    fn test_set_aside_with_certification_does_not_trigger() {
        let rule = set_aside_rule();
        let opp = field_map(json!({
            "description": "restricted to 8(a) certified small businesses only"
        }));
        let profile = field_map(json!({
            "sba_certifications": ["Small Business", "8(a)"]
        }));

        let result = evaluate_rule(&rule, &opp, Some(&profile)).unwrap();
        assert!(!result.triggered);
    }

    #[test]
    fn test_set_aside_mention_without_restriction_does_not_trigger() {
        let rule = set_aside_rule();
        let opp = field_map(json!({
            "description": "HUBZone participation is encouraged"
        }));

        let result = evaluate_rule(&rule, &opp, None).unwrap();
        assert!(!result.triggered);
    }

    #[test]
    fn test_set_aside_sdvosb_not_claimed_by_vosb_certification() {
        let rule = set_aside_rule();
        let opp = field_map(json!({
            "description": "This procurement is set aside exclusively for service-disabled veteran owned small businesses"
        }));
        let profile = field_map(json!({"sba_certifications": ["VOSB"]}));

        let result = evaluate_rule(&rule, &opp, Some(&profile)).unwrap();
        assert!(result.triggered);
        assert_eq!(
            result.extracted_values["set_aside_program"],
            json!("SDVOSB")
        );
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(coerce_numeric(&json!(42)), Some(42.0));
        assert_eq!(coerce_numeric(&json!("$1,234.50")), Some(1234.5));
        assert_eq!(coerce_numeric(&json!("no number here")), None);
        assert_eq!(coerce_numeric(&json!(null)), None);
        assert_eq!(coerce_numeric(&json!(true)), None);
    }
}

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use epmforge_core::{DependencyRule, Issue, RuleType};

use crate::errors::RuleError;
use crate::formula::{Formula, parse_formula};

/// Measure column used when no rule references any measure.
pub const DEFAULT_MEASURE: &str = "Value";

/// A calculation rule that survived validation, with its parsed formula.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub formula: Formula,
    /// Position of the source rule in the caller's list.
    pub source_index: usize,
}

/// Resolved rule plan: measure classification plus evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RulePlan {
    /// Measures filled from random draws.
    pub base_measures: BTreeSet<String>,
    /// Measures computed from formulas.
    pub derived_measures: BTreeSet<String>,
    /// Calculation rules in topological evaluation order.
    pub rules: Vec<CompiledRule>,
    /// Dropped-rule and unsupported-rule warnings.
    pub warnings: Vec<Issue>,
}

/// Validate rules, classify measures, and order calculations for evaluation.
///
/// Invalid rules are dropped with a warning and generation continues with
/// the rest. Dimension names take precedence over measure names: an operand
/// that names a dimension does not create a phantom measure, and a rule
/// targeting a dimension is dropped. A dependency cycle among derived
/// measures fails compilation.
pub fn compile_rules(
    rules: &[DependencyRule],
    dimension_names: &[String],
) -> Result<RulePlan, RuleError> {
    let dimension_set: BTreeSet<&str> = dimension_names.iter().map(String::as_str).collect();
    let mut plan = RulePlan::default();
    let mut compiled: Vec<CompiledRule> = Vec::new();
    let mut targets_seen: BTreeSet<String> = BTreeSet::new();

    for (index, rule) in rules.iter().enumerate() {
        let position = index + 1;
        if rule.involved_dimensions.is_empty() {
            drop_rule(
                &mut plan,
                "rule_missing_involved_dimensions",
                format!("rule #{position}: involved_dimensions must be non-empty"),
            );
            continue;
        }

        match rule.rule_type {
            RuleType::Calculation => {
                let (Some(formula_text), Some(declared_target)) = (&rule.formula, &rule.target)
                else {
                    drop_rule(
                        &mut plan,
                        "calculation_missing_fields",
                        format!("rule #{position} (calculation): missing 'formula' or 'target'"),
                    );
                    continue;
                };

                let formula = match parse_formula(formula_text) {
                    Ok(formula) => formula,
                    Err(err) => {
                        drop_rule(
                            &mut plan,
                            "formula_parse_failed",
                            format!(
                                "rule #{position}: formula '{formula_text}' parsing failed: {err}"
                            ),
                        );
                        continue;
                    }
                };

                if formula.target != declared_target.trim() {
                    drop_rule(
                        &mut plan,
                        "target_mismatch",
                        format!(
                            "rule #{position}: formula target '{}' does not match declared target '{declared_target}'",
                            formula.target
                        ),
                    );
                    continue;
                }
                if dimension_set.contains(formula.target.as_str()) {
                    drop_rule(
                        &mut plan,
                        "target_is_dimension",
                        format!(
                            "rule #{position}: target '{}' names a dimension and cannot be derived",
                            formula.target
                        ),
                    );
                    continue;
                }
                if !targets_seen.insert(formula.target.clone()) {
                    drop_rule(
                        &mut plan,
                        "duplicate_target",
                        format!(
                            "rule #{position}: measure '{}' is already produced by an earlier rule",
                            formula.target
                        ),
                    );
                    continue;
                }

                compiled.push(CompiledRule {
                    formula,
                    source_index: index,
                });
            }
            RuleType::Allocation => {
                if rule.target.is_none() || rule.parameters.is_none() {
                    drop_rule(
                        &mut plan,
                        "allocation_missing_fields",
                        format!(
                            "rule #{position} (allocation): missing 'target', 'involved_dimensions', or 'parameters'"
                        ),
                    );
                } else {
                    plan.warnings.push(Issue::warning(
                        "allocation_not_applied",
                        format!("rule #{position} (allocation): accepted but not applied"),
                    ));
                }
            }
            RuleType::Validation => {
                debug!(rule = position, "validation rule is informational only");
            }
        }
    }

    let mut all_measures: BTreeSet<String> = BTreeSet::new();
    for rule in &compiled {
        all_measures.insert(rule.formula.target.clone());
        all_measures.insert(rule.formula.lhs.clone());
        all_measures.insert(rule.formula.rhs.clone());
    }
    all_measures.retain(|name| !dimension_set.contains(name.as_str()));

    plan.derived_measures = compiled
        .iter()
        .map(|rule| rule.formula.target.clone())
        .collect();
    plan.base_measures = all_measures
        .difference(&plan.derived_measures)
        .cloned()
        .collect();
    if all_measures.is_empty() {
        plan.base_measures.insert(DEFAULT_MEASURE.to_string());
    }

    plan.rules = topo_sort(compiled)?;
    Ok(plan)
}

fn drop_rule(plan: &mut RulePlan, code: &str, message: String) {
    warn!(code, message = %message, "dependency rule dropped");
    plan.warnings.push(Issue::warning(code, message));
}

/// Kahn traversal over the derived-measure graph, tie-broken by source
/// position so the order is deterministic. Rules that never become ready
/// sit on a cycle.
fn topo_sort(rules: Vec<CompiledRule>) -> Result<Vec<CompiledRule>, RuleError> {
    if rules.is_empty() {
        return Ok(rules);
    }

    let mut rule_map: BTreeMap<String, CompiledRule> = BTreeMap::new();
    let mut indegree: BTreeMap<String, usize> = BTreeMap::new();
    let mut order_keys: BTreeMap<String, (usize, String)> = BTreeMap::new();
    for rule in rules {
        let target = rule.formula.target.clone();
        order_keys.insert(target.clone(), (rule.source_index, target.clone()));
        indegree.insert(target.clone(), 0);
        rule_map.insert(target, rule);
    }

    let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let targets: Vec<String> = rule_map.keys().cloned().collect();
    for target in &targets {
        let rule = &rule_map[target];
        for operand in [&rule.formula.lhs, &rule.formula.rhs] {
            if rule_map.contains_key(operand) {
                if let Some(entry) = indegree.get_mut(target) {
                    *entry += 1;
                }
                dependents
                    .entry(operand.clone())
                    .or_default()
                    .push(target.clone());
            }
        }
    }

    let mut ready: BTreeSet<(usize, String)> = BTreeSet::new();
    for (target, degree) in &indegree {
        if *degree == 0 {
            if let Some(key) = order_keys.get(target) {
                ready.insert(key.clone());
            }
        }
    }

    let mut ordered = Vec::new();
    while let Some(key) = ready.iter().next().cloned() {
        ready.remove(&key);
        let target = key.1;
        ordered.push(target.clone());

        if let Some(children) = dependents.get(&target) {
            for child in children {
                if let Some(entry) = indegree.get_mut(child) {
                    *entry = entry.saturating_sub(1);
                    if *entry == 0 {
                        if let Some(key) = order_keys.get(child) {
                            ready.insert(key.clone());
                        }
                    }
                }
            }
        }
    }

    if ordered.len() != rule_map.len() {
        let stuck: Vec<String> = indegree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(target, _)| target.clone())
            .collect();
        return Err(RuleError::CyclicRules(stuck.join(", ")));
    }

    Ok(ordered
        .into_iter()
        .filter_map(|target| rule_map.remove(&target))
        .collect())
}

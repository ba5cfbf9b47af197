use epmforge_core::{DependencyRule, RuleType};
use epmforge_rules::{Operator, compile_rules};

fn calculation(target: &str, formula: &str) -> DependencyRule {
    DependencyRule {
        rule_type: RuleType::Calculation,
        formula: Some(formula.to_string()),
        target: Some(target.to_string()),
        involved_dimensions: vec!["Account".to_string()],
        parameters: None,
    }
}

fn dims(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn classifies_base_and_derived_measures() {
    let rules = vec![calculation("Margin", "Margin = Revenue - COGS")];
    let plan = compile_rules(&rules, &dims(&["Account"])).expect("plan compiles");

    let base: Vec<&str> = plan.base_measures.iter().map(String::as_str).collect();
    assert_eq!(base, ["COGS", "Revenue"]);
    let derived: Vec<&str> = plan.derived_measures.iter().map(String::as_str).collect();
    assert_eq!(derived, ["Margin"]);
    assert!(plan.warnings.is_empty());
}

#[test]
fn no_measures_falls_back_to_value() {
    let plan = compile_rules(&[], &dims(&["Region"])).expect("plan compiles");
    let base: Vec<&str> = plan.base_measures.iter().map(String::as_str).collect();
    assert_eq!(base, ["Value"]);
    assert!(plan.derived_measures.is_empty());
}

#[test]
fn dimension_operands_do_not_become_measures() {
    let rules = vec![calculation("Total", "Total = Value + Region")];
    let plan = compile_rules(&rules, &dims(&["Region"])).expect("plan compiles");
    assert!(!plan.base_measures.contains("Region"));
    assert!(plan.base_measures.contains("Value"));
}

#[test]
fn chained_rules_sort_topologically_regardless_of_input_order() {
    let rules = vec![
        calculation("C", "C = B * Factor"),
        calculation("B", "B = A + Base"),
    ];
    let plan = compile_rules(&rules, &dims(&["Account"])).expect("plan compiles");
    let order: Vec<&str> = plan
        .rules
        .iter()
        .map(|rule| rule.formula.target.as_str())
        .collect();
    assert_eq!(order, ["B", "C"]);
}

#[test]
fn rule_cycle_fails_compilation() {
    let rules = vec![
        calculation("A", "A = B + One"),
        calculation("B", "B = A + Two"),
    ];
    assert!(compile_rules(&rules, &dims(&["Account"])).is_err());
}

#[test]
fn multi_operator_formula_is_dropped_with_warning() {
    let rules = vec![
        calculation("Bad", "Bad = A + B * C"),
        calculation("Margin", "Margin = Revenue - COGS"),
    ];
    let plan = compile_rules(&rules, &dims(&["Account"])).expect("plan compiles");
    assert_eq!(plan.rules.len(), 1);
    assert_eq!(plan.rules[0].formula.op, Operator::Sub);
    assert!(
        plan.warnings
            .iter()
            .any(|issue| issue.code == "formula_parse_failed")
    );
}

#[test]
fn calculation_without_formula_is_dropped() {
    let rules = vec![
        DependencyRule {
            rule_type: RuleType::Calculation,
            formula: None,
            target: Some("Margin".to_string()),
            involved_dimensions: vec!["Account".to_string()],
            parameters: None,
        },
        calculation("Margin", "Margin = Revenue - COGS"),
    ];
    let plan = compile_rules(&rules, &dims(&["Account"])).expect("plan compiles");
    assert_eq!(plan.rules.len(), 1);
    assert!(
        plan.warnings
            .iter()
            .any(|issue| issue.code == "calculation_missing_fields")
    );
}

#[test]
fn duplicate_targets_keep_first_rule() {
    let rules = vec![
        calculation("Margin", "Margin = Revenue - COGS"),
        calculation("Margin", "Margin = Revenue * Share"),
    ];
    let plan = compile_rules(&rules, &dims(&["Account"])).expect("plan compiles");
    assert_eq!(plan.rules.len(), 1);
    assert_eq!(plan.rules[0].formula.op, Operator::Sub);
    assert!(
        plan.warnings
            .iter()
            .any(|issue| issue.code == "duplicate_target")
    );
}

#[test]
fn allocation_rule_is_accepted_but_not_applied() {
    let rules = vec![DependencyRule {
        rule_type: RuleType::Allocation,
        formula: None,
        target: Some("Budget".to_string()),
        involved_dimensions: vec!["Department".to_string()],
        parameters: Some(serde_json::json!({"driver": "headcount"})),
    }];
    let plan = compile_rules(&rules, &dims(&["Department"])).expect("plan compiles");
    assert!(plan.rules.is_empty());
    assert!(
        plan.warnings
            .iter()
            .any(|issue| issue.code == "allocation_not_applied")
    );
}

#[test]
fn allocation_missing_parameters_is_dropped() {
    let rules = vec![DependencyRule {
        rule_type: RuleType::Allocation,
        formula: None,
        target: Some("Budget".to_string()),
        involved_dimensions: vec!["Department".to_string()],
        parameters: None,
    }];
    let plan = compile_rules(&rules, &dims(&["Department"])).expect("plan compiles");
    assert!(
        plan.warnings
            .iter()
            .any(|issue| issue.code == "allocation_missing_fields")
    );
}

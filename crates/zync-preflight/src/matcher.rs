//! Condition matching.

use std::collections::HashSet;

use crate::rule::{OperationType, PreflightRule};

/// Values that match a blocking condition.
///
/// - `equal`: a value matches if it is a member of `condition`
/// - `not_equal`: a value matches if it is not a member of `condition`
///
/// Matches keep the order they appear in `values`.
pub fn match_values(operation: OperationType, condition: &[String], values: &[String]) -> Vec<String> {
    let condition: HashSet<&str> = condition.iter().map(String::as_str).collect();

    values
        .iter()
        .filter(|value| {
            let member = condition.contains(value.as_str());
            match operation {
                OperationType::Equal => member,
                OperationType::NotEqual => !member,
            }
        })
        .cloned()
        .collect()
}

/// Match a rule against evaluated values.
pub fn match_rule(rule: &PreflightRule, values: &[String]) -> Vec<String> {
    match_values(rule.operation_type, &rule.condition, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_equal_membership() {
        let matched = match_values(OperationType::Equal, &strings(&["A", "B"]), &strings(&["A", "C"]));
        assert_eq!(matched, vec!["A"]);
    }

    #[test]
    fn test_not_equal_membership() {
        let matched = match_values(OperationType::NotEqual, &strings(&["A"]), &strings(&["A", "B"]));
        assert_eq!(matched, vec!["B"]);
    }

    #[test]
    fn test_not_equal_empty_condition_matches_everything() {
        let matched = match_values(OperationType::NotEqual, &[], &strings(&["x", "y"]));
        assert_eq!(matched, vec!["x", "y"]);
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        let matched = match_values(
            OperationType::Equal,
            &strings(&["b", "a"]),
            &strings(&["a", "c", "b", "a"]),
        );
        assert_eq!(matched, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_no_values_no_matches() {
        assert!(match_values(OperationType::NotEqual, &[], &[]).is_empty());
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let matched = match_values(OperationType::Equal, &strings(&["VRay"]), &strings(&["vray"]));
        assert!(matched.is_empty());
    }
}

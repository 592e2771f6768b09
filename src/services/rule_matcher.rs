//! Segment rule evaluator.
//!
//! Rules are folded left to right. The accumulator starts `true` and the
//! pending combinator starts as AND; each rule's match result is combined
//! into the accumulator using the *previous* rule's `logical_operator`,
//! after which the pending combinator becomes this rule's operator. The
//! last rule's operator is therefore never consulted. An empty rule list
//! matches everything.

use std::collections::HashMap;

use tracing::warn;

use crate::models::{operators, SegmentRule};

pub fn evaluate(fields: &HashMap<String, String>, rules: &[SegmentRule]) -> bool {
    if rules.is_empty() {
        return true;
    }

    let mut result = true;
    let mut pending_operator = "AND";

    for rule in rules {
        let matches = rule_matches(fields, rule);

        match pending_operator {
            "AND" => result = result && matches,
            "OR" => result = result || matches,
            other => {
                warn!(operator = other, "unknown logical operator, skipping combine");
            }
        }

        pending_operator = rule.logical_operator.as_str();
    }

    result
}

fn rule_matches(fields: &HashMap<String, String>, rule: &SegmentRule) -> bool {
    // Field names match case-insensitively; a missing field never matches,
    // whatever the operator.
    let field_value = fields
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(&rule.field_name))
        .map(|(_, value)| value);
    let Some(field_value) = field_value else {
        return false;
    };
    apply_operator(&rule.operator, field_value, &rule.field_value)
}

fn apply_operator(operator: &str, field_value: &str, rule_value: &str) -> bool {
    let field_lower = field_value.to_lowercase();
    let rule_lower = rule_value.to_lowercase();

    match operator {
        operators::EQUALS => field_lower == rule_lower,
        operators::NOT_EQUALS => field_lower != rule_lower,
        operators::CONTAINS => field_lower.contains(&rule_lower),
        operators::NOT_CONTAINS => !field_lower.contains(&rule_lower),
        operators::STARTS_WITH => field_lower.starts_with(&rule_lower),
        operators::ENDS_WITH => field_lower.ends_with(&rule_lower),
        operators::GREATER_THAN => match (field_value.parse::<f64>(), rule_value.parse::<f64>()) {
            (Ok(field), Ok(rule)) => field > rule,
            _ => false,
        },
        operators::LESS_THAN => match (field_value.parse::<f64>(), rule_value.parse::<f64>()) {
            (Ok(field), Ok(rule)) => field < rule,
            _ => false,
        },
        operators::IN => rule_value
            .split(',')
            .any(|candidate| candidate.trim().eq_ignore_ascii_case(field_value)),
        other => {
            // Misconfigured rules must not take the automation down.
            warn!(operator = other, "unknown rule operator, treating as no-match");
            false
        }
    }
}

use serde_json::Value;

/// The sort key used when a constraint has no reported status. Constraints
/// that have never been evaluated sort after any constraint with a count.
const UNKNOWN_VIOLATIONS: i64 = -1;

/// Reads `status.totalViolations` from a constraint object, defaulting to
/// -1 when the status or the field is absent.
pub fn total_violations(constraint: &Value) -> i64 {
    constraint
        .pointer("/status/totalViolations")
        .and_then(Value::as_i64)
        .unwrap_or(UNKNOWN_VIOLATIONS)
}

/// Orders constraints by violation count, most violations first.
///
/// The sort is stable: constraints with equal counts (including all
/// status-less ones) keep their fetch order.
pub fn sort_by_violations(constraints: &mut [Value]) {
    constraints.sort_by(|a, b| total_violations(b).cmp(&total_violations(a)));
}

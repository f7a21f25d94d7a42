// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Minimal predicate evaluator over [`FrameAgg`] field names.
//!
//! Grammar: one atom, or `ATOM && ATOM`, or `ATOM || ATOM`, where an atom
//! is `<field> OP <number>` with OP one of `>`, `<`, `>=`, `<=`, `==`.
//! Unknown fields read 0; an atom that fails to parse evaluates to false.

use dynsoa_core::FrameAgg;

/// Tolerance of the `==` comparison.
const EQ_TOLERANCE: f64 = 1e-9;

/// Operators in match order; two-character operators first so `>=` is not
/// misread as `>`.
const OPS: [&str; 5] = [">=", "<=", "==", ">", "<"];

/// Resolves an aggregate field by name; unknown names read as 0.
pub fn field_value(name: &str, agg: &FrameAgg) -> f64 {
    match name {
        "mean_us" => agg.mean_us,
        "p95_us" => agg.p95_us,
        "p99_us" => agg.p99_us,
        "warp_eff" => agg.warp_eff,
        "branch_div" => agg.branch_div,
        "mem_coalesce" => agg.mem_coalesce,
        "l2_miss" => agg.l2_miss,
        "tail_ratio" => agg.tail_ratio,
        _ => 0.0,
    }
}

fn eval_atom(expr: &str, agg: &FrameAgg) -> bool {
    let expr = expr.trim();
    let Some((op, pos)) = OPS
        .iter()
        .find_map(|op| expr.find(op).map(|pos| (*op, pos)))
    else {
        return false;
    };

    let lhs = expr[..pos].trim();
    let rhs = expr[pos + op.len()..].trim();
    let left = field_value(lhs, agg);
    let Ok(right) = rhs.parse::<f64>() else {
        return false;
    };

    match op {
        ">" => left > right,
        "<" => left < right,
        ">=" => left >= right,
        "<=" => left <= right,
        "==" => (left - right).abs() < EQ_TOLERANCE,
        _ => false,
    }
}

/// Evaluates a trigger predicate against an aggregate.
pub fn evaluate(when: &str, agg: &FrameAgg) -> bool {
    if let Some(pos) = when.find("&&") {
        return eval_atom(&when[..pos], agg) && eval_atom(&when[pos + 2..], agg);
    }
    if let Some(pos) = when.find("||") {
        return eval_atom(&when[..pos], agg) || eval_atom(&when[pos + 2..], agg);
    }
    eval_atom(when, agg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agg(branch_div: f64, mem_coalesce: f64) -> FrameAgg {
        FrameAgg {
            branch_div,
            mem_coalesce,
            ..Default::default()
        }
    }

    #[test]
    fn conjunction_requires_both_atoms() {
        let pred = "branch_div > 0.2 && mem_coalesce < 0.7";
        assert!(evaluate(pred, &agg(0.3, 0.6)));
        assert!(!evaluate(pred, &agg(0.1, 0.6)));
        assert!(!evaluate(pred, &agg(0.3, 0.9)));
    }

    #[test]
    fn disjunction_requires_either_atom() {
        let pred = "branch_div > 0.2 || mem_coalesce < 0.7";
        assert!(evaluate(pred, &agg(0.1, 0.6)));
        assert!(evaluate(pred, &agg(0.3, 0.9)));
        assert!(!evaluate(pred, &agg(0.1, 0.9)));
    }

    #[test]
    fn unknown_field_reads_zero() {
        // "foo" resolves to 0, so equality with 0 holds.
        assert!(evaluate("foo == 0", &agg(0.5, 0.5)));
        assert!(!evaluate("foo > 0", &agg(0.5, 0.5)));
    }

    #[test]
    fn relational_operators() {
        let a = FrameAgg {
            mean_us: 1000.0,
            tail_ratio: 1.25,
            ..Default::default()
        };
        assert!(evaluate("mean_us >= 1000", &a));
        assert!(evaluate("mean_us <= 1000", &a));
        assert!(!evaluate("mean_us > 1000", &a));
        assert!(evaluate("tail_ratio > 1.2", &a));
        assert!(evaluate("mean_us == 1000", &a));
    }

    #[test]
    fn always_true_demo_predicate() {
        assert!(evaluate("mean_us >= 0", &FrameAgg::default()));
    }

    #[test]
    fn whitespace_is_trimmed() {
        let a = FrameAgg {
            warp_eff: 0.5,
            ..Default::default()
        };
        assert!(evaluate("  warp_eff   <   0.8  ", &a));
    }

    #[test]
    fn unparseable_atoms_are_false() {
        let a = FrameAgg::default();
        assert!(!evaluate("mean_us", &a));
        assert!(!evaluate("mean_us > banana", &a));
        assert!(!evaluate("", &a));
        assert!(!evaluate("mean_us >= 0 && garbage", &a));
    }
}

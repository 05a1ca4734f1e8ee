//! Non-fatal conditions raised while sweeping a grid.
//!
//! A [`ConditionReporter`] is created per run and passed explicitly to the
//! cube assembler and the model runner. Each distinct message is logged once;
//! every occurrence is kept so callers can inspect the full list afterwards.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::field::Field;
use crate::runner::ModelParameters;

/// A per-slice or per-cell condition that does not abort a traversal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// An outer-axis combination matched no rows; its slice is NaN.
    EmptySlice { context: Vec<(Field, f64)> },
    /// The model exhausted its iteration budget at these parameters.
    NonConvergence {
        parameters: ModelParameters,
        iterations: u32,
    },
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySlice { context } => {
                let parts: Vec<String> = context
                    .iter()
                    .map(|(field, value)| format!("{} == {}", field, value))
                    .collect();
                write!(f, "there are no matches for {}", parts.join(" and "))
            }
            Self::NonConvergence {
                parameters,
                iterations,
            } => write!(
                f,
                "model did not converge after {} iterations at {}",
                iterations, parameters
            ),
        }
    }
}

/// Run-scoped collector of [`Condition`]s.
#[derive(Debug, Default)]
pub struct ConditionReporter {
    seen: HashSet<String>,
    conditions: Vec<Condition>,
}

impl ConditionReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a condition, logging it the first time its message is seen.
    pub fn report(&mut self, condition: Condition) {
        let message = condition.to_string();
        if self.seen.insert(message.clone()) {
            warn!(condition = %message, "Grid condition");
        }
        self.conditions.push(condition);
    }

    /// Every condition reported so far, in order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Number of distinct messages logged.
    pub fn distinct_count(&self) -> usize {
        self.seen.len()
    }

    /// Outer-axis contexts that produced empty slices.
    pub fn empty_slices(&self) -> impl Iterator<Item = &[(Field, f64)]> {
        self.conditions.iter().filter_map(|c| match c {
            Condition::EmptySlice { context } => Some(context.as_slice()),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn into_conditions(self) -> Vec<Condition> {
        self.conditions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty(value: f64) -> Condition {
        Condition::EmptySlice {
            context: vec![(Field::Temperature, value), (Field::Opr, 3.0)],
        }
    }

    #[test]
    fn test_message_format() {
        assert_eq!(
            empty(20.0).to_string(),
            "there are no matches for temperature == 20 and opr == 3"
        );
    }

    #[test]
    fn test_reporter_keeps_duplicates_but_logs_once() {
        let mut reporter = ConditionReporter::new();
        reporter.report(empty(20.0));
        reporter.report(empty(20.0));
        reporter.report(empty(30.0));

        assert_eq!(reporter.len(), 3);
        assert_eq!(reporter.distinct_count(), 2);
        assert_eq!(reporter.empty_slices().count(), 3);
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::error::{DataTableError, Result};
use super::value::Value;

/// How values of one column combine when rows are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationOp {
    #[default]
    Sum,
    Min,
    Max,
    First,
    Last,
}

impl AggregationOp {
    pub fn label(&self) -> &'static str {
        match self {
            AggregationOp::Sum => "sum",
            AggregationOp::Min => "min",
            AggregationOp::Max => "max",
            AggregationOp::First => "first",
            AggregationOp::Last => "last",
        }
    }

    /// Combine the value already held by the merged row with an incoming one
    pub fn combine(&self, column: &str, existing: Option<&Value>, incoming: &Value) -> Result<Value> {
        let Some(existing) = existing else {
            self.require_numeric(column, incoming)?;
            return Ok(incoming.clone());
        };

        match self {
            AggregationOp::First => Ok(existing.clone()),
            AggregationOp::Last => Ok(incoming.clone()),
            AggregationOp::Sum => {
                self.require_numeric(column, existing)?;
                self.require_numeric(column, incoming)?;
                existing
                    .checked_add(incoming)
                    .ok_or_else(|| self.violation(column, incoming))
            }
            AggregationOp::Min | AggregationOp::Max => {
                let (Some(a), Some(b)) = (existing.as_f64(), incoming.as_f64()) else {
                    return Err(self.violation(column, incoming));
                };
                let keep_existing = if *self == AggregationOp::Min { a <= b } else { a >= b };
                Ok(if keep_existing {
                    existing.clone()
                } else {
                    incoming.clone()
                })
            }
        }
    }

    fn require_numeric(&self, column: &str, value: &Value) -> Result<()> {
        match self {
            AggregationOp::First | AggregationOp::Last => Ok(()),
            _ if value.is_numeric() => Ok(()),
            _ => Err(self.violation(column, value)),
        }
    }

    fn violation(&self, column: &str, value: &Value) -> DataTableError {
        DataTableError::AggregationContractViolation {
            column: column.to_string(),
            reason: format!("cannot {} non-numeric value '{}'", self.label(), value),
        }
    }
}

impl fmt::Display for AggregationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Declared aggregation operator per column; undeclared columns sum
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregationOps(BTreeMap<String, AggregationOp>);

impl AggregationOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, op: AggregationOp) -> Self {
        self.0.insert(column.into(), op);
        self
    }

    pub fn op(&self, column: &str) -> AggregationOp {
        self.0.get(column).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AggregationOp)> {
        self.0.iter()
    }

    /// Union of two declarations; a column declared differently on each side
    /// is a contract violation
    pub fn merge(&self, other: &AggregationOps) -> Result<AggregationOps> {
        let mut merged = self.0.clone();
        for (column, op) in &other.0 {
            match merged.get(column) {
                Some(existing) if existing != op => {
                    return Err(DataTableError::AggregationContractViolation {
                        column: column.clone(),
                        reason: format!("declared as '{}' and as '{}'", existing, op),
                    });
                }
                _ => {
                    merged.insert(column.clone(), *op);
                }
            }
        }
        Ok(AggregationOps(merged))
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(column, op)| (column.clone(), serde_json::Value::from(op.label())))
                .collect(),
        )
    }

    pub(crate) fn from_json(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| DataTableError::MalformedAggregationOps(e.to_string()))
    }
}

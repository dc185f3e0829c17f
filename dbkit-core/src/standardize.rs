//! Uniform result shape for every query-family operation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One result row: column name to JSON value
pub type Row = Map<String, Value>;

/// Mutation metadata reported by INSERT/UPDATE/DELETE and friends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationMeta {
    pub affected_rows: u64,
    pub insert_id: u64,
}

/// What the driver adapter hands back, decided once per statement
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(Vec<Row>),
    Mutation(MutationMeta),
}

/// `{ data, metadata }` as seen by callers.
///
/// At most one side is populated. A read that matched nothing has both
/// sides `None`; callers get no distinction between "zero rows" and "absent".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StandardResult {
    pub data: Option<Vec<Row>>,
    pub metadata: Option<MutationMeta>,
}

impl StandardResult {
    /// First row of `data`, if any
    pub fn first(&self) -> Option<&Row> {
        self.data.as_ref().and_then(|rows| rows.first())
    }
}

pub fn standardize(outcome: QueryOutcome) -> StandardResult {
    match outcome {
        QueryOutcome::Rows(rows) => StandardResult {
            data: (!rows.is_empty()).then_some(rows),
            metadata: None,
        },
        QueryOutcome::Mutation(meta) => StandardResult {
            data: None,
            metadata: Some(meta),
        },
    }
}

//! Kanban board reconciliation.
//!
//! Ideas are bucketed into readiness-range columns and sorted by `order`
//! inside each column. A drag-end gesture is turned into a `DragPlan`:
//! either a batch reorder of one column or a readiness update that moves
//! a card to another column. Planning is pure; `client::BoardSession`
//! applies and sends the plan.

pub mod columns;

use std::collections::BTreeMap;

use playground_common::Idea;
use serde::{Deserialize, Serialize};

pub use columns::{
    ReadinessColumn, column_title, columns_from_registry, default_columns, resolve_columns,
};

/// What the dragged card was released over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Another card, by idea id.
    Card(String),
    /// The empty area of a column, by column key.
    Column(String),
}

/// Mutation implied by a drag-end gesture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DragPlan {
    NoOp,
    /// Full id list of `column` in its new order; becomes `order = i + 1`.
    Reorder { column: String, ids: Vec<String> },
    /// Readiness update to the target column's minimum. `order` is untouched.
    MoveToColumn {
        idea_id: String,
        from: String,
        to: String,
        readiness: i64,
    },
}

impl DragPlan {
    pub fn is_noop(&self) -> bool {
        matches!(self, DragPlan::NoOp)
    }
}

/// Snapshot of ideas grouped into columns.
#[derive(Debug, Clone)]
pub struct Board {
    columns: Vec<ReadinessColumn>,
    lanes: Vec<Vec<String>>,
    unplaced: Vec<String>,
}

impl Board {
    /// Group `ideas` by readiness. Each column is sorted ascending by
    /// `order`, ties broken by id. Ideas outside every range are kept in
    /// `unplaced`.
    pub fn build(columns: Vec<ReadinessColumn>, ideas: &BTreeMap<String, Idea>) -> Self {
        let mut buckets: Vec<Vec<(i64, &String)>> = vec![Vec::new(); columns.len()];
        let mut unplaced = Vec::new();

        for (id, idea) in ideas {
            let readiness = idea.dimensions.readiness;
            match columns.iter().position(|c| c.contains(readiness)) {
                Some(idx) => buckets[idx].push((idea.order, id)),
                None => unplaced.push(id.clone()),
            }
        }

        let lanes = buckets
            .into_iter()
            .map(|mut bucket| {
                bucket.sort();
                bucket.into_iter().map(|(_, id)| id.clone()).collect()
            })
            .collect();

        if !unplaced.is_empty() {
            tracing::debug!(count = unplaced.len(), "Ideas outside every readiness column");
        }

        Self {
            columns,
            lanes,
            unplaced,
        }
    }

    pub fn columns(&self) -> &[ReadinessColumn] {
        &self.columns
    }

    /// Ids in `key`'s column, in display order.
    pub fn ids(&self, key: &str) -> &[String] {
        self.column_index(key)
            .map(|idx| self.lanes[idx].as_slice())
            .unwrap_or(&[])
    }

    /// `(column, ids)` pairs in column order.
    pub fn lanes(&self) -> impl Iterator<Item = (&ReadinessColumn, &[String])> {
        self.columns
            .iter()
            .zip(self.lanes.iter().map(Vec::as_slice))
    }

    pub fn unplaced(&self) -> &[String] {
        &self.unplaced
    }

    /// Column key holding `idea_id`, if it is on the board.
    pub fn column_of(&self, idea_id: &str) -> Option<&str> {
        self.locate(idea_id)
            .map(|(col, _)| self.columns[col].key.as_str())
    }

    fn column_index(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.key == key)
    }

    fn locate(&self, idea_id: &str) -> Option<(usize, usize)> {
        self.lanes.iter().enumerate().find_map(|(col, lane)| {
            lane.iter()
                .position(|id| id == idea_id)
                .map(|pos| (col, pos))
        })
    }

    /// Plan the mutation for dropping `active_id` on `over`.
    ///
    /// - no target, or a source/target not on the board: `NoOp`
    /// - same column: splice `active_id` into the target card's index and
    ///   return the column's full id list; same index or own column zone
    ///   is `NoOp`
    /// - other column: `MoveToColumn` with the target's minimum readiness
    pub fn plan_drag_end(&self, active_id: &str, over: Option<&DropTarget>) -> DragPlan {
        let Some(over) = over else {
            return DragPlan::NoOp;
        };
        let Some((from_col, from_pos)) = self.locate(active_id) else {
            return DragPlan::NoOp;
        };

        let (to_col, to_pos) = match over {
            DropTarget::Card(target_id) => match self.locate(target_id) {
                Some((col, pos)) => (col, Some(pos)),
                None => return DragPlan::NoOp,
            },
            DropTarget::Column(key) => match self.column_index(key) {
                Some(col) => (col, None),
                None => return DragPlan::NoOp,
            },
        };

        if from_col == to_col {
            return match to_pos {
                Some(to_pos) if to_pos != from_pos => {
                    let mut ids = self.lanes[from_col].clone();
                    let moved = ids.remove(from_pos);
                    ids.insert(to_pos, moved);
                    DragPlan::Reorder {
                        column: self.columns[from_col].key.clone(),
                        ids,
                    }
                }
                _ => DragPlan::NoOp,
            };
        }

        let target = &self.columns[to_col];
        DragPlan::MoveToColumn {
            idea_id: active_id.to_string(),
            from: self.columns[from_col].key.clone(),
            to: target.key.clone(),
            readiness: target.min_readiness,
        }
    }
}

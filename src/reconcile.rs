//! Order reconciliation.
//!
//! The display order of employees is the `order` field, which must always be
//! the dense sequence `0..N-1`. After a delete or a move the roster computes
//! the desired sequence locally, then [`plan`] emits one [`OrderUpdate`] per
//! record whose stored order disagrees with its index. The plan is written
//! as a single [`WriteBatch`] tagged with the revision it was computed
//! against, so a concurrent writer makes the batch fail instead of
//! interleaving with it.

use crate::employee::{Employee, ORDER_FIELD};
use crate::store::{FieldUpdate, Fields, Revision, WriteBatch};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdate {
    pub id: String,
    pub order: u32,
}

/// Which way to move an employee in the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(format!("unknown direction `{other}` (expected up or down)")),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

/// Updates that turn `records`, taken in their current sequence, into a
/// dense `0..N-1` order. Records already at their index are skipped.
pub fn plan(records: &[Employee]) -> Vec<OrderUpdate> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, employee)| {
            let index = index as u32;
            (employee.order != Some(index)).then(|| OrderUpdate {
                id: employee.id.clone(),
                order: index,
            })
        })
        .collect()
}

/// Swap the employee `id` with its neighbour in `direction`.
///
/// Returns the new sequence, or `None` when the id is unknown or the move
/// would leave the list.
pub fn move_position(records: &[Employee], id: &str, direction: Direction) -> Option<Vec<Employee>> {
    let from = records.iter().position(|e| e.id == id)?;
    let to = match direction {
        Direction::Up => from.checked_sub(1)?,
        Direction::Down => from + 1,
    };
    if to >= records.len() {
        return None;
    }
    let mut moved = records.to_vec();
    let employee = moved.remove(from);
    moved.insert(to, employee);
    Some(moved)
}

/// Wrap a plan in a batch guarded by `expected`.
pub fn to_batch(updates: &[OrderUpdate], expected: Revision) -> WriteBatch {
    WriteBatch {
        expected_revision: Some(expected),
        updates: updates
            .iter()
            .map(|u| {
                let mut fields = Fields::new();
                fields.insert(ORDER_FIELD.into(), Value::from(u.order));
                FieldUpdate {
                    id: u.id.clone(),
                    fields,
                }
            })
            .collect(),
    }
}

/// Assign each record its index, mirroring a committed plan locally.
pub fn apply_dense(records: &mut [Employee]) {
    for (index, employee) in records.iter_mut().enumerate() {
        employee.order = Some(index as u32);
    }
}

/// Whether the orders are exactly `0..N-1` in sequence.
pub fn is_dense(records: &[Employee]) -> bool {
    records
        .iter()
        .enumerate()
        .all(|(index, e)| e.order == Some(index as u32))
}

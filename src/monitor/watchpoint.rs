/*
Watchpoint pool.

A fixed arena of NR_WP slots. A slot's index is its watchpoint id for
as long as it is allocated. Every slot is either on the free stack or
in the active list, never both. The active list is kept in creation
order, listing and scanning walk it front to back.

Each watchpoint keeps its expression text (for display) and the tree
compiled from it (for the per instruction re-evaluation).
*/

use crate::{
    expr::{error::ExprError, eval::Target, parser::parse, parser::Expr},
    log::trace,
};
use thiserror::Error;

pub const NR_WP: usize = 32;
pub const MAX_EXPR_LEN: usize = 1023;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchError {
    #[error("too many watchpoints, max is {}", NR_WP)]
    PoolExhausted,
    #[error("expression is longer than {} characters", MAX_EXPR_LEN)]
    ExpressionTooLong,
    #[error(transparent)]
    Expr(#[from] ExprError),
}

#[derive(Default)]
struct Slot {
    expr_text: String,
    expr: Option<Expr>,
    value: u32,
    hit_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchInfo {
    pub id: usize,
    pub expression: String,
    pub value: u32,
    pub hit_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchHit {
    pub id: usize,
    pub expression: String,
    pub old: u32,
    pub new: u32,
}

pub struct WatchpointPool {
    slots: Vec<Slot>,
    free: Vec<usize>,
    active: Vec<usize>,
}

impl Default for WatchpointPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchpointPool {
    pub fn new() -> Self {
        Self {
            slots: (0..NR_WP).map(|_| Slot::default()).collect(),
            // popped from the back, so slot 0 goes first
            free: (0..NR_WP).rev().collect(),
            active: Vec::with_capacity(NR_WP),
        }
    }

    pub fn create(&mut self, text: &str, target: &dyn Target) -> Result<usize, WatchError> {
        if self.free.is_empty() {
            return Err(WatchError::PoolExhausted);
        }
        if text.len() > MAX_EXPR_LEN {
            return Err(WatchError::ExpressionTooLong);
        }
        let expr = parse(text)?;
        let value = expr.eval(target)?;

        let Some(id) = self.free.pop() else {
            return Err(WatchError::PoolExhausted);
        };
        self.slots[id] = Slot {
            expr_text: text.to_string(),
            expr: Some(expr),
            value,
            hit_count: 0,
        };
        self.active.push(id);
        trace!("watchpoint {} created: {} = {:#x}", id, text, value);
        Ok(id)
    }

    pub fn delete(&mut self, id: usize) -> bool {
        let Some(pos) = self.active.iter().position(|&a| a == id) else {
            return false;
        };
        self.active.remove(pos);
        self.slots[id] = Slot::default();
        self.free.push(id);
        true
    }

    pub fn clear(&mut self) {
        while let Some(&id) = self.active.last() {
            self.delete(id);
        }
    }

    pub fn list(&self) -> Vec<WatchInfo> {
        self.active
            .iter()
            .map(|&id| {
                let slot = &self.slots[id];
                WatchInfo {
                    id,
                    expression: slot.expr_text.clone(),
                    value: slot.value,
                    hit_count: slot.hit_count,
                }
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    // Re-evaluate everything, return what changed.
    // A watchpoint whose expression can't be evaluated right now (say it
    // dereferences an address that is out of range) just doesn't fire,
    // the rest are still checked
    pub fn scan(&mut self, target: &dyn Target) -> Vec<WatchHit> {
        let mut hits = Vec::new();
        for &id in &self.active {
            let slot = &mut self.slots[id];
            let Some(expr) = &slot.expr else {
                continue;
            };
            let new = match expr.eval(target) {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("watchpoint {} '{}': {}", id, slot.expr_text, e);
                    continue;
                }
            };
            if new != slot.value {
                hits.push(WatchHit {
                    id,
                    expression: slot.expr_text.clone(),
                    old: slot.value,
                    new,
                });
                slot.value = new;
                slot.hit_count = slot.hit_count.saturating_add(1);
            }
        }
        hits
    }
}

/*
The monitor core. It owns the machine, the cpu back end and the
watchpoints. It does not do any ui, the shell (or anything else) drives
it and decides how to show the results.

Nothing in here is global: two monitors can live side by side.
*/

use anyhow::{anyhow, Result};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    expr::eval::evaluate,
    monitor::{
        machine::Machine,
        sim::{Cpu, Sim},
        watchpoint::{WatchInfo, WatchpointPool},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    Stop,
    Running,
    End(u32),
    Abort,
}

pub struct Monitor {
    pub(crate) machine: Machine,
    pub(crate) cpu: Box<dyn Cpu>,
    pub(crate) watch_points: WatchpointPool,
    pub(crate) state: ExecState,
    pub(crate) ticks: u64,
    pub(crate) ctrlc: Arc<AtomicBool>,
}

impl Monitor {
    pub fn new(mem_size: usize) -> Self {
        Self::with_cpu(mem_size, Box::new(Sim))
    }
    pub fn with_cpu(mem_size: usize, cpu: Box<dyn Cpu>) -> Self {
        Self {
            machine: Machine::new(mem_size),
            cpu,
            watch_points: WatchpointPool::new(),
            state: ExecState::Stop,
            ticks: 0,
            ctrlc: Arc::new(AtomicBool::new(false)),
        }
    }
    // hand this to a signal handler to stop a long run
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.ctrlc.clone()
    }
    pub(crate) fn take_interrupt(&self) -> bool {
        self.ctrlc.swap(false, Ordering::SeqCst)
    }

    pub fn evaluate_expression(&self, text: &str) -> Result<u32> {
        evaluate(text, &self.machine).map_err(|e| anyhow!(e))
    }

    pub fn create_watchpoint(&mut self, text: &str) -> Result<usize> {
        let id = self
            .watch_points
            .create(text, &self.machine)
            .map_err(|e| anyhow!(e))?;
        log::info!("watchpoint {} set on '{}'", id, text);
        Ok(id)
    }
    pub fn delete_watchpoint(&mut self, id: usize) -> bool {
        let found = self.watch_points.delete(id);
        if found {
            log::info!("watchpoint {} deleted", id);
        }
        found
    }
    pub fn delete_all_watchpoints(&mut self) {
        self.watch_points.clear();
    }
    pub fn list_watchpoints(&self) -> Vec<WatchInfo> {
        self.watch_points.list()
    }
}

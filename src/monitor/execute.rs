/*
core run code of the monitor.

Runs the cpu one instruction at a time. After every instruction the
watchpoints are re-evaluated. It stops on
- a watchpoint changing value
- the trap instruction (program end)
- an invalid opcode or a memory fault (abort)
- the instruction count running out
- ctrl-c

It runs until it stops. It then returns a StopReason
*/
use anyhow::{bail, Result};
use util::say;

use crate::monitor::{
    core::{ExecState, Monitor},
    sim::ExecOutcome,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Count,
    WatchPoint,
    Trap(u32),
    Invalid { pc: u32, opcode: u8 },
    Interrupted,
    Ended,
}

impl Monitor {
    // count = 0 means run forever
    pub fn execute(&mut self, mut count: u64) -> Result<StopReason> {
        if matches!(self.state, ExecState::End(_) | ExecState::Abort) {
            return Ok(StopReason::Ended);
        }
        let counting = count > 0;
        self.state = ExecState::Running;
        self.take_interrupt();

        let reason = loop {
            let pc = self.machine.regs.eip;
            let outcome = match self.cpu.exec_once(&mut self.machine) {
                Ok(o) => o,
                Err(e) => {
                    self.state = ExecState::Abort;
                    bail!("cpu fault at eip = {:#010x}: {}", pc, e);
                }
            };
            self.ticks += 1;
            match outcome {
                ExecOutcome::Running => {}
                ExecOutcome::Trap(code) => {
                    self.state = ExecState::End(code);
                    break StopReason::Trap(code);
                }
                ExecOutcome::Invalid { pc, opcode } => {
                    self.state = ExecState::Abort;
                    break StopReason::Invalid { pc, opcode };
                }
            }

            if self.step_and_check() {
                break StopReason::WatchPoint;
            }

            // limited number of instructions?
            if counting {
                count -= 1;
                if count == 0 {
                    break StopReason::Count;
                }
            }
            if self.take_interrupt() {
                break StopReason::Interrupted;
            }
        };
        if self.state == ExecState::Running {
            self.state = ExecState::Stop;
        }
        log::debug!("stopped: {:?} after {} instructions", reason, self.ticks);
        Ok(reason)
    }

    // Called after every instruction. Reports every watchpoint that
    // changed and returns true if any did
    pub fn step_and_check(&mut self) -> bool {
        if self.watch_points.is_empty() {
            return false;
        }
        let hits = self.watch_points.scan(&self.machine);
        for hit in &hits {
            log::info!(
                "watchpoint {} '{}' {:#x} -> {:#x}",
                hit.id,
                hit.expression,
                hit.old,
                hit.new
            );
            say!(
                "Hit watchpoint {} at eip = {:#010x}: {}",
                hit.id,
                self.machine.regs.eip,
                hit.expression
            );
            say!("Old value = {:#010x} ({})", hit.old, hit.old);
            say!("New value = {:#010x} ({})", hit.new, hit.new);
        }
        !hits.is_empty()
    }
}

/*
    Simple plumbing code passing requests from shell to the monitor core

*/

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use util::verbose;

use super::{
    core::{ExecState, Monitor},
    machine::{Registers, IMAGE_START},
};

impl Monitor {
    pub fn registers(&self) -> &Registers {
        &self.machine.regs
    }
    pub fn state(&self) -> ExecState {
        self.state
    }
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    // count 4 byte words starting at the value of addr_expr
    pub fn examine(&self, count: usize, addr_expr: &str) -> Result<Vec<(u32, u32)>> {
        let addr = self.evaluate_expression(addr_expr)?;
        // the whole range has to be in memory before anything is read
        let fits = count
            .checked_mul(4)
            .and_then(|len| (addr as usize).checked_add(len))
            .is_some_and(|end| end <= self.machine.mem.size());
        if !fits {
            bail!(
                "{} words at {:#010x} run past the end of memory ({:#x} bytes)",
                count,
                addr,
                self.machine.mem.size()
            );
        }
        let mut words = Vec::with_capacity(count);
        for i in 0..count {
            let a = u32::try_from(addr as usize + 4 * i)?;
            words.push((a, self.machine.mem.read(a, 4)?));
        }
        Ok(words)
    }

    pub fn set_register(&mut self, name: &str, value_expr: &str) -> Result<u32> {
        let v = self.evaluate_expression(value_expr)?;
        let name = name.strip_prefix('$').unwrap_or(name);
        if !self.machine.regs.set(name, v) {
            bail!("unknown register '{}'", name);
        }
        Ok(v)
    }

    // bytes is a hex string, eg "90d6"
    pub fn write_memory(&mut self, addr_expr: &str, bytes: &str) -> Result<usize> {
        let addr = self.evaluate_expression(addr_expr)?;
        let data = hex::decode(bytes).with_context(|| format!("bad hex bytes '{}'", bytes))?;
        self.machine.mem.write_bytes(addr, &data)?;
        Ok(data.len())
    }

    // raw image, loaded at IMAGE_START, restarts execution
    pub fn load_image(&mut self, file: &Path) -> Result<usize> {
        let data = fs::read(file).with_context(|| format!("can't read {}", file.display()))?;
        self.machine.mem.write_bytes(IMAGE_START, &data)?;
        self.machine.reset();
        self.state = ExecState::Stop;
        self.ticks = 0;
        verbose!(
            "Loaded {} bytes from {} at {:#010x}",
            data.len(),
            file.display(),
            IMAGE_START
        );
        Ok(data.len())
    }
}

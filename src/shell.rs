/*
The interactive front end.

Reads lines (rustyline), splits them (shlex) and parses them with the
clap multicall command table in syntax.rs. Each command is a thin call
into the monitor core. Any error is printed and the loop carries on.
*/

use crate::{
    expr::error::ExprError,
    monitor::{
        core::{ExecState, Monitor},
        execute::StopReason,
        machine::REGSL,
    },
    syntax::syntax,
};
use anyhow::{anyhow, Result};
use clap::ArgMatches;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};
use util::say;

static VERBOSE: AtomicBool = AtomicBool::new(false);
const HISTORY: &str = ".db32_history";

fn say_cb(s: &str, v: bool) {
    if !v || VERBOSE.load(Ordering::Relaxed) {
        println!("{}", s);
    }
}

pub struct Shell {
    monitor: Monitor,
}

impl Shell {
    pub fn new(monitor: Monitor, verbose: bool) -> Self {
        VERBOSE.store(verbose, Ordering::Relaxed);
        util::say::set_say_cb(say_cb);
        Self { monitor }
    }

    // install the ctrl-c handler, it only ever stops a running program
    fn trap_ctrlc(&self) -> Result<()> {
        let flag = self.monitor.interrupt_flag();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })?;
        Ok(())
    }

    pub fn shell(&mut self, command_file: Option<PathBuf>) -> Result<()> {
        self.trap_ctrlc()?;
        if let Some(file) = command_file {
            let reader = BufReader::new(File::open(&file)?);
            for line in reader.lines() {
                let line = line?;
                say!("> {}", line);
                if self.dispatch(&line)? {
                    return Ok(());
                }
            }
        }

        let mut rl = DefaultEditor::new()?;
        if rl.load_history(HISTORY).is_err() {
            log::info!("no previous history");
        }
        loop {
            match rl.readline("(db32) ") {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line.as_str())?;
                    if self.dispatch(&line)? {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    say!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    say!("CTRL-D");
                    break;
                }
                Err(err) => {
                    say!("Error: {:?}", err);
                    break;
                }
            }
        }
        if let Err(e) = rl.save_history(HISTORY) {
            log::warn!("failed to save history: {}", e);
        }
        Ok(())
    }

    // run to the end with no prompt, the trap code is the exit code
    pub fn batch(&mut self) -> Result<i32> {
        self.trap_ctrlc()?;
        let reason = self.monitor.execute(0)?;
        self.report(&reason);
        Ok(match reason {
            StopReason::Trap(code) => code as i32,
            _ => 1,
        })
    }

    // true means quit
    fn dispatch(&mut self, line: &str) -> Result<bool> {
        match self.run_command(line) {
            Ok(quit) => Ok(quit),
            Err(e) => {
                match e.downcast_ref::<ExprError>() {
                    Some(ee) if ee.is_syntax() => say!("Bad expression: {}", ee),
                    _ => say!("{}", e),
                }
                Ok(false)
            }
        }
    }

    fn run_command(&mut self, line: &str) -> Result<bool> {
        let args = shlex::split(line).ok_or_else(|| anyhow!("error: Invalid quoting"))?;
        if args.is_empty() {
            return Ok(false);
        }
        let matches = syntax().try_get_matches_from(args)?;
        match matches.subcommand() {
            Some(("continue", _)) => {
                let reason = self.monitor.execute(0)?;
                self.report(&reason);
            }
            Some(("step", args)) => {
                let count = args.get_one::<u64>("count").copied().unwrap_or(1);
                let reason = self.monitor.execute(count)?;
                self.report(&reason);
            }
            Some(("quit", _)) => return Ok(true),
            Some(("info", args)) => match args.get_one::<String>("what").map(|s| s.as_str()) {
                Some("r") => self.print_registers(),
                _ => self.print_watchpoints(),
            },
            Some(("print", args)) => {
                let v = self.monitor.evaluate_expression(&joined(args, "expr"))?;
                say!("{:#010x}  {}", v, v);
            }
            Some(("examine", args)) => {
                let count = args.get_one::<usize>("count").copied().unwrap_or(1);
                for (addr, word) in self.monitor.examine(count, &joined(args, "expr"))? {
                    say!("{:#010x}: {:#010x}", addr, word);
                }
            }
            Some(("watch", args)) => {
                let expr = joined(args, "expr");
                let id = self.monitor.create_watchpoint(&expr)?;
                say!("Watchpoint {}: {}", id, expr);
            }
            Some(("delete", args)) => match args.get_one::<usize>("id") {
                Some(&id) => {
                    if !self.monitor.delete_watchpoint(id) {
                        say!("No watchpoint number {}.", id);
                    }
                }
                None => self.monitor.delete_all_watchpoints(),
            },
            Some(("set", args)) => {
                let reg = args
                    .get_one::<String>("register")
                    .ok_or_else(|| anyhow!("register required"))?;
                let v = self.monitor.set_register(reg, &joined(args, "expr"))?;
                say!("{} = {:#010x}", reg, v);
            }
            Some(("write", args)) => {
                let addr = args
                    .get_one::<String>("address")
                    .ok_or_else(|| anyhow!("address required"))?;
                let bytes = args
                    .get_one::<String>("bytes")
                    .ok_or_else(|| anyhow!("bytes required"))?;
                let n = self.monitor.write_memory(addr, bytes)?;
                say!("wrote {} bytes", n);
            }
            Some(("load", args)) => {
                let file = args
                    .get_one::<String>("file")
                    .ok_or_else(|| anyhow!("file required"))?;
                let n = self.monitor.load_image(&PathBuf::from(file))?;
                say!("Loaded {} bytes", n);
            }
            Some((name, _)) => say!("Unknown command '{}'", name),
            None => unreachable!("subcommand required"),
        }
        Ok(false)
    }

    fn report(&self, reason: &StopReason) {
        let eip = self.monitor.registers().eip;
        match reason {
            StopReason::Count => say!("eip = {:#010x}", eip),
            StopReason::WatchPoint => say!("Stopped at eip = {:#010x}", eip),
            StopReason::Interrupted => say!("Interrupted at eip = {:#010x}", eip),
            StopReason::Trap(code) => {
                let kind = if *code == 0 { "GOOD" } else { "BAD" };
                say!(
                    "db32: HIT {} TRAP at eip = {:#010x}, exit code {}",
                    kind,
                    eip.wrapping_sub(1),
                    code
                );
            }
            StopReason::Invalid { pc, opcode } => {
                say!("invalid opcode {:#04x} at eip = {:#010x}", opcode, pc)
            }
            StopReason::Ended => {
                say!("Program execution has ended. To restart the program, load it again.")
            }
        }
    }

    fn print_registers(&self) {
        let regs = self.monitor.registers();
        for (i, name) in REGSL.iter().enumerate() {
            let v = regs.reg_l(i);
            say!("{:<8}{:#010x}  {}", name, v, v);
        }
        say!("{:<8}{:#010x}", "eip", regs.eip);
        say!("{:<8}{:#010x}  {:?}", "eflags", regs.eflags.bits(), regs.eflags);
        let state = match self.monitor.state() {
            ExecState::Stop => "stopped".to_string(),
            ExecState::Running => "running".to_string(),
            ExecState::End(code) => format!("ended ({})", code),
            ExecState::Abort => "aborted".to_string(),
        };
        say!("{} after {} instructions", state, self.monitor.ticks());
    }

    fn print_watchpoints(&self) {
        let list = self.monitor.list_watchpoints();
        if list.is_empty() {
            say!("No watchpoints.");
            return;
        }
        say!("{:<4}{:<24}{:<12}{}", "NO", "What", "Value", "Hits");
        for wp in list {
            say!(
                "{:<4}{:<24}{:<12}{}",
                wp.id,
                wp.expression,
                format!("{:#x}", wp.value),
                wp.hit_count
            );
        }
    }
}

// multi value expression args are glued back together, so
// p 1 + 2 and p "1 + 2" are the same thing
fn joined(args: &ArgMatches, name: &str) -> String {
    args.get_many::<String>(name)
        .map(|v| v.cloned().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

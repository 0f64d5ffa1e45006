#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]
use crate::{
    log::init_log,
    monitor::{core::Monitor, machine::PMEM_SIZE},
    shell::Shell,
};
use anyhow::{anyhow, Result};
use clap::Parser;
use simplelog::LevelFilter;
use std::path::PathBuf;

mod log;
mod expr {
    pub mod error;
    pub mod eval;
    pub mod lexer;
    pub mod parser;
}
mod monitor {
    pub mod core;
    pub mod execute;
    pub mod machine;
    pub mod plumbing;
    pub mod sim;
    pub mod watchpoint;
}
mod shell;
mod syntax;

#[allow(dead_code)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// raw binary loaded at 0x100000
    #[arg(short, long, value_name = "FILE")]
    image: Option<PathBuf>,

    /// monitor commands run before the prompt
    #[arg(short, long, value_name = "FILE")]
    command_file: Option<PathBuf>,

    /// run the image to the end without a prompt, exit with its trap code
    #[arg(short, long)]
    batch: bool,

    #[arg(short, long)]
    verbose: bool,

    #[arg(long, value_name = "FILE", default_value = "db32.log")]
    log_file: PathBuf,

    #[arg(long, default_value = "error",
        value_parser = ["off", "error", "warn", "info", "debug", "trace"])]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level: LevelFilter = cli
        .log_level
        .parse()
        .map_err(|_| anyhow!("bad log level '{}'", cli.log_level))?;
    init_log(&cli.log_file, level)?;
    println!("db32 i386 monitor {}", built_info::PKG_VERSION);

    let mut monitor = Monitor::new(PMEM_SIZE);
    if let Some(image) = &cli.image {
        monitor.load_image(image)?;
    }
    let mut sh = Shell::new(monitor, cli.verbose);
    if cli.batch {
        let code = sh.batch()?;
        std::process::exit(code);
    }
    sh.shell(cli.command_file)?;
    Ok(())
}

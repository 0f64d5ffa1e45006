use anyhow::Result;
use simplelog::*;

use std::{fs::File, path::Path};

// Tracing for the hot paths (lexer, evaluator, watch scan).
// Compiled out of release builds, goes to stdout under `cargo test`
macro_rules! trace {
    ($fmt:literal, $($arg:expr),*) => {
        #[cfg(debug_assertions)]
        {
            if cfg!(test){
                println!($fmt, $($arg),*);
            } else {
                log::trace!($fmt, $($arg),*);
            }
        }
    };
    ($msg:expr) => {
        #[cfg(debug_assertions)]
        {
            if cfg!(test){
                println!($msg);
            } else {
                log::trace!($msg);
            }
        }
    };
}
pub(crate) use trace;

pub fn init_log(path: &Path, level: LevelFilter) -> Result<()> {
    CombinedLogger::init(vec![WriteLogger::new(
        level,
        ConfigBuilder::new()
            .add_filter_ignore_str("rustyline")
            .build(),
        File::create(path)?,
    )])?;
    Ok(())
}

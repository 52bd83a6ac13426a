use std::{env, fs};

use anyhow::{Context, Result};
use ggcode::parse::parse;

fn main() -> Result<()> {
    env_logger::init();
    let filename = env::args().nth(1).context("file name required")?;
    let input = fs::read_to_string(&filename).with_context(|| format!("reading {}", filename))?;

    match parse(&filename, &input) {
        Err(e) => eprintln!("Parse error: {}\n{}", e, e.excerpt),
        Ok(prog) => {
            for warning in &prog.warnings {
                eprintln!("{}", warning);
            }
            print!("{}", prog);
        }
    }
    Ok(())
}

// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ggcode::{compile, output_path, Config, RuntimeStrings};

#[derive(Parser, Debug)]
#[command(name = "ggcode", version, about = "Compile GGcode programs to G-code")]
struct Cli {
    /// Source files to compile.
    #[arg(required = true, value_name = "FILE")]
    inputs: Vec<PathBuf>,
    /// Exact output file (only with a single input).
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,
    /// Directory for output files.
    #[arg(long = "output-dir", value_name = "DIR", default_value = "Gcode")]
    output_dir: PathBuf,
    /// Print the G-code instead of writing files.
    #[arg(long)]
    stdout: bool,
    /// Omit the N line numbers.
    #[arg(long = "no-line-numbers")]
    no_line_numbers: bool,
    /// Decimal places for argument values (0-6).
    #[arg(short = 'd', long, default_value_t = 3,
          value_parser = clap::value_parser!(u8).range(0..=6))]
    decimals: u8,
    /// Log every executed statement.
    #[arg(long)]
    debug: bool,
}

/// Format of the `time` placeholder in notes.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn timestamp() -> String {
    chrono::Local::now().format(TIME_FORMAT).to_string()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default()
                                  .default_filter_or(if cli.debug { "debug" } else { "warn" }))
        .init();

    if cli.output.is_some() && cli.inputs.len() > 1 {
        bail!("--output can only be used with a single input file");
    }
    let config = Config {
        line_numbers: !cli.no_line_numbers,
        decimals: cli.decimals,
        debug: cli.debug,
        ..Config::default()
    };
    let time = timestamp();

    let mut failed = 0;
    for input in &cli.inputs {
        let source = fs::read_to_string(input)
            .with_context(|| format!("reading {}", input.display()))?;
        let file_name = input.file_name().map_or_else(String::new, |n| n.to_string_lossy().into());
        let result = compile(&source, &config, &RuntimeStrings::new(time.clone(), file_name));

        for diag in &result.diagnostics {
            eprintln!("{}: {}", input.display(), diag);
        }
        if result.lines.is_empty() {
            failed += 1;
            continue;
        }
        let text: String = result.lines.iter().map(|l| format!("{}\n", l)).collect();
        if cli.stdout {
            print!("{}", text);
            continue;
        }
        let out = match &cli.output {
            Some(path) => path.clone(),
            None => {
                fs::create_dir_all(&cli.output_dir)
                    .with_context(|| format!("creating {}", cli.output_dir.display()))?;
                output_path(input, &cli.output_dir)
            }
        };
        fs::write(&out, text).with_context(|| format!("writing {}", out.display()))?;
        eprintln!("{} -> {} ({} statements, {} lines)", input.display(), out.display(),
                  result.stats.statements, result.stats.lines);
    }
    if failed > 0 {
        bail!("{} of {} file(s) failed to compile", failed, cli.inputs.len());
    }
    Ok(())
}

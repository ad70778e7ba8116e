// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "falzwerk")]
#[command(version)]
#[command(about = "Merge, split, protect and convert PDF and image files", long_about = None)]
pub struct Cli {
    /// Engine configuration (JSON). Missing file means defaults.
    #[arg(long, global = true, env = "FALZWERK_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one operation on the given files
    Run {
        /// Operation name, e.g. merge, rotate, pdf2docx
        #[arg(value_name = "OPERATION")]
        operation: String,

        /// Input files, in order
        #[arg(short, long = "input", value_name = "FILE", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Operation parameter, repeatable (e.g. -p pages=1-3 -p degrees=90)
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        /// Document password; kept out of the parameter list and shell history
        #[arg(long, env = "FALZWERK_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Output file (defaults to the artifact's own name in --out-dir)
        #[arg(short, long, value_name = "FILE", conflicts_with = "out_dir")]
        output: Option<PathBuf>,

        /// Directory for the artifact when --output is not given
        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,

        /// Print failures as JSON on stdout
        #[arg(long)]
        json_errors: bool,
    },

    /// Show which capabilities this build can use
    Capabilities,

    /// List operation names
    Operations,
}

/// Parse a single `key=value` pair. The value may itself contain `=`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in {raw:?}"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

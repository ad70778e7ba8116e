// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Falzwerk — command-line front end.
//
// Entry point. Initialises logging, loads the engine configuration, detects
// capabilities, and hands one request to the dispatcher. The process exit
// code reflects the error kind so scripts can react to it.

mod args;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use falzwerk_core::{EngineConfig, ErrorKind, Operation, StructuredError};
use falzwerk_document::{Capabilities, Dispatcher, InputFile};
use tracing::{debug, info};

use args::{Cli, Command};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Operations => {
            for op in Operation::ALL {
                println!("{op}");
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Capabilities => {
            let summary = Capabilities::detect(&config).summary();
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(ExitCode::SUCCESS)
        }

        Command::Run {
            operation,
            inputs,
            params,
            password,
            output,
            out_dir,
            json_errors,
        } => {
            let files = read_inputs(&inputs)?;
            let mut params: HashMap<String, String> = params.into_iter().collect();
            if let Some(password) = password {
                params.entry("password".to_owned()).or_insert(password);
            }

            let dispatcher = Dispatcher::new(config.clone(), Capabilities::detect(&config));
            match dispatcher.execute(&operation, files, &params) {
                Ok(artifact) => {
                    let path = output.unwrap_or_else(|| out_dir.join(&artifact.filename));
                    std::fs::write(&path, &artifact.bytes)
                        .with_context(|| format!("cannot write {}", path.display()))?;
                    info!(
                        path = %path.display(),
                        content_type = %artifact.content_type,
                        bytes_len = artifact.bytes.len(),
                        "Artifact written"
                    );
                    println!("{}", path.display());
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    report(&err, json_errors)?;
                    Ok(exit_code(err.kind))
                }
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let config = EngineConfig::load(path)
        .with_context(|| format!("cannot load configuration from {}", path.display()))?;
    debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

fn read_inputs(paths: &[PathBuf]) -> Result<Vec<InputFile>> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(InputFile::new(name, bytes))
        })
        .collect()
}

fn report(err: &StructuredError, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(err)?);
    } else {
        eprintln!("error [{}]: {}", err.kind, err.message);
        eprintln!("  {}", err.suggestion);
    }
    Ok(())
}

/// Exit status per error kind. 1 is left for failures of the tool itself.
fn exit_code(kind: ErrorKind) -> ExitCode {
    let code = match kind {
        ErrorKind::Internal => 1,
        ErrorKind::InvalidParameter => 2,
        ErrorKind::UnsupportedFormat => 3,
        ErrorKind::Encrypted => 4,
        ErrorKind::WrongCredential => 5,
        ErrorKind::Corrupt => 6,
        ErrorKind::CapabilityUnavailable => 7,
        ErrorKind::ResourceExhausted => 8,
    };
    ExitCode::from(code)
}

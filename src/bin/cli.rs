// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! booltree CLI

use anyhow::{Context, Result};
use booltree::cli::{BoundsFields, ExitStatus, Reporter};
use booltree::config::EngineConfig;
use booltree::csg::CombineRequest;
use booltree::db::Database;
use booltree::ops::{self, BoundsOptions, CombineOptions};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "booltree")]
#[command(about = "Walk assembly trees and evaluate boolean expressions in a geometry database", long_about = None)]
struct Cli {
    /// Geometry database file
    #[arg(value_name = "DATABASE")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to booltree.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate `obj op obj op ...` into a new B-rep object
    Combine {
        /// Triangulate the result
        #[arg(short = 't')]
        triangulate: bool,

        /// Traversal worker threads
        #[arg(short = 'j', long)]
        workers: Option<usize>,

        /// Name of the object to create
        new_name: String,

        /// Objects separated by operators (u, -, n)
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        expression: Vec<String>,
    },

    /// Trace the region walk over objects
    Walk {
        /// Traversal worker threads
        #[arg(short = 'j', long)]
        workers: Option<usize>,

        /// Print every callback
        #[arg(short = 'd')]
        debug: bool,

        #[arg(required = true)]
        objects: Vec<String>,
    },

    /// Report the bounding box of objects
    Bb {
        /// Store the box as a new arb8
        #[arg(short = 'c', value_name = "NAME")]
        create: Option<String>,

        /// Print dimensions
        #[arg(short = 'd')]
        dimensions: bool,

        /// Print min and max extents
        #[arg(short = 'e')]
        extents: bool,

        /// Print the midpoint
        #[arg(short = 'm')]
        midpoint: bool,

        /// Print the box volume
        #[arg(short = 'v')]
        volume: bool,

        /// Oriented box of a single BoT
        #[arg(short = 'o')]
        oriented: bool,

        /// Omit the header line
        #[arg(short = 'q')]
        quiet: bool,

        #[arg(required = true)]
        objects: Vec<String>,
    },

    /// List database objects
    Ls,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let status = if err.use_stderr() {
                ExitStatus::Usage
            } else {
                ExitStatus::Success
            };
            let _ = err.print();
            std::process::exit(status.code());
        }
    };

    let debug = matches!(cli.command, Commands::Walk { debug: true, .. });
    let level = if cli.verbose || debug {
        Level::DEBUG
    } else {
        Level::WARN
    };
    if let Err(err) = tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .finish(),
    ) {
        eprintln!("could not install logger: {}", err);
    }

    std::process::exit(run(&cli).code());
}

fn run(cli: &Cli) -> ExitStatus {
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            Reporter::report_error(&format!("{:#}", err));
            return ExitStatus::Usage;
        }
    };

    let db = match Database::open(&cli.database) {
        Ok(db) => db,
        Err(err) => {
            Reporter::report_error(&format!("{}: {}", cli.database.display(), err));
            return ExitStatus::from(&err);
        }
    };

    match &cli.command {
        Commands::Combine {
            triangulate,
            workers,
            new_name,
            expression,
        } => {
            let request = match CombineRequest::from_args(expression) {
                Ok(request) => request,
                Err(err) => {
                    Reporter::report_error(&err.to_string());
                    return ExitStatus::from(&err);
                }
            };
            let config = match workers {
                Some(workers) => config.with_workers(*workers),
                None => config,
            };
            let options = CombineOptions::new(new_name.clone(), request).triangulate(*triangulate);

            let start = Instant::now();
            match ops::combine(&db, &options, &config) {
                Ok(report) => {
                    if let Err(err) = save(&db, &cli.database) {
                        Reporter::report_error(&format!("{:#}", err));
                        return ExitStatus::Failure;
                    }
                    Reporter::report_combine(&report, start.elapsed());
                    ExitStatus::Success
                }
                Err(err) => {
                    Reporter::report_error(&err.to_string());
                    ExitStatus::from(&err)
                }
            }
        }

        Commands::Walk {
            workers, objects, ..
        } => match ops::walk(&db, objects, workers.unwrap_or(config.workers)) {
            Ok(report) => {
                Reporter::report_walk(&report);
                ExitStatus::Success
            }
            Err(err) => {
                Reporter::report_error(&err.to_string());
                ExitStatus::Failure
            }
        },

        Commands::Bb {
            create,
            dimensions,
            extents,
            midpoint,
            volume,
            oriented,
            quiet,
            objects,
        } => {
            let options = BoundsOptions {
                oriented: *oriented,
                create: create.clone(),
                ..BoundsOptions::default()
            };
            match ops::bounds(&db, objects, &options, config.workers) {
                Ok(report) => {
                    if report.created.is_some() {
                        if let Err(err) = save(&db, &cli.database) {
                            Reporter::report_error(&format!("{:#}", err));
                            return ExitStatus::Failure;
                        }
                    }
                    let fields = BoundsFields {
                        dimensions: *dimensions,
                        extents: *extents,
                        midpoint: *midpoint,
                        volume: *volume,
                        quiet: *quiet,
                    };
                    Reporter::report_bounds(&report, fields);
                    ExitStatus::Success
                }
                Err(err) => {
                    Reporter::report_error(&err.to_string());
                    ExitStatus::from(&err)
                }
            }
        }

        Commands::Ls => {
            Reporter::report_listing(db.title(), &db.entries());
            ExitStatus::Success
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::load().context("Failed to load configuration")?,
    };
    if path.is_some() {
        config
            .apply_overrides(|key| std::env::var(key).ok())
            .context("Invalid environment override")?;
    }
    Ok(config)
}

fn save(db: &Database, path: &Path) -> Result<()> {
    db.save(path)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    info!("saved {}", path.display());
    Ok(())
}

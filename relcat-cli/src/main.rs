// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Relcat CLI entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        // RUST_LOG can still raise it
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "error:".bold().red(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let context = cli::Context::open(cli.config.as_deref(), cli.path.clone(), &cli.user)?;
    match cli.command {
        Commands::CreateCatalog { catalog } => cli::handle_create_catalog(&context, &catalog),
        Commands::DropCatalog { catalog } => cli::handle_drop_catalog(&context, &catalog),
        Commands::ListCatalogs => cli::handle_list_catalogs(&context),
        Commands::Apply { catalog, file } => cli::handle_apply(&context, &catalog, &file),
        Commands::Resolve { catalog, path } => cli::handle_resolve(&context, &catalog, &path),
        Commands::Describe {
            catalog,
            path,
            format,
            at,
        } => cli::handle_describe(&context, &catalog, &path, format, at),
        Commands::Version { catalog, since } => cli::handle_version(&context, &catalog, since),
        Commands::Gc { once, dry_run } => cli::handle_gc(&context, once, dry_run),
    }
}

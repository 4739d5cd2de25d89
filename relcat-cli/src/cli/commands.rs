// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Command line definitions

use clap::{Parser, Subcommand, ValueEnum};
use relcat::SnapshotId;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "relcat", version, about = "Versioned relational catalog models")]
pub struct Cli {
    /// Service configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory; overrides the configured storage path
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,

    /// Principal the commands run as
    #[arg(long, global = true, default_value = "admin")]
    pub user: String,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<log::Level>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty catalog
    CreateCatalog { catalog: String },

    /// Drop a catalog and its history
    DropCatalog { catalog: String },

    /// List catalog ids
    ListCatalogs,

    /// Apply mutations from a JSON file (one mutation or an array)
    Apply { catalog: String, file: PathBuf },

    /// Resolve a resource path and print the references it names
    Resolve { catalog: String, path: String },

    /// Print the representation of a resource
    Describe {
        catalog: String,
        path: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Read the model as of this snapshot
        #[arg(long)]
        at: Option<SnapshotId>,
    },

    /// Print the current model version, or what changed since a snapshot
    Version {
        catalog: String,

        #[arg(long)]
        since: Option<SnapshotId>,
    },

    /// Run the garbage collector
    Gc {
        /// Run a single pass and exit
        #[arg(long)]
        once: bool,

        /// Report what would be purged without deleting
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

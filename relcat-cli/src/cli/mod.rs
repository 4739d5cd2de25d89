// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for relcat
//!
//! Catalog lifecycle, model mutation from JSON files, resource resolution
//! and description, version queries and garbage collection.

pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{Cli, Commands};
pub use handlers::{
    handle_apply, handle_create_catalog, handle_describe, handle_drop_catalog, handle_gc,
    handle_list_catalogs, handle_resolve, handle_version, Context,
};

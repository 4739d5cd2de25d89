// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command handlers for relcat

use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::commands::OutputFormat;
use super::output::{format_change_set, format_gc_result, format_references, DocumentFormatter};
use relcat::resolver::path::encode_name;
use relcat::store::kv::StorageType;
use relcat::{
    AllowAll, CatalogId, GarbageCollector, GcScheduler, MetadataStore, ModelRegistry, Mutation,
    MvccStore, Principal, ServiceConfig, SnapshotId, VersionTracker,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Everything a command needs, opened once per invocation
pub struct Context {
    pub config: ServiceConfig,
    pub store: Arc<dyn MetadataStore>,
    pub registry: ModelRegistry,
    pub tracker: VersionTracker,
    pub principal: Principal,
}

impl Context {
    pub fn open(
        config_file: Option<&Path>,
        path: Option<PathBuf>,
        user: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = match config_file {
            Some(file) => ServiceConfig::from_file(file)?,
            None => ServiceConfig::default(),
        };
        if let Some(path) = path {
            config.storage.storage_type = StorageType::Sled;
            config.storage.path = path;
        }
        config.validate()?;

        let store: Arc<dyn MetadataStore> = Arc::new(MvccStore::open(&config.storage)?);
        // the command line is an administrative tool; access control belongs
        // to the embedding service
        let registry =
            ModelRegistry::new(store.clone(), Arc::new(AllowAll), config.registry.clone());
        let tracker = VersionTracker::new(store.clone());
        Ok(Self {
            config,
            store,
            registry,
            tracker,
            principal: Principal::new(user),
        })
    }
}

/// Accept either a full `/catalog/...` path or one relative to `catalog`
fn qualify(catalog: &str, path: &str) -> String {
    if path.starts_with("/catalog/") {
        return path.to_string();
    }
    let root = format!("/catalog/{}", encode_name(catalog));
    let rest = path.trim_start_matches('/');
    if rest.is_empty() {
        root
    } else {
        format!("{}/{}", root, rest)
    }
}

pub fn handle_create_catalog(context: &Context, catalog: &str) -> CliResult {
    let version = context
        .registry
        .create_catalog(&context.principal, &CatalogId::from(catalog))?;
    println!(
        "{} catalog {} (version {})",
        "Created".bold().green(),
        catalog,
        version
    );
    Ok(())
}

pub fn handle_drop_catalog(context: &Context, catalog: &str) -> CliResult {
    context
        .registry
        .drop_catalog(&context.principal, &CatalogId::from(catalog))?;
    println!("{} catalog {}", "Dropped".bold().yellow(), catalog);
    Ok(())
}

pub fn handle_list_catalogs(context: &Context) -> CliResult {
    let catalogs = context.registry.list_catalogs()?;
    if catalogs.is_empty() {
        println!("{}", "No catalogs".yellow());
    }
    for catalog in catalogs {
        println!("{}", catalog);
    }
    Ok(())
}

/// Apply mutations in file order, each in its own transaction
///
/// Stops at the first failure; earlier mutations stay committed.
pub fn handle_apply(context: &Context, catalog: &str, file: &Path) -> CliResult {
    let text = std::fs::read_to_string(file)?;
    let document: serde_json::Value = serde_json::from_str(&text)?;
    let mutations: Vec<Mutation> = match document {
        serde_json::Value::Array(_) => serde_json::from_value(document)?,
        other => vec![serde_json::from_value(other)?],
    };
    let catalog = CatalogId::from(catalog);
    for (i, mutation) in mutations.iter().enumerate() {
        match context.registry.mutate(&context.principal, &catalog, mutation) {
            Ok(version) => println!(
                "{} {} {} (version {})",
                "✓".green(),
                i + 1,
                mutation.name(),
                version
            ),
            Err(e) => {
                println!("{} {} {}", "✗".red(), i + 1, mutation.name());
                return Err(e.into());
            }
        }
    }
    Ok(())
}

pub fn handle_resolve(context: &Context, catalog: &str, path: &str) -> CliResult {
    let resolution = context.registry.resolve(&qualify(catalog, path))?;
    print!("{}", format_references(&resolution.into_references()));
    Ok(())
}

pub fn handle_describe(
    context: &Context,
    catalog: &str,
    path: &str,
    format: OutputFormat,
    at: Option<SnapshotId>,
) -> CliResult {
    let document = context
        .registry
        .describe(&context.principal, &qualify(catalog, path), at)?;
    print!("{}", DocumentFormatter::format(&document, format));
    Ok(())
}

pub fn handle_version(context: &Context, catalog: &str, since: Option<SnapshotId>) -> CliResult {
    let catalog = CatalogId::from(catalog);
    let current = context.tracker.current_version(&catalog)?;
    println!("{} {}", "Model version:".bold(), current);
    if let Some(since) = since {
        let changes = context.tracker.changes_since(&catalog, since)?;
        print!("{}", format_change_set(since, &changes));
    }
    Ok(())
}

pub fn handle_gc(context: &Context, once: bool, dry_run: bool) -> CliResult {
    let mut policy = context.config.gc.clone();
    policy.dry_run |= dry_run;
    let collector = Arc::new(GarbageCollector::new(context.store.clone(), policy));

    if once {
        let result = collector.run_once()?;
        print!("{}", format_gc_result(&result, collector.policy().dry_run));
        return Ok(());
    }

    let scheduler = GcScheduler::new(collector);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let Some(handle) = scheduler.spawn() else {
            println!("{}", "Garbage collection is disabled in the configuration".yellow());
            return Ok::<(), Box<dyn std::error::Error>>(());
        };
        println!("Garbage collector running; press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
        scheduler.shutdown();
        handle.await?;
        println!("Completed {} passes", scheduler.passes());
        Ok(())
    })
}

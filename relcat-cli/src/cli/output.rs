// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result formatting for CLI output

use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use relcat::{ChangeSet, GcResult, Reference, SnapshotId};
use serde_json::Value;

use super::commands::OutputFormat;

/// Formatter for resource representations
pub struct DocumentFormatter;

impl DocumentFormatter {
    pub fn format(document: &Value, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => Self::format_json(document),
            OutputFormat::Table => Self::format_table(document),
        }
    }

    fn format_json(document: &Value) -> String {
        let mut text = serde_json::to_string_pretty(document)
            .unwrap_or_else(|_| "{\"error\": \"Could not serialize representation\"}".to_string());
        text.push('\n');
        text
    }

    /// Tables for model objects, plain text for comments
    fn format_table(document: &Value) -> String {
        match document {
            Value::String(text) => format!("{}\n", text),
            Value::Array(items) => Self::format_listing(items),
            Value::Object(map) if map.contains_key("column_definitions") => {
                Self::format_model_table(document)
            }
            Value::Object(map) if map.contains_key("tables") => Self::format_schema(document),
            Value::Object(map) if map.contains_key("schemas") => Self::format_catalog(document),
            other => Self::format_json(other),
        }
    }

    fn format_listing(items: &[Value]) -> String {
        if items.is_empty() {
            return format!("{}\n", "No resources found".yellow());
        }
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            Cell::new("resource").fg(Color::Green),
            Cell::new("kind").fg(Color::Green),
            Cell::new("comment").fg(Color::Green),
        ]);
        for item in items {
            match item.get("resource") {
                Some(resource) => table.add_row(vec![
                    text(resource),
                    item.get("kind").map(text).unwrap_or_default(),
                    item.get("comment").map(text).unwrap_or_default(),
                ]),
                // annotation documents carry no resource field
                None => table.add_row(vec![item.to_string(), String::new(), String::new()]),
            };
        }
        format!("{}\n", table)
    }

    fn format_model_table(document: &Value) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{} {}:{} ({})\n",
            "Table".bold().green(),
            field(document, "schema_name"),
            field(document, "table_name"),
            field(document, "kind")
        ));
        if let Some(comment) = document.get("comment").filter(|c| !c.is_null()) {
            output.push_str(&format!("{}\n", text(comment).italic()));
        }

        let mut columns = Table::new();
        columns.load_preset(UTF8_FULL);
        columns.set_header(vec![
            Cell::new("column").fg(Color::Green),
            Cell::new("type").fg(Color::Green),
            Cell::new("nullok").fg(Color::Green),
            Cell::new("comment").fg(Color::Green),
        ]);
        for column in array(document, "column_definitions") {
            columns.add_row(vec![
                field(column, "name"),
                field(column, "type"),
                field(column, "nullok"),
                column.get("comment").map(text).unwrap_or_default(),
            ]);
        }
        output.push_str(&format!("{}\n", columns));

        let mut constraints = Table::new();
        constraints.load_preset(UTF8_FULL);
        constraints.set_header(vec![
            Cell::new("constraint").fg(Color::Green),
            Cell::new("kind").fg(Color::Green),
            Cell::new("resource").fg(Color::Green),
        ]);
        for key in array(document, "keys") {
            constraints.add_row(vec![
                format!("key ({})", joined(key, "unique_columns")),
                field(key, "kind"),
                field(key, "resource"),
            ]);
        }
        for fk in array(document, "foreign_keys") {
            let columns: Vec<String> = array(fk, "foreign_key_columns")
                .iter()
                .map(|c| field(c, "column_name"))
                .collect();
            constraints.add_row(vec![
                format!("foreign key ({})", columns.join(",")),
                field(fk, "kind"),
                field(fk, "resource"),
            ]);
        }
        output.push_str(&format!("{}\n", constraints));
        output
    }

    fn format_schema(document: &Value) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            Cell::new("table").fg(Color::Green),
            Cell::new("kind").fg(Color::Green),
            Cell::new("columns").fg(Color::Green),
        ]);
        if let Some(Value::Object(tables)) = document.get("tables") {
            for (name, t) in tables {
                table.add_row(vec![
                    name.clone(),
                    field(t, "kind"),
                    array(t, "column_definitions").len().to_string(),
                ]);
            }
        }
        format!(
            "{} {}\n{}\n",
            "Schema".bold().green(),
            field(document, "schema_name"),
            table
        )
    }

    fn format_catalog(document: &Value) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            Cell::new("schema").fg(Color::Green),
            Cell::new("tables").fg(Color::Green),
        ]);
        if let Some(Value::Object(schemas)) = document.get("schemas") {
            for (name, s) in schemas {
                let count = s.get("tables").and_then(Value::as_object).map_or(0, |t| t.len());
                table.add_row(vec![name.clone(), count.to_string()]);
            }
        }
        format!(
            "{} {} (version {})\n{}\n",
            "Catalog".bold().green(),
            field(document, "catalog_id"),
            field(document, "version"),
            table
        )
    }
}

pub fn format_references(references: &[Reference]) -> String {
    if references.is_empty() {
        return format!("{}\n", "No resources found".yellow());
    }
    let mut output = String::new();
    for reference in references {
        let kind = serde_json::to_value(reference)
            .ok()
            .and_then(|v| v.get("kind").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default();
        output.push_str(&format!("{:<12} {}\n", kind.cyan(), reference.to_path()));
    }
    output
}

pub fn format_change_set(since: SnapshotId, changes: &ChangeSet) -> String {
    if changes.is_empty() {
        return format!("{}\n", format!("No changes since {}", since).yellow());
    }
    let mut output = format!("{} {}\n", "Changes since".bold(), since);
    if changes.model_changed {
        output.push_str("  model changed\n");
    }
    for table in &changes.tables {
        output.push_str(&format!("  data changed: {}\n", table));
    }
    output
}

pub fn format_gc_result(result: &GcResult, dry_run: bool) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("rows").fg(Color::Green),
        Cell::new(if dry_run { "would purge" } else { "purged" }).fg(Color::Green),
    ]);
    for (label, count) in [
        ("model versions", result.model_versions_purged),
        ("data versions", result.data_versions_purged),
        ("comments", result.comments_purged),
        ("annotations", result.annotations_purged),
        ("pseudo keys", result.pseudo_keys_purged),
        ("pseudo foreign keys", result.pseudo_foreign_keys_purged),
    ] {
        table.add_row(vec![label.to_string(), count.to_string()]);
    }

    let mut output = format!(
        "{} {} catalogs\n{}\n",
        "Collected".bold().green(),
        result.catalogs_collected,
        table
    );
    if result.has_skips() {
        output.push_str(&format!("\n{}\n", "Skipped:".bold().yellow()));
        for (catalog, reason) in &result.skipped {
            output.push_str(&format!("  {}: {}\n", catalog, reason.yellow()));
        }
    }
    output
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn field(value: &Value, name: &str) -> String {
    value.get(name).map(text).unwrap_or_default()
}

fn array<'v>(value: &'v Value, name: &str) -> &'v [Value] {
    value
        .get(name)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn joined(value: &Value, name: &str) -> String {
    array(value, name).iter().map(text).collect::<Vec<_>>().join(",")
}

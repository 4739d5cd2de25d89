// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! JSON representations of resolved resources
//!
//! Every object document carries a `resource` field holding its canonical
//! path, so a client can feed it straight back into the resolver.

use crate::error::{CatalogError, CatalogResult};
use crate::model::{Column, ForeignKey, Key, ModelSnapshot, Schema, Table, TableName};
use crate::resolver::{locate, ColumnList, ColumnMapping, ObjectRef, Reference, Resolution};
use serde_json::{json, Map, Value};

/// Render a resolution: one document, or an array for listings
pub fn render(snapshot: &ModelSnapshot, resolution: &Resolution) -> CatalogResult<Value> {
    match resolution {
        Resolution::One(reference) => render_reference(snapshot, reference),
        Resolution::Many(references) => references
            .iter()
            .map(|r| render_reference(snapshot, r))
            .collect::<CatalogResult<Vec<_>>>()
            .map(Value::Array),
    }
}

pub fn render_reference(snapshot: &ModelSnapshot, reference: &Reference) -> CatalogResult<Value> {
    match reference {
        Reference::Comment { subject } => locate(snapshot, subject)?
            .comment()
            .map(|c| Value::String(c.to_string()))
            .ok_or_else(|| CatalogError::NotFound(format!("comment on {}", subject.to_path()))),
        Reference::Annotation { subject, key } => locate(snapshot, subject)?
            .annotations()
            .get(key)
            .cloned()
            .ok_or_else(|| {
                CatalogError::NotFound(format!("annotation {} on {}", key, subject.to_path()))
            }),
        _ => Ok(render_object(snapshot, reference, locate(snapshot, reference)?)),
    }
}

fn render_object(snapshot: &ModelSnapshot, reference: &Reference, object: ObjectRef<'_>) -> Value {
    let catalog = snapshot.catalog();
    match object {
        ObjectRef::Catalog(graph) => {
            let schemas: Map<String, Value> = graph
                .schemas
                .values()
                .map(|s| (s.name.clone(), schema_doc(snapshot, s)))
                .collect();
            json!({
                "resource": reference.to_path(),
                "catalog_id": catalog.as_str(),
                "version": graph.version.id(),
                "snapshot": graph.snapshot.id(),
                "annotations": graph.annotations,
                "schemas": schemas,
            })
        }
        ObjectRef::Schema(schema) => schema_doc(snapshot, schema),
        ObjectRef::Table(table) => table_doc(snapshot, table),
        ObjectRef::Column(table, column) => column_doc(snapshot, table, column),
        // keep the column order the caller named
        ObjectRef::Key(table, key) => key_doc(reference.to_path(), table, key),
        ObjectRef::ForeignKey(table, fk) => fk_doc(reference.to_path(), table, fk),
    }
}

fn schema_doc(snapshot: &ModelSnapshot, schema: &Schema) -> Value {
    let reference = Reference::Schema {
        catalog: snapshot.catalog().clone(),
        schema: schema.name.clone(),
    };
    let tables: Map<String, Value> = schema
        .tables
        .values()
        .map(|t| (t.name.table.clone(), table_doc(snapshot, t)))
        .collect();
    json!({
        "resource": reference.to_path(),
        "schema_name": schema.name,
        "comment": schema.comment,
        "annotations": schema.annotations,
        "tables": tables,
    })
}

fn table_doc(snapshot: &ModelSnapshot, table: &Table) -> Value {
    let reference = Reference::Table {
        catalog: snapshot.catalog().clone(),
        table: table.name.clone(),
    };
    let columns: Vec<Value> = table
        .columns
        .iter()
        .map(|c| column_doc(snapshot, table, c))
        .collect();
    let keys: Vec<Value> = table
        .keys
        .iter()
        .map(|k| {
            let path = Reference::Key {
                catalog: snapshot.catalog().clone(),
                table: table.name.clone(),
                columns: ColumnList::new(k.columns.clone()),
            }
            .to_path();
            key_doc(path, table, k)
        })
        .collect();
    let foreign_keys: Vec<Value> = table
        .foreign_keys
        .iter()
        .map(|fk| {
            let path = Reference::ForeignKey {
                catalog: snapshot.catalog().clone(),
                table: table.name.clone(),
                mapping: ColumnMapping::new(fk.pairs()),
                referenced: fk.referenced.clone(),
            }
            .to_path();
            fk_doc(path, table, fk)
        })
        .collect();
    json!({
        "resource": reference.to_path(),
        "schema_name": table.name.schema,
        "table_name": table.name.table,
        "kind": table.kind.to_string(),
        "comment": table.comment,
        "annotations": table.annotations,
        "column_definitions": columns,
        "keys": keys,
        "foreign_keys": foreign_keys,
    })
}

fn column_doc(snapshot: &ModelSnapshot, table: &Table, column: &Column) -> Value {
    let reference = Reference::Column {
        catalog: snapshot.catalog().clone(),
        table: table.name.clone(),
        column: column.name.clone(),
    };
    json!({
        "resource": reference.to_path(),
        "name": column.name,
        "type": column.type_name,
        "nullok": column.nullok,
        "comment": column.comment,
        "annotations": column.annotations,
    })
}

fn key_doc(resource: String, table: &Table, key: &Key) -> Value {
    json!({
        "resource": resource,
        "unique_columns": key.columns,
        "names": constraint_names(&table.name, key.name.as_deref()),
        "kind": key.kind.to_string(),
        "comment": key.comment,
        "annotations": key.annotations,
    })
}

fn fk_doc(resource: String, table: &Table, fk: &ForeignKey) -> Value {
    json!({
        "resource": resource,
        "foreign_key_columns": column_refs(&table.name, &fk.columns),
        "referenced_columns": column_refs(&fk.referenced, &fk.referenced_columns),
        "names": constraint_names(&table.name, fk.name.as_deref()),
        "kind": fk.kind.to_string(),
        "comment": fk.comment,
        "annotations": fk.annotations,
    })
}

fn column_refs(table: &TableName, columns: &[String]) -> Vec<Value> {
    columns
        .iter()
        .map(|c| {
            json!({
                "schema_name": table.schema,
                "table_name": table.table,
                "column_name": c,
            })
        })
        .collect()
}

fn constraint_names(table: &TableName, name: Option<&str>) -> Vec<Value> {
    name.map(|n| vec![json!([table.schema, n])]).unwrap_or_default()
}

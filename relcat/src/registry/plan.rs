// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Mutation planning
//!
//! Validates a mutation against a model snapshot and lowers it to store
//! statements. Planning is pure: nothing here touches the store, so every
//! name and validation error surfaces before a transaction is opened.

use super::mutation::{ColumnDef, ForeignKeyDef, KeyDef, Mutation, TableDef};
use super::naming::constraint_name;
use crate::authz::Action;
use crate::config::RegistryConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::model::graph::{same_column_pairs, same_column_set};
use crate::model::{ConstraintKind, MetadataTarget, ModelSnapshot, Table, TableKind, TableName};
use crate::resolver::{locate, parse, resolve, Reference};
use crate::store::{
    NativeColumn, NativeForeignKey, NativeKey, NativeTable, PseudoForeignKeyRow, PseudoKeyRow,
    Statement,
};
use std::collections::HashSet;

/// Object a mutation acts on, and the action the principal needs on it
pub fn authorization_target(
    snapshot: &ModelSnapshot,
    mutation: &Mutation,
) -> CatalogResult<(Reference, Action)> {
    let catalog = snapshot.catalog().clone();
    let table_ref = |schema: &str, table: &str| Reference::Table {
        catalog: catalog.clone(),
        table: TableName::new(schema, table),
    };
    let target = match mutation {
        Mutation::CreateSchema { .. } => (
            Reference::Catalog {
                catalog: catalog.clone(),
            },
            Action::Create,
        ),
        Mutation::DropSchema { schema } => (
            Reference::Schema {
                catalog: catalog.clone(),
                schema: schema.clone(),
            },
            Action::Drop,
        ),
        Mutation::CreateTable { schema, .. } => (
            Reference::Schema {
                catalog: catalog.clone(),
                schema: schema.clone(),
            },
            Action::Create,
        ),
        Mutation::DropTable { schema, table } => (table_ref(schema, table), Action::Drop),
        Mutation::AddColumn { schema, table, .. }
        | Mutation::DropColumn { schema, table, .. }
        | Mutation::AddKey { schema, table, .. }
        | Mutation::DropKey { schema, table, .. }
        | Mutation::AddForeignKey { schema, table, .. }
        | Mutation::DropForeignKey { schema, table, .. } => {
            (table_ref(schema, table), Action::Alter)
        }
        Mutation::SetComment { resource, .. }
        | Mutation::SetAnnotation { resource, .. }
        | Mutation::DeleteAnnotation { resource, .. } => {
            (metadata_subject(snapshot, resource)?, Action::Alter)
        }
    };
    Ok(target)
}

/// Lower `mutation` to the statements of one transaction
pub fn plan_mutation(
    snapshot: &ModelSnapshot,
    mutation: &Mutation,
    config: &RegistryConfig,
) -> CatalogResult<Vec<Statement>> {
    let mut planner = Planner {
        snapshot,
        config,
        statements: Vec::new(),
    };
    planner.plan(mutation)?;
    Ok(planner.statements)
}

/// The single object a comment or annotation mutation addresses
fn metadata_subject(snapshot: &ModelSnapshot, resource: &str) -> CatalogResult<Reference> {
    let path = parse(resource)?;
    if path.is_listing() {
        return Err(CatalogError::MalformedName(format!(
            "{} is a listing, not a single resource",
            resource
        )));
    }
    match resolve(snapshot, &path)?.single() {
        Some(reference) => Ok(reference.subject().clone()),
        None => Err(CatalogError::AmbiguousName(format!(
            "{} names more than one resource",
            resource
        ))),
    }
}

struct Planner<'a> {
    snapshot: &'a ModelSnapshot,
    config: &'a RegistryConfig,
    statements: Vec<Statement>,
}

impl<'a> Planner<'a> {
    fn plan(&mut self, mutation: &Mutation) -> CatalogResult<()> {
        let snapshot = self.snapshot;
        match mutation {
            Mutation::CreateSchema { schema, comment } => {
                self.check_identifier("schema", schema)?;
                if snapshot.graph().schema(schema).is_some() {
                    return Err(CatalogError::InvalidModel(format!(
                        "schema {} already exists",
                        schema
                    )));
                }
                self.push(Statement::CreateSchema {
                    schema: schema.clone(),
                });
                if let Some(comment) = comment {
                    self.push(Statement::SetComment {
                        target: MetadataTarget::schema(schema.as_str()),
                        comment: Some(comment.clone()),
                    });
                }
            }
            Mutation::DropSchema { schema } => {
                snapshot.schema(schema)?;
                self.push(Statement::DropSchema {
                    schema: schema.clone(),
                });
                self.push(Statement::PurgeOrphans);
            }
            Mutation::CreateTable { schema, table } => self.create_table(schema, table)?,
            Mutation::DropTable { schema, table } => {
                let name = TableName::new(schema.as_str(), table.as_str());
                snapshot.table(&name)?;
                self.push(Statement::DropTable { table: name });
                self.push(Statement::PurgeOrphans);
            }
            Mutation::AddColumn {
                schema,
                table,
                column,
            } => {
                let name = TableName::new(schema.as_str(), table.as_str());
                let existing = snapshot.table(&name)?;
                self.check_identifier("column", &column.name)?;
                if existing.column(&column.name).is_some() {
                    return Err(CatalogError::InvalidModel(format!(
                        "column {} already exists in {}",
                        column.name, name
                    )));
                }
                self.push(Statement::AddColumn {
                    table: name.clone(),
                    column: native_column(column),
                });
                if let Some(comment) = &column.comment {
                    self.push(Statement::SetComment {
                        target: MetadataTarget::column(name.clone(), column.name.as_str()),
                        comment: Some(comment.clone()),
                    });
                }
                self.push(Statement::RecordDataChange { table: name });
            }
            Mutation::DropColumn {
                schema,
                table,
                column,
            } => {
                let name = TableName::new(schema.as_str(), table.as_str());
                let existing = snapshot.table(&name)?;
                if existing.column(column).is_none() {
                    return Err(CatalogError::NotFound(format!("column {}:{}", name, column)));
                }
                if existing.columns.len() == 1 {
                    return Err(CatalogError::InvalidModel(format!(
                        "cannot drop {}, the only column of {}",
                        column, name
                    )));
                }
                self.push(Statement::DropColumn {
                    table: name.clone(),
                    column: column.clone(),
                });
                self.push(Statement::PurgeOrphans);
                self.push(Statement::RecordDataChange { table: name });
            }
            Mutation::AddKey { schema, table, key } => {
                let name = TableName::new(schema.as_str(), table.as_str());
                let existing = snapshot.table(&name)?;
                check_columns(&name, &key.columns, |c| existing.column(c).is_some())?;
                if existing.key(&key.columns).is_some() {
                    return Err(CatalogError::InvalidModel(format!(
                        "key ({}) already exists on {}",
                        key.columns.join(","),
                        name
                    )));
                }
                let kind = key_kind(existing.kind);
                self.add_key(&name, kind, key)?;
            }
            Mutation::DropKey {
                schema,
                table,
                columns,
            } => self.drop_key(&TableName::new(schema.as_str(), table.as_str()), columns)?,
            Mutation::AddForeignKey {
                schema,
                table,
                foreign_key,
            } => {
                let name = TableName::new(schema.as_str(), table.as_str());
                let existing = snapshot.table(&name)?;
                check_columns(&name, &foreign_key.columns, |c| existing.column(c).is_some())?;
                let referenced = TableName::new(
                    foreign_key.referenced_schema.as_str(),
                    foreign_key.referenced_table.as_str(),
                );
                let target = snapshot.table(&referenced)?;
                let referenced_kind = referenced_key_kind(target, foreign_key)?;
                let pairs = fk_pairs(foreign_key);
                if existing.foreign_key(&pairs, &referenced).is_some() {
                    return Err(CatalogError::InvalidModel(format!(
                        "foreign key ({}) on {} referencing {} already exists",
                        foreign_key.columns.join(","),
                        name,
                        referenced
                    )));
                }
                let kind = fk_kind(existing.kind, target.kind, referenced_kind);
                self.add_foreign_key(&name, kind, foreign_key)?;
            }
            Mutation::DropForeignKey {
                schema,
                table,
                columns,
                referenced_schema,
                referenced_table,
                referenced_columns,
            } => {
                let name = TableName::new(schema.as_str(), table.as_str());
                let referenced =
                    TableName::new(referenced_schema.as_str(), referenced_table.as_str());
                if columns.len() != referenced_columns.len() {
                    return Err(CatalogError::MalformedName(format!(
                        "foreign key maps {} columns to {}",
                        columns.len(),
                        referenced_columns.len()
                    )));
                }
                let pairs: Vec<(String, String)> = columns
                    .iter()
                    .cloned()
                    .zip(referenced_columns.iter().cloned())
                    .collect();
                let existing = snapshot.table(&name)?;
                let fk = existing.foreign_key(&pairs, &referenced).ok_or_else(|| {
                    CatalogError::NotFound(format!(
                        "foreign key ({}) on {} referencing {}",
                        columns.join(","),
                        name,
                        referenced
                    ))
                })?;
                let statement = match fk.kind {
                    ConstraintKind::Real => Statement::DropForeignKey {
                        table: name,
                        pairs,
                        referenced,
                    },
                    ConstraintKind::Pseudo => Statement::DeletePseudoForeignKey {
                        table: name,
                        pairs,
                        referenced,
                    },
                };
                self.push(statement);
                self.push(Statement::PurgeOrphans);
            }
            Mutation::SetComment { resource, comment } => {
                let subject = metadata_subject(snapshot, resource)?;
                if matches!(subject, Reference::Catalog { .. }) {
                    return Err(CatalogError::InvalidModel(
                        "catalogs do not carry comments".to_string(),
                    ));
                }
                self.push(Statement::SetComment {
                    target: subject.metadata_target(),
                    comment: comment.clone(),
                });
            }
            Mutation::SetAnnotation {
                resource,
                key,
                value,
            } => {
                if key.is_empty() {
                    return Err(CatalogError::MalformedName(
                        "annotation key must not be empty".to_string(),
                    ));
                }
                let subject = metadata_subject(snapshot, resource)?;
                self.push(Statement::SetAnnotation {
                    target: subject.metadata_target(),
                    key: key.clone(),
                    document: serde_json::to_string(value)?,
                });
            }
            Mutation::DeleteAnnotation { resource, key } => {
                let subject = metadata_subject(snapshot, resource)?;
                let object = locate(snapshot, &subject)?;
                if !object.annotations().contains_key(key) {
                    return Err(CatalogError::NotFound(format!(
                        "annotation {} on {}",
                        key,
                        subject.to_path()
                    )));
                }
                self.push(Statement::DeleteAnnotation {
                    target: subject.metadata_target(),
                    key: key.clone(),
                });
            }
        }
        self.push(Statement::RecordModelChange);
        Ok(())
    }

    fn create_table(&mut self, schema: &str, def: &TableDef) -> CatalogResult<()> {
        let snapshot = self.snapshot;
        snapshot.schema(schema)?;
        let name = TableName::new(schema, def.name.as_str());
        self.check_identifier("table", &def.name)?;
        if snapshot.table(&name).is_ok() {
            return Err(CatalogError::InvalidModel(format!("table {} already exists", name)));
        }
        if def.columns.is_empty() {
            return Err(CatalogError::InvalidModel(format!("table {} has no columns", name)));
        }
        let mut seen = HashSet::new();
        for column in &def.columns {
            self.check_identifier("column", &column.name)?;
            if !seen.insert(column.name.as_str()) {
                return Err(CatalogError::InvalidModel(format!(
                    "column {} declared twice in {}",
                    column.name, name
                )));
            }
        }
        if self.config.require_primary_keys && def.kind == TableKind::Table && def.keys.is_empty() {
            return Err(CatalogError::InvalidModel(format!(
                "table {} must declare at least one key",
                name
            )));
        }

        let table_key_kind = key_kind(def.kind);
        let mut native = NativeTable {
            name: def.name.clone(),
            kind: def.kind,
            columns: def.columns.iter().map(native_column).collect(),
            keys: Vec::new(),
            foreign_keys: Vec::new(),
        };
        let mut pseudo = Vec::new();
        let mut declared_keys: Vec<&KeyDef> = Vec::new();
        for key in &def.keys {
            check_columns(&name, &key.columns, |c| seen.contains(c))?;
            if declared_keys
                .iter()
                .any(|k| same_column_set(&k.columns, &key.columns))
            {
                return Err(CatalogError::InvalidModel(format!(
                    "key ({}) declared twice on {}",
                    key.columns.join(","),
                    name
                )));
            }
            declared_keys.push(key);
            match table_key_kind {
                ConstraintKind::Real => native.keys.push(self.native_key(&name, key)?),
                ConstraintKind::Pseudo => pseudo.push(Statement::InsertPseudoKey(PseudoKeyRow {
                    table: name.clone(),
                    columns: key.columns.clone(),
                    name: key.name.clone(),
                })),
            }
        }

        let mut declared_fks: Vec<(TableName, Vec<(String, String)>)> = Vec::new();
        for fk in &def.foreign_keys {
            check_columns(&name, &fk.columns, |c| seen.contains(c))?;
            let referenced =
                TableName::new(fk.referenced_schema.as_str(), fk.referenced_table.as_str());
            let (target_kind, referenced_kind) = if referenced == name {
                check_fk_lengths(fk)?;
                if !declared_keys
                    .iter()
                    .any(|k| same_column_set(&k.columns, &fk.referenced_columns))
                {
                    return Err(missing_key(&referenced, &fk.referenced_columns));
                }
                (def.kind, table_key_kind)
            } else {
                let target = snapshot.table(&referenced)?;
                (target.kind, referenced_key_kind(target, fk)?)
            };
            let pairs = fk_pairs(fk);
            if declared_fks
                .iter()
                .any(|(r, p)| r == &referenced && same_column_pairs(p, &pairs))
            {
                return Err(CatalogError::InvalidModel(format!(
                    "foreign key ({}) declared twice on {}",
                    fk.columns.join(","),
                    name
                )));
            }
            declared_fks.push((referenced, pairs));
            match fk_kind(def.kind, target_kind, referenced_kind) {
                ConstraintKind::Real => {
                    native.foreign_keys.push(self.native_foreign_key(&name, fk)?)
                }
                ConstraintKind::Pseudo => pseudo.push(Statement::InsertPseudoForeignKey(
                    pseudo_foreign_key(&name, fk),
                )),
            }
        }

        self.push(Statement::CreateTable {
            schema: schema.to_string(),
            table: native,
        });
        self.statements.extend(pseudo);

        if let Some(comment) = &def.comment {
            self.push(Statement::SetComment {
                target: MetadataTarget::table(name.clone()),
                comment: Some(comment.clone()),
            });
        }
        for column in &def.columns {
            if let Some(comment) = &column.comment {
                self.push(Statement::SetComment {
                    target: MetadataTarget::column(name.clone(), column.name.as_str()),
                    comment: Some(comment.clone()),
                });
            }
        }
        for key in &def.keys {
            if let Some(comment) = &key.comment {
                self.push(Statement::SetComment {
                    target: MetadataTarget::key(name.clone(), &key.columns),
                    comment: Some(comment.clone()),
                });
            }
        }
        for fk in &def.foreign_keys {
            if let Some(comment) = &fk.comment {
                self.push(Statement::SetComment {
                    target: fk_target(&name, fk),
                    comment: Some(comment.clone()),
                });
            }
        }
        for (key, value) in &def.annotations {
            self.push(Statement::SetAnnotation {
                target: MetadataTarget::table(name.clone()),
                key: key.clone(),
                document: serde_json::to_string(value)?,
            });
        }
        self.push(Statement::RecordDataChange { table: name });
        Ok(())
    }

    fn add_key(
        &mut self,
        table: &TableName,
        kind: ConstraintKind,
        key: &KeyDef,
    ) -> CatalogResult<()> {
        let statement = match kind {
            ConstraintKind::Real => Statement::AddKey {
                table: table.clone(),
                key: self.native_key(table, key)?,
            },
            ConstraintKind::Pseudo => Statement::InsertPseudoKey(PseudoKeyRow {
                table: table.clone(),
                columns: key.columns.clone(),
                name: key.name.clone(),
            }),
        };
        self.push(statement);
        if let Some(comment) = &key.comment {
            self.push(Statement::SetComment {
                target: MetadataTarget::key(table.clone(), &key.columns),
                comment: Some(comment.clone()),
            });
        }
        Ok(())
    }

    fn drop_key(&mut self, table: &TableName, columns: &[String]) -> CatalogResult<()> {
        let snapshot = self.snapshot;
        let existing = snapshot.table(table)?;
        let key = existing.key(columns).ok_or_else(|| {
            CatalogError::NotFound(format!("key ({}) on {}", columns.join(","), table))
        })?;
        let referencing: Vec<String> = snapshot
            .graph()
            .referencing(table)
            .into_iter()
            .filter(|(_, fk)| same_column_set(&fk.referenced_columns, &key.columns))
            .map(|(from, _)| from.name.to_string())
            .collect();
        if !referencing.is_empty() {
            return Err(CatalogError::InvalidModel(format!(
                "key ({}) on {} is referenced by foreign keys on {}",
                columns.join(","),
                table,
                referencing.join(", ")
            )));
        }
        if self.config.require_primary_keys
            && existing.kind == TableKind::Table
            && existing.keys.len() == 1
        {
            return Err(CatalogError::InvalidModel(format!(
                "cannot drop the last key of {}",
                table
            )));
        }
        let statement = match key.kind {
            ConstraintKind::Real => Statement::DropKey {
                table: table.clone(),
                columns: key.columns.clone(),
            },
            ConstraintKind::Pseudo => Statement::DeletePseudoKey {
                table: table.clone(),
                columns: key.columns.clone(),
            },
        };
        self.push(statement);
        self.push(Statement::PurgeOrphans);
        Ok(())
    }

    fn add_foreign_key(
        &mut self,
        table: &TableName,
        kind: ConstraintKind,
        fk: &ForeignKeyDef,
    ) -> CatalogResult<()> {
        let statement = match kind {
            ConstraintKind::Real => Statement::AddForeignKey {
                table: table.clone(),
                foreign_key: self.native_foreign_key(table, fk)?,
            },
            ConstraintKind::Pseudo => {
                Statement::InsertPseudoForeignKey(pseudo_foreign_key(table, fk))
            }
        };
        self.push(statement);
        if let Some(comment) = &fk.comment {
            self.push(Statement::SetComment {
                target: fk_target(table, fk),
                comment: Some(comment.clone()),
            });
        }
        Ok(())
    }

    fn native_key(&self, table: &TableName, key: &KeyDef) -> CatalogResult<NativeKey> {
        let name = match &key.name {
            Some(name) => {
                self.check_identifier("constraint", name)?;
                name.clone()
            }
            None => constraint_name(
                &table.table,
                &key.columns,
                "key",
                self.config.max_identifier_bytes,
            ),
        };
        Ok(NativeKey {
            name,
            columns: key.columns.clone(),
        })
    }

    fn native_foreign_key(
        &self,
        table: &TableName,
        fk: &ForeignKeyDef,
    ) -> CatalogResult<NativeForeignKey> {
        let name = match &fk.name {
            Some(name) => {
                self.check_identifier("constraint", name)?;
                name.clone()
            }
            None => constraint_name(
                &table.table,
                &fk.columns,
                "fkey",
                self.config.max_identifier_bytes,
            ),
        };
        Ok(NativeForeignKey {
            name,
            columns: fk.columns.clone(),
            referenced: TableName::new(fk.referenced_schema.as_str(), fk.referenced_table.as_str()),
            referenced_columns: fk.referenced_columns.clone(),
        })
    }

    fn check_identifier(&self, what: &str, name: &str) -> CatalogResult<()> {
        if name.is_empty() {
            return Err(CatalogError::InvalidModel(format!("{} name must not be empty", what)));
        }
        if name.len() > self.config.max_identifier_bytes {
            return Err(CatalogError::InvalidModel(format!(
                "{} name {} is longer than {} bytes",
                what, name, self.config.max_identifier_bytes
            )));
        }
        Ok(())
    }

    fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }
}

/// Keys are enforced natively on plain tables only
fn key_kind(table: TableKind) -> ConstraintKind {
    if table.enforces_constraints() {
        ConstraintKind::Real
    } else {
        ConstraintKind::Pseudo
    }
}

/// A foreign key is native only between plain tables and onto a native key
fn fk_kind(from: TableKind, to: TableKind, referenced_key: ConstraintKind) -> ConstraintKind {
    if from.enforces_constraints()
        && to.enforces_constraints()
        && referenced_key == ConstraintKind::Real
    {
        ConstraintKind::Real
    } else {
        ConstraintKind::Pseudo
    }
}

/// Kind of the key an FK definition points at on `target`
fn referenced_key_kind(target: &Table, fk: &ForeignKeyDef) -> CatalogResult<ConstraintKind> {
    check_fk_lengths(fk)?;
    target
        .key(&fk.referenced_columns)
        .map(|k| k.kind)
        .ok_or_else(|| missing_key(&target.name, &fk.referenced_columns))
}

fn check_fk_lengths(fk: &ForeignKeyDef) -> CatalogResult<()> {
    if fk.columns.is_empty() || fk.columns.len() != fk.referenced_columns.len() {
        return Err(CatalogError::InvalidModel(format!(
            "foreign key maps {} columns to {}",
            fk.columns.len(),
            fk.referenced_columns.len()
        )));
    }
    Ok(())
}

fn missing_key(table: &TableName, columns: &[String]) -> CatalogError {
    CatalogError::InvalidModel(format!(
        "referenced columns ({}) do not form a key of {}",
        columns.join(","),
        table
    ))
}

/// Columns must be non-empty, distinct, and present on the table
fn check_columns<F>(table: &TableName, columns: &[String], exists: F) -> CatalogResult<()>
where
    F: Fn(&str) -> bool,
{
    if columns.is_empty() {
        return Err(CatalogError::InvalidModel(format!(
            "constraint on {} names no columns",
            table
        )));
    }
    let mut seen = HashSet::new();
    for column in columns {
        if !seen.insert(column.as_str()) {
            return Err(CatalogError::InvalidModel(format!(
                "column {} repeated in constraint on {}",
                column, table
            )));
        }
        if !exists(column) {
            return Err(CatalogError::InvalidModel(format!(
                "column {} does not exist in {}",
                column, table
            )));
        }
    }
    Ok(())
}

fn native_column(def: &ColumnDef) -> NativeColumn {
    NativeColumn {
        name: def.name.clone(),
        type_name: def.type_name.clone(),
        nullok: def.nullok,
    }
}

fn fk_pairs(fk: &ForeignKeyDef) -> Vec<(String, String)> {
    fk.columns
        .iter()
        .cloned()
        .zip(fk.referenced_columns.iter().cloned())
        .collect()
}

fn fk_target(table: &TableName, fk: &ForeignKeyDef) -> MetadataTarget {
    MetadataTarget::foreign_key(
        table.clone(),
        &fk_pairs(fk),
        TableName::new(fk.referenced_schema.as_str(), fk.referenced_table.as_str()),
    )
}

fn pseudo_foreign_key(table: &TableName, fk: &ForeignKeyDef) -> PseudoForeignKeyRow {
    PseudoForeignKeyRow {
        table: table.clone(),
        columns: fk.columns.clone(),
        referenced: TableName::new(fk.referenced_schema.as_str(), fk.referenced_table.as_str()),
        referenced_columns: fk.referenced_columns.clone(),
        name: fk.name.clone(),
    }
}

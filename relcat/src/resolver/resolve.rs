// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Resolution of parsed paths against a model snapshot
//!
//! Rules, in order:
//! 1. unqualified table names must be unique across the catalog
//! 2. key and foreign key column lists match as sets
//! 3. a foreign key path without a trailing key column list matches every
//!    foreign key from those columns to any key of the referenced table
//! 4. annotation keys are opaque

use super::path::{Facet, ObjectPath, ResourcePath, TableRef};
use super::reference::{ColumnList, ColumnMapping, Reference, Resolution};
use crate::error::{CatalogError, CatalogResult};
use crate::model::graph::same_column_pairs;
use crate::model::{
    Annotations, CatalogId, Column, ForeignKey, Key, ModelGraph, ModelSnapshot, Schema, Table,
};

/// A graph object located from a reference
#[derive(Debug, Clone, Copy)]
pub enum ObjectRef<'g> {
    Catalog(&'g ModelGraph),
    Schema(&'g Schema),
    Table(&'g Table),
    Column(&'g Table, &'g Column),
    Key(&'g Table, &'g Key),
    ForeignKey(&'g Table, &'g ForeignKey),
}

impl<'g> ObjectRef<'g> {
    pub fn annotations(&self) -> &'g Annotations {
        match self {
            ObjectRef::Catalog(g) => &g.annotations,
            ObjectRef::Schema(s) => &s.annotations,
            ObjectRef::Table(t) => &t.annotations,
            ObjectRef::Column(_, c) => &c.annotations,
            ObjectRef::Key(_, k) => &k.annotations,
            ObjectRef::ForeignKey(_, fk) => &fk.annotations,
        }
    }

    pub fn comment(&self) -> Option<&'g str> {
        match self {
            ObjectRef::Catalog(_) => None,
            ObjectRef::Schema(s) => s.comment.as_deref(),
            ObjectRef::Table(t) => t.comment.as_deref(),
            ObjectRef::Column(_, c) => c.comment.as_deref(),
            ObjectRef::Key(_, k) => k.comment.as_deref(),
            ObjectRef::ForeignKey(_, fk) => fk.comment.as_deref(),
        }
    }
}

/// Find the graph object a (non-metadata) reference names
pub fn locate<'g>(
    snapshot: &'g ModelSnapshot,
    reference: &Reference,
) -> CatalogResult<ObjectRef<'g>> {
    match reference.subject() {
        Reference::Catalog { .. } => Ok(ObjectRef::Catalog(snapshot.graph())),
        Reference::Schema { schema, .. } => Ok(ObjectRef::Schema(snapshot.schema(schema)?)),
        Reference::Table { table, .. } => Ok(ObjectRef::Table(snapshot.table(table)?)),
        Reference::Column { table, column, .. } => {
            let t = snapshot.table(table)?;
            let c = t
                .column(column)
                .ok_or_else(|| CatalogError::NotFound(format!("column {}:{}", table, column)))?;
            Ok(ObjectRef::Column(t, c))
        }
        Reference::Key { table, columns, .. } => {
            let t = snapshot.table(table)?;
            let k = t.key(columns.as_slice()).ok_or_else(|| {
                CatalogError::NotFound(format!(
                    "key ({}) on {}",
                    columns.as_slice().join(","),
                    table
                ))
            })?;
            Ok(ObjectRef::Key(t, k))
        }
        Reference::ForeignKey {
            table,
            mapping,
            referenced,
            ..
        } => {
            let t = snapshot.table(table)?;
            let fk = t.foreign_key(mapping.pairs(), referenced).ok_or_else(|| {
                CatalogError::NotFound(format!(
                    "foreign key ({}) on {} referencing {}",
                    mapping.from_columns().join(","),
                    table,
                    referenced
                ))
            })?;
            Ok(ObjectRef::ForeignKey(t, fk))
        }
        Reference::Annotation { .. } | Reference::Comment { .. } => Err(CatalogError::NotFound(
            "metadata resources do not nest".to_string(),
        )),
    }
}

pub fn resolve(snapshot: &ModelSnapshot, path: &ResourcePath) -> CatalogResult<Resolution> {
    if &path.catalog != snapshot.catalog() {
        return Err(CatalogError::NotFound(format!("catalog {}", path.catalog)));
    }
    let catalog = snapshot.catalog().clone();
    let objects = resolve_object(snapshot, &catalog, &path.object)?;
    apply_facet(snapshot, objects, &path.facet)
}

fn table<'g>(snapshot: &'g ModelSnapshot, table: &TableRef) -> CatalogResult<&'g Table> {
    snapshot.lookup_table(table.schema.as_deref(), &table.table)
}

fn table_ref(catalog: &CatalogId, t: &Table) -> Reference {
    Reference::Table {
        catalog: catalog.clone(),
        table: t.name.clone(),
    }
}

fn key_ref(catalog: &CatalogId, t: &Table, columns: Vec<String>) -> Reference {
    Reference::Key {
        catalog: catalog.clone(),
        table: t.name.clone(),
        columns: ColumnList::new(columns),
    }
}

fn foreign_key_ref(
    catalog: &CatalogId,
    t: &Table,
    fk: &ForeignKey,
    pairs: Vec<(String, String)>,
) -> Reference {
    Reference::ForeignKey {
        catalog: catalog.clone(),
        table: t.name.clone(),
        mapping: ColumnMapping::new(pairs),
        referenced: fk.referenced.clone(),
    }
}

fn resolve_object(
    snapshot: &ModelSnapshot,
    catalog: &CatalogId,
    object: &ObjectPath,
) -> CatalogResult<Resolution> {
    let resolution = match object {
        ObjectPath::Catalog => Resolution::One(Reference::Catalog {
            catalog: catalog.clone(),
        }),
        ObjectPath::Schemas => Resolution::Many(
            snapshot
                .graph()
                .schemas
                .keys()
                .map(|schema| Reference::Schema {
                    catalog: catalog.clone(),
                    schema: schema.clone(),
                })
                .collect(),
        ),
        ObjectPath::Schema(schema) => Resolution::One(Reference::Schema {
            catalog: catalog.clone(),
            schema: snapshot.schema(schema)?.name.clone(),
        }),
        ObjectPath::Tables(schema) => Resolution::Many(
            snapshot
                .schema(schema)?
                .tables
                .values()
                .map(|t| table_ref(catalog, t))
                .collect(),
        ),
        ObjectPath::Table(tref) => Resolution::One(table_ref(catalog, table(snapshot, tref)?)),
        ObjectPath::Columns(tref) => {
            let t = table(snapshot, tref)?;
            Resolution::Many(
                t.columns
                    .iter()
                    .map(|c| Reference::Column {
                        catalog: catalog.clone(),
                        table: t.name.clone(),
                        column: c.name.clone(),
                    })
                    .collect(),
            )
        }
        ObjectPath::Column(tref, column) => {
            let t = table(snapshot, tref)?;
            let c = t
                .column(column)
                .ok_or_else(|| CatalogError::NotFound(format!("column {}:{}", t.name, column)))?;
            Resolution::One(Reference::Column {
                catalog: catalog.clone(),
                table: t.name.clone(),
                column: c.name.clone(),
            })
        }
        ObjectPath::Keys(tref) => {
            let t = table(snapshot, tref)?;
            Resolution::Many(
                t.keys
                    .iter()
                    .map(|k| key_ref(catalog, t, k.columns.clone()))
                    .collect(),
            )
        }
        ObjectPath::Key(tref, columns) => {
            let t = table(snapshot, tref)?;
            if t.key(columns).is_none() {
                return Err(CatalogError::NotFound(format!(
                    "key ({}) on {}",
                    columns.join(","),
                    t.name
                )));
            }
            // textual order from the path is kept
            Resolution::One(key_ref(catalog, t, columns.clone()))
        }
        ObjectPath::ForeignKeys(tref) => {
            let t = table(snapshot, tref)?;
            Resolution::Many(
                t.foreign_keys
                    .iter()
                    .map(|fk| foreign_key_ref(catalog, t, fk, fk.pairs()))
                    .collect(),
            )
        }
        ObjectPath::ForeignKey {
            table: tref,
            columns,
            referenced,
            referenced_columns,
        } => {
            let t = table(snapshot, tref)?;
            let referenced = match referenced {
                Some(r) => Some(table(snapshot, r)?),
                None => None,
            };
            let wanted_pairs = match referenced_columns {
                Some(kcols) if kcols.len() != columns.len() => {
                    return Err(CatalogError::MalformedName(format!(
                        "foreign key lists ({}) and ({}) differ in length",
                        columns.join(","),
                        kcols.join(",")
                    )));
                }
                Some(kcols) => Some(
                    columns
                        .iter()
                        .cloned()
                        .zip(kcols.iter().cloned())
                        .collect::<Vec<_>>(),
                ),
                None => None,
            };

            let matches: Vec<Reference> = t
                .foreign_keys
                .iter()
                .filter(|fk| referenced.map_or(true, |r| fk.referenced == r.name))
                .filter(|fk| {
                    wanted_pairs
                        .as_ref()
                        .map_or(true, |pairs| same_column_pairs(&fk.pairs(), pairs))
                })
                .filter_map(|fk| {
                    fk.pairs_in_order(columns)
                        .map(|pairs| foreign_key_ref(catalog, t, fk, pairs))
                })
                .collect();

            if matches.is_empty() {
                return Err(CatalogError::NotFound(format!(
                    "foreign key ({}) on {}",
                    columns.join(","),
                    t.name
                )));
            }
            if wanted_pairs.is_some() && matches.len() == 1 {
                let mut matches = matches;
                Resolution::One(matches.swap_remove(0))
            } else {
                Resolution::Many(matches)
            }
        }
    };
    Ok(resolution)
}

fn apply_facet(
    snapshot: &ModelSnapshot,
    objects: Resolution,
    facet: &Facet,
) -> CatalogResult<Resolution> {
    let wrap = |objects: Resolution, f: &dyn Fn(Reference) -> Reference| match objects {
        Resolution::One(r) => Resolution::One(f(r)),
        Resolution::Many(refs) => Resolution::Many(refs.into_iter().map(f).collect()),
    };
    match facet {
        Facet::Object => Ok(objects),
        Facet::Comment => Ok(wrap(objects, &|subject: Reference| Reference::Comment {
            subject: Box::new(subject),
        })),
        Facet::Annotation(key) => Ok(wrap(objects, &|subject: Reference| Reference::Annotation {
            subject: Box::new(subject),
            key: key.clone(),
        })),
        Facet::Annotations => {
            let mut listed = Vec::new();
            for subject in objects.into_references() {
                let keys: Vec<String> = locate(snapshot, &subject)?
                    .annotations()
                    .keys()
                    .cloned()
                    .collect();
                listed.extend(keys.into_iter().map(|key| Reference::Annotation {
                    subject: Box::new(subject.clone()),
                    key,
                }));
            }
            Ok(Resolution::Many(listed))
        }
    }
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Model mutation documents

use crate::model::{Annotations, TableKind};
use serde::{Deserialize, Serialize};

/// One model change, applied as a single store transaction
///
/// Mutations deserialize from JSON objects tagged with `"op"`:
///
/// ```json
/// {"op": "add_key", "schema": "schema1", "table": "table1", "key": {"columns": ["id"]}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    CreateSchema {
        schema: String,
        #[serde(default)]
        comment: Option<String>,
    },
    DropSchema {
        schema: String,
    },
    CreateTable {
        schema: String,
        table: TableDef,
    },
    DropTable {
        schema: String,
        table: String,
    },
    AddColumn {
        schema: String,
        table: String,
        column: ColumnDef,
    },
    DropColumn {
        schema: String,
        table: String,
        column: String,
    },
    AddKey {
        schema: String,
        table: String,
        key: KeyDef,
    },
    DropKey {
        schema: String,
        table: String,
        columns: Vec<String>,
    },
    AddForeignKey {
        schema: String,
        table: String,
        foreign_key: ForeignKeyDef,
    },
    DropForeignKey {
        schema: String,
        table: String,
        columns: Vec<String>,
        referenced_schema: String,
        referenced_table: String,
        referenced_columns: Vec<String>,
    },
    /// Set or clear (`null`) the comment of the resource at `resource`
    SetComment {
        resource: String,
        comment: Option<String>,
    },
    SetAnnotation {
        resource: String,
        key: String,
        value: serde_json::Value,
    },
    DeleteAnnotation {
        resource: String,
        key: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    #[serde(default)]
    pub kind: TableKind,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub keys: Vec<KeyDef>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDef>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "default_nullok")]
    pub nullok: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_nullok() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyDef {
    pub columns: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    pub columns: Vec<String>,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Mutation {
    /// Operation name as it appears in the `op` tag
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::CreateSchema { .. } => "create_schema",
            Mutation::DropSchema { .. } => "drop_schema",
            Mutation::CreateTable { .. } => "create_table",
            Mutation::DropTable { .. } => "drop_table",
            Mutation::AddColumn { .. } => "add_column",
            Mutation::DropColumn { .. } => "drop_column",
            Mutation::AddKey { .. } => "add_key",
            Mutation::DropKey { .. } => "drop_key",
            Mutation::AddForeignKey { .. } => "add_foreign_key",
            Mutation::DropForeignKey { .. } => "drop_foreign_key",
            Mutation::SetComment { .. } => "set_comment",
            Mutation::SetAnnotation { .. } => "set_annotation",
            Mutation::DeleteAnnotation { .. } => "delete_annotation",
        }
    }
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullok: true,
            comment: None,
        }
    }
}

impl KeyDef {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            name: None,
            comment: None,
        }
    }
}

impl ForeignKeyDef {
    pub fn new(
        columns: &[&str],
        referenced_schema: &str,
        referenced_table: &str,
        referenced_columns: &[&str],
    ) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            referenced_schema: referenced_schema.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_columns: referenced_columns.iter().map(|c| c.to_string()).collect(),
            name: None,
            comment: None,
        }
    }
}

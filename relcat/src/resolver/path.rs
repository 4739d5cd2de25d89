// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Resource path syntax
//!
//! Paths are split on `/` first, then list segments on `,` and table
//! references on `:`, and only then is each item percent-decoded. Keywords
//! (`comment`, `annotation`, `reference`, ...) are recognized on the raw
//! segment, so a percent-escaped spelling always denotes a name.

use crate::error::{CatalogError, CatalogResult};
use crate::model::CatalogId;

/// Bytes printed verbatim in names; everything else is percent-escaped
fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'.' | b'_' | b'~' | b'!' | b'$' | b'\'' | b'(' | b')' | b'*'
        )
}

/// Words that would be read as keywords where a name may also appear
const RESERVED_WORDS: &[&str] = &["comment", "annotation", "reference"];

pub fn encode_name(name: &str) -> String {
    if RESERVED_WORDS.contains(&name) {
        let (first, rest) = name.split_at(1);
        return format!("%{:02X}{}", first.as_bytes()[0], rest);
    }
    let mut encoded = String::with_capacity(name.len());
    for b in name.bytes() {
        if is_unreserved(b) {
            encoded.push(b as char);
        } else {
            encoded.push_str(&format!("%{:02X}", b));
        }
    }
    encoded
}

/// Decode `%XX` escapes; `None` for a broken escape or non-UTF-8 result
pub(crate) fn percent_decode(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = raw.get(i + 1..i + 3)?;
            if !hex.bytes().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

pub fn encode_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| encode_name(n))
        .collect::<Vec<_>>()
        .join(",")
}

/// `table` or `schema:table`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectPath {
    Catalog,
    Schemas,
    Schema(String),
    Tables(String),
    Table(TableRef),
    Columns(TableRef),
    Column(TableRef, String),
    Keys(TableRef),
    Key(TableRef, Vec<String>),
    ForeignKeys(TableRef),
    ForeignKey {
        table: TableRef,
        columns: Vec<String>,
        referenced: Option<TableRef>,
        referenced_columns: Option<Vec<String>>,
    },
}

/// What part of the object a path addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Facet {
    Object,
    Comment,
    Annotations,
    Annotation(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    pub catalog: CatalogId,
    pub object: ObjectPath,
    pub facet: Facet,
}

impl ResourcePath {
    /// Whether the path enumerates resources rather than naming one
    ///
    /// Foreign key paths without the referenced key columns count as
    /// listings, however many constraints they happen to match.
    pub fn is_listing(&self) -> bool {
        let listing_object = match &self.object {
            ObjectPath::Schemas
            | ObjectPath::Tables(_)
            | ObjectPath::Columns(_)
            | ObjectPath::Keys(_)
            | ObjectPath::ForeignKeys(_) => true,
            ObjectPath::ForeignKey {
                referenced_columns, ..
            } => referenced_columns.is_none(),
            _ => false,
        };
        listing_object || self.facet == Facet::Annotations
    }
}

pub fn parse(path: &str) -> CatalogResult<ResourcePath> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(malformed(path, "resource names start with '/'"));
    };
    let mut cursor = Cursor {
        path,
        segments: rest.split('/').collect(),
        pos: 0,
    };
    match cursor.next() {
        Some("catalog") => {}
        _ => return Err(malformed(path, "expected /catalog/<cid>")),
    }
    let catalog = CatalogId::from(cursor.name()?);

    if cursor.listing_end()? {
        return Ok(ResourcePath {
            catalog,
            object: ObjectPath::Catalog,
            facet: Facet::Object,
        });
    }
    let (object, facet) = match cursor.next() {
        Some("annotation") => (ObjectPath::Catalog, cursor.annotation_facet()?),
        Some("schema") => cursor.schema_path()?,
        Some("table") => {
            let table = cursor.table_ref()?;
            cursor.table_path(table)?
        }
        _ => return Err(malformed(path, "expected annotation, schema or table")),
    };
    Ok(ResourcePath {
        catalog,
        object,
        facet,
    })
}

fn malformed(path: &str, reason: &str) -> CatalogError {
    CatalogError::MalformedName(format!("{}: {}", path, reason))
}

struct Cursor<'a> {
    path: &'a str,
    segments: Vec<&'a str>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn err(&self, reason: &str) -> CatalogError {
        malformed(self.path, reason)
    }

    fn next(&mut self) -> Option<&'a str> {
        let segment = self.segments.get(self.pos).copied();
        self.pos += 1;
        segment
    }

    fn peek(&self) -> Option<&'a str> {
        self.segments.get(self.pos).copied()
    }

    /// Nothing left, or only the empty segment of a trailing slash
    fn listing_end(&mut self) -> CatalogResult<bool> {
        match self.peek() {
            None => Ok(true),
            Some("") if self.pos + 1 == self.segments.len() => {
                self.pos += 1;
                Ok(true)
            }
            Some("") => Err(self.err("empty path segment")),
            Some(_) => Ok(false),
        }
    }

    fn expect_end(&mut self) -> CatalogResult<()> {
        if self.listing_end()? {
            Ok(())
        } else {
            Err(self.err("unexpected trailing segments"))
        }
    }

    fn required(&mut self) -> CatalogResult<&'a str> {
        match self.next() {
            Some("") | None => Err(self.err("missing path segment")),
            Some(segment) => Ok(segment),
        }
    }

    fn decode(&self, raw: &str) -> CatalogResult<String> {
        let decoded = percent_decode(raw)
            .ok_or_else(|| self.err("invalid percent-encoding"))?;
        if decoded.is_empty() {
            return Err(self.err("empty name"));
        }
        Ok(decoded)
    }

    fn name(&mut self) -> CatalogResult<String> {
        let raw = self.required()?;
        self.decode(raw)
    }

    fn column_list(&mut self) -> CatalogResult<Vec<String>> {
        let raw = self.required()?;
        let mut columns: Vec<String> = Vec::new();
        for item in raw.split(',') {
            if item.is_empty() {
                return Err(self.err("empty column name in column list"));
            }
            let column = self.decode(item)?;
            if columns.contains(&column) {
                return Err(self.err("column listed twice"));
            }
            columns.push(column);
        }
        Ok(columns)
    }

    fn table_ref(&mut self) -> CatalogResult<TableRef> {
        let raw = self.required()?;
        let parts: Vec<&str> = raw.split(':').collect();
        match parts.as_slice() {
            [table] => Ok(TableRef {
                schema: None,
                table: self.decode(table)?,
            }),
            [schema, table] => Ok(TableRef {
                schema: Some(self.decode(schema)?),
                table: self.decode(table)?,
            }),
            _ => Err(self.err("table reference must be table or schema:table")),
        }
    }

    fn annotation_facet(&mut self) -> CatalogResult<Facet> {
        if self.listing_end()? {
            return Ok(Facet::Annotations);
        }
        let key = self.name()?;
        self.expect_end()?;
        Ok(Facet::Annotation(key))
    }

    /// Optional `/comment` or `/annotation[/<key>]` suffix
    fn facet(&mut self) -> CatalogResult<Facet> {
        if self.listing_end()? {
            return Ok(Facet::Object);
        }
        match self.next() {
            Some("comment") => {
                self.expect_end()?;
                Ok(Facet::Comment)
            }
            Some("annotation") => self.annotation_facet(),
            _ => Err(self.err("expected comment or annotation")),
        }
    }

    fn schema_path(&mut self) -> CatalogResult<(ObjectPath, Facet)> {
        if self.listing_end()? {
            return Ok((ObjectPath::Schemas, Facet::Object));
        }
        let schema = self.name()?;
        if self.listing_end()? {
            return Ok((ObjectPath::Schema(schema), Facet::Object));
        }
        match self.next() {
            Some("comment") => {
                self.expect_end()?;
                Ok((ObjectPath::Schema(schema), Facet::Comment))
            }
            Some("annotation") => Ok((ObjectPath::Schema(schema), self.annotation_facet()?)),
            Some("table") => {
                if self.listing_end()? {
                    return Ok((ObjectPath::Tables(schema), Facet::Object));
                }
                let table = self.name()?;
                self.table_path(TableRef {
                    schema: Some(schema),
                    table,
                })
            }
            _ => Err(self.err("expected comment, annotation or table")),
        }
    }

    fn table_path(&mut self, table: TableRef) -> CatalogResult<(ObjectPath, Facet)> {
        if self.listing_end()? {
            return Ok((ObjectPath::Table(table), Facet::Object));
        }
        match self.next() {
            Some("comment") => {
                self.expect_end()?;
                Ok((ObjectPath::Table(table), Facet::Comment))
            }
            Some("annotation") => Ok((ObjectPath::Table(table), self.annotation_facet()?)),
            Some("column") => {
                if self.listing_end()? {
                    return Ok((ObjectPath::Columns(table), Facet::Object));
                }
                let column = self.name()?;
                Ok((ObjectPath::Column(table, column), self.facet()?))
            }
            Some("key") => {
                if self.listing_end()? {
                    return Ok((ObjectPath::Keys(table), Facet::Object));
                }
                let columns = self.column_list()?;
                Ok((ObjectPath::Key(table, columns), self.facet()?))
            }
            Some("foreignkey") => {
                if self.listing_end()? {
                    return Ok((ObjectPath::ForeignKeys(table), Facet::Object));
                }
                let columns = self.column_list()?;
                let mut referenced = None;
                let mut referenced_columns = None;
                if self.peek() == Some("reference") {
                    self.next();
                    if !self.listing_end()? {
                        referenced = Some(self.table_ref()?);
                        if !self.listing_end()?
                            && !matches!(self.peek(), Some("comment") | Some("annotation"))
                        {
                            referenced_columns = Some(self.column_list()?);
                        }
                    }
                }
                let object = ObjectPath::ForeignKey {
                    table,
                    columns,
                    referenced,
                    referenced_columns,
                };
                Ok((object, self.facet()?))
            }
            _ => Err(self.err("expected comment, annotation, column, key or foreignkey")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tref(schema: Option<&str>, table: &str) -> TableRef {
        TableRef {
            schema: schema.map(str::to_string),
            table: table.to_string(),
        }
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_catalog_and_listing_forms() {
        assert_eq!(parse("/catalog/1").unwrap().object, ObjectPath::Catalog);
        assert_eq!(parse("/catalog/1/schema/").unwrap().object, ObjectPath::Schemas);
        assert_eq!(parse("/catalog/1/schema").unwrap().object, ObjectPath::Schemas);
        assert_eq!(
            parse("/catalog/1/annotation").unwrap().facet,
            Facet::Annotations
        );
        assert_eq!(
            parse("/catalog/1/schema/s/table/").unwrap().object,
            ObjectPath::Tables("s".into())
        );
        let keys = parse("/catalog/1/schema/schema1/table/table1/key/").unwrap();
        assert_eq!(keys.object, ObjectPath::Keys(tref(Some("schema1"), "table1")));
    }

    #[test]
    fn test_listing_detection() {
        for path in [
            "/catalog/1/schema/",
            "/catalog/1/schema/s/table/",
            "/catalog/1/table/t/column/",
            "/catalog/1/table/t/key/",
            "/catalog/1/table/t/foreignkey/",
            "/catalog/1/table/t/foreignkey/a",
            "/catalog/1/table/t/foreignkey/a/reference/r/comment",
            "/catalog/1/annotation/",
            "/catalog/1/table/t/column/c/annotation",
        ] {
            assert!(parse(path).unwrap().is_listing(), "{}", path);
        }
        for path in [
            "/catalog/1",
            "/catalog/1/schema/s/comment",
            "/catalog/1/table/t/key/a,b/annotation/k",
            "/catalog/1/table/t/foreignkey/a/reference/r/x/comment",
        ] {
            assert!(!parse(path).unwrap().is_listing(), "{}", path);
        }
    }

    #[test]
    fn test_key_and_annotation_paths() {
        let p = parse("/catalog/1/schema/s/table/t/key/b,a/annotation/tag%3Aex.org%2Cdoc").unwrap();
        assert_eq!(p.object, ObjectPath::Key(tref(Some("s"), "t"), strings(&["b", "a"])));
        assert_eq!(p.facet, Facet::Annotation("tag:ex.org,doc".into()));

        let p = parse("/catalog/1/table/s:t/column/name/comment").unwrap();
        assert_eq!(p.object, ObjectPath::Column(tref(Some("s"), "t"), "name".into()));
        assert_eq!(p.facet, Facet::Comment);
    }

    #[test]
    fn test_foreign_key_forms() {
        let p = parse("/catalog/1/table/t/foreignkey/a,b/reference/r/x,y").unwrap();
        assert_eq!(
            p.object,
            ObjectPath::ForeignKey {
                table: tref(None, "t"),
                columns: strings(&["a", "b"]),
                referenced: Some(tref(None, "r")),
                referenced_columns: Some(strings(&["x", "y"])),
            }
        );

        let p = parse("/catalog/1/table/t/foreignkey/a/reference/s:r/comment").unwrap();
        assert_eq!(p.facet, Facet::Comment);
        assert!(matches!(
            p.object,
            ObjectPath::ForeignKey {
                referenced_columns: None,
                ..
            }
        ));

        // an escaped keyword is a column name
        let p = parse("/catalog/1/table/t/foreignkey/a/reference/r/%63omment").unwrap();
        assert!(matches!(
            p.object,
            ObjectPath::ForeignKey {
                referenced_columns: Some(ref cols),
                ..
            } if cols == &strings(&["comment"])
        ));
    }

    #[test]
    fn test_percent_decoding_happens_after_splitting() {
        let p = parse("/catalog/1/schema/a%2Fb/table/c%2Cd/key/x%2Cy,z").unwrap();
        assert_eq!(
            p.object,
            ObjectPath::Key(tref(Some("a/b"), "c,d"), strings(&["x,y", "z"]))
        );
    }

    #[test]
    fn test_malformed_names() {
        for bad in [
            "catalog/1",
            "/catalogs/1",
            "/catalog/",
            "/catalog/1/schema/s/table/t/key/a,,b",
            "/catalog/1/schema/s/table/t/key/a,a",
            "/catalog/1//schema",
            "/catalog/1/table/a:b:c",
            "/catalog/1/schema/s/table/t/bogus",
            "/catalog/1/schema/s/comment/extra",
            "/catalog/1/schema/s/table/t/column/%FF",
            "/catalog/1/schema/s/table/t/column/%2",
            "/catalog/1/schema/s/table/t/column/%+1x",
        ] {
            assert!(
                matches!(parse(bad), Err(CatalogError::MalformedName(_))),
                "{} should be malformed",
                bad
            );
        }
    }

    #[test]
    fn test_reserved_words_are_escaped() {
        assert_eq!(encode_name("comment"), "%63omment");
        assert_eq!(encode_name("a b"), "a%20b");
        assert_eq!(encode_list(&strings(&["x,y", "z"])), "x%2Cy,z");
        assert_eq!(encode_name("é"), "%C3%A9");
        assert_eq!(percent_decode("%C3%A9t%C3%A9").as_deref(), Some("été"));
    }
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Generated constraint names

/// Name for an unnamed constraint: `<table>_<col>_..._<suffix>`, shortened
/// with a CRC32 tag when it would exceed `max_bytes`
pub fn constraint_name(table: &str, columns: &[String], suffix: &str, max_bytes: usize) -> String {
    let name = format!("{}_{}_{}", table, columns.join("_"), suffix);
    truncate_identifier(&name, max_bytes)
}

/// Shorten `name` to at most `max_bytes`, keeping distinct long names distinct
pub fn truncate_identifier(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }
    let tag = format!("{:08x}", crc32fast::hash(name.as_bytes()));
    let mut cut = max_bytes.saturating_sub(tag.len() + 1);
    while cut > 0 && !name.is_char_boundary(cut) {
        cut -= 1;
    }
    if cut == 0 {
        return tag;
    }
    format!("{}_{}", &name[..cut], tag)
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Authorization seam
//!
//! Authentication and ACL management live outside the catalog core. The
//! registry asks an `Authorizer` before every mutation and before returning
//! any representation; a denial or an authorizer failure becomes `Forbidden`.

use crate::error::{CatalogError, CatalogResult};
use crate::model::CatalogId;
use crate::resolver::Reference;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// An already-authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal(String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Principal(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read a representation
    Enumerate,
    Create,
    Alter,
    Drop,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Enumerate => "enumerate",
            Action::Create => "create",
            Action::Alter => "alter",
            Action::Drop => "drop",
        };
        write!(f, "{}", name)
    }
}

#[derive(Error, Debug, Clone)]
#[error("authorization failed: {0}")]
pub struct AuthzError(pub String);

pub trait Authorizer: Send + Sync {
    fn authorize(
        &self,
        principal: &Principal,
        object: &Reference,
        action: Action,
    ) -> Result<bool, AuthzError>;
}

/// Ask `authorizer`, mapping anything but an explicit grant to `Forbidden`
pub(crate) fn require(
    authorizer: &dyn Authorizer,
    principal: &Principal,
    object: &Reference,
    action: Action,
) -> CatalogResult<()> {
    match authorizer.authorize(principal, object, action) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CatalogError::Forbidden(format!(
            "{} may not {} {}",
            principal,
            action,
            object.to_path()
        ))),
        Err(e) => {
            log::warn!("Authorizer failed for {} on {}: {}", principal, object.to_path(), e);
            Err(CatalogError::Forbidden(e.to_string()))
        }
    }
}

/// Grants everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _: &Principal, _: &Reference, _: Action) -> Result<bool, AuthzError> {
        Ok(true)
    }
}

/// Catalog-owner policy
///
/// Owners of a catalog may do anything in it. Everyone may enumerate unless
/// reads are restricted, in which case only owners and listed readers may.
/// Creating a catalog is open while it has no owners.
#[derive(Debug, Default)]
pub struct OwnerPolicy {
    owners: RwLock<HashMap<CatalogId, HashSet<Principal>>>,
    readers: RwLock<HashMap<CatalogId, HashSet<Principal>>>,
    restrict_reads: bool,
}

impl OwnerPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_restricted_reads() -> Self {
        Self {
            restrict_reads: true,
            ..Self::default()
        }
    }

    pub fn grant_owner(&self, catalog: &CatalogId, principal: Principal) {
        self.owners
            .write()
            .entry(catalog.clone())
            .or_default()
            .insert(principal);
    }

    pub fn grant_reader(&self, catalog: &CatalogId, principal: Principal) {
        self.readers
            .write()
            .entry(catalog.clone())
            .or_default()
            .insert(principal);
    }

    fn is_owner(&self, catalog: &CatalogId, principal: &Principal) -> bool {
        self.owners
            .read()
            .get(catalog)
            .map_or(false, |owners| owners.contains(principal))
    }
}

impl Authorizer for OwnerPolicy {
    fn authorize(
        &self,
        principal: &Principal,
        object: &Reference,
        action: Action,
    ) -> Result<bool, AuthzError> {
        let catalog = object.catalog();
        if self.is_owner(catalog, principal) {
            return Ok(true);
        }
        Ok(match action {
            Action::Enumerate => {
                !self.restrict_reads
                    || self
                        .readers
                        .read()
                        .get(catalog)
                        .map_or(false, |readers| readers.contains(principal))
            }
            Action::Create => {
                matches!(object, Reference::Catalog { .. })
                    && self.owners.read().get(catalog).map_or(true, HashSet::is_empty)
            }
            Action::Alter | Action::Drop => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_ref() -> Reference {
        Reference::Schema {
            catalog: CatalogId::from("1"),
            schema: "s".into(),
        }
    }

    struct Broken;

    impl Authorizer for Broken {
        fn authorize(&self, _: &Principal, _: &Reference, _: Action) -> Result<bool, AuthzError> {
            Err(AuthzError("identity provider offline".into()))
        }
    }

    #[test]
    fn test_owner_policy() {
        let policy = OwnerPolicy::new();
        let owner = Principal::new("alice");
        let other = Principal::new("bob");
        policy.grant_owner(&CatalogId::from("1"), owner.clone());

        assert!(policy.authorize(&owner, &schema_ref(), Action::Drop).unwrap());
        assert!(!policy.authorize(&other, &schema_ref(), Action::Drop).unwrap());
        assert!(policy
            .authorize(&other, &schema_ref(), Action::Enumerate)
            .unwrap());
    }

    #[test]
    fn test_restricted_reads() {
        let policy = OwnerPolicy::with_restricted_reads();
        let reader = Principal::new("carol");
        assert!(!policy
            .authorize(&reader, &schema_ref(), Action::Enumerate)
            .unwrap());
        policy.grant_reader(&CatalogId::from("1"), reader.clone());
        assert!(policy
            .authorize(&reader, &schema_ref(), Action::Enumerate)
            .unwrap());
    }

    #[test]
    fn test_denial_and_failure_become_forbidden() {
        let policy = OwnerPolicy::new();
        let err = require(&policy, &Principal::new("x"), &schema_ref(), Action::Alter);
        assert!(matches!(err, Err(CatalogError::Forbidden(_))));
        let err = require(&Broken, &Principal::new("x"), &schema_ref(), Action::Enumerate);
        assert!(matches!(err, Err(CatalogError::Forbidden(_))));
        assert!(require(&AllowAll, &Principal::new("x"), &schema_ref(), Action::Drop).is_ok());
    }
}

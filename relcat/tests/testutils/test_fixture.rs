//! Test fixture for relcat integration tests
//!
//! Every fixture owns its own store, so tests never share catalog state.

use relcat::registry::{ColumnDef, ForeignKeyDef, KeyDef, TableDef};
use relcat::store::{Statement, Transaction};
use relcat::{
    AllowAll, Authorizer, CatalogError, CatalogId, CatalogResult, GarbageCollector, GcPolicy,
    MetadataStore, ModelRegistry, Mutation, MvccStore, Principal, RegistryConfig, Resolution,
    SnapshotId, StorageConfig, TableKind, VersionTracker,
};
use std::sync::Arc;

pub struct TestFixture {
    pub store: Arc<dyn MetadataStore>,
    pub registry: ModelRegistry,
    pub tracker: VersionTracker,
    pub collector: GarbageCollector,
    pub admin: Principal,
    pub catalog: CatalogId,
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestFixture {
    /// In-memory store with an empty catalog "1"
    pub fn new() -> Self {
        Self::with_store(Arc::new(MvccStore::in_memory()), Arc::new(AllowAll))
    }

    /// Sled-backed store in a temporary directory
    pub fn persistent() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = StorageConfig::sled(temp_dir.path().join("relcat_test"));
        let store = MvccStore::open(&config).expect("Failed to open sled store");
        let mut fixture = Self::with_store(Arc::new(store), Arc::new(AllowAll));
        fixture._temp_dir = Some(temp_dir);
        fixture
    }

    pub fn with_store(store: Arc<dyn MetadataStore>, authorizer: Arc<dyn Authorizer>) -> Self {
        // RUST_LOG=debug shows registry and collector activity in test output
        let _ = env_logger::builder().is_test(true).try_init();
        let registry = ModelRegistry::new(store.clone(), authorizer, RegistryConfig::default());
        let admin = Principal::new("admin");
        let catalog = CatalogId::from("1");
        registry
            .create_catalog(&admin, &catalog)
            .expect("Failed to create catalog");
        Self {
            tracker: VersionTracker::new(store.clone()),
            collector: GarbageCollector::new(store.clone(), GcPolicy::default()),
            store,
            registry,
            admin,
            catalog,
            _temp_dir: None,
        }
    }

    /// Catalog 1 with `schema1:table1(id int4, name text)` keyed on `id`
    pub fn with_scenario() -> Self {
        let fixture = Self::new();
        fixture.load_scenario();
        fixture
    }

    pub fn load_scenario(&self) {
        self.apply(Mutation::CreateSchema {
            schema: "schema1".to_string(),
            comment: None,
        });
        self.apply(Mutation::CreateTable {
            schema: "schema1".to_string(),
            table: TableDef {
                name: "table1".to_string(),
                kind: TableKind::Table,
                columns: vec![
                    ColumnDef {
                        nullok: false,
                        ..ColumnDef::new("id", "int4")
                    },
                    ColumnDef::new("name", "text"),
                ],
                keys: vec![KeyDef::new(&["id"])],
                foreign_keys: Vec::new(),
                comment: None,
                annotations: Default::default(),
            },
        });
    }

    /// `name(id, a, b)` with a given kind and optional keys
    pub fn create_table(
        &self,
        schema: &str,
        name: &str,
        kind: TableKind,
        keys: &[&[&str]],
    ) -> SnapshotId {
        self.apply(Mutation::CreateTable {
            schema: schema.to_string(),
            table: TableDef {
                name: name.to_string(),
                kind,
                columns: vec![
                    ColumnDef::new("id", "int4"),
                    ColumnDef::new("a", "text"),
                    ColumnDef::new("b", "text"),
                ],
                keys: keys.iter().map(|k| KeyDef::new(k)).collect(),
                foreign_keys: Vec::new(),
                comment: None,
                annotations: Default::default(),
            },
        })
    }

    pub fn create_schema(&self, schema: &str) -> SnapshotId {
        self.apply(Mutation::CreateSchema {
            schema: schema.to_string(),
            comment: None,
        })
    }

    pub fn add_foreign_key(&self, schema: &str, table: &str, fk: ForeignKeyDef) -> SnapshotId {
        self.apply(Mutation::AddForeignKey {
            schema: schema.to_string(),
            table: table.to_string(),
            foreign_key: fk,
        })
    }

    pub fn apply(&self, mutation: Mutation) -> SnapshotId {
        self.try_apply(mutation.clone())
            .unwrap_or_else(|e| panic!("{} failed: {}", mutation.name(), e))
    }

    pub fn try_apply(&self, mutation: Mutation) -> CatalogResult<SnapshotId> {
        self.registry.mutate(&self.admin, &self.catalog, &mutation)
    }

    pub fn set_annotation(
        &self,
        resource: &str,
        key: &str,
        value: serde_json::Value,
    ) -> SnapshotId {
        self.apply(Mutation::SetAnnotation {
            resource: resource.to_string(),
            key: key.to_string(),
            value,
        })
    }

    /// Run raw statements against the store, bypassing the registry, the way
    /// an external DDL client would
    pub fn execute_raw(&self, statements: Vec<Statement>) -> SnapshotId {
        self.store
            .execute(Transaction::new(self.catalog.clone(), statements))
            .expect("Raw statements failed")
    }

    pub fn resolve(&self, path: &str) -> Resolution {
        self.registry
            .resolve(path)
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", path, e))
    }

    pub fn resolve_err(&self, path: &str) -> CatalogError {
        match self.registry.resolve(path) {
            Ok(resolution) => panic!("{} unexpectedly resolved to {:?}", path, resolution),
            Err(e) => e,
        }
    }

    pub fn describe(&self, path: &str) -> serde_json::Value {
        self.registry
            .describe(&self.admin, path, None)
            .unwrap_or_else(|e| panic!("Failed to describe {}: {}", path, e))
    }

    pub fn current_version(&self) -> SnapshotId {
        self.tracker
            .current_version(&self.catalog)
            .expect("Failed to read version")
    }
}

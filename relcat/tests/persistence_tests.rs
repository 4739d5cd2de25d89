//! Sled-backed store: committed catalogs survive a reopen
#![cfg(feature = "sled-backend")]

#[path = "testutils/mod.rs"]
mod testutils;

use relcat::registry::ForeignKeyDef;
use relcat::{
    AllowAll, CatalogId, MetadataStore, ModelRegistry, Mutation, MvccStore, Principal, ReadPoint,
    RegistryConfig, StorageConfig, TableKind,
};
use serde_json::json;
use std::sync::Arc;
use testutils::test_fixture::TestFixture;

fn open_registry(config: &StorageConfig) -> ModelRegistry {
    let store = MvccStore::open(config).expect("Failed to open sled store");
    ModelRegistry::new(Arc::new(store), Arc::new(AllowAll), RegistryConfig::default())
}

#[test]
#[serial_test::serial]
fn test_model_survives_reopen() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = StorageConfig::sled(temp_dir.path().join("relcat_db"));
    let admin = Principal::new("admin");
    let catalog = CatalogId::from("1");

    let (version, described) = {
        let registry = open_registry(&config);
        registry.create_catalog(&admin, &catalog).unwrap();
        for mutation in [
            Mutation::CreateSchema {
                schema: "s".to_string(),
                comment: Some("persisted".to_string()),
            },
            Mutation::SetAnnotation {
                resource: "/catalog/1".to_string(),
                key: "owner".to_string(),
                value: json!({"team": "catalog"}),
            },
        ] {
            registry.mutate(&admin, &catalog, &mutation).unwrap();
        }
        let version = registry.load(&catalog).unwrap().version();
        let described = registry.describe(&admin, "/catalog/1/schema/s", None).unwrap();
        (version, described)
    };

    let registry = open_registry(&config);
    assert_eq!(registry.list_catalogs().unwrap(), vec![catalog.clone()]);
    assert_eq!(registry.load(&catalog).unwrap().version(), version);
    assert_eq!(
        registry.describe(&admin, "/catalog/1/schema/s", None).unwrap(),
        described
    );
    assert_eq!(
        registry
            .read_annotation(&admin, "/catalog/1/annotation/owner")
            .unwrap(),
        json!({"team": "catalog"})
    );

    // new commits continue past the reopened version
    let next = registry
        .mutate(
            &admin,
            &catalog,
            &Mutation::CreateSchema {
                schema: "t".to_string(),
                comment: None,
            },
        )
        .unwrap();
    assert!(next > version);
}

#[test]
#[serial_test::serial]
fn test_persistent_store_keeps_constraint_kinds() {
    let fixture = TestFixture::persistent();
    fixture.create_schema("s");
    fixture.create_table("s", "t", TableKind::Table, &[&["id"]]);
    fixture.create_table("s", "v", TableKind::View, &[&["id"]]);
    fixture.add_foreign_key("s", "v", ForeignKeyDef::new(&["a"], "s", "t", &["id"]));
    fixture.collector.run_once().unwrap();

    let rows = fixture
        .store
        .read(&fixture.catalog, ReadPoint::Latest)
        .unwrap()
        .rows;
    assert_eq!(rows.pseudo_keys.len(), 1);
    assert_eq!(rows.pseudo_foreign_keys.len(), 1);
    assert_eq!(rows.model_versions.len(), 1);

    let v = fixture.describe("/catalog/1/schema/s/table/v");
    assert_eq!(v["keys"][0]["kind"], "pseudo");
    assert_eq!(v["foreign_keys"][0]["kind"], "pseudo");
    let t = fixture.describe("/catalog/1/schema/s/table/t");
    assert_eq!(t["keys"][0]["kind"], "real");
}

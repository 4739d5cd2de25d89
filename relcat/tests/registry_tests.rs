//! Model registry behavior: mutations, representations, constraint kinds,
//! authorization and concurrent writers

#[path = "testutils/mod.rs"]
mod testutils;

use relcat::registry::{ColumnDef, ForeignKeyDef, KeyDef, TableDef};
use relcat::store::{Statement, Transaction};
use relcat::{
    AllowAll, Authorizer, CatalogError, CatalogId, MetadataStore, Mutation, MvccStore,
    OwnerPolicy, Principal, TableKind,
};
use serde_json::json;
use std::sync::Arc;
use testutils::flaky_store::FlakyStore;
use testutils::test_fixture::TestFixture;

const TABLE1: &str = "/catalog/1/schema/schema1/table/table1";

#[test]
fn test_scenario_key_listing_is_single_real_key() {
    let fixture = TestFixture::with_scenario();

    let keys = fixture.describe(&format!("{}/key/", TABLE1));
    let keys = keys.as_array().expect("key listing is an array");
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["unique_columns"], json!(["id"]));
    assert_eq!(keys[0]["kind"], "real");
    assert_eq!(keys[0]["resource"], format!("{}/key/id", TABLE1));
}

#[test]
fn test_table_representation() {
    let fixture = TestFixture::with_scenario();
    fixture.apply(Mutation::SetComment {
        resource: format!("{}/column/name", TABLE1),
        comment: Some("display name".to_string()),
    });

    let table = fixture.describe(TABLE1);
    assert_eq!(table["schema_name"], "schema1");
    assert_eq!(table["table_name"], "table1");
    assert_eq!(table["kind"], "table");

    let columns = table["column_definitions"].as_array().unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["id", "name"]);
    assert_eq!(columns[0]["type"], "int4");
    assert_eq!(columns[0]["nullok"], false);
    assert_eq!(columns[1]["comment"], "display name");

    let catalog = fixture.describe("/catalog/1");
    assert_eq!(catalog["catalog_id"], "1");
    assert!(catalog["schemas"]["schema1"]["tables"]["table1"].is_object());
    assert_eq!(catalog["version"], fixture.current_version().id());
}

#[test]
fn test_constraint_kind_follows_table_kind_and_survives_reload() {
    let fixture = TestFixture::new();
    fixture.create_schema("s");
    fixture.create_table("s", "t", TableKind::Table, &[&["id"]]);
    fixture.create_table("s", "v", TableKind::View, &[&["id"]]);
    fixture.add_foreign_key("s", "t", ForeignKeyDef::new(&["a"], "s", "t", &["id"]));
    fixture.add_foreign_key("s", "v", ForeignKeyDef::new(&["a"], "s", "t", &["id"]));
    fixture.add_foreign_key("s", "t", ForeignKeyDef::new(&["b"], "s", "v", &["id"]));

    let check = |fixture: &TestFixture| {
        let t = fixture.describe("/catalog/1/schema/s/table/t");
        let v = fixture.describe("/catalog/1/schema/s/table/v");
        assert_eq!(t["keys"][0]["kind"], "real");
        assert_eq!(v["keys"][0]["kind"], "pseudo");
        assert_eq!(v["kind"], "view");
        assert_eq!(v["foreign_keys"][0]["kind"], "pseudo");

        let kinds: Vec<(String, String)> = t["foreign_keys"]
            .as_array()
            .unwrap()
            .iter()
            .map(|fk| {
                (
                    fk["referenced_columns"][0]["table_name"].as_str().unwrap().to_string(),
                    fk["kind"].as_str().unwrap().to_string(),
                )
            })
            .collect();
        assert!(kinds.contains(&("t".to_string(), "real".to_string())));
        assert!(kinds.contains(&("v".to_string(), "pseudo".to_string())));
    };

    check(&fixture);
    // introspecting again never changes a tag
    fixture.registry.invalidate(&fixture.catalog);
    check(&fixture);
    fixture.apply(Mutation::SetComment {
        resource: "/catalog/1/schema/s/table/v/key/id".to_string(),
        comment: Some("asserted".to_string()),
    });
    check(&fixture);
}

#[test]
fn test_version_monotonicity() {
    let fixture = TestFixture::new();
    let mut last = fixture.current_version();

    let mutations = vec![
        Mutation::CreateSchema {
            schema: "s".to_string(),
            comment: Some("first".to_string()),
        },
        Mutation::CreateTable {
            schema: "s".to_string(),
            table: TableDef {
                name: "t".to_string(),
                kind: TableKind::Table,
                columns: vec![ColumnDef::new("id", "int4"), ColumnDef::new("x", "text")],
                keys: vec![KeyDef::new(&["id"])],
                foreign_keys: Vec::new(),
                comment: None,
                annotations: Default::default(),
            },
        },
        Mutation::AddColumn {
            schema: "s".to_string(),
            table: "t".to_string(),
            column: ColumnDef::new("y", "text"),
        },
        Mutation::AddKey {
            schema: "s".to_string(),
            table: "t".to_string(),
            key: KeyDef::new(&["x", "y"]),
        },
        Mutation::SetAnnotation {
            resource: "/catalog/1/schema/s/table/t".to_string(),
            key: "tag:example.org,2024:hidden".to_string(),
            value: json!(true),
        },
        Mutation::DeleteAnnotation {
            resource: "/catalog/1/schema/s/table/t".to_string(),
            key: "tag:example.org,2024:hidden".to_string(),
        },
        Mutation::DropKey {
            schema: "s".to_string(),
            table: "t".to_string(),
            columns: vec!["y".to_string(), "x".to_string()],
        },
        Mutation::DropColumn {
            schema: "s".to_string(),
            table: "t".to_string(),
            column: "y".to_string(),
        },
        Mutation::DropTable {
            schema: "s".to_string(),
            table: "t".to_string(),
        },
        Mutation::DropSchema {
            schema: "s".to_string(),
        },
    ];

    for mutation in mutations {
        let version = fixture.apply(mutation.clone());
        assert!(version > last, "{} did not advance the version", mutation.name());
        assert_eq!(fixture.current_version(), version);
        last = version;
    }
}

#[test]
fn test_failed_mutations_leave_model_untouched() {
    let fixture = TestFixture::with_scenario();
    let before = fixture.current_version();
    let described = fixture.describe("/catalog/1")["schemas"].clone();

    let failures = vec![
        (
            Mutation::CreateSchema {
                schema: "schema1".to_string(),
                comment: None,
            },
            "InvalidModel",
        ),
        (
            Mutation::DropColumn {
                schema: "schema1".to_string(),
                table: "table1".to_string(),
                column: "missing".to_string(),
            },
            "NotFound",
        ),
        (
            Mutation::AddKey {
                schema: "schema1".to_string(),
                table: "table1".to_string(),
                key: KeyDef::new(&["id"]),
            },
            "InvalidModel",
        ),
        (
            Mutation::AddForeignKey {
                schema: "schema1".to_string(),
                table: "table1".to_string(),
                foreign_key: ForeignKeyDef::new(&["name"], "schema1", "table1", &["name"]),
            },
            "InvalidModel",
        ),
        (
            Mutation::SetComment {
                resource: "/catalog/1".to_string(),
                comment: Some("no".to_string()),
            },
            "InvalidModel",
        ),
        (
            Mutation::SetAnnotation {
                resource: format!("{}/column/", TABLE1),
                key: "k".to_string(),
                value: json!(1),
            },
            "MalformedName",
        ),
    ];

    for (mutation, expected) in failures {
        let err = fixture.try_apply(mutation.clone()).unwrap_err();
        let kind = match err {
            CatalogError::InvalidModel(_) => "InvalidModel",
            CatalogError::NotFound(_) => "NotFound",
            CatalogError::MalformedName(_) => "MalformedName",
            ref other => panic!("{} failed with {:?}", mutation.name(), other),
        };
        assert_eq!(kind, expected, "{}", mutation.name());
        assert_eq!(fixture.current_version(), before);
    }
    assert_eq!(fixture.describe("/catalog/1")["schemas"], described);
}

#[test]
fn test_comments_and_annotations() {
    let fixture = TestFixture::with_scenario();
    let comment_path = format!("{}/comment", TABLE1);

    let err = fixture
        .registry
        .read_comment(&fixture.admin, &comment_path)
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));

    fixture.apply(Mutation::SetComment {
        resource: TABLE1.to_string(),
        comment: Some("the first table".to_string()),
    });
    assert_eq!(
        fixture
            .registry
            .read_comment(&fixture.admin, &comment_path)
            .unwrap(),
        "the first table"
    );

    fixture.set_annotation(&format!("{}/key/id", TABLE1), "display", json!({"name": "ID"}));
    let annotation = format!("{}/key/id/annotation/display", TABLE1);
    assert_eq!(
        fixture
            .registry
            .read_annotation(&fixture.admin, &annotation)
            .unwrap(),
        json!({"name": "ID"})
    );

    // clearing a comment leaves nothing behind
    fixture.apply(Mutation::SetComment {
        resource: TABLE1.to_string(),
        comment: None,
    });
    assert!(fixture.describe(TABLE1)["comment"].is_null());

    fixture.apply(Mutation::DeleteAnnotation {
        resource: format!("{}/key/id", TABLE1),
        key: "display".to_string(),
    });
    let err = fixture
        .registry
        .read_annotation(&fixture.admin, &annotation)
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[test]
fn test_dropping_referenced_table_cascades_foreign_keys() {
    let fixture = TestFixture::new();
    fixture.create_schema("s");
    fixture.create_table("s", "parent", TableKind::Table, &[&["id"]]);
    fixture.create_table("s", "child", TableKind::Table, &[&["id"]]);
    fixture.add_foreign_key("s", "child", ForeignKeyDef::new(&["a"], "s", "parent", &["id"]));
    fixture.set_annotation(
        "/catalog/1/schema/s/table/child/foreignkey/a/reference/s:parent/id",
        "label",
        json!("parent link"),
    );

    fixture.apply(Mutation::DropTable {
        schema: "s".to_string(),
        table: "parent".to_string(),
    });

    let child = fixture.describe("/catalog/1/schema/s/table/child");
    assert_eq!(child["foreign_keys"], json!([]));
    let rows = fixture
        .store
        .read(&fixture.catalog, relcat::ReadPoint::Latest)
        .unwrap()
        .rows;
    assert_eq!(rows.annotation_row_count(), 0);
}

#[test]
fn test_owner_policy_denies_strangers() {
    let policy = Arc::new(OwnerPolicy::with_restricted_reads());
    let fixture = TestFixture::with_store(Arc::new(MvccStore::in_memory()), policy.clone());
    policy.grant_owner(&fixture.catalog, fixture.admin.clone());
    fixture.load_scenario();

    let mallory = Principal::new("mallory");
    let before = fixture.current_version();
    let err = fixture
        .registry
        .mutate(
            &mallory,
            &fixture.catalog,
            &Mutation::DropTable {
                schema: "schema1".to_string(),
                table: "table1".to_string(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));
    assert_eq!(fixture.current_version(), before);

    let err = fixture.registry.describe(&mallory, TABLE1, None).unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));
    policy.grant_reader(&fixture.catalog, mallory.clone());
    assert!(fixture.registry.describe(&mallory, TABLE1, None).is_ok());

    // nor drop a catalog it does not own
    let err = fixture
        .registry
        .drop_catalog(&mallory, &fixture.catalog)
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));
}

struct DenyEverything;

impl Authorizer for DenyEverything {
    fn authorize(
        &self,
        _: &Principal,
        object: &relcat::Reference,
        _: relcat::Action,
    ) -> Result<bool, relcat::authz::AuthzError> {
        // let the fixture create its catalog
        Ok(matches!(object, relcat::Reference::Catalog { .. }))
    }
}

#[test]
fn test_authorization_precedes_validation() {
    let fixture =
        TestFixture::with_store(Arc::new(MvccStore::in_memory()), Arc::new(DenyEverything));
    let before = fixture.current_version();

    // the caller learns nothing about objects it may not touch
    let err = fixture
        .try_apply(Mutation::DropSchema {
            schema: "missing".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));

    let err = fixture
        .try_apply(Mutation::CreateTable {
            schema: "public".to_string(),
            table: TableDef {
                name: "t".to_string(),
                kind: TableKind::Table,
                columns: Vec::new(),
                keys: Vec::new(),
                foreign_keys: Vec::new(),
                comment: None,
                annotations: Default::default(),
            },
        })
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));
    assert_eq!(fixture.current_version(), before);
}

#[test]
fn test_stale_transaction_is_a_concurrent_modification() {
    let fixture = TestFixture::with_scenario();
    let stale = fixture.registry.load(&fixture.catalog).unwrap();
    fixture.create_schema("schema2");

    let err = fixture
        .store
        .execute(
            Transaction::new(
                fixture.catalog.clone(),
                vec![
                    Statement::CreateSchema {
                        schema: "schema3".to_string(),
                    },
                    Statement::RecordModelChange,
                ],
            )
            .based_on(stale.snapshot()),
        )
        .unwrap_err();
    assert!(matches!(
        CatalogError::from(err),
        CatalogError::ConcurrentModification(_)
    ));
    assert!(fixture.registry.resolve("/catalog/1/schema/schema3").is_err());
}

#[test]
fn test_concurrent_mutators_all_commit_with_retries() {
    let fixture = TestFixture::new();
    let start = fixture.current_version();
    let writers = 8;

    let versions: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..writers)
            .map(|i| {
                let fixture = &fixture;
                scope.spawn(move || {
                    let mutation = Mutation::CreateSchema {
                        schema: format!("s{}", i),
                        comment: None,
                    };
                    loop {
                        match fixture.try_apply(mutation.clone()) {
                            Ok(version) => return version,
                            Err(CatalogError::ConcurrentModification(_)) => continue,
                            Err(e) => panic!("writer {} failed: {}", i, e),
                        }
                    }
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut sorted = versions.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), writers);
    assert!(sorted.iter().all(|v| *v > start));

    let schemas = fixture.resolve("/catalog/1/schema/");
    assert_eq!(schemas.references().len(), writers);
    assert_eq!(fixture.current_version(), *sorted.last().unwrap());
}

#[test]
fn test_catalog_lifecycle() {
    let fixture = TestFixture::with_scenario();
    let other = CatalogId::from("2");
    fixture.registry.create_catalog(&fixture.admin, &other).unwrap();
    assert_eq!(
        fixture.registry.list_catalogs().unwrap(),
        vec![fixture.catalog.clone(), other.clone()]
    );

    let err = fixture
        .registry
        .create_catalog(&fixture.admin, &other)
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidModel(_)));

    fixture.registry.drop_catalog(&fixture.admin, &other).unwrap();
    let err = fixture.resolve_err("/catalog/2");
    assert!(matches!(err, CatalogError::NotFound(_)));
    // the other catalog is untouched
    assert!(fixture.registry.resolve(TABLE1).is_ok());
}

#[test]
fn test_metadata_writes_reject_listing_paths() {
    let fixture = TestFixture::new();
    fixture.create_schema("s");
    fixture.create_table("s", "parent", TableKind::Table, &[&["id"]]);
    fixture.create_table("s", "child", TableKind::Table, &[&["id"]]);
    fixture.add_foreign_key("s", "child", ForeignKeyDef::new(&["a"], "s", "parent", &["id"]));
    fixture.set_annotation("/catalog/1", "k", json!(1));
    let before = fixture.current_version();

    // every listing below has exactly one member
    let child = "/catalog/1/schema/s/table/child";
    let listings = vec![
        "/catalog/1/schema/".to_string(),
        format!("{}/key/", child),
        format!("{}/foreignkey/", child),
        format!("{}/foreignkey/a", child),
        format!("{}/foreignkey/a/reference/s:parent", child),
        "/catalog/1/annotation/".to_string(),
    ];
    for path in &listings {
        let mutations = vec![
            Mutation::SetComment {
                resource: path.clone(),
                comment: Some("via listing".to_string()),
            },
            Mutation::SetAnnotation {
                resource: path.clone(),
                key: "k2".to_string(),
                value: json!(true),
            },
            Mutation::DeleteAnnotation {
                resource: path.clone(),
                key: "k".to_string(),
            },
        ];
        for mutation in mutations {
            let err = fixture.try_apply(mutation.clone()).unwrap_err();
            assert!(
                matches!(err, CatalogError::MalformedName(_)),
                "{} on {}: {:?}",
                mutation.name(),
                path,
                err
            );
        }
    }
    assert_eq!(fixture.current_version(), before);

    let err = fixture
        .registry
        .read_comment(
            &fixture.admin,
            &format!("{}/foreignkey/a/reference/s:parent/comment", child),
        )
        .unwrap_err();
    assert!(matches!(err, CatalogError::MalformedName(_)));

    // a second schema does not change the answer
    fixture.create_schema("t");
    let err = fixture
        .try_apply(Mutation::SetComment {
            resource: "/catalog/1/schema/".to_string(),
            comment: Some("via listing".to_string()),
        })
        .unwrap_err();
    assert!(matches!(err, CatalogError::MalformedName(_)));

    let err = fixture
        .registry
        .read_annotation(&fixture.admin, "/catalog/1/annotation/")
        .unwrap_err();
    assert!(matches!(err, CatalogError::MalformedName(_)));
    assert_eq!(
        fixture
            .registry
            .read_annotation(&fixture.admin, "/catalog/1/annotation/k")
            .unwrap(),
        json!(1)
    );

    // the complete foreign key form still names one constraint
    fixture.apply(Mutation::SetComment {
        resource: format!("{}/foreignkey/a/reference/s:parent/id", child),
        comment: Some("to parent".to_string()),
    });
}

#[test]
fn test_store_timeouts_reach_the_caller_unchanged() {
    let flaky = Arc::new(FlakyStore::new());
    let fixture = TestFixture::with_store(flaky.clone(), Arc::new(AllowAll));
    fixture.load_scenario();
    let cached = fixture.registry.load(&fixture.catalog).unwrap();
    let before = cached.version();

    flaky.fail_reads_on(&fixture.catalog);
    let err = fixture.registry.resolve(TABLE1).unwrap_err();
    assert!(matches!(err, CatalogError::Timeout(_)), "{:?}", err);
    let err = fixture.try_apply(Mutation::CreateSchema {
        schema: "s".to_string(),
        comment: None,
    });
    assert!(matches!(err, Err(CatalogError::Timeout(_))), "{:?}", err);
    flaky.heal();

    flaky.fail_commits_on(&fixture.catalog);
    let err = fixture
        .try_apply(Mutation::CreateSchema {
            schema: "s".to_string(),
            comment: None,
        })
        .unwrap_err();
    assert!(matches!(err, CatalogError::Timeout(_)), "{:?}", err);
    assert!(err.is_transient());
    flaky.heal();

    // nothing was written and the cached model is still the one in use
    assert_eq!(fixture.current_version(), before);
    let after = fixture.registry.load(&fixture.catalog).unwrap();
    assert!(Arc::ptr_eq(&cached, &after));
    assert!(after.graph().schema("s").is_none());
    assert!(fixture.registry.resolve(TABLE1).is_ok());
}

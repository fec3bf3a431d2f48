//! # Engine Tier Tests (T0-T3)
//!
//! If ANY tier fails, the engine contract is broken.
//!
//! ## Tiers
//! - T0: Validation
//! - T1: Merge
//! - T2: Resolution
//! - T3: Resolve / merge round trip

use docgate_core::{
    AttributeSpec, DocgateError, Document, DocumentSource, LookupStrategy, Merger,
    ResolveOptions, Resolver, Schema, SchemaRegistry, Validator,
};
use serde_json::{Value, json};
use std::sync::Arc;

// =============================================================================
// FIXTURES
// =============================================================================

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn address_obj1() -> Document {
    doc(json!({"street": "Bakerstreet", "city": "London", "plz": "12345", "openWifi": "nopassword"}))
}

fn address_obj2() -> Document {
    doc(json!({"street": "Brook St", "city": "London", "plz": "98765", "openWifi": "WEP-something"}))
}

fn company_obj() -> Document {
    doc(json!({"name": "Continental", "address": "foreign_key_456"}))
}

fn person_obj() -> Document {
    doc(json!({
        "name": "Sepp Huber",
        "email": "sepp.huber@fancypants.com",
        "address": "foreign_key_123",
        "company": "foreign_key_890"
    }))
}

fn find_by_key(key: &Value) -> Option<Document> {
    match key.as_str()? {
        "foreign_key_123" => Some(address_obj1()),
        "foreign_key_456" => Some(address_obj2()),
        "foreign_key_890" => Some(company_obj()),
        _ => None,
    }
}

fn public(document: Document) -> Document {
    let mut document = document;
    document.remove("openWifi");
    document
}

/// Connection shared by every DAO built from it.
struct MockConnection;

impl MockConnection {
    fn get(&self, key: &Value) -> Result<Option<Document>, DocgateError> {
        Ok(find_by_key(key))
    }
}

/// DAO wrapping a connection.
struct MockDao {
    connection: Arc<MockConnection>,
}

impl DocumentSource for MockDao {
    fn find(&self, key: &Value) -> Result<Option<Document>, DocgateError> {
        self.connection.get(key)
    }
}

fn address_model() -> Arc<Schema> {
    Arc::new(
        Schema::builder("address")
            .required("street")
            .required("city")
            .required("plz")
            .private("openWifi")
            .build()
            .expect("address"),
    )
}

fn company_model() -> Arc<Schema> {
    Arc::new(
        Schema::builder("company")
            .required("address")
            .resolve_as(
                "address",
                LookupStrategy::function(find_by_key),
                address_model(),
            )
            .build()
            .expect("company"),
    )
}

/// Explicit target models on both attributes.
fn person_model_1() -> Schema {
    Schema::builder("person")
        .required("name")
        .required("email")
        .resolve_as(
            "address",
            LookupStrategy::function(find_by_key),
            address_model(),
        )
        .resolve_as(
            "company",
            LookupStrategy::bound(Arc::new(MockConnection), MockConnection::get),
            company_model(),
        )
        .build()
        .expect("person")
}

/// Target model of `company` taken from `sub_models`.
fn person_model_2() -> Schema {
    Schema::builder("person")
        .required("name")
        .required("email")
        .resolve_as(
            "address",
            LookupStrategy::function(find_by_key),
            address_model(),
        )
        .resolve("company", LookupStrategy::function(find_by_key))
        .sub_model("company", company_model())
        .build()
        .expect("person")
}

/// Lookup through a DAO constructed per call.
fn person_model_3() -> Schema {
    let connection = Arc::new(MockConnection);
    Schema::builder("person")
        .resolve_as(
            "address",
            LookupStrategy::constructed(
                move |_args| {
                    let dao: Box<dyn DocumentSource> = Box::new(MockDao {
                        connection: Arc::clone(&connection),
                    });
                    Ok(dao)
                },
                doc(json!({"connection": "mock"})),
            ),
            address_model(),
        )
        .build()
        .expect("person")
}

/// Lookup through a pre-built DAO.
fn person_model_4() -> Schema {
    let dao = MockDao {
        connection: Arc::new(MockConnection),
    };
    Schema::builder("person")
        .resolve_as("address", LookupStrategy::instance(dao), address_model())
        .build()
        .expect("person")
}

// =============================================================================
// TIER T0: VALIDATION
// =============================================================================

mod t0_validation {
    use super::*;

    /// T0.1: A required attribute must be present, whatever its value.
    #[test]
    fn required_coverage() {
        let schema = Schema::builder("s").required("A").build().expect("build");

        assert!(matches!(
            Validator::validate(&schema, &Document::new()),
            Err(DocgateError::Validation(_))
        ));
        for value in [json!(null), json!(0), json!("x"), json!({"n": 1}), json!([])] {
            let mut document = Document::new();
            document.insert("A".to_string(), value);
            assert!(Validator::validate(&schema, &document).is_ok());
        }
    }

    /// T0.2: one_of and either_of group semantics.
    #[test]
    fn compound_groups() {
        let one_of = Schema::builder("s")
            .required(AttributeSpec::one_of(["A", "B"]))
            .build()
            .expect("build");
        let either_of = Schema::builder("s")
            .required(AttributeSpec::either_of(["C", "D"]))
            .build()
            .expect("build");

        assert!(Validator::validate(&one_of, &doc(json!({}))).is_err());
        assert!(Validator::validate(&one_of, &doc(json!({"A": 1}))).is_ok());
        assert!(Validator::validate(&one_of, &doc(json!({"B": 1}))).is_ok());
        assert!(Validator::validate(&one_of, &doc(json!({"A": 1, "B": 1}))).is_ok());

        assert!(Validator::validate(&either_of, &doc(json!({}))).is_err());
        assert!(Validator::validate(&either_of, &doc(json!({"C": 1}))).is_ok());
        assert!(Validator::validate(&either_of, &doc(json!({"D": 1}))).is_ok());
        assert!(Validator::validate(&either_of, &doc(json!({"C": 1, "D": 1}))).is_err());
    }

    /// T0.3: An empty optional list still whitelists.
    #[test]
    fn whitelist_enforcement() {
        let restrictive = Schema::builder("s")
            .required("name")
            .restrictive()
            .build()
            .expect("build");
        let open = Schema::builder("s").required("name").build().expect("build");
        let document = doc(json!({"name": "x", "extra": "y"}));

        assert!(matches!(
            Validator::validate(&restrictive, &document),
            Err(DocgateError::Validation(_))
        ));
        assert!(Validator::validate(&open, &document).is_ok());
    }

    /// T0.4: Illegal modes are configuration errors, not validation errors.
    #[test]
    fn bad_schema_is_not_bad_data() {
        let schema = Schema::builder("s")
            .required(AttributeSpec::all_of(["A", "B"]))
            .build()
            .expect("build");

        let err = Validator::validate(&schema, &doc(json!({"A": 1, "B": 2})))
            .expect_err("configuration error");
        assert!(matches!(err, DocgateError::Configuration(_)));
        assert!(!err.is_client_error());
    }

    /// T0.5: Each key matches exactly one optional entry.
    #[test]
    fn optional_entries_do_not_overlap() {
        let overlapping = Schema::builder("s")
            .optional("A")
            .optional(AttributeSpec::all_of(["A", "B"]))
            .build();
        assert!(matches!(overlapping, Err(DocgateError::Configuration(_))));

        let schema = Schema::builder("s")
            .optional(AttributeSpec::all_of(["A", "B"]))
            .build()
            .expect("build");
        assert!(matches!(
            Validator::validate(&schema, &doc(json!({"A": 1}))),
            Err(DocgateError::Validation(_))
        ));
    }
}

// =============================================================================
// TIER T1: MERGE
// =============================================================================

mod t1_merge {
    use super::*;

    fn immutable_a() -> Schema {
        Schema::builder("s").immutable("A").build().expect("build")
    }

    /// T1.1: Immutable attributes cannot change or disappear.
    #[test]
    fn immutability_on_merge() {
        let schema = immutable_a();
        let stored = doc(json!({"A": 1}));

        assert!(matches!(
            Merger::merge(&schema, &stored, &doc(json!({"A": 2}))),
            Err(DocgateError::ChangingImmutableAttribute(_))
        ));
        assert_eq!(
            Merger::merge(&schema, &stored, &doc(json!({"A": 1}))).expect("merge"),
            doc(json!({"A": 1}))
        );
        assert!(matches!(
            Merger::merge(&schema, &stored, &Document::new()),
            Err(DocgateError::ChangingImmutableAttribute(_))
        ));
    }

    /// T1.2: Mutable attributes are added and removed freely.
    #[test]
    fn merge_adds_and_removes_mutable_fields() {
        let schema = immutable_a();

        assert_eq!(
            Merger::merge(&schema, &doc(json!({"A": 1})), &doc(json!({"A": 1, "B": 2})))
                .expect("merge"),
            doc(json!({"A": 1, "B": 2}))
        );
        assert_eq!(
            Merger::merge(&schema, &doc(json!({"A": 1, "B": 2})), &doc(json!({"A": 1})))
                .expect("merge"),
            doc(json!({"A": 1}))
        );
    }

    /// T1.3: Immutable equality is value equality.
    #[test]
    fn immutable_compares_by_value() {
        let schema = immutable_a();
        let stored = doc(json!({"A": {"nested": [1, 2, 3]}}));
        let proposed = doc(json!({"A": {"nested": [1, 2, 3]}}));

        assert!(Merger::merge(&schema, &stored, &proposed).is_ok());
    }

    fn with_address() -> Schema {
        let address = Arc::new(
            Schema::builder("address")
                .immutable("planet")
                .build()
                .expect("address"),
        );
        Schema::builder("person")
            .sub_model("address", address)
            .build()
            .expect("person")
    }

    /// T1.4: Reshaping a sub-model value cannot drop nested immutables.
    #[test]
    fn reshaped_sub_model_keeps_immutables() {
        let schema = with_address();

        let listed = doc(json!({"address": [{"street": "x", "planet": "Earth"}]}));
        let single = doc(json!({"address": {"street": "y"}}));
        assert!(matches!(
            Merger::merge(&schema, &listed, &single),
            Err(DocgateError::ChangingImmutableAttribute(_))
        ));

        let single = doc(json!({"address": {"street": "x", "planet": "Earth"}}));
        let listed = doc(json!({"address": [{"street": "y"}]}));
        assert!(matches!(
            Merger::merge(&schema, &single, &listed),
            Err(DocgateError::ChangingImmutableAttribute(_))
        ));
    }

    /// T1.5: Reshaping is fine when nothing immutable is lost.
    #[test]
    fn reshaped_sub_model_without_immutables() {
        let schema = with_address();
        let stored = doc(json!({"address": [{"street": "x"}]}));
        let proposed = doc(json!({"address": {"street": "y", "planet": "Mars"}}));

        assert_eq!(
            Merger::merge(&schema, &stored, &proposed).expect("merge"),
            proposed
        );
    }
}

// =============================================================================
// TIER T2: RESOLUTION
// =============================================================================

mod t2_resolution {
    use super::*;

    /// T2.1: Depth controls how far references are followed.
    #[test]
    fn key_is_resolved() {
        let resolved = Resolver::resolve(
            &person_model_1(),
            &person_obj(),
            ResolveOptions::with_depth(1),
        )
        .expect("resolve");
        assert_eq!(resolved["company"], Value::Object(company_obj()));
        assert_eq!(resolved["company"]["address"], json!("foreign_key_456"));

        let resolved = Resolver::resolve(
            &person_model_1(),
            &person_obj(),
            ResolveOptions::with_depth(2),
        )
        .expect("resolve");
        assert_eq!(resolved["address"], Value::Object(public(address_obj1())));
        assert_eq!(
            resolved["company"]["address"],
            Value::Object(public(address_obj2()))
        );
    }

    /// T2.2: Target model falls back to sub_models.
    #[test]
    fn sub_model_fallback() {
        let resolved = Resolver::resolve(
            &person_model_2(),
            &person_obj(),
            ResolveOptions::with_depth(2),
        )
        .expect("resolve");
        assert_eq!(resolved["address"], Value::Object(public(address_obj1())));
        assert_eq!(
            resolved["company"]["address"],
            Value::Object(public(address_obj2()))
        );
    }

    /// T2.3: Private attributes never leak through resolution.
    #[test]
    fn response_is_prepared_when_resolving() {
        let resolved = Resolver::resolve(
            &person_model_1(),
            &person_obj(),
            ResolveOptions::with_depth(2),
        )
        .expect("resolve");

        assert!(resolved["address"].get("openWifi").is_none());
        assert!(resolved["company"]["address"].get("openWifi").is_none());
    }

    /// T2.4: Lenient leaves the key, fail-fast reports it.
    #[test]
    fn failing_fast() {
        let person = doc(json!({"name": "x", "email": "y", "company": "no_such_key"}));

        let resolved =
            Resolver::resolve(&person_model_1(), &person, ResolveOptions::default())
                .expect("resolve");
        assert_eq!(resolved["company"], json!("no_such_key"));

        let err = Resolver::resolve(
            &person_model_1(),
            &person,
            ResolveOptions::default().fail_fast(),
        )
        .expect_err("not found");
        assert!(matches!(err, DocgateError::ResolvedObjectNotFound { .. }));
        let message = err.to_string();
        assert!(message.contains("no_such_key"));
        assert!(message.contains("company"));
    }

    /// T2.5: Constructed and pre-built lookup instances.
    #[test]
    fn lookup_instances() {
        let resolved =
            Resolver::resolve(&person_model_3(), &person_obj(), ResolveOptions::default())
                .expect("resolve");
        assert_eq!(resolved["address"], Value::Object(public(address_obj1())));

        let resolved =
            Resolver::resolve(&person_model_4(), &person_obj(), ResolveOptions::default())
                .expect("resolve");
        assert_eq!(resolved["address"], Value::Object(public(address_obj1())));
    }

    /// T2.6: Depth above the ceiling behaves like the ceiling.
    #[test]
    fn depth_is_clamped() {
        // level0 -> level1 -> level2 -> level3 -> level4
        fn chain(key: &Value) -> Option<Document> {
            let level: u64 = key.as_str()?.strip_prefix("level")?.parse().ok()?;
            let mut document = Document::new();
            document.insert("id".to_string(), json!(level));
            document.insert("next".to_string(), json!(format!("level{}", level + 1)));
            Some(document)
        }

        let mut registry = SchemaRegistry::new();
        let next = registry.reference("node");
        let root = registry
            .register(
                Schema::builder("node")
                    .resolve_as("next", LookupStrategy::function(chain), next)
                    .build()
                    .expect("node"),
            )
            .expect("register");

        let input = doc(json!({"id": 0, "next": "level1"}));
        let deep =
            Resolver::resolve(&root, &input, ResolveOptions::with_depth(10)).expect("resolve");
        let capped =
            Resolver::resolve(&root, &input, ResolveOptions::with_depth(3)).expect("resolve");

        assert_eq!(deep, capped);
        assert_eq!(deep["next"]["next"]["next"]["id"], json!(3));
        assert_eq!(deep["next"]["next"]["next"]["next"], json!("level4"));
    }

    /// T2.7: A self-referential schema governs every level of its data.
    #[test]
    fn self_referential_schema() {
        let mut registry = SchemaRegistry::new();
        let manager = registry.reference("employee");
        let employee = registry
            .register(
                Schema::builder("employee")
                    .required("name")
                    .private("salary")
                    .sub_model("manager", manager)
                    .build()
                    .expect("employee"),
            )
            .expect("register");

        let chain = doc(json!({
            "name": "Ada",
            "salary": 1,
            "manager": {"name": "Grace", "salary": 2, "manager": {"name": "Alan", "salary": 3}}
        }));
        assert!(Validator::validate(&employee, &chain).is_ok());
        assert_eq!(
            employee.strip_private(&chain),
            doc(json!({"name": "Ada", "manager": {"name": "Grace", "manager": {"name": "Alan"}}}))
        );

        let headless = doc(json!({"name": "Ada", "manager": {"manager": {"name": "Alan"}}}));
        assert!(matches!(
            Validator::validate(&employee, &headless),
            Err(DocgateError::Validation(_))
        ));
    }
}

// =============================================================================
// TIER T3: ROUND TRIP
// =============================================================================

mod t3_round_trip {
    use super::*;

    /// T3.1: A resolved response sent back as an update keeps the stored keys.
    #[test]
    fn resolved_attributes_are_not_saved_on_update() {
        let stored = person_obj();
        let resolved = Resolver::resolve(
            &person_model_1(),
            &stored,
            ResolveOptions::with_depth(2),
        )
        .expect("resolve");
        assert!(resolved["address"].is_object());

        let merged = Merger::merge(&person_model_1(), &stored, &resolved).expect("merge");

        assert_eq!(merged["company"], stored["company"]);
        assert_eq!(merged["address"], stored["address"]);
    }

    /// T3.2: Minimal address scenario.
    #[test]
    fn address_write_protection() {
        let schema = Schema::builder("person")
            .resolve_as(
                "address",
                LookupStrategy::function(|key| {
                    (key == "fk1").then(|| doc(json!({"street": "Bakerstreet"})))
                }),
                address_model(),
            )
            .build()
            .expect("build");

        let stored = doc(json!({"address": "fk1"}));
        let resolved =
            Resolver::resolve(&schema, &stored, ResolveOptions::default()).expect("resolve");
        assert_eq!(resolved["address"], json!({"street": "Bakerstreet"}));

        let merged = Merger::merge(&schema, &stored, &resolved).expect("merge");
        assert_eq!(merged, doc(json!({"address": "fk1"})));
    }

    /// T3.3: Stripping a resolved response is stable.
    #[test]
    fn strip_after_resolve_is_stable() {
        let schema = person_model_2();
        let resolved = Resolver::resolve(&schema, &person_obj(), ResolveOptions::with_depth(2))
            .expect("resolve");

        let once = schema.strip_private(&resolved);
        let twice = schema.strip_private(&once);
        assert_eq!(once, twice);
    }
}

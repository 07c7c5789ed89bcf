//! End-to-end transformation scenarios.

use chrono::{TimeZone, Utc};
use chrysalis_core::{
    ClassId, ClassTransformer, Direction, Discriminator, ExposeOptions, MetadataError,
    MetadataStorage, Object, TargetMap, TransformFnOptions, TransformOptions, TypeOptions,
    TypeRef, Value, default_metadata_storage, instance_to_plain, plain_to_instance,
};

fn keys(value: &Value) -> Vec<String> {
    value.keys()
}

fn photo_union() -> TypeOptions {
    TypeOptions::new().discriminator(
        Discriminator::new("__type")
            .sub_type("landscape", "Landscape")
            .sub_type("portrait", "Portrait"),
    )
}

#[test]
fn test_excluded_password_never_reaches_plain() {
    let mut storage = MetadataStorage::new();
    storage.describe("User").exclude("password").register().unwrap();
    let transformer = ClassTransformer::new(&storage);
    let user = Value::instance(
        "User",
        [
            ("firstName", Value::from("Umed")),
            ("lastName", Value::from("K")),
            ("password", Value::from("x")),
        ],
    );

    let plain = transformer.instance_to_plain(&user, &TransformOptions::new());

    assert_eq!(keys(&plain), vec!["firstName", "lastName"]);
    assert_eq!(plain.class_id(), None);
    assert_eq!(
        plain,
        Value::plain([
            ("firstName", Value::from("Umed")),
            ("lastName", Value::from("K")),
        ])
    );
}

#[test]
fn test_typed_array_becomes_instances() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Album")
        .type_of("photos", "Photo")
        .hint("photos", TypeRef::Array)
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let plain = Value::plain([
        ("name", Value::from("Holidays")),
        (
            "photos",
            Value::array([
                Value::plain([("id", Value::from(1i64))]),
                Value::plain([("id", Value::from(2i64))]),
            ]),
        ),
    ]);

    let album = transformer.plain_to_instance("Album", &plain, &TransformOptions::new());

    assert_eq!(album.class_id(), Some(ClassId::from("Album")));
    let photos = album.get("photos");
    let photos = photos.as_sequence().unwrap();
    assert_eq!(photos.len(), 2);
    for (photo, id) in photos.iter().zip([1i64, 2]) {
        assert!(storage.is_instance_of(photo, &"Photo".into()));
        assert_eq!(photo.get("id"), Value::from(id));
    }
}

#[test]
fn test_plain_array_to_instances() {
    let storage = MetadataStorage::new();
    let transformer = ClassTransformer::new(&storage);
    let plain = Value::array([
        Value::plain([("id", Value::from(1i64))]),
        Value::plain([("id", Value::from(2i64))]),
    ]);

    let users = transformer.plain_to_instance("User", &plain, &TransformOptions::new());

    let users = users.as_sequence().unwrap();
    assert!(users
        .iter()
        .all(|u| u.class_id() == Some(ClassId::from("User"))));
}

#[test]
fn test_stacked_expose_with_input_alias() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("User")
        .expose_with(
            "name",
            ExposeOptions::new().to_class_only().name("inputName"),
        )
        .expose_with("name", ExposeOptions::new().to_plain_only())
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let options = TransformOptions::new().exclude_extraneous_values(true);

    let user = transformer.plain_to_instance(
        "User",
        &Value::plain([("inputName", Value::from("X"))]),
        &options,
    );

    assert_eq!(user, Value::instance("User", [("name", Value::from("X"))]));

    let plain = transformer.instance_to_plain(&user, &options);
    assert_eq!(plain, Value::plain([("name", Value::from("X"))]));
}

#[test]
fn test_alias_renames_output() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Product")
        .alias("title", "product_title", Direction::ClassToPlain)
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let product = Value::instance("Product", [("title", Value::from("Lamp"))]);

    let plain = transformer.instance_to_plain(&product, &TransformOptions::new());

    assert_eq!(keys(&plain), vec!["product_title"]);
}

#[test]
fn test_version_window_boundaries() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Doc")
        .expose_with("draft", ExposeOptions::new().since(1.0).until(2.0))
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let doc = Value::instance(
        "Doc",
        [("title", Value::from("t")), ("draft", Value::from(true))],
    );
    let has_draft = |options: TransformOptions| {
        !transformer
            .instance_to_plain(&doc, &options)
            .get("draft")
            .is_undefined()
    };

    assert!(!has_draft(TransformOptions::new().version(0.999)));
    assert!(has_draft(TransformOptions::new().version(1.0)));
    assert!(has_draft(TransformOptions::new().version(1.999)));
    assert!(!has_draft(TransformOptions::new().version(2.0)));
    assert!(has_draft(TransformOptions::new()));
}

#[test]
fn test_groups_are_opt_in() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Account")
        .expose_with("email", ExposeOptions::new().groups(["admin", "owner"]))
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let account = Value::instance(
        "Account",
        [("id", Value::from(1i64)), ("email", Value::from("a@b"))],
    );
    let has_email = |options: TransformOptions| {
        !transformer
            .instance_to_plain(&account, &options)
            .get("email")
            .is_undefined()
    };

    assert!(!has_email(TransformOptions::new()));
    assert!(has_email(TransformOptions::new().groups(["owner"])));
    assert!(!has_email(TransformOptions::new().groups(["guest"])));
}

#[test]
fn test_exclude_all_strategy() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Secret")
        .exclude_all()
        .expose("label")
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let secret = Value::instance(
        "Secret",
        [("label", Value::from("l")), ("value", Value::from("v"))],
    );

    let plain = transformer.instance_to_plain(&secret, &TransformOptions::new());
    assert_eq!(keys(&plain), vec!["label"]);

    // Option strategy applies only to classes that declare none.
    let plain = transformer.instance_to_plain(
        &Value::instance("Open", [("a", Value::from(1i64))]),
        &TransformOptions::new().strategy(chrysalis_core::Strategy::ExcludeAll),
    );
    assert!(keys(&plain).is_empty());
}

#[test]
fn test_exclude_prefixes() {
    let storage = MetadataStorage::new();
    let transformer = ClassTransformer::new(&storage);
    let value = Value::instance(
        "Cache",
        [
            ("_internal", Value::from(1i64)),
            ("$meta", Value::from(2i64)),
            ("visible", Value::from(3i64)),
        ],
    );

    let plain = transformer.instance_to_plain(
        &value,
        &TransformOptions::new().exclude_prefixes(["_", "$"]),
    );

    assert_eq!(keys(&plain), vec!["visible"]);
}

#[test]
fn test_circular_class_to_plain_omits_slot() {
    let storage = MetadataStorage::new();
    let transformer = ClassTransformer::new(&storage);
    let options = TransformOptions::new().enable_circular_check(true);
    let a = Value::instance("Node", [("name", Value::from("a"))]);
    let b = Value::instance("Node", [("name", Value::from("b")), ("ref", a.clone())]);
    a.as_object().unwrap().borrow_mut().set("ref", b.clone());

    let plain = transformer.instance_to_plain(&a, &options);

    assert_eq!(plain.get("name"), Value::from("a"));
    assert_eq!(keys(&plain.get("ref")), vec!["name"]);
    assert!(plain.to_json().is_ok());

    a.as_object().unwrap().borrow_mut().remove("ref");
}

#[test]
fn test_circular_class_to_class_preserves_identity() {
    let storage = MetadataStorage::new();
    let transformer = ClassTransformer::new(&storage);
    let options = TransformOptions::new().enable_circular_check(true);
    let a = Value::instance("Node", [("name", Value::from("a"))]);
    let b = Value::instance("Node", [("name", Value::from("b")), ("ref", a.clone())]);
    a.as_object().unwrap().borrow_mut().set("ref", b.clone());

    let a2 = transformer.instance_to_instance(&a, &options);
    let b2 = a2.get("ref");

    assert!(!a2.same_value(&a));
    assert!(!b2.same_value(&b));
    assert_eq!(b2.get("name"), Value::from("b"));
    assert!(b2.get("ref").same_value(&a2));
    assert_eq!(a2.class_id(), Some(ClassId::from("Node")));

    a.as_object().unwrap().borrow_mut().remove("ref");
    a2.as_object().unwrap().borrow_mut().remove("ref");
}

#[test]
fn test_transform_order_is_stable() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Post")
        .transform("title", |p| Value::from(format!("{}1", p.value.to_js_string())))
        .transform("title", |p| Value::from(format!("{}2", p.value.to_js_string())))
        .transform_with(
            "title",
            |p| Value::from(format!("{}3", p.value.to_js_string())),
            TransformFnOptions::new().to_class_only(),
        )
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let post = Value::instance("Post", [("title", Value::from("t"))]);
    let options = TransformOptions::new();

    for _ in 0..5 {
        let plain = transformer.instance_to_plain(&post, &options);
        assert_eq!(plain.get("title"), Value::from("t12"));
    }
    for _ in 0..5 {
        let copy = transformer.plain_to_instance(
            "Post",
            &Value::plain([("title", Value::from("t"))]),
            &options,
        );
        assert_eq!(copy.get("title"), Value::from("t123"));
    }
}

#[test]
fn test_transform_sees_source_object() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Price")
        .transform("amount", |p| {
            let rate = p.obj.get("rate").as_f64().unwrap_or(1.0);
            Value::from(p.value.as_f64().unwrap_or_default() * rate)
        })
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);

    let price = transformer.plain_to_instance(
        "Price",
        &Value::plain([("amount", Value::from(2i64)), ("rate", Value::from(1.5))]),
        &TransformOptions::new(),
    );

    assert_eq!(price.get("amount"), Value::Float(3.0));
}

#[test]
fn test_round_trip() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Person")
        .type_of("address", "Address")
        .type_of("birthday", TypeRef::Date)
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let options = TransformOptions::new();
    let person = Value::instance(
        "Person",
        [
            ("name", Value::from("Ada")),
            ("age", Value::from(36i64)),
            ("tags", Value::array([Value::from("math"), Value::from("poetry")])),
            (
                "birthday",
                Value::from(Utc.with_ymd_and_hms(1815, 12, 10, 0, 0, 0).unwrap()),
            ),
            (
                "address",
                Value::instance("Address", [("city", Value::from("London"))]),
            ),
        ],
    );

    let plain = transformer.instance_to_plain(&person, &options);
    assert_eq!(plain.get("address").class_id(), None);
    let back = transformer.plain_to_instance("Person", &plain, &options);

    assert_eq!(back, person);
}

#[test]
fn test_json_round_trip() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Event")
        .type_of("at", TypeRef::Date)
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let options = TransformOptions::new();
    let event = Value::instance(
        "Event",
        [
            ("name", Value::from("launch")),
            ("at", Value::from(Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap())),
        ],
    );

    let json = transformer.serialize(&event, &options).unwrap();
    assert_eq!(json, r#"{"name":"launch","at":"2020-01-02T03:04:05.000Z"}"#);
    let back = transformer.deserialize("Event", &json, &options).unwrap();

    assert_eq!(back, event);
}

#[test]
fn test_discriminator_plain_to_class() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Gallery")
        .type_with("cover", "Photo", photo_union())
        .type_with("photos", "Photo", photo_union())
        .hint("photos", TypeRef::Array)
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let plain = Value::plain([
        (
            "cover",
            Value::plain([("__type", Value::from("portrait")), ("w", Value::from(1i64))]),
        ),
        (
            "photos",
            Value::array([
                Value::plain([("__type", Value::from("landscape"))]),
                Value::plain([("__type", Value::from("square"))]),
            ]),
        ),
    ]);

    let gallery = transformer.plain_to_instance("Gallery", &plain, &TransformOptions::new());

    let cover = gallery.get("cover");
    assert_eq!(cover, Value::instance("Portrait", [("w", Value::from(1i64))]));
    let photos = gallery.get("photos");
    assert_eq!(photos.index(0).class_id(), Some(ClassId::from("Landscape")));
    assert_eq!(photos.index(1).class_id(), Some(ClassId::from("Photo")));
    // input untouched
    assert_eq!(plain.get("cover").get("__type"), Value::from("portrait"));
}

#[test]
fn test_discriminator_keep_property() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Gallery")
        .type_with("cover", "Photo", photo_union().keep_discriminator_property(true))
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let plain = Value::plain([(
        "cover",
        Value::plain([("__type", Value::from("landscape"))]),
    )]);

    let gallery = transformer.plain_to_instance("Gallery", &plain, &TransformOptions::new());

    assert_eq!(
        gallery.get("cover"),
        Value::instance("Landscape", [("__type", Value::from("landscape"))])
    );
}

#[test]
fn test_discriminator_class_to_plain_and_class() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Gallery")
        .type_with("cover", "Photo", photo_union())
        .type_with("photos", "Photo", photo_union())
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let portrait = Value::instance("Portrait", [("w", Value::from(1i64))]);
    let gallery = Value::instance(
        "Gallery",
        [
            ("cover", portrait.clone()),
            ("photos", Value::array([Value::instance::<&str>("Landscape", [])])),
        ],
    );
    let options = TransformOptions::new();

    let plain = transformer.instance_to_plain(&gallery, &options);
    assert_eq!(
        plain.get("cover"),
        Value::plain([("w", Value::from(1i64)), ("__type", Value::from("portrait"))])
    );
    assert_eq!(
        plain.get("photos").index(0),
        Value::plain([("__type", Value::from("landscape"))])
    );
    assert!(portrait.get("__type").is_undefined());

    let copy = transformer.instance_to_instance(&gallery, &options);
    assert_eq!(copy.get("cover").class_id(), Some(ClassId::from("Portrait")));
    assert!(!copy.get("cover").same_value(&portrait));
}

#[test]
fn test_sets_and_maps_from_hints() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Team")
        .type_of("members", "Member")
        .hint("members", TypeRef::Set)
        .type_of("scores", TypeRef::Number)
        .hint("scores", TypeRef::Map)
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let plain = Value::plain([
        (
            "members",
            Value::array([
                Value::plain([("name", Value::from("a"))]),
                Value::plain([("name", Value::from("b"))]),
            ]),
        ),
        (
            "scores",
            Value::plain([("a", Value::from("1")), ("b", Value::from("2"))]),
        ),
    ]);
    let options = TransformOptions::new();

    let team = transformer.plain_to_instance("Team", &plain, &options);

    let members = team.get("members");
    assert!(matches!(members, Value::Set(ref items) if items.len() == 2));
    assert_eq!(members.index(0).class_id(), Some(ClassId::from("Member")));
    assert_eq!(
        team.get("scores"),
        Value::map([("a", Value::Int(1)), ("b", Value::Int(2))])
    );

    let back = transformer.instance_to_plain(&team, &options);
    assert!(matches!(back.get("members"), Value::Array(_)));
    assert_eq!(
        back.get("scores"),
        Value::plain([("a", Value::Int(1)), ("b", Value::Int(2))])
    );
}

#[test]
fn test_implicit_conversion_and_target_maps() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Item")
        .hint("count", TypeRef::Number)
        .hint("created", TypeRef::Date)
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let plain = Value::plain([
        ("count", Value::from("5")),
        ("created", Value::from("2020-01-01")),
    ]);

    let loose = transformer.plain_to_instance("Item", &plain, &TransformOptions::new());
    assert_eq!(loose.get("count"), Value::from("5"));

    let converted = transformer.plain_to_instance(
        "Item",
        &plain,
        &TransformOptions::new().enable_implicit_conversion(true),
    );
    assert_eq!(converted.get("count"), Value::Int(5));
    assert_eq!(
        converted.get("created"),
        Value::from(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
    );

    let mapped = transformer.plain_to_instance(
        "Item",
        &plain,
        &TransformOptions::new().target_map(TargetMap::new("Item").property("count", "Number")),
    );
    assert_eq!(mapped.get("count"), Value::Int(5));
    assert_eq!(mapped.get("created"), Value::from("2020-01-01"));
}

#[test]
fn test_plain_to_instance_from_exist() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Profile")
        .default_value("theme", || Value::from("dark"))
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let mut object = storage.instantiate(&"Profile".into());
    object.set("theme", "light");
    object.set("id", 1i64);
    let existing = Value::from(object);

    let result = transformer.plain_to_instance_from_exist(
        &existing,
        &Value::plain([("name", Value::from("x"))]),
        &TransformOptions::new(),
    );

    assert!(result.same_value(&existing));
    assert_eq!(existing.get("theme"), Value::from("light"));
    assert_eq!(existing.get("id"), Value::Int(1));
    assert_eq!(existing.get("name"), Value::from("x"));
}

#[test]
fn test_instance_to_plain_from_exist() {
    let mut storage = MetadataStorage::new();
    storage.describe("User").exclude("password").register().unwrap();
    let transformer = ClassTransformer::new(&storage);
    let existing = Value::plain([("extra", Value::from(true))]);
    let user = Value::instance(
        "User",
        [("name", Value::from("n")), ("password", Value::from("p"))],
    );

    transformer.instance_to_plain_from_exist(&existing, &user, &TransformOptions::new());

    assert_eq!(keys(&existing), vec!["extra", "name"]);
}

#[test]
fn test_methods_and_computed_properties() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Person")
        .method("greet")
        .computed("fullName", |obj: &Object| {
            let part = |key| obj.get(key).map(Value::to_js_string).unwrap_or_default();
            Value::from(format!("{} {}", part("first"), part("last")))
        })
        .computed_with_setter(
            "nick",
            |obj: &Object| obj.get("_nick").cloned().unwrap_or_default(),
            |obj: &mut Object, value| obj.set("_nick", value),
        )
        .expose("fullName")
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let plain = Value::plain([
        ("first", Value::from("Ada")),
        ("last", Value::from("Lovelace")),
        ("greet", Value::from("overwritten?")),
        ("fullName", Value::from("overwritten?")),
        ("nick", Value::from("countess")),
    ]);
    let options = TransformOptions::new();

    let person = transformer.plain_to_instance("Person", &plain, &options);

    assert_eq!(keys(&person), vec!["first", "last", "_nick"]);
    assert_eq!(person.get("_nick"), Value::from("countess"));

    let out = transformer.instance_to_plain(&person, &options.clone().exclude_prefixes(["_"]));
    assert_eq!(
        out,
        Value::plain([
            ("first", Value::from("Ada")),
            ("last", Value::from("Lovelace")),
            ("fullName", Value::from("Ada Lovelace")),
        ])
    );
}

#[test]
fn test_default_and_unset_values() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Settings")
        .default_value("theme", || Value::from("dark"))
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let plain = Value::plain([("theme", Value::Undefined)]);

    let unset = transformer.plain_to_instance("Settings", &plain, &TransformOptions::new());
    assert!(unset.get("theme").is_undefined());

    let kept = transformer.plain_to_instance(
        "Settings",
        &plain,
        &TransformOptions::new().expose_default_values(true),
    );
    assert_eq!(kept.get("theme"), Value::from("dark"));

    let instance = Value::instance("Settings", [("theme", Value::Undefined)]);
    let skipped = transformer.instance_to_plain(
        &instance,
        &TransformOptions::new().expose_unset_fields(false),
    );
    assert!(keys(&skipped).is_empty());
    let written = transformer.instance_to_plain(&instance, &TransformOptions::new());
    assert_eq!(keys(&written), vec!["theme"]);
}

#[test]
fn test_inherited_metadata() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Entity")
        .exclude("internalId")
        .type_of("createdAt", TypeRef::Date)
        .register()
        .unwrap();
    storage
        .describe("User")
        .extends("Entity")
        .type_of("createdAt", TypeRef::String)
        .register()
        .unwrap();
    let transformer = ClassTransformer::new(&storage);
    let plain = Value::plain([
        ("internalId", Value::from(9i64)),
        ("createdAt", Value::from(20i64)),
    ]);

    let user = transformer.plain_to_instance("User", &plain, &TransformOptions::new());

    assert_eq!(keys(&user), vec!["createdAt"]);
    assert_eq!(user.get("createdAt"), Value::from("20"));
}

#[test]
fn test_registration_errors() {
    let mut storage = MetadataStorage::new();
    storage
        .describe("Album")
        .transform("title", |p| p.value)
        .register()
        .unwrap();

    let duplicate = storage
        .describe("Album")
        .transform("title", |p| p.value)
        .register();
    assert!(matches!(
        duplicate,
        Err(MetadataError::DuplicateMetadata { kind: "transform", .. })
    ));

    let ambiguous = storage
        .describe("Album")
        .expose_with(
            "name",
            ExposeOptions::new().flags(chrysalis_core::DirectionFlags {
                to_class_only: Some(false),
                to_plain_only: None,
            }),
        )
        .register();
    let err = ambiguous.unwrap_err();
    assert!(err.to_string().contains("toClassOnly"));
}

#[test]
fn test_default_storage_functions() {
    {
        let mut storage = default_metadata_storage().write().unwrap();
        storage
            .describe("ScenarioDefaultStorageUser")
            .exclude("password")
            .register()
            .unwrap();
    }
    let user = Value::instance(
        "ScenarioDefaultStorageUser",
        [("name", Value::from("n")), ("password", Value::from("p"))],
    );

    let plain = instance_to_plain(&user, &TransformOptions::new());
    assert_eq!(keys(&plain), vec!["name"]);

    let back = plain_to_instance("ScenarioDefaultStorageUser", &plain, &TransformOptions::new());
    assert_eq!(
        back.class_id(),
        Some(ClassId::from("ScenarioDefaultStorageUser"))
    );
}

#[test]
fn test_shared_storage_serves_concurrent_transformations() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MetadataStorage>();

    let mut storage = MetadataStorage::new();
    storage.describe("Account").exclude("password").register().unwrap();
    storage
        .describe("Admin")
        .extends("Account")
        .exclude("token")
        .register()
        .unwrap();
    let storage = std::sync::Arc::new(storage);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let storage = std::sync::Arc::clone(&storage);
                scope.spawn(move || {
                    let transformer = ClassTransformer::new(&storage);
                    let admin = Value::instance(
                        "Admin",
                        [
                            ("name", Value::from(format!("admin-{i}"))),
                            ("password", Value::from("p")),
                            ("token", Value::from("t")),
                        ],
                    );
                    let plain = transformer.instance_to_plain(&admin, &TransformOptions::new());
                    keys(&plain)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec!["name"]);
        }
    });
    assert_eq!(
        storage.ancestors(&ClassId::from("Admin")).as_ref(),
        &[ClassId::from("Account")]
    );
}

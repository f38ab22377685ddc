//! End-to-end tests for component declarations produced by `generate`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::{Value, json};
use tsforge_core::{
    Customizations, Declaration, DiagnosticKind, GenerationError, GeneratorOutput, OutputPolicy,
    RunState, Workspace, dedupe_declarations, generate,
};

fn single(schemas: Value) -> Workspace {
    Workspace::from_values(
        "api.json",
        [(
            "api.json",
            json!({"openapi": "3.0.3", "components": {"schemas": schemas}}),
        )],
    )
    .unwrap()
}

fn run(workspace: &Workspace, policy: &OutputPolicy) -> Result<GeneratorOutput, GenerationError> {
    generate(workspace, policy, &Customizations::default())
}

fn body<'o>(output: &'o GeneratorOutput, name: &str) -> &'o str {
    &output.declaration(name).unwrap().body
}

fn pet_schemas() -> Value {
    json!({
        "Pet": {
            "type": "object",
            "required": ["id", "name"],
            "properties": {"id": {"type": "integer"}, "name": {"type": "string"}}
        },
        "Tagged": {
            "type": "object",
            "properties": {"tag": {"type": "string"}}
        }
    })
}

// ===== Ordering =====

#[test]
fn test_cyclic_declarations_are_each_emitted_once() {
    let ws = single(json!({
        "A": {"type": "object", "properties": {"b": {"$ref": "#/components/schemas/B"}}},
        "B": {"type": "object", "properties": {"a": {"$ref": "#/components/schemas/A"}}},
        "Node": {"type": "object", "properties": {"next": {"$ref": "#/components/schemas/Node"}}}
    }));

    let output = run(&ws, &OutputPolicy::default()).unwrap();
    let names: Vec<_> = output.declarations.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["B", "A", "Node"]);
    assert_eq!(body(&output, "Node"), "export interface Node {\n  next?: Node;\n}\n");
}

#[test]
fn test_dedupe_is_idempotent() {
    let declarations = vec![
        Declaration::new("A", "export type A = string;\n", "api.json"),
        Declaration::new("A", "export type A = number;\n", "common.json"),
        Declaration::new("B", "export type B = A;\n", "api.json"),
    ];
    let mut state = RunState::default();
    let once = dedupe_declarations(declarations, false, &mut state).unwrap();
    let twice = dedupe_declarations(once.clone(), false, &mut state).unwrap();
    assert_eq!(once, twice);
    assert_eq!(state.diagnostics.len(), 1);
    assert_eq!(state.diagnostics[0].kind, DiagnosticKind::DuplicateDeclaration);
}

// ===== Combinators =====

#[test]
fn test_all_of_force_required_only_for_uncovered_keys() {
    let mut schemas = pet_schemas();
    schemas["Extended"] = json!({"allOf": [
        {"$ref": "#/components/schemas/Pet"},
        {"type": "object", "required": ["id"], "properties": {"extra": {"type": "string"}}}
    ]});
    schemas["Labelled"] = json!({"allOf": [
        {"$ref": "#/components/schemas/Tagged"},
        {"type": "object", "required": ["tag"], "properties": {"extra": {"type": "string"}}}
    ]});

    let output = run(&single(schemas), &OutputPolicy::default()).unwrap();
    assert_eq!(
        body(&output, "Extended"),
        "export type Extended = Pet & { extra?: string };\n"
    );
    assert_eq!(
        body(&output, "Labelled"),
        "export type Labelled = Tagged & { extra?: string } & Required<Pick<Tagged & { extra?: string }, \"tag\">>;\n"
    );
}

#[test]
fn test_nested_and_sibling_objects_render_identically() {
    let mut schemas = pet_schemas();
    schemas["Nested"] = json!({"allOf": [
        {"$ref": "#/components/schemas/Pet"},
        {"type": "object", "properties": {"owner": {"type": "string"}}}
    ]});
    schemas["Flat"] = json!({
        "allOf": [{"$ref": "#/components/schemas/Pet"}],
        "properties": {"owner": {"type": "string"}}
    });

    let output = run(&single(schemas), &OutputPolicy::default()).unwrap();
    let nested = body(&output, "Nested").replace("Nested", "X");
    let flat = body(&output, "Flat").replace("Flat", "X");
    assert_eq!(nested, flat);
    assert_eq!(nested, "export type X = Pet & { owner?: string };\n");
}

#[test]
fn test_all_of_with_sibling_one_of_keeps_both() {
    let ws = single(json!({
        "Base": {"type": "object", "properties": {"id": {"type": "integer"}}},
        "Cat": {"type": "object", "properties": {"meow": {"type": "boolean"}}},
        "Dog": {"type": "object", "properties": {"bark": {"type": "boolean"}}},
        "Pet": {
            "allOf": [{"$ref": "#/components/schemas/Base"}],
            "oneOf": [{"$ref": "#/components/schemas/Cat"}, {"$ref": "#/components/schemas/Dog"}],
            "properties": {"name": {"type": "string"}}
        }
    }));

    let output = run(&ws, &OutputPolicy::default()).unwrap();
    assert_eq!(
        body(&output, "Pet"),
        "export type Pet = Base & ((Cat & { name?: string }) | (Dog & { name?: string }));\n"
    );
}

// ===== Discriminators =====

#[test]
fn test_discriminator_tags_reach_variants() {
    let ws = single(json!({
        "Pet": {
            "oneOf": [
                {"$ref": "#/components/schemas/Cat"},
                {"$ref": "#/components/schemas/Dog"}
            ],
            "discriminator": {
                "propertyName": "type",
                "mapping": {"CAT": "#/components/schemas/Cat", "DOG": "#/components/schemas/Dog"}
            }
        },
        "Cat": {"type": "object", "properties": {"meow": {"type": "boolean"}}},
        "Dog": {
            "type": "object",
            "properties": {"type": {"type": "string", "enum": ["DOG", "PUPPY"], "description": "kind"}}
        }
    }));

    let output = run(&ws, &OutputPolicy::default()).unwrap();
    assert_eq!(body(&output, "Pet"), "export type Pet = Cat | Dog;\n");
    assert!(body(&output, "Cat").contains("  type: CatType;\n"));
    assert!(body(&output, "CatType").contains("CAT: \"CAT\","));
    let dog_type = body(&output, "DogType");
    assert!(dog_type.contains("DOG: \"DOG\","));
    assert!(dog_type.contains("PUPPY: \"PUPPY\","));
}

// ===== Brands =====

fn branded(schemas: Value) -> Result<GeneratorOutput, GenerationError> {
    let policy = OutputPolicy {
        use_branded_types: true,
        ..OutputPolicy::default()
    };
    run(&single(schemas), &policy)
}

#[test]
fn test_brand_registration_is_idempotent() {
    let output = branded(json!({
        "User": {
            "type": "object",
            "properties": {
                "id": {"type": "string", "x-brand": "UserId"},
                "manager": {"type": "string", "x-brand": "UserId"}
            }
        }
    }))
    .unwrap();
    assert_eq!(output.brands.len(), 1);
    assert_eq!(
        body(&output, "UserId"),
        "export type UserId = Branded<string, \"UserId\">;\n"
    );
    assert!(output.diagnostics.is_empty());
}

#[test]
fn test_brand_conflicting_base() {
    let err = branded(json!({
        "User": {
            "type": "object",
            "properties": {
                "id": {"type": "string", "x-brand": "UserId"},
                "legacyId": {"type": "integer", "x-brand": "UserId"}
            }
        }
    }))
    .unwrap_err();
    assert!(matches!(
        err,
        GenerationError::BrandConflict { ref brand, ref existing, ref requested }
            if brand == "UserId" && existing == "string" && requested == "number"
    ));
}

#[test]
fn test_brand_colliding_with_declaration() {
    let err = branded(json!({
        "Pet": {"type": "object", "properties": {"name": {"type": "string"}}},
        "Owner": {
            "type": "object",
            "properties": {"pet": {"type": "string", "x-brand": "Pet"}}
        }
    }))
    .unwrap_err();
    assert!(matches!(err, GenerationError::BrandNameCollision { ref brand } if brand == "Pet"));
}

#[test]
fn test_brand_colliding_with_promoted_declaration() {
    let err = branded(json!({
        "Pet": {
            "type": "object",
            "properties": {"owner": {"type": "object", "properties": {"name": {"type": "string"}}}}
        },
        "User": {
            "type": "object",
            "properties": {"id": {"type": "string", "x-brand": "PetOwner"}}
        }
    }))
    .unwrap_err();
    assert!(matches!(err, GenerationError::BrandNameCollision { ref brand } if brand == "PetOwner"));
}

// ===== Arrays =====

#[test]
fn test_untyped_array_follows_dialect() {
    let schemas = json!({"Bag": {"type": "array"}});

    let err = run(&single(schemas.clone()), &OutputPolicy::default()).unwrap_err();
    assert!(matches!(err, GenerationError::MalformedArray { ref name, .. } if name == "Bag"));

    let ws = Workspace::from_values(
        "api.json",
        [(
            "api.json",
            json!({"openapi": "3.1.0", "components": {"schemas": schemas}}),
        )],
    )
    .unwrap();
    let output = run(&ws, &OutputPolicy::default()).unwrap();
    assert_eq!(body(&output, "Bag"), "export type Bag = unknown[];\n");
}

// ===== Documents =====

#[test]
fn test_cross_document_names_are_aliased() {
    let ws = Workspace::from_values(
        "api.json",
        [
            (
                "api.json",
                json!({"openapi": "3.0.3", "components": {"schemas": {
                    "Pet": {"type": "string"},
                    "Owner": {
                        "type": "object",
                        "properties": {"pet": {"$ref": "./common.json#/components/schemas/Pet"}}
                    }
                }}}),
            ),
            (
                "common.json",
                json!({"openapi": "3.0.3", "components": {"schemas": {
                    "Pet": {"type": "integer"}
                }}}),
            ),
        ],
    )
    .unwrap();

    let output = run(&ws, &OutputPolicy::default()).unwrap();
    assert_eq!(body(&output, "Pet"), "export type Pet = string;\n");
    assert_eq!(body(&output, "Common__Pet"), "export type Common__Pet = number;\n");
    assert_eq!(
        body(&output, "Owner"),
        "export interface Owner {\n  pet?: Common__Pet;\n}\n"
    );
    assert!(
        output
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::ShadowedImport && d.name == "Common__Pet")
    );
}

#[test]
fn test_policy_from_toml() {
    let policy = OutputPolicy::from_toml_str(
        r#"
naming-convention = "pascal-case"
use-branded-types = true
strict-duplicate-names = true

[format-overrides]
uuid = "Uuid"
"#,
    )
    .unwrap();
    assert!(policy.use_branded_types);
    assert!(policy.strict_duplicate_names);
    assert_eq!(policy.format_type("uuid").as_deref(), Some("Uuid"));

    assert!(matches!(
        OutputPolicy::from_toml_str("use-dates = \"yes\""),
        Err(GenerationError::InvalidPolicy(_))
    ));
}

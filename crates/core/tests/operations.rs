//! End-to-end tests for operation descriptors produced by `generate`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::{Value, json};
use tsforge_core::{
    ArrayHandling, CompiledOperation, Customizations, DiagnosticKind, FormDataPolicy,
    GenerationError, GeneratorOutput, HttpMethod, MutatorShape, OutputPolicy, Workspace, generate,
};

fn workspace(document: Value) -> Workspace {
    Workspace::from_values("api.json", [("api.json", document)]).unwrap()
}

fn upload_document() -> Value {
    json!({
        "openapi": "3.0.3",
        "paths": {"/uploads": {"post": {
            "operationId": "upload",
            "requestBody": {
                "required": true,
                "content": {"multipart/form-data": {"schema": {
                    "type": "object",
                    "required": ["file"],
                    "properties": {
                        "id": {"type": "integer", "readOnly": true},
                        "file": {"type": "string", "format": "binary"},
                        "kind": {"type": "string", "enum": ["photo", "scan"]},
                        "tags": {"type": "array", "items": {"type": "string"}}
                    }
                }}}
            },
            "responses": {"204": {"description": "stored"}}
        }}}
    })
}

fn run(document: Value, policy: &OutputPolicy) -> GeneratorOutput {
    generate(&workspace(document), policy, &Customizations::default()).unwrap()
}

#[test]
fn test_multipart_omits_read_only_fields() {
    let output = run(upload_document(), &OutputPolicy::default());
    let upload = output.operation("upload").unwrap();
    assert_eq!(upload.method, HttpMethod::Post);

    let body = upload.body.as_ref().unwrap();
    assert_eq!(body.ty, "UploadBody");
    assert_eq!(body.implementation, "uploadBody");
    assert_eq!(body.content_type, "multipart/form-data");

    let form = body.form.as_ref().unwrap();
    assert_eq!(form.variable, "formData");
    assert!(form.code.starts_with("const formData = new FormData();\n"));
    assert!(form.code.contains("formData.append(\"file\", uploadBody.file);\n"));
    assert!(form.code.contains("formData.append(\"kind\", uploadBody.kind);\n"));
    assert!(!form.code.contains("\"id\""));

    let declaration = output.declaration("UploadBody").unwrap();
    assert!(declaration.body.contains("  readonly id?: number;\n"));
    assert!(output.declaration("UploadBodyKind").is_some());
}

#[test]
fn test_form_array_handling() {
    let policy = OutputPolicy {
        form_data: FormDataPolicy {
            array_handling: ArrayHandling::SerializeWithBrackets,
        },
        ..OutputPolicy::default()
    };
    let output = run(upload_document(), &policy);
    let form = output.operation("upload").unwrap().body.as_ref().unwrap().form.clone().unwrap();
    assert!(form.code.contains("\"tags[]\""));
}

#[test]
fn test_missing_path_parameter_is_fatal() {
    let document = json!({
        "openapi": "3.0.3",
        "paths": {"/pets/{petId}": {"get": {
            "operationId": "showPet",
            "responses": {"200": {"description": "ok"}}
        }}}
    });
    let err = generate(&workspace(document), &OutputPolicy::default(), &Customizations::default())
        .unwrap_err();
    assert!(matches!(
        err,
        GenerationError::MissingPathParameter { ref operation, ref path, ref parameter }
            if operation == "showPet" && path == "/pets/{petId}" && parameter == "petId"
    ));
}

#[test]
fn test_responses_and_parameters() {
    let output = run(
        json!({
            "openapi": "3.0.3",
            "paths": {"/pets/{pet_id}": {
                "parameters": [
                    {"name": "petId", "in": "path", "required": true, "schema": {"type": "integer"}}
                ],
                "get": {
                    "operationId": "showPet",
                    "parameters": [
                        {"name": "fields", "in": "query", "schema": {"type": "array", "items": {"type": "string"}}},
                        {"name": "trace", "in": "cookie", "schema": {"type": "string"}}
                    ],
                    "responses": {
                        "200": {"description": "ok", "content": {"application/json": {
                            "schema": {"$ref": "#/components/schemas/Pet"}
                        }}},
                        "404": {"description": "missing", "content": {"application/json": {
                            "schema": {"$ref": "#/components/schemas/Problem"}
                        }}},
                        "default": {"description": "boom", "content": {"application/octet-stream": {}}}
                    }
                }
            }},
            "components": {"schemas": {
                "Pet": {"type": "object", "properties": {"name": {"type": "string"}}},
                "Problem": {"type": "object", "properties": {"title": {"type": "string"}}}
            }}
        }),
        &OutputPolicy::default(),
    );

    let show = output.operation("showPet").unwrap();
    assert_eq!(show.path_params.len(), 1);
    assert_eq!(show.path_params[0].definition, "petId: number");
    assert_eq!(show.query_params.len(), 1);
    assert_eq!(show.query_params[0].implementation, "fields?: string[]");
    assert!(show.header_params.is_empty());
    assert_eq!(show.response.success, "Pet");
    assert_eq!(show.response.errors, "Problem | Blob");
    assert_eq!(
        output.declaration("ShowPetParams").unwrap().body,
        "export interface ShowPetParams {\n  fields?: string[];\n}\n"
    );
}

#[test]
fn test_customizations_reach_every_operation() {
    let document = json!({
        "openapi": "3.0.3",
        "paths": {
            "/a": {"get": {"responses": {}}},
            "/b": {"post": {"responses": {}}}
        }
    });
    let customizations = Customizations {
        transformer: Some(Box::new(|mut operation: CompiledOperation| {
            operation.name = format!("{}Request", operation.name);
            operation
        })),
        mutator: Some(MutatorShape {
            name: "useClient".to_string(),
            param_count: 1,
            is_hook: true,
        }),
    };

    let output = generate(&workspace(document), &OutputPolicy::default(), &customizations).unwrap();
    let names: Vec<_> = output.operations.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["getARequest", "postBRequest"]);
    assert!(output.operations.iter().all(|o| o.mutator.as_ref().is_some_and(|m| m.is_hook)));
}

#[test]
fn test_linked_document_operations_share_names() {
    let ws = Workspace::from_values(
        "api.json",
        [
            (
                "api.json",
                json!({"openapi": "3.0.3", "paths": {"/pets": {"get": {
                    "operationId": "listPets",
                    "responses": {"200": {"description": "ok"}}
                }}}}),
            ),
            (
                "admin.json",
                json!({"openapi": "3.0.3", "paths": {"/admin/pets": {"get": {
                    "operationId": "listPets",
                    "responses": {"200": {"description": "ok"}}
                }}}}),
            ),
        ],
    )
    .unwrap();

    let output = generate(&ws, &OutputPolicy::default(), &Customizations::default()).unwrap();
    let names: Vec<_> = output.operations.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["listPets", "listPets2"]);
    assert_eq!(output.operation("listPets2").unwrap().document, "admin.json");
    assert!(
        output
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::RenamedOperation && d.name == "listPets2")
    );
}

//! Top-level generation run.
//!
//! The pipeline is:
//! 1. Normalize: discriminator mappings are folded into the schemas they name
//! 2. Compile: every component schema of every document, root first, then the
//!    operations of every document
//! 3. Alias: declarations shadowed by another document's name are renamed
//! 4. Dedupe and sort: one declaration per name, dependencies first

use std::collections::HashSet;

use tracing::debug;

use crate::alias::resolve_collisions;
use crate::brand::{BrandEntry, helper_declaration};
use crate::context::{Context, RunState};
use crate::discriminator::normalize_discriminators;
use crate::dispatch::compile_declaration;
use crate::error::{Diagnostic, GenerationError};
use crate::operation::{CompiledOperation, Customizations, compile_operations};
use crate::policy::OutputPolicy;
use crate::sort::{dedupe_declarations, sort_declarations};
use crate::value::Declaration;
use crate::workspace::Workspace;

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct GeneratorOutput {
    /// Deduplicated declarations, each after the declarations it depends on
    pub declarations: Vec<Declaration>,
    pub operations: Vec<CompiledOperation>,
    /// Brands registered during the run, in registration order
    pub brands: Vec<BrandEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GeneratorOutput {
    /// Concatenated declaration bodies, separated by blank lines.
    pub fn render(&self) -> String {
        self.declarations
            .iter()
            .map(|d| d.body.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    pub fn operation(&self, name: &str) -> Option<&CompiledOperation> {
        self.operations.iter().find(|o| o.name == name)
    }
}

/// Generate TypeScript declarations and operation descriptors for a workspace.
pub fn generate(
    workspace: &Workspace,
    policy: &OutputPolicy,
    customizations: &Customizations,
) -> Result<GeneratorOutput, GenerationError> {
    let workspace = normalize_discriminators(workspace);
    let mut state = RunState::new(&workspace, policy);

    let mut declarations = Vec::new();
    for key in workspace.keys() {
        let mut ctx = Context::new(&workspace, policy, &mut state, key.as_str());
        let Some(document) = ctx.current_document() else {
            continue;
        };
        let before = declarations.len();
        for (name, schema) in &document.components.schemas {
            declarations.extend(compile_declaration(name, schema, &mut ctx)?);
        }
        debug!(
            document = %key,
            schemas = document.components.schemas.len(),
            declarations = declarations.len() - before,
            "Compiled component schemas."
        );
    }

    let mut operation_names = HashSet::new();
    let mut operations = Vec::new();
    for key in workspace.keys() {
        let mut ctx = Context::new(&workspace, policy, &mut state, key.as_str());
        operations.extend(compile_operations(&mut ctx, customizations, &mut operation_names)?);
    }
    for operation in &operations {
        declarations.extend(operation.declarations.iter().cloned());
    }
    state.brands.check_declarations(&declarations)?;

    if !state.brands.is_empty() {
        declarations.insert(0, helper_declaration(workspace.root()));
    }

    let declarations = resolve_collisions(declarations, &mut state);
    let declarations =
        dedupe_declarations(declarations, policy.strict_duplicate_names, &mut state)?;
    let declarations = sort_declarations(declarations);

    debug!(
        declarations = declarations.len(),
        operations = operations.len(),
        brands = state.brands.len(),
        diagnostics = state.diagnostics.len(),
        "Generation finished."
    );

    Ok(GeneratorOutput {
        declarations,
        operations,
        brands: state.brands.entries().cloned().collect(),
        diagnostics: state.diagnostics,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(output: &GeneratorOutput) -> Vec<&str> {
        output.declarations.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_generate_orders_dependencies() {
        let ws = Workspace::from_values(
            "api.json",
            [(
                "api.json",
                json!({
                    "openapi": "3.0.3",
                    "components": {"schemas": {
                        "Order": {
                            "type": "object",
                            "required": ["pet"],
                            "properties": {"pet": {"$ref": "#/components/schemas/Pet"}}
                        },
                        "Pet": {"type": "object", "properties": {"name": {"type": "string"}}}
                    }}
                }),
            )],
        )
        .unwrap();

        let output = generate(&ws, &OutputPolicy::default(), &Customizations::default()).unwrap();
        assert_eq!(names(&output), vec!["Pet", "Order"]);
        assert_eq!(
            output.render(),
            "export interface Pet {\n  name?: string;\n}\n\nexport interface Order {\n  pet: Pet;\n}\n"
        );
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_generate_adds_brand_helper() {
        let ws = Workspace::from_values(
            "api.json",
            [(
                "api.json",
                json!({
                    "openapi": "3.0.3",
                    "components": {"schemas": {
                        "User": {
                            "type": "object",
                            "properties": {
                                "id": {"type": "string", "x-brand": "UserId"},
                                "manager": {"type": "string", "x-brand": "UserId"}
                            }
                        }
                    }}
                }),
            )],
        )
        .unwrap();
        let policy = OutputPolicy {
            use_branded_types: true,
            ..OutputPolicy::default()
        };

        let output = generate(&ws, &policy, &Customizations::default()).unwrap();
        assert_eq!(names(&output), vec!["Branded", "UserId", "User"]);
        assert_eq!(output.brands.len(), 1);
        assert_eq!(
            output.declaration("UserId").unwrap().body,
            "export type UserId = Branded<string, \"UserId\">;\n"
        );
    }

    #[test]
    fn test_generate_collects_operation_declarations() {
        let ws = Workspace::from_values(
            "api.json",
            [(
                "api.json",
                json!({
                    "openapi": "3.0.3",
                    "paths": {"/pets": {"get": {
                        "operationId": "listPets",
                        "parameters": [{"name": "limit", "in": "query", "schema": {"type": "integer"}}],
                        "responses": {"200": {
                            "description": "ok",
                            "content": {"application/json": {"schema": {
                                "type": "array",
                                "items": {"type": "string"}
                            }}}
                        }}
                    }}}
                }),
            )],
        )
        .unwrap();

        let output = generate(&ws, &OutputPolicy::default(), &Customizations::default()).unwrap();
        assert_eq!(names(&output), vec!["ListPetsParams"]);
        let list = output.operation("listPets").unwrap();
        assert_eq!(list.response.success, "string[]");
        assert_eq!(list.params_type.as_deref(), Some("ListPetsParams"));
    }
}

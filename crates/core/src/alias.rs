//! Cross-document name collisions.
//!
//! When several documents define the same component name, the first
//! document (root first) keeps the plain name. References into the other
//! documents use `<DocumentTag>__<Name>` aliases, and [`resolve_collisions`]
//! renames the colliding declarations to match.

use std::collections::{HashMap, HashSet};

use tsforge_common::{pascal_case, replace_identifier};

use crate::context::{Context, RunState};
use crate::error::DiagnosticKind;
use crate::value::{Declaration, ImportDescriptor};

/// PascalCase tag for a document key, without its extension.
///
/// `schemas/common.yaml` becomes `SchemasCommon`.
pub fn document_tag(document: &str) -> String {
    let stem = match document.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/{}", strip_extension(file)),
        None => strip_extension(document).to_string(),
    };
    let tag = pascal_case(&stem);
    if tag.is_empty() || tag.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{tag}")
    } else {
        tag
    }
}

fn strip_extension(file: &str) -> &str {
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    }
}

/// `<DocumentTag>__<Name>`
pub fn alias_name(document: &str, name: &str) -> String {
    format!("{}__{}", document_tag(document), name)
}

/// Import of component `name` from `document`, aliased when another document
/// keeps the plain name.
pub(crate) fn import_for(name: &str, document: &str, ctx: &Context<'_>) -> ImportDescriptor {
    let mut import = ImportDescriptor::new(name, document);
    let components = &ctx.state.components;
    if components.is_ambiguous(name) && components.keeper(name) != Some(document) {
        import.alias = Some(alias_name(document, name));
    }
    import
}

/// Rename declarations whose name another document already uses.
///
/// The keeper of a name is the document the component index names for it,
/// or the first document that produced it. Every other document's
/// declaration of that name is renamed to its alias, and unaliased imports
/// of it in the same document are rewritten.
pub fn resolve_collisions(declarations: Vec<Declaration>, state: &mut RunState) -> Vec<Declaration> {
    let mut documents_by_name: HashMap<&str, Vec<&str>> = HashMap::new();
    for decl in &declarations {
        let docs = documents_by_name.entry(decl.name.as_str()).or_default();
        if !docs.contains(&decl.document.as_str()) {
            docs.push(decl.document.as_str());
        }
    }

    let mut renames: HashMap<(String, String), String> = HashMap::new();
    for (name, docs) in &documents_by_name {
        if docs.len() < 2 {
            continue;
        }
        let keeper = state.components.keeper(name).unwrap_or(docs[0]);
        for document in docs.iter().filter(|d| **d != keeper) {
            renames.insert(
                (name.to_string(), document.to_string()),
                alias_name(document, name),
            );
        }
    }
    if renames.is_empty() {
        return declarations;
    }

    let mut reported: HashSet<(String, String)> = HashSet::new();
    let mut resolved = Vec::with_capacity(declarations.len());
    for mut decl in declarations {
        let own_key = (decl.name.clone(), decl.document.clone());
        if let Some(alias) = renames.get(&own_key) {
            decl.body = rename_head(&decl.body, &decl.name, alias);
            if reported.insert(own_key) {
                state.diagnose(
                    DiagnosticKind::ShadowedImport,
                    alias.clone(),
                    decl.document.clone(),
                    format!(
                        "'{}' is also declared by another document; renamed to '{alias}'",
                        decl.name
                    ),
                );
            }
            decl.name = alias.clone();
        }

        for import in &mut decl.imports {
            if import.alias.is_some() {
                continue;
            }
            let Some(document) = import.document.clone() else {
                continue;
            };
            let Some(alias) = renames.get(&(import.name.clone(), document)) else {
                continue;
            };
            decl.body = replace_identifier(&decl.body, &import.name, alias);
            for dep in &mut decl.dependencies {
                if *dep == import.name {
                    *dep = alias.clone();
                }
            }
            import.alias = Some(alias.clone());
        }
        resolved.push(decl);
    }
    resolved
}

/// Rename the declared identifier of a rendered declaration, leaving references in its body alone.
fn rename_head(body: &str, from: &str, to: &str) -> String {
    body.replace(&format!("export interface {from} "), &format!("export interface {to} "))
        .replace(&format!("export type {from} "), &format!("export type {to} "))
        .replace(&format!("export const {from} "), &format!("export const {to} "))
        .replace(&format!("typeof {from})"), &format!("typeof {to})"))
        .replace(&format!("typeof {from}]"), &format!("typeof {to}]"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::policy::OutputPolicy;
    use crate::workspace::Workspace;
    use serde_json::json;

    #[test]
    fn test_document_tag() {
        assert_eq!(document_tag("common.yaml"), "Common");
        assert_eq!(document_tag("schemas/pet-store.json"), "SchemasPetStore");
        assert_eq!(document_tag("2024/api.yaml"), "_2024Api");
        assert_eq!(alias_name("common.yaml", "Pet"), "Common__Pet");
    }

    #[test]
    fn test_rename_head_keeps_references() {
        let body = "export interface Pet {\n  parent?: Pet;\n}\n";
        assert_eq!(
            rename_head(body, "Pet", "Common__Pet"),
            "export interface Common__Pet {\n  parent?: Pet;\n}\n"
        );
        let body = "export const Kind = {\n  a: \"a\",\n} as const;\n\nexport type Kind = (typeof Kind)[keyof typeof Kind];\n";
        assert_eq!(
            rename_head(body, "Kind", "Other__Kind"),
            "export const Other__Kind = {\n  a: \"a\",\n} as const;\n\nexport type Other__Kind = (typeof Other__Kind)[keyof typeof Other__Kind];\n"
        );
    }

    #[test]
    fn test_resolve_collisions_renames_non_keeper() {
        let ws = Workspace::from_values(
            "api.json",
            [
                ("api.json", json!({"components": {"schemas": {"Pet": {"type": "string"}}}})),
                ("common.json", json!({"components": {"schemas": {"Pet": {"type": "integer"}}}})),
            ],
        )
        .unwrap();
        let mut state = RunState::new(&ws, &OutputPolicy::default());
        let declarations = vec![
            Declaration::new("Pet", "export type Pet = string;\n", "api.json"),
            Declaration::new("Pet", "export type Pet = number;\n", "common.json"),
            Declaration::new("PetList", "export type PetList = Pet[];\n", "common.json")
                .with_imports(vec![ImportDescriptor::new("Pet", "common.json")]),
        ];

        let resolved = resolve_collisions(declarations, &mut state);
        assert_eq!(resolved[0].name, "Pet");
        assert_eq!(resolved[1].name, "Common__Pet");
        assert_eq!(resolved[1].body, "export type Common__Pet = number;\n");
        assert_eq!(resolved[2].body, "export type PetList = Common__Pet[];\n");
        assert_eq!(resolved[2].dependencies, vec!["Common__Pet"]);
        assert_eq!(state.diagnostics.len(), 1);
        assert_eq!(state.diagnostics[0].kind, DiagnosticKind::ShadowedImport);
    }
}

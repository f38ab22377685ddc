//! Discriminator handling.
//!
//! [`normalize_discriminators`] rewrites a copy of the workspace so every
//! schema named in a discriminator mapping declares the tag it is selected
//! by. [`collapse_union`] renders a discriminated union as a tag const enum
//! plus one alias per tag.

use serde_json::Value;
use tracing::{debug, trace, warn};
use tsforge_common::{pascal_case, quote_if_needed};

use crate::context::Context;
use crate::dispatch::compile_value;
use crate::emit::Emit;
use crate::enums::{enum_declaration, enum_value_key};
use crate::error::GenerationError;
use crate::resolver::{decode_pointer, resolve_schema, split_reference};
use crate::spec::{Discriminator, Schema, SchemaObject, SchemaType};
use crate::types::{ConstEnumMember, TsLiteral, TsType, TsTypeDef, TypeDefKind};
use crate::value::{CompiledValue, Declaration, ImportDescriptor, TypeCategory};
use crate::workspace::Workspace;

/// Return a copy of `workspace` with discriminator mappings applied to their targets.
///
/// - Variants nested under `discriminator.oneOf` are hoisted to the parent's `oneOf`
/// - A target without the tag property gains `{type: string, enum: [tag]}`
/// - A tag property that is a `$ref` is replaced by that literal schema
/// - An existing enum lacking the tag gets it appended; other keywords are kept
/// - The tag property is added to the target's `required`
///
/// The input workspace is never modified.
pub fn normalize_discriminators(workspace: &Workspace) -> Workspace {
    let mut normalized = workspace.clone();

    for document in workspace.keys() {
        let Some(doc) = workspace.document(&document) else {
            continue;
        };
        debug!(
            document = %document,
            schemas = doc.components.schemas.len(),
            "Normalizing discriminators."
        );

        for (name, schema) in &doc.components.schemas {
            let Some(obj) = schema.as_object() else {
                continue;
            };
            let Some(disc) = &obj.discriminator else {
                continue;
            };

            if let Some(nested) = &disc.one_of {
                hoist_variants(&mut normalized, &document, name, nested);
            }

            for (tag, target) in &disc.mapping {
                let Some((target_document, target_name)) =
                    mapping_target(&normalized, &document, target)
                else {
                    warn!(
                        document = %document,
                        schema = %name,
                        target = %target,
                        "Discriminator mapping target is not a component schema."
                    );
                    continue;
                };
                apply_tag(
                    &mut normalized,
                    &target_document,
                    &target_name,
                    &disc.property_name,
                    tag,
                );
            }
        }
    }
    normalized
}

fn hoist_variants(workspace: &mut Workspace, document: &str, name: &str, variants: &[Schema]) {
    let Some(doc) = workspace.document_mut(document) else {
        return;
    };
    let Some(Schema::Object(current)) = doc.components.schemas.get(name).cloned() else {
        return;
    };
    let mut parent = *current;
    if parent.one_of.is_none() {
        parent.one_of = Some(variants.to_vec());
    }
    if let Some(disc) = &mut parent.discriminator {
        disc.one_of = None;
    }
    trace!(document, schema = name, "Hoisted discriminator variants.");
    if let Err(e) = doc.set_schema(name, Schema::from(parent)) {
        warn!(document, schema = name, error = %e, "Failed to rewrite schema.");
    }
}

/// Document and component name a mapping value points at.
///
/// Accepts full references (`other.yaml#/components/schemas/Cat`) and bare
/// component names (`Cat`).
fn mapping_target(workspace: &Workspace, from: &str, target: &str) -> Option<(String, String)> {
    if !target.contains('#') && !target.contains('/') {
        return Some((from.to_string(), target.to_string()));
    }
    let (doc_part, pointer) = split_reference(target);
    let document = workspace.resolve_document_key(from, doc_part)?;
    match decode_pointer(pointer).as_slice() {
        [components, schemas, name] if components == "components" && schemas == "schemas" => {
            Some((document, name.clone()))
        }
        _ => None,
    }
}

fn tag_schema(tag: &str) -> Schema {
    Schema::from(SchemaObject {
        schema_type: Some(SchemaType::Single("string".to_string())),
        enum_values: Some(vec![Value::String(tag.to_string())]),
        ..SchemaObject::default()
    })
}

fn apply_tag(workspace: &mut Workspace, document: &str, name: &str, property: &str, tag: &str) {
    let Some(doc) = workspace.document_mut(document) else {
        return;
    };
    let Some(Schema::Object(current)) = doc.components.schemas.get(name).cloned() else {
        warn!(document, schema = name, "Discriminator mapping target not found.");
        return;
    };
    let mut target = *current;
    let tag_value = Value::String(tag.to_string());

    match target.properties.get_mut(property) {
        None => {
            target.properties.insert(property.to_string(), tag_schema(tag));
        }
        Some(Schema::Object(existing)) if existing.reference.is_none() => {
            let values = existing.enum_values.get_or_insert_with(Vec::new);
            if !values.contains(&tag_value) {
                values.push(tag_value);
            }
        }
        Some(slot) => *slot = tag_schema(tag),
    }
    if !target.required.iter().any(|r| r == property) {
        target.required.push(property.to_string());
    }

    trace!(document, schema = name, property, tag, "Applied discriminator tag.");
    if let Err(e) = doc.set_schema(name, Schema::from(target)) {
        warn!(document, schema = name, error = %e, "Failed to rewrite schema.");
    }
}

/// Render a discriminated union as `<Name><Prop>` tag enum plus `<Name><Tag>` aliases.
///
/// A variant whose tag property is exactly the tag is a plain alias of the
/// target; otherwise the tag is pinned with `Omit<T, "prop"> & { prop: "TAG" }`.
pub fn collapse_union(
    disc: &Discriminator,
    name: &str,
    ctx: &mut Context<'_>,
) -> Result<CompiledValue, GenerationError> {
    let property = &disc.property_name;
    let tag_enum = ctx.policy.type_name(&format!("{name}{}", pascal_case(property)));
    let members = disc
        .mapping
        .keys()
        .map(|tag| ConstEnumMember::Entry {
            key: enum_value_key(&Value::String(tag.clone())),
            value: TsLiteral::String(tag.clone()),
            description: None,
        })
        .collect();

    let mut value = CompiledValue::new("", TypeCategory::Object);
    value.side_schemas.push(Declaration::new(
        tag_enum.clone(),
        enum_declaration(&tag_enum, members, false),
        ctx.document.clone(),
    ));

    let mut variants = Vec::with_capacity(disc.mapping.len());
    for (tag, target) in &disc.mapping {
        let reference = if target.contains('#') || target.contains('/') {
            target.clone()
        } else {
            format!("#/components/schemas/{target}")
        };
        let target_schema = Schema::from(SchemaObject {
            reference: Some(reference),
            ..SchemaObject::default()
        });
        let compiled = compile_value(&target_schema, None, ctx)?;
        let (concrete, _) = resolve_schema(&target_schema, ctx)?;
        let exact = concrete
            .as_object()
            .and_then(|obj| obj.properties.get(property))
            .and_then(Schema::as_object)
            .and_then(|prop| prop.enum_values.as_ref())
            .is_some_and(|values| *values == [Value::String(tag.clone())]);

        let ty = if exact {
            compiled.value.clone()
        } else {
            format!(
                "Omit<{}, \"{}\"> & {{ {}: {} }}",
                compiled.value,
                property,
                quote_if_needed(property),
                TsLiteral::String(tag.clone()).emit()
            )
        };
        let variant = ctx.policy.type_name(&format!("{name}{}", pascal_case(tag)));
        let def = TsTypeDef {
            name: variant.clone(),
            kind: TypeDefKind::TypeAlias { ty: TsType::Ref(ty) },
        };
        value.side_schemas.extend(compiled.side_schemas.iter().cloned());
        value.side_schemas.push(
            Declaration::new(variant.clone(), def.emit(), ctx.document.clone())
                .with_imports(compiled.imports.clone()),
        );
        value.add_import(ImportDescriptor::new(variant.clone(), ctx.document.clone()));
        variants.push(variant);
    }

    value.value = variants.join(" | ");
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::context::RunState;
    use crate::dispatch::compile_declaration;
    use crate::policy::{DiscriminatedUnions, OutputPolicy};
    use serde_json::json;

    fn pet_workspace(cat: serde_json::Value) -> Workspace {
        Workspace::from_values(
            "api.json",
            [(
                "api.json",
                json!({
                    "openapi": "3.0.3",
                    "components": {"schemas": {
                        "Pet": {
                            "oneOf": [
                                {"$ref": "#/components/schemas/Cat"},
                                {"$ref": "#/components/schemas/Dog"}
                            ],
                            "discriminator": {
                                "propertyName": "type",
                                "mapping": {
                                    "CAT": "#/components/schemas/Cat",
                                    "DOG": "Dog"
                                }
                            }
                        },
                        "Cat": cat,
                        "Dog": {
                            "type": "object",
                            "properties": {"type": {"$ref": "#/components/schemas/Kind"}}
                        },
                        "Kind": {"type": "string"}
                    }}
                }),
            )],
        )
        .unwrap()
    }

    fn schema_of(ws: &Workspace, name: &str) -> SchemaObject {
        ws.document("api.json").unwrap().components.schemas[name]
            .as_object()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_adds_missing_tag_property() {
        let ws = pet_workspace(json!({"type": "object", "properties": {"meow": {"type": "boolean"}}}));
        let normalized = normalize_discriminators(&ws);

        let cat = schema_of(&normalized, "Cat");
        let tag = cat.properties["type"].as_object().unwrap();
        assert_eq!(tag.enum_values, Some(vec![json!("CAT")]));
        assert_eq!(cat.required, vec!["type"]);

        assert!(!schema_of(&ws, "Cat").properties.contains_key("type"));
    }

    #[test]
    fn test_merges_tag_into_existing_enum() {
        let ws = pet_workspace(json!({
            "type": "object",
            "properties": {"type": {"type": "string", "enum": ["CAT", "DOG"], "description": "kind"}}
        }));
        let normalized = normalize_discriminators(&ws);

        let cat = schema_of(&normalized, "Cat");
        let tag = cat.properties["type"].as_object().unwrap();
        assert_eq!(tag.enum_values, Some(vec![json!("CAT"), json!("DOG")]));
        assert_eq!(tag.description.as_deref(), Some("kind"));
    }

    #[test]
    fn test_replaces_reference_tag_property() {
        let ws = pet_workspace(json!({"type": "object"}));
        let normalized = normalize_discriminators(&ws);

        let dog = schema_of(&normalized, "Dog");
        let tag = dog.properties["type"].as_object().unwrap();
        assert!(tag.reference.is_none());
        assert_eq!(tag.enum_values, Some(vec![json!("DOG")]));

        let raw = normalized.document("api.json").unwrap().raw();
        assert_eq!(
            raw["components"]["schemas"]["Dog"]["properties"]["type"]["enum"],
            json!(["DOG"])
        );
    }

    #[test]
    fn test_hoists_nested_variants() {
        let ws = Workspace::from_values(
            "api.json",
            [(
                "api.json",
                json!({"components": {"schemas": {
                    "Shape": {"discriminator": {
                        "propertyName": "kind",
                        "oneOf": [{"$ref": "#/components/schemas/Square"}]
                    }},
                    "Square": {"type": "object"}
                }}}),
            )],
        )
        .unwrap();
        let normalized = normalize_discriminators(&ws);
        let shape = schema_of(&normalized, "Shape");
        assert_eq!(shape.one_of.as_ref().map(Vec::len), Some(1));
        assert!(shape.discriminator.unwrap().one_of.is_none());
    }

    #[test]
    fn test_collapse_union() {
        let ws = pet_workspace(json!({
            "type": "object",
            "properties": {"type": {"type": "string", "enum": ["CAT", "KITTEN"]}}
        }));
        let normalized = normalize_discriminators(&ws);
        let policy = OutputPolicy {
            discriminated_unions: DiscriminatedUnions::Collapse,
            ..OutputPolicy::default()
        };
        let mut state = RunState::new(&normalized, &policy);
        let mut ctx = Context::new(&normalized, &policy, &mut state, "api.json");
        let pet = normalized.document("api.json").unwrap().components.schemas["Pet"].clone();
        let decls = compile_declaration("Pet", &pet, &mut ctx).unwrap();

        let names: Vec<_> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["PetType", "PetCAT", "PetDOG", "Pet"]);
        assert_eq!(
            decls[1].body,
            "export type PetCAT = Omit<Cat, \"type\"> & { type: \"CAT\" };\n"
        );
        assert_eq!(decls[2].body, "export type PetDOG = Dog;\n");
        assert_eq!(decls[3].body, "export type Pet = PetCAT | PetDOG;\n");
    }
}

//! Combinators: `allOf` intersections, `oneOf`/`anyOf` unions, and combined enums.
//!
//! - Members are compiled with `combined` set so member enums stay joinable
//! - A union whose members are all enums becomes a single const enum when it
//!   has a name and more than one member
//! - `allOf` re-requires properties that a member or the parent lists as
//!   required but no member both defines and requires
//! - Sibling properties next to the combinator are compiled anonymously and
//!   intersected with the result

use indexmap::IndexSet;
use tracing::trace;
use tsforge_common::{dedupe_union, quote_if_needed, wrap_union};

use crate::context::Context;
use crate::discriminator;
use crate::dispatch::{has_null_member, resolve_object};
use crate::enums::enum_declaration;
use crate::error::GenerationError;
use crate::object::compile_object;
use crate::policy::DiscriminatedUnions;
use crate::resolver::resolve_schema;
use crate::spec::{Combinator, Schema, SchemaObject};
use crate::types::ConstEnumMember;
use crate::value::{CompiledValue, Declaration, ImportDescriptor, TypeCategory};

/// A compiled combinator member together with its concrete schema.
struct Member {
    compiled: CompiledValue,
    /// The member's own keywords, with a top-level reference followed
    schema: Option<SchemaObject>,
}

/// Compile `members` joined by `kind`. `parent` is the schema holding the combinator.
pub fn combine_schemas(
    parent: &SchemaObject,
    kind: Combinator,
    members: &[Schema],
    name: Option<&str>,
    ctx: &mut Context<'_>,
) -> Result<CompiledValue, GenerationError> {
    if kind != Combinator::AllOf
        && ctx.policy.discriminated_unions == DiscriminatedUnions::Collapse
        && let (Some(name), Some(disc)) = (name, &parent.discriminator)
        && !disc.mapping.is_empty()
    {
        return discriminator::collapse_union(disc, name, ctx);
    }

    trace!(
        name = name.unwrap_or("<inline>"),
        combinator = kind.label(),
        members = members.len(),
        "Combining schemas."
    );

    let mut resolved = Vec::with_capacity(members.len());
    for (i, member) in members.iter().enumerate() {
        let member_name = if ctx.policy.alias_combined_types {
            name.map(|n| ctx.policy.type_name(&format!("{n}{}{}", kind.label(), i + 1)))
        } else {
            None
        };
        let compiled = resolve_object(member, member_name.as_deref(), true, ctx)?;
        let (concrete, _) = resolve_schema(member, ctx)?;
        resolved.push(Member {
            compiled,
            schema: concrete.as_object().cloned(),
        });
    }

    if resolved.is_empty() {
        return Ok(CompiledValue::unknown());
    }

    let all_enums = resolved.iter().all(|m| m.compiled.is_enum);
    if all_enums && kind != Combinator::AllOf {
        return Ok(match name {
            Some(name) if resolved.len() > 1 => combined_enum(parent, &resolved, name, ctx),
            _ => enum_union(&resolved),
        });
    }

    match kind {
        Combinator::AllOf => intersect(parent, &resolved, name, ctx),
        Combinator::OneOf | Combinator::AnyOf => unite(parent, &resolved, ctx),
    }
}

/// Const-enum members of a member: spreads for referenced enums, entries for inline ones.
fn member_enum_entries(member: &Member) -> Vec<ConstEnumMember> {
    if member.compiled.is_ref {
        let spread = member
            .compiled
            .imports
            .first()
            .map(|i| i.local_name().to_string())
            .unwrap_or_else(|| member.compiled.value.clone());
        vec![ConstEnumMember::Spread(spread)]
    } else {
        member.compiled.enum_members.clone()
    }
}

fn value_imports(member: &Member) -> Vec<ImportDescriptor> {
    member
        .compiled
        .imports
        .iter()
        .cloned()
        .map(|mut import| {
            if member.compiled.is_ref {
                import.is_value = true;
            }
            import
        })
        .collect()
}

fn collect_enum_members(members: &[Member]) -> Vec<ConstEnumMember> {
    let mut entries: Vec<ConstEnumMember> = Vec::new();
    for member in members {
        for entry in member_enum_entries(member) {
            let duplicate = entries.iter().any(|existing| match (existing, &entry) {
                (ConstEnumMember::Entry { key: a, .. }, ConstEnumMember::Entry { key: b, .. }) => {
                    a == b
                }
                (a, b) => a == b,
            });
            if !duplicate {
                entries.push(entry);
            }
        }
    }
    entries
}

/// Union of enum members that stays flagged as an enum.
fn enum_union(members: &[Member]) -> CompiledValue {
    let joined = members
        .iter()
        .map(|m| m.compiled.value.as_str())
        .collect::<Vec<_>>()
        .join(" | ");
    let mut value = CompiledValue::new(dedupe_union(&joined), TypeCategory::Enum);
    value.is_enum = true;
    value.enum_members = collect_enum_members(members);
    for member in members {
        value.side_schemas.extend(member.compiled.side_schemas.iter().cloned());
        value.has_readonly_props |= member.compiled.has_readonly_props;
        for import in value_imports(member) {
            value.add_import(import);
        }
    }
    value
}

/// One const enum named `name` spreading referenced enums and listing inline values.
fn combined_enum(
    parent: &SchemaObject,
    members: &[Member],
    name: &str,
    ctx: &Context<'_>,
) -> CompiledValue {
    let nullable = parent.is_nullable() || members.iter().any(|m| has_null_member(&m.compiled.value));
    let body = enum_declaration(name, collect_enum_members(members), nullable);
    let imports: Vec<ImportDescriptor> = members.iter().flat_map(value_imports).collect();
    let declaration = Declaration::new(name, body, ctx.document.clone()).with_imports(imports);

    let mut value = CompiledValue::new(name, TypeCategory::Enum);
    for member in members {
        value.side_schemas.extend(member.compiled.side_schemas.iter().cloned());
        value.has_readonly_props |= member.compiled.has_readonly_props;
    }
    value.side_schemas.push(declaration);
    value.add_import(ImportDescriptor::new(name, ctx.document.clone()));
    value
}

/// Parent keywords other than the combinator, compiled as an anonymous object.
fn sibling_object(
    parent: &SchemaObject,
    ctx: &mut Context<'_>,
) -> Result<Option<CompiledValue>, GenerationError> {
    if parent.properties.is_empty() && parent.additional_properties.is_none() {
        return Ok(None);
    }
    let rest = SchemaObject {
        nullable: None,
        discriminator: None,
        ..parent.without_combinators()
    };
    compile_object(&rest, None, ctx).map(Some)
}

/// Whether rendered object text `text` assigns property `prop`.
fn assigns_property(text: &str, prop: &str) -> bool {
    let key = quote_if_needed(prop);
    [" ", "{"].iter().any(|lead| {
        text.contains(&format!("{lead}{key}:")) || text.contains(&format!("{lead}{key}?:"))
    })
}

fn quoted_union(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("\"{n}\""))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn intersect(
    parent: &SchemaObject,
    members: &[Member],
    name: Option<&str>,
    ctx: &mut Context<'_>,
) -> Result<CompiledValue, GenerationError> {
    let mut value = CompiledValue::new("", TypeCategory::Object);
    for member in members {
        value.absorb(&member.compiled);
    }
    let mut joined = members
        .iter()
        .map(|m| wrap_union(&m.compiled.value))
        .collect::<Vec<_>>()
        .join(" & ");

    // A sibling union carries the sibling properties itself.
    let rest = SchemaObject {
        all_of: None,
        nullable: None,
        ..parent.clone()
    };
    let sibling = match rest.combinator() {
        Some((kind, siblings)) => Some(combine_schemas(&rest, kind, siblings, name, ctx)?),
        None => sibling_object(parent, ctx)?,
    };

    if let Some(sibling) = &sibling {
        let overridden: IndexSet<String> = members
            .iter()
            .filter_map(|m| m.schema.as_ref()?.discriminator.as_ref())
            .map(|d| d.property_name.clone())
            .filter(|prop| assigns_property(&sibling.value, prop))
            .collect();
        if !overridden.is_empty() {
            let names: Vec<String> = overridden.into_iter().collect();
            joined = format!("Omit<{joined}, {}>", quoted_union(&names));
        }
        joined = format!("{joined} & {}", wrap_union(&sibling.value));
        value.absorb(sibling);
    }

    let missing = uncovered_required(parent, members);
    if !missing.is_empty() {
        joined = format!("{joined} & Required<Pick<{joined}, {}>>", quoted_union(&missing));
    }

    value.value = joined;
    Ok(value)
}

/// Required properties no member (nor the parent) both defines and requires.
fn uncovered_required(parent: &SchemaObject, members: &[Member]) -> Vec<String> {
    let mut required: IndexSet<&String> = parent.required.iter().collect();
    for member in members {
        if let Some(schema) = &member.schema {
            required.extend(schema.required.iter());
        }
    }

    let covers = |schema: &SchemaObject, prop: &String| {
        schema.properties.contains_key(prop) && schema.required.contains(prop)
    };
    required
        .into_iter()
        .filter(|prop| {
            !covers(parent, *prop)
                && !members
                    .iter()
                    .any(|m| m.schema.as_ref().is_some_and(|s| covers(s, *prop)))
        })
        .cloned()
        .collect()
}

fn unite(
    parent: &SchemaObject,
    members: &[Member],
    ctx: &mut Context<'_>,
) -> Result<CompiledValue, GenerationError> {
    let mut value = CompiledValue::new("", TypeCategory::Object);
    for member in members {
        value.absorb(&member.compiled);
    }

    let mut variants: Vec<String> = members.iter().map(|m| m.compiled.value.clone()).collect();
    if ctx.policy.union_add_missing_properties {
        variants = pad_missing_properties(members, variants);
    }

    let joined = match sibling_object(parent, ctx)? {
        Some(sibling) => {
            value.absorb(&sibling);
            variants
                .iter()
                .map(|v| format!("({} & {})", wrap_union(v), wrap_union(&sibling.value)))
                .collect::<Vec<_>>()
                .join(" | ")
        }
        None => variants.join(" | "),
    };
    value.value = dedupe_union(&joined);
    Ok(value)
}

/// Add `key?: never` for every property only other object members define.
fn pad_missing_properties(members: &[Member], variants: Vec<String>) -> Vec<String> {
    let all_keys: IndexSet<&String> = members
        .iter()
        .filter_map(|m| m.schema.as_ref())
        .flat_map(|s| s.properties.keys())
        .collect();
    if all_keys.is_empty() {
        return variants;
    }

    members
        .iter()
        .zip(variants)
        .map(|(member, variant)| {
            let Some(schema) = member.schema.as_ref().filter(|s| !s.properties.is_empty()) else {
                return variant;
            };
            let missing: Vec<String> = all_keys
                .iter()
                .filter(|key| !schema.properties.contains_key(key.as_str()))
                .map(|key| format!("{}?: never", quote_if_needed(key)))
                .collect();
            if missing.is_empty() {
                variant
            } else {
                format!("{} & {{ {} }}", wrap_union(&variant), missing.join("; "))
            }
        })
        .collect()
}

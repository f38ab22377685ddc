//! Object schemas: properties, `additionalProperties` and bare objects.

use tsforge_common::pascal_case;

use crate::context::Context;
use crate::dispatch::resolve_object;
use crate::emit::Emit;
use crate::error::GenerationError;
use crate::spec::{Schema, SchemaObject};
use crate::types::{TsLiteral, TsProp, TsType};
use crate::value::{CompiledValue, TypeCategory};

/// Compile an object-shaped (or untyped) schema.
///
/// Inline property schemas get promoted under `<Name><Key>`; the promoted
/// name takes a `Property` suffix when a component already uses it.
pub fn compile_object(
    obj: &SchemaObject,
    name: Option<&str>,
    ctx: &mut Context<'_>,
) -> Result<CompiledValue, GenerationError> {
    let mut value = CompiledValue::new("", TypeCategory::Object);

    if !obj.properties.is_empty() {
        let mut props = Vec::with_capacity(obj.properties.len());
        for (key, prop_schema) in &obj.properties {
            let prop_name = name.map(|n| property_type_name(n, key, ctx));
            let resolved = resolve_object(prop_schema, prop_name.as_deref(), false, ctx)?;
            let read_only = prop_schema.is_read_only() || obj.is_read_only();
            value.absorb(&resolved);
            value.has_readonly_props |= read_only;
            props.push(TsProp {
                name: key.clone(),
                ty: TsType::Ref(resolved.value),
                optional: !obj.required.contains(key),
                readonly: read_only && !ctx.policy.suppress_readonly_modifier,
            });
        }

        let object_ty = TsType::Object(props.clone());
        match record_value(obj, ctx, &mut value)? {
            Some(record) => {
                value.value = TsType::Intersection(vec![object_ty, record]).emit();
            }
            None => {
                value.value = object_ty.emit();
                value.properties = Some(props);
            }
        }
        return Ok(value);
    }

    if let Some(record) = record_value(obj, ctx, &mut value)? {
        value.value = record.emit();
        return Ok(value);
    }
    if matches!(obj.additional_properties.as_deref(), Some(Schema::Bool(false))) {
        value.value = TsType::Object(Vec::new()).emit();
        return Ok(value);
    }
    if let Some(literal) = obj.const_value.as_ref().and_then(TsLiteral::from_json) {
        value.value = literal.emit();
        return Ok(value);
    }
    if obj.types().contains(&"object") {
        value.value = TsType::string_record(TsType::unknown()).emit();
        return Ok(value);
    }
    Ok(CompiledValue::unknown())
}

/// `Record<string, V>` for `additionalProperties`, or `None` when absent or `false`.
fn record_value(
    obj: &SchemaObject,
    ctx: &mut Context<'_>,
    value: &mut CompiledValue,
) -> Result<Option<TsType>, GenerationError> {
    let Some(additional) = obj.additional_properties.as_deref() else {
        return Ok(None);
    };
    match additional {
        Schema::Bool(false) => Ok(None),
        Schema::Bool(true) => Ok(Some(TsType::string_record(TsType::unknown()))),
        Schema::Object(inner) if is_empty_schema(inner) => {
            Ok(Some(TsType::string_record(TsType::unknown())))
        }
        schema => {
            let resolved = resolve_object(schema, None, false, ctx)?;
            value.absorb(&resolved);
            Ok(Some(TsType::string_record(TsType::Ref(resolved.value))))
        }
    }
}

fn is_empty_schema(obj: &SchemaObject) -> bool {
    *obj == SchemaObject::default()
}

/// Name for a promoted inline property type.
fn property_type_name(parent: &str, key: &str, ctx: &Context<'_>) -> String {
    let candidate = ctx
        .policy
        .type_name(&format!("{parent}{}", pascal_case(key)));
    if ctx.is_component_name(&candidate) {
        format!("{candidate}Property")
    } else {
        candidate
    }
}

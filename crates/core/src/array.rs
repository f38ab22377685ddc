//! Array and tuple schemas.

use crate::context::Context;
use crate::dispatch::resolve_object;
use crate::emit::{Emit, wrap_compound};
use crate::error::GenerationError;
use crate::policy::UntypedArrays;
use crate::spec::{Schema, SchemaObject};
use crate::types::TsType;
use crate::value::{CompiledValue, TypeCategory};

/// Compile an array schema.
///
/// - `prefixItems` gives a tuple, with `items` as its rest element
/// - `items` gives `T[]`, item declarations named `<Name><ItemSuffix>`
/// - neither gives `unknown[]` when permitted, otherwise an error
pub fn compile_array(
    obj: &SchemaObject,
    name: Option<&str>,
    ctx: &mut Context<'_>,
) -> Result<CompiledValue, GenerationError> {
    let readonly = if obj.is_read_only() && !ctx.policy.suppress_readonly_modifier {
        "readonly "
    } else {
        ""
    };
    let suffix = ctx.policy.item_suffix.clone();

    if let Some(prefix_items) = &obj.prefix_items {
        let mut value = CompiledValue::new("", TypeCategory::Array);
        let mut elements = Vec::with_capacity(prefix_items.len() + 1);
        for (i, item) in prefix_items.iter().enumerate() {
            let item_name = name.map(|n| ctx.policy.type_name(&format!("{n}{suffix}{i}")));
            let resolved = resolve_object(item, item_name.as_deref(), false, ctx)?;
            value.absorb(&resolved);
            elements.push(resolved.value);
        }
        if let Some(rest) = obj.items.as_deref()
            && !matches!(rest, Schema::Bool(false))
        {
            let rest_name = name.map(|n| ctx.policy.type_name(&format!("{n}{suffix}")));
            let resolved = resolve_object(rest, rest_name.as_deref(), false, ctx)?;
            value.absorb(&resolved);
            elements.push(format!("...{}[]", wrap_compound(&resolved.value)));
        }
        value.value = format!("{readonly}[{}]", elements.join(", "));
        return Ok(value);
    }

    if let Some(items) = obj.items.as_deref() {
        let item_name = name.map(|n| ctx.policy.type_name(&format!("{n}{suffix}")));
        let resolved = resolve_object(items, item_name.as_deref(), false, ctx)?;
        let ty = TsType::Array(Box::new(TsType::Ref(resolved.value.clone())));
        let mut value = CompiledValue::new(format!("{readonly}{}", ty.emit()), TypeCategory::Array);
        value.absorb(&resolved);
        return Ok(value);
    }

    let allowed = match ctx.policy.untyped_arrays {
        UntypedArrays::Allow => true,
        UntypedArrays::FollowDialect => ctx
            .current_document()
            .is_some_and(|doc| doc.allows_untyped_arrays()),
    };
    if allowed {
        let ty = TsType::Array(Box::new(TsType::unknown()));
        return Ok(CompiledValue::new(
            format!("{readonly}{}", ty.emit()),
            TypeCategory::Array,
        ));
    }
    Err(GenerationError::MalformedArray {
        name: name.unwrap_or("<inline>").to_string(),
        schema: serde_json::to_string(obj).unwrap_or_default(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::context::RunState;
    use crate::policy::OutputPolicy;
    use crate::workspace::Workspace;
    use serde_json::json;

    fn compile_in(
        openapi: &str,
        policy: &OutputPolicy,
        value: serde_json::Value,
        name: Option<&str>,
    ) -> Result<CompiledValue, GenerationError> {
        let ws = Workspace::from_values(
            "api.json",
            [("api.json", json!({"openapi": openapi}))],
        )
        .unwrap();
        let mut state = RunState::new(&ws, policy);
        let mut ctx = Context::new(&ws, policy, &mut state, "api.json");
        let obj: SchemaObject = serde_json::from_value(value).unwrap();
        compile_array(&obj, name, &mut ctx)
    }

    fn compile(value: serde_json::Value) -> CompiledValue {
        compile_in("3.0.3", &OutputPolicy::default(), value, None).unwrap()
    }

    #[test]
    fn test_items() {
        assert_eq!(
            compile(json!({"type": "array", "items": {"type": "string"}})).value,
            "string[]"
        );
        assert_eq!(
            compile(json!({"type": "array", "items": {"type": ["string", "null"]}})).value,
            "(string | null)[]"
        );
        assert_eq!(
            compile(json!({"type": "array", "readOnly": true, "items": {"type": "integer"}})).value,
            "readonly number[]"
        );
    }

    #[test]
    fn test_tuple_with_rest() {
        let value = compile(json!({
            "type": "array",
            "prefixItems": [{"type": "string"}, {"type": "integer"}],
            "items": {"type": "boolean"}
        }));
        assert_eq!(value.value, "[string, number, ...boolean[]]");
    }

    #[test]
    fn test_item_promotion_uses_suffix() {
        let value = compile_in(
            "3.0.3",
            &OutputPolicy::default(),
            json!({"items": {"properties": {"id": {"type": "integer"}}}}),
            Some("Pets"),
        )
        .unwrap();
        assert_eq!(value.value, "PetsItem[]");
        assert_eq!(value.side_schemas[0].name, "PetsItem");
    }

    #[test]
    fn test_untyped_array_depends_on_dialect() {
        let err = compile_in("3.0.3", &OutputPolicy::default(), json!({"type": "array"}), Some("Bag"))
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedArray { ref name, .. } if name == "Bag"));

        let value =
            compile_in("3.1.0", &OutputPolicy::default(), json!({"type": "array"}), None).unwrap();
        assert_eq!(value.value, "unknown[]");

        let policy = OutputPolicy {
            untyped_arrays: UntypedArrays::Allow,
            ..OutputPolicy::default()
        };
        let value = compile_in("3.0.3", &policy, json!({"type": "array"}), None).unwrap();
        assert_eq!(value.value, "unknown[]");
    }
}

//! Operation compilation.
//!
//! Walks the `paths` of a document and compiles every operation into a
//! [`CompiledOperation`]: parameter descriptors, the request body (with its
//! form-encoding block), and response types per status code. Hosts can
//! rewrite compiled operations through an [`OperationTransformer`].

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, trace};
use tsforge_common::{
    camel_case, dedupe_union, needs_bracket_notation, pascal_case, quote_if_needed,
    sanitize_ts_identifier, to_snake_case,
};

use crate::context::Context;
use crate::dispatch::resolve_object;
use crate::emit::Emit;
use crate::error::{DiagnosticKind, GenerationError};
use crate::form_data::{FormEncoding, FormKind, encode_form_body};
use crate::resolver::resolve_item;
use crate::spec::{MediaType, Operation, Parameter, ParameterLocation, PathItem, Schema};
use crate::types::{TsProp, TsType, TsTypeDef, TypeDefKind};
use crate::value::{CompiledValue, Declaration, ImportDescriptor};

/// HTTP method of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    /// Every method, in the order operations are compiled.
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
        HttpMethod::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }

    fn operation<'p>(&self, item: &'p PathItem) -> Option<&'p Operation> {
        match self {
            HttpMethod::Get => item.get.as_ref(),
            HttpMethod::Put => item.put.as_ref(),
            HttpMethod::Post => item.post.as_ref(),
            HttpMethod::Delete => item.delete.as_ref(),
            HttpMethod::Options => item.options.as_ref(),
            HttpMethod::Head => item.head.as_ref(),
            HttpMethod::Patch => item.patch.as_ref(),
            HttpMethod::Trace => item.trace.as_ref(),
        }
    }
}

/// One path, query or header parameter.
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    /// Name as declared in the document
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    /// Compiled type expression
    pub ty: String,
    /// `name: Type`
    pub definition: String,
    /// `name: Type`, or `name?: Type` when optional
    pub implementation: String,
    pub description: Option<String>,
}

/// Compiled type of one response status code.
#[derive(Debug, Clone)]
pub struct ResponseVariant {
    /// Status code or `default`
    pub status: String,
    pub content_type: Option<String>,
    pub value: String,
}

/// Response types of an operation.
#[derive(Debug, Clone)]
pub struct ResponseDescriptor {
    /// Union of the 2xx variants, or `unknown`
    pub success: String,
    /// Union of every other variant including `default`, or `unknown`
    pub errors: String,
    pub variants: Vec<ResponseVariant>,
}

/// Request body of an operation.
#[derive(Debug, Clone)]
pub struct RequestBodyDescriptor {
    /// Compiled type expression
    pub ty: String,
    pub content_type: String,
    /// Argument name used by generated client code
    pub implementation: String,
    pub optional: bool,
    /// Form population code for multipart and url-encoded bodies
    pub form: Option<FormEncoding>,
}

/// Static description of a host-provided request mutator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutatorShape {
    pub name: String,
    /// Number of parameters the mutator function takes
    pub param_count: usize,
    /// The mutator is a hook returning the actual function
    pub is_hook: bool,
}

/// A compiled operation, ready for per-client emitters.
#[derive(Debug, Clone)]
pub struct CompiledOperation {
    /// Identifier used for generated functions (e.g. `listPets`)
    pub name: String,
    pub method: HttpMethod,
    pub path: String,
    /// Document the operation is declared in
    pub document: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
    pub path_params: Vec<ParameterDescriptor>,
    pub query_params: Vec<ParameterDescriptor>,
    pub header_params: Vec<ParameterDescriptor>,
    /// `<Operation>Params` declaration name when there are query parameters
    pub params_type: Option<String>,
    /// `<Operation>Headers` declaration name when there are header parameters
    pub headers_type: Option<String>,
    pub body: Option<RequestBodyDescriptor>,
    pub response: ResponseDescriptor,
    pub mutator: Option<MutatorShape>,
    /// Declarations spawned while compiling the operation
    pub declarations: Vec<Declaration>,
    pub imports: Vec<ImportDescriptor>,
}

/// Host hook applied to every compiled operation.
pub trait OperationTransformer {
    fn transform(&self, operation: CompiledOperation) -> CompiledOperation;
}

impl<F> OperationTransformer for F
where
    F: Fn(CompiledOperation) -> CompiledOperation,
{
    fn transform(&self, operation: CompiledOperation) -> CompiledOperation {
        self(operation)
    }
}

/// Host customization points for a run.
#[derive(Default)]
pub struct Customizations {
    pub transformer: Option<Box<dyn OperationTransformer>>,
    pub mutator: Option<MutatorShape>,
}

impl fmt::Debug for Customizations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Customizations")
            .field("transformer", &self.transformer.as_ref().map(|_| "<transformer>"))
            .field("mutator", &self.mutator)
            .finish()
    }
}

/// Compile every operation of the context's current document.
///
/// `taken` holds operation names already used in this run; a repeated name
/// gets a numeric suffix.
pub fn compile_operations(
    ctx: &mut Context<'_>,
    customizations: &Customizations,
    taken: &mut HashSet<String>,
) -> Result<Vec<CompiledOperation>, GenerationError> {
    let Some(document) = ctx.current_document() else {
        return Ok(Vec::new());
    };

    let mut paths: Vec<(&String, &PathItem)> = document.paths.iter().collect();
    paths.sort_by_key(|(path, _)| *path);

    let mut operations = Vec::new();
    for (path, item) in paths {
        for method in HttpMethod::ALL {
            let Some(op) = method.operation(item) else {
                continue;
            };
            let name = unique_name(operation_name(path, method, op), taken, ctx);
            let mut compiled = compile_operation(&name, path, method, item, op, ctx)?;
            compiled.mutator = customizations.mutator.clone();
            if let Some(transformer) = &customizations.transformer {
                compiled = transformer.transform(compiled);
            }
            operations.push(compiled);
        }
    }

    debug!(
        document = %ctx.document,
        operations = operations.len(),
        "Compiled operations."
    );
    Ok(operations)
}

/// Sanitized `operationId`, or `<method>_<static path segments>`.
fn operation_name(path: &str, method: HttpMethod, op: &Operation) -> String {
    if let Some(id) = &op.operation_id {
        return sanitize_ts_identifier(id);
    }

    let path_parts: Vec<_> = path
        .split('/')
        .filter(|s| !s.is_empty() && !s.starts_with('{'))
        .collect();

    let base = path_parts.join("_");
    camel_case(&sanitize_ts_identifier(&format!(
        "{}_{}",
        method.as_str().to_lowercase(),
        base
    )))
}

fn unique_name(name: String, taken: &mut HashSet<String>, ctx: &mut Context<'_>) -> String {
    if taken.insert(name.clone()) {
        return name;
    }
    let mut n = 2;
    let renamed = loop {
        let candidate = format!("{name}{n}");
        if taken.insert(candidate.clone()) {
            break candidate;
        }
        n += 1;
    };
    ctx.state.diagnose(
        DiagnosticKind::RenamedOperation,
        renamed.clone(),
        ctx.document.clone(),
        format!("Operation name '{name}' is already used; renamed to '{renamed}'"),
    );
    renamed
}

fn compile_operation(
    name: &str,
    path: &str,
    method: HttpMethod,
    item: &PathItem,
    op: &Operation,
    ctx: &mut Context<'_>,
) -> Result<CompiledOperation, GenerationError> {
    trace!(operation = name, method = method.as_str(), path, "Compiling operation.");
    let prefix = ctx.policy.type_name(&pascal_case(name));
    let mut collected = CompiledValue::unknown();

    let parameters = merged_parameters(item, op, ctx)?;
    validate_path_parameters(name, path, &parameters)?;

    let mut path_params = Vec::new();
    let mut query_params = Vec::new();
    let mut header_params = Vec::new();
    for (param, document) in &parameters {
        let descriptor = ctx.in_document(document, |ctx| {
            compile_parameter(param, &prefix, ctx)
        })?;
        collected.absorb(&descriptor.1);
        match param.location {
            ParameterLocation::Path => path_params.push(descriptor.0),
            ParameterLocation::Query => query_params.push(descriptor.0),
            ParameterLocation::Header => header_params.push(descriptor.0),
            ParameterLocation::Cookie => {}
        }
    }

    let params_type = parameter_declaration(&format!("{prefix}Params"), &query_params, &collected, ctx);
    let headers_type =
        parameter_declaration(&format!("{prefix}Headers"), &header_params, &collected, ctx);
    for declaration in params_type.iter().chain(headers_type.iter()) {
        collected.side_schemas.push(declaration.clone());
    }

    let body = match &op.request_body {
        Some(request_body) => {
            let (request_body, document) = resolve_item(request_body, ctx)?;
            ctx.in_document(&document, |ctx| {
                compile_request_body(name, &prefix, &request_body.content, request_body.required, ctx)
            })?
            .map(|(descriptor, value)| {
                collected.absorb(&value);
                descriptor
            })
        }
        None => None,
    };

    let response = compile_responses(&prefix, op, ctx, &mut collected)?;

    Ok(CompiledOperation {
        name: name.to_string(),
        method,
        path: path.to_string(),
        document: ctx.document.clone(),
        summary: op.summary.clone(),
        description: op.description.clone(),
        tags: op.tags.clone(),
        deprecated: op.deprecated,
        path_params,
        query_params,
        header_params,
        params_type: params_type.map(|d| d.name),
        headers_type: headers_type.map(|d| d.name),
        body,
        response,
        mutator: None,
        declarations: collected.side_schemas,
        imports: collected.imports,
    })
}

/// Path-level parameters overridden by operation-level ones with the same `(name, in)`.
/// Cookie parameters are dropped.
fn merged_parameters(
    item: &PathItem,
    op: &Operation,
    ctx: &Context<'_>,
) -> Result<Vec<(Parameter, String)>, GenerationError> {
    let mut merged: Vec<(Parameter, String)> = Vec::new();
    for raw in item.parameters.iter().chain(op.parameters.iter()) {
        let (param, document) = resolve_item(raw, ctx)?;
        if param.location == ParameterLocation::Cookie {
            continue;
        }
        merged.retain(|(p, _)| !(p.name == param.name && p.location == param.location));
        merged.push((param, document));
    }
    Ok(merged)
}

/// Names of the `{var}` placeholders in a path template.
fn path_placeholders(path: &str) -> Vec<&str> {
    path.split('{')
        .skip(1)
        .filter_map(|rest| rest.split_once('}').map(|(name, _)| name))
        .filter(|name| !name.is_empty())
        .collect()
}

/// Declared path parameter matching a placeholder, exactly or by snake-case equivalence.
fn find_matching_param<'p>(placeholder: &str, params: &[&'p Parameter]) -> Option<&'p Parameter> {
    if let Some(exact) = params.iter().find(|p| p.name == placeholder) {
        return Some(*exact);
    }
    let placeholder_snake = to_snake_case(placeholder);
    params
        .iter()
        .find(|p| to_snake_case(&p.name) == placeholder_snake)
        .copied()
}

fn validate_path_parameters(
    operation: &str,
    path: &str,
    parameters: &[(Parameter, String)],
) -> Result<(), GenerationError> {
    let declared: Vec<&Parameter> = parameters
        .iter()
        .map(|(p, _)| p)
        .filter(|p| p.location == ParameterLocation::Path)
        .collect();
    for placeholder in path_placeholders(path) {
        if find_matching_param(placeholder, &declared).is_none() {
            return Err(GenerationError::MissingPathParameter {
                operation: operation.to_string(),
                path: path.to_string(),
                parameter: placeholder.to_string(),
            });
        }
    }
    Ok(())
}

fn compile_parameter(
    param: &Parameter,
    prefix: &str,
    ctx: &mut Context<'_>,
) -> Result<(ParameterDescriptor, CompiledValue), GenerationError> {
    let schema = param
        .schema
        .clone()
        .or_else(|| param.content.values().find_map(|m| m.schema.clone()));
    let type_name = ctx
        .policy
        .type_name(&format!("{prefix}{}", pascal_case(&param.name)));
    let compiled = match &schema {
        Some(schema) => resolve_object(schema, Some(&type_name), false, ctx)?,
        None => CompiledValue::unknown(),
    };

    let required = param.required || param.location == ParameterLocation::Path;
    let key = if param.location == ParameterLocation::Path {
        camel_case(&param.name)
    } else {
        quote_if_needed(&param.name)
    };
    let optional = if required { "" } else { "?" };
    let descriptor = ParameterDescriptor {
        name: param.name.clone(),
        location: param.location,
        required,
        ty: compiled.value.clone(),
        definition: format!("{key}: {}", compiled.value),
        implementation: format!("{key}{optional}: {}", compiled.value),
        description: param.description.clone(),
    };
    Ok((descriptor, compiled))
}

/// `<Operation>Params` / `<Operation>Headers` interface, or `None` when there are no parameters.
fn parameter_declaration(
    name: &str,
    params: &[ParameterDescriptor],
    collected: &CompiledValue,
    ctx: &Context<'_>,
) -> Option<Declaration> {
    if params.is_empty() {
        return None;
    }
    let properties = params
        .iter()
        .map(|p| TsProp {
            name: p.name.clone(),
            ty: TsType::Ref(p.ty.clone()),
            optional: !p.required,
            readonly: false,
        })
        .collect();
    let def = TsTypeDef {
        name: name.to_string(),
        kind: TypeDefKind::Interface { properties },
    };
    Some(
        Declaration::new(name, def.emit(), ctx.document.clone())
            .with_imports(collected.imports.clone()),
    )
}

fn is_json(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or(content_type).trim();
    essence == "application/json" || essence.ends_with("+json") || essence.ends_with("/json")
}

/// Preferred media type of a body: JSON, then multipart, then url-encoded, then the first.
fn preferred_content<'c>(
    content: &'c IndexMap<String, MediaType>,
) -> Option<(&'c String, &'c MediaType)> {
    content
        .iter()
        .find(|(ct, _)| is_json(ct))
        .or_else(|| content.iter().find(|(ct, _)| ct.as_str() == "multipart/form-data"))
        .or_else(|| {
            content
                .iter()
                .find(|(ct, _)| ct.as_str() == "application/x-www-form-urlencoded")
        })
        .or_else(|| content.iter().next())
}

fn compile_request_body(
    operation: &str,
    prefix: &str,
    content: &IndexMap<String, MediaType>,
    required: bool,
    ctx: &mut Context<'_>,
) -> Result<Option<(RequestBodyDescriptor, CompiledValue)>, GenerationError> {
    let Some((content_type, media)) = preferred_content(content) else {
        return Ok(None);
    };
    let type_name = ctx.policy.type_name(&format!("{prefix}Body"));
    let compiled = match &media.schema {
        Some(schema) => resolve_object(schema, Some(&type_name), false, ctx)?,
        None => CompiledValue::unknown(),
    };

    let implementation = if needs_bracket_notation(&compiled.value) {
        format!("{operation}Body")
    } else {
        camel_case(&compiled.value)
    };

    let form = match (FormKind::from_content_type(content_type), &media.schema) {
        (Some(kind), Some(schema)) => Some(encode_form_body(
            schema,
            &implementation,
            kind,
            &media.encoding,
            ctx,
        )?),
        _ => None,
    };

    let descriptor = RequestBodyDescriptor {
        ty: compiled.value.clone(),
        content_type: content_type.clone(),
        implementation,
        optional: !required,
        form,
    };
    Ok(Some((descriptor, compiled)))
}

fn compile_responses(
    prefix: &str,
    op: &Operation,
    ctx: &mut Context<'_>,
    collected: &mut CompiledValue,
) -> Result<ResponseDescriptor, GenerationError> {
    let mut variants = Vec::with_capacity(op.responses.len());
    for (status, response) in &op.responses {
        let (response, document) = resolve_item(response, ctx)?;
        let type_name = ctx.policy.type_name(&format!("{prefix}{}", pascal_case(status)));

        let json = response.content.iter().find(|(ct, _)| is_json(ct));
        let (content_type, value) = match json {
            Some((ct, media)) => {
                let compiled = match &media.schema {
                    Some(schema) => ctx.in_document(&document, |ctx| {
                        resolve_object(schema, Some(&type_name), false, ctx)
                    })?,
                    None => CompiledValue::unknown(),
                };
                collected.absorb(&compiled);
                (Some(ct.clone()), compiled.value)
            }
            None => match response.content.first() {
                Some((ct, _)) if ct.starts_with("text/") => {
                    (Some(ct.clone()), "string".to_string())
                }
                Some((ct, media)) => (Some(ct.clone()), binary_or_text(media)),
                None => (None, "void".to_string()),
            },
        };

        variants.push(ResponseVariant {
            status: status.clone(),
            content_type,
            value,
        });
    }

    let union_of = |success: bool| {
        let members: Vec<&str> = variants
            .iter()
            .filter(|v| v.status.starts_with('2') == success)
            .map(|v| v.value.as_str())
            .collect();
        if members.is_empty() {
            "unknown".to_string()
        } else {
            dedupe_union(&members.join(" | "))
        }
    };
    let success = union_of(true);
    let errors = union_of(false);

    Ok(ResponseDescriptor {
        success,
        errors,
        variants,
    })
}

/// Non-JSON, non-text content is binary unless its schema says it is a plain string.
fn binary_or_text(media: &MediaType) -> String {
    let is_plain_string = media.schema.as_ref().and_then(Schema::as_object).is_some_and(|s| {
        s.types() == ["string"] && s.format.as_deref() != Some("binary")
    });
    if is_plain_string {
        "string".to_string()
    } else {
        "Blob".to_string()
    }
}

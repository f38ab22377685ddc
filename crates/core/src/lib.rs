//! OpenAPI schema resolution and TypeScript type generation.
//!
//! This crate turns a workspace of linked OpenAPI documents into named
//! TypeScript declarations and per-operation descriptors:
//! - Declarations from component schemas, plus the inline shapes promoted to
//!   their own names while compiling them
//! - Operation descriptors: parameters, request body, form encoding, responses
//! - Diagnostics for recoverable findings
//!
//! ## Module Structure
//!
//! - `spec`, `workspace`: document model and the linked-document map
//! - `policy`: output policy, deserialized from TOML or any serde format
//! - `resolver`: `$ref` resolution across documents
//! - `dispatch`, `object`, `array`, `combine`, `enums`, `brand`: schema compilation
//! - `discriminator`: discriminator normalization and union collapse
//! - `alias`, `sort`: cross-document renaming, deduplication and ordering
//! - `form_data`: multipart and url-encoded body population code
//! - `operation`: operation compilation and host customization hooks
//! - `types`, `emit`: TypeScript AST and its rendering (via the `Emit` trait)
//! - `generate`: the run entry point

mod alias;
mod array;
mod brand;
mod combine;
mod context;
mod discriminator;
mod dispatch;
mod emit;
mod enums;
mod error;
mod form_data;
mod generate;
mod object;
mod operation;
mod policy;
mod resolver;
mod sort;
mod spec;
mod types;
mod value;
mod workspace;

// Re-export the main entry points
pub use alias::{alias_name, document_tag};
pub use brand::{BRANDED_HELPER, BrandEntry, BrandRegistry};
pub use context::{Context, RunState};
pub use discriminator::normalize_discriminators;
pub use dispatch::{compile_declaration, compile_value, resolve_object};
pub use emit::Emit;
pub use error::{Diagnostic, DiagnosticKind, GenerationError};
pub use form_data::{FormEncoding, FormKind, encode_form_body};
pub use generate::{GeneratorOutput, generate};
pub use operation::{
    CompiledOperation, Customizations, HttpMethod, MutatorShape, OperationTransformer,
    ParameterDescriptor, RequestBodyDescriptor, ResponseDescriptor, ResponseVariant,
};
pub use policy::{ArrayHandling, DiscriminatedUnions, FormDataPolicy, OutputPolicy, UntypedArrays};
pub use resolver::{ResolvedRef, resolve_schema_ref};
pub use sort::{dedupe_declarations, sort_declarations};
pub use spec::{
    Combinator, Components, Discriminator, Document, Encoding, MediaType, Operation, Parameter,
    ParameterLocation, PathItem, RefOr, RequestBody, Response, Schema, SchemaObject, SchemaType,
};
pub use types::{
    ConstEnumMember, TsExpr, TsLiteral, TsPrimitive, TsProp, TsStmt, TsType, TsTypeDef,
    TypeDefKind,
};
pub use value::{CompiledValue, Declaration, ImportDescriptor, TypeCategory};
pub use workspace::Workspace;
pub use tsforge_common::NamingConvention;

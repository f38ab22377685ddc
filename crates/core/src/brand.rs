//! Branded primitive types.
//!
//! A scalar schema carrying `x-brand` compiles to a nominal alias
//! `Branded<Base, "Brand">`. The registry keeps every brand of a run and
//! rejects contradictory registrations.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::context::Context;
use crate::emit::Emit;
use crate::error::GenerationError;
use crate::spec::SchemaObject;
use crate::types::{TsType, TsTypeDef, TypeDefKind};
use crate::value::{CompiledValue, Declaration, ImportDescriptor};

/// Name of the helper type every brand declaration builds on.
pub const BRANDED_HELPER: &str = "Branded";

/// A registered brand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandEntry {
    pub base: String,
    pub brand: String,
}

/// Brands registered during one run.
#[derive(Debug, Default)]
pub struct BrandRegistry {
    brands: IndexMap<String, BrandEntry>,
    reserved: HashSet<String>,
}

impl BrandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `name` as taken by a declaration.
    pub fn reserve(&mut self, name: &str) {
        self.reserved.insert(name.to_string());
    }

    /// Register `brand` over `base`.
    ///
    /// Returns `Ok(true)` on first registration and `Ok(false)` when the same
    /// brand is registered again with the same base.
    pub fn register(&mut self, brand: &str, base: &str) -> Result<bool, GenerationError> {
        if self.reserved.contains(brand) {
            return Err(GenerationError::BrandNameCollision {
                brand: brand.to_string(),
            });
        }
        if let Some(existing) = self.brands.get(brand) {
            if existing.base == base {
                return Ok(false);
            }
            return Err(GenerationError::BrandConflict {
                brand: brand.to_string(),
                existing: existing.base.clone(),
                requested: base.to_string(),
            });
        }
        self.brands.insert(
            brand.to_string(),
            BrandEntry {
                base: base.to_string(),
                brand: brand.to_string(),
            },
        );
        Ok(true)
    }

    /// Fail when a declaration other than a brand's own alias carries a brand name.
    ///
    /// Component names are reserved up front; this catches names promoted
    /// during compilation, such as inline objects and operation parameter types.
    pub fn check_declarations(&self, declarations: &[Declaration]) -> Result<(), GenerationError> {
        for declaration in declarations {
            let Some(entry) = self.brands.get(&declaration.name) else {
                continue;
            };
            if declaration.body != brand_definition(&entry.brand, &entry.base).emit() {
                return Err(GenerationError::BrandNameCollision {
                    brand: entry.brand.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, brand: &str) -> Option<&BrandEntry> {
        self.brands.get(brand)
    }

    /// Registered brands in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &BrandEntry> {
        self.brands.values()
    }

    pub fn len(&self) -> usize {
        self.brands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }
}

/// `export type Branded<T, B extends string> = T & { readonly __brand: B };`
pub fn helper_declaration(document: &str) -> Declaration {
    Declaration::new(
        BRANDED_HELPER,
        format!(
            "export type {BRANDED_HELPER}<T, B extends string> = T & {{ readonly __brand: B }};\n"
        ),
        document,
    )
}

fn brand_definition(brand: &str, base: &str) -> TsTypeDef {
    TsTypeDef {
        name: brand.to_string(),
        kind: TypeDefKind::TypeAlias {
            ty: TsType::Ref(format!("{BRANDED_HELPER}<{base}, \"{brand}\">")),
        },
    }
}

/// Replace a compiled scalar with its branded alias when the schema carries `x-brand`.
pub fn apply_brand(
    schema: &SchemaObject,
    compiled: CompiledValue,
    ctx: &mut Context<'_>,
) -> Result<CompiledValue, GenerationError> {
    if !ctx.policy.use_branded_types {
        return Ok(compiled);
    }
    let Some(brand) = schema.extension_str("x-brand") else {
        return Ok(compiled);
    };

    let name = ctx.policy.type_name(brand);
    let newly = ctx.state.brands.register(&name, &compiled.value)?;
    if newly {
        debug!(brand = %name, base = %compiled.value, "Registered brand.");
    }

    let def = brand_definition(&name, &compiled.value);
    // Brand declarations always belong to the root document.
    let root = ctx.workspace.root().to_string();
    let mut imports = compiled.imports.clone();
    imports.push(ImportDescriptor::new(BRANDED_HELPER, root.clone()));
    let declaration =
        Declaration::new(name.clone(), def.emit(), root.clone()).with_imports(imports);

    let mut branded = CompiledValue::new(name.clone(), compiled.category);
    branded.is_ref = true;
    branded.side_schemas = compiled.side_schemas;
    branded.side_schemas.push(declaration);
    branded.add_import(ImportDescriptor::new(name, root));
    branded.example = compiled.example;
    branded.examples = compiled.examples;
    Ok(branded)
}

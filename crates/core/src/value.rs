//! Results of compiling schema nodes.
//!
//! - [`CompiledValue`]: a type expression plus everything it pulled in
//! - [`Declaration`]: a named, independently emitted declaration
//! - [`ImportDescriptor`]: how one declaration refers to another

use serde_json::Value;

use crate::types::{ConstEnumMember, TsProp};

/// Category of a compiled type expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Number,
    String,
    Boolean,
    Object,
    Array,
    Enum,
    Null,
    Unknown,
}

/// How a declaration refers to another declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportDescriptor {
    /// Declaration name in its own document
    pub name: String,
    /// Document-qualified alias used in place of `name`, if any
    pub alias: Option<String>,
    /// Document the referenced declaration comes from
    pub document: Option<String>,
    /// The import is used as a value (e.g. spread into a const enum), not only as a type
    pub is_value: bool,
    /// The referenced declaration is a constant
    pub is_constant: bool,
}

impl ImportDescriptor {
    /// Type-only import of `name` from `document`.
    pub fn new(name: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            document: Some(document.into()),
            is_value: false,
            is_constant: false,
        }
    }

    /// Name to write at the use site.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A named declaration ready to be ordered and emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    /// Rendered TypeScript text, ending in a newline
    pub body: String,
    pub imports: Vec<ImportDescriptor>,
    /// Names of declarations that must be emitted before this one
    pub dependencies: Vec<String>,
    /// Document the declaration was compiled from
    pub document: String,
}

impl Declaration {
    pub fn new(name: impl Into<String>, body: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            imports: Vec::new(),
            dependencies: Vec::new(),
            document: document.into(),
        }
    }

    /// Attach imports and derive dependencies from them, skipping self references.
    pub fn with_imports(mut self, imports: Vec<ImportDescriptor>) -> Self {
        for import in &imports {
            let local = import.local_name();
            if local != self.name && !self.dependencies.iter().any(|d| d == local) {
                self.dependencies.push(local.to_string());
            }
        }
        self.imports = imports;
        self
    }
}

/// The engine's result for one schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledValue {
    /// Rendered type expression
    pub value: String,
    pub category: TypeCategory,
    pub is_ref: bool,
    pub is_enum: bool,
    pub has_readonly_props: bool,
    /// Declarations spawned while compiling this value
    pub side_schemas: Vec<Declaration>,
    pub imports: Vec<ImportDescriptor>,
    pub dependencies: Vec<String>,
    /// Enum members when `is_enum` is set and the value is an inline literal union
    pub enum_members: Vec<ConstEnumMember>,
    /// Property list when the value is a plain object literal
    pub properties: Option<Vec<TsProp>>,
    pub example: Option<Value>,
    pub examples: Option<Value>,
}

impl CompiledValue {
    pub fn new(value: impl Into<String>, category: TypeCategory) -> Self {
        Self {
            value: value.into(),
            category,
            is_ref: false,
            is_enum: false,
            has_readonly_props: false,
            side_schemas: Vec::new(),
            imports: Vec::new(),
            dependencies: Vec::new(),
            enum_members: Vec::new(),
            properties: None,
            example: None,
            examples: None,
        }
    }

    pub fn unknown() -> Self {
        Self::new("unknown", TypeCategory::Unknown)
    }

    /// Merge the imports, dependencies and side schemas of `other` into `self`.
    pub fn absorb(&mut self, other: &CompiledValue) {
        for import in &other.imports {
            if !self.imports.contains(import) {
                self.imports.push(import.clone());
            }
        }
        for dep in &other.dependencies {
            if !self.dependencies.contains(dep) {
                self.dependencies.push(dep.clone());
            }
        }
        self.side_schemas.extend(other.side_schemas.iter().cloned());
        self.has_readonly_props |= other.has_readonly_props;
    }

    /// Record a reference to declaration `import`.
    pub fn add_import(&mut self, import: ImportDescriptor) {
        let local = import.local_name().to_string();
        if !self.dependencies.contains(&local) {
            self.dependencies.push(local);
        }
        if !self.imports.contains(&import) {
            self.imports.push(import);
        }
    }

    /// Append ` | null` unless the value already admits null.
    pub fn make_nullable(&mut self) {
        self.value = tsforge_common::dedupe_union(&format!("{} | null", self.value));
        self.properties = None;
    }
}

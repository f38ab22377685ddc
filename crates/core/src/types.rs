//! TypeScript IR types for declaration and statement generation.
//!
//! This module defines the TypeScript representation the engine builds before
//! rendering text:
//! - TsType: Types (primitives, arrays, unions, objects, etc.)
//! - TsTypeDef: Named declarations (interfaces, aliases, const enums)
//! - TsExpr / TsStmt: Expressions and statements for form-encoding code

/// TypeScript type representation
#[derive(Debug, Clone, PartialEq)]
pub enum TsType {
    /// Primitive types: string, number, boolean, null, void, unknown, never
    Primitive(TsPrimitive),
    /// Array type: T[]
    Array(Box<TsType>),
    /// Union type: A | B | C
    Union(Vec<TsType>),
    /// Intersection type: A & B & C
    Intersection(Vec<TsType>),
    /// Object type: { foo: string; bar?: number }
    Object(Vec<TsProp>),
    /// Record type: Record<K, V>
    Record {
        key: Box<TsType>,
        value: Box<TsType>,
    },
    /// Literal type: "foo", 42, true
    Literal(TsLiteral),
    /// Named type reference or already-rendered type text
    Ref(String),
}

impl TsType {
    pub fn string() -> Self {
        TsType::Primitive(TsPrimitive::String)
    }

    pub fn unknown() -> Self {
        TsType::Primitive(TsPrimitive::Unknown)
    }

    /// `Record<string, value>`
    pub fn string_record(value: TsType) -> Self {
        TsType::Record {
            key: Box::new(TsType::string()),
            value: Box::new(value),
        }
    }
}

/// TypeScript primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsPrimitive {
    String,
    Number,
    Boolean,
    Null,
    Void,
    Unknown,
    Never,
}

/// Object property definition
#[derive(Debug, Clone, PartialEq)]
pub struct TsProp {
    pub name: String,
    pub ty: TsType,
    pub optional: bool,
    pub readonly: bool,
}

/// TypeScript literal values
#[derive(Debug, Clone, PartialEq)]
pub enum TsLiteral {
    String(String),
    Number(f64),
    Int(i64),
    Bool(bool),
    Null,
}

impl TsLiteral {
    /// Literal for a JSON scalar; `None` for arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(TsLiteral::Null),
            serde_json::Value::Bool(b) => Some(TsLiteral::Bool(*b)),
            serde_json::Value::Number(n) => Some(match n.as_i64() {
                Some(i) => TsLiteral::Int(i),
                None => TsLiteral::Number(n.as_f64().unwrap_or(0.0)),
            }),
            serde_json::Value::String(s) => Some(TsLiteral::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

/// One member of a const enum object.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstEnumMember {
    /// `key: value,` with an optional doc comment
    Entry {
        key: String,
        value: TsLiteral,
        description: Option<String>,
    },
    /// `...Other,`
    Spread(String),
}

/// Type definition kind
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefKind {
    /// interface Foo { ... }
    Interface { properties: Vec<TsProp> },
    /// type Foo = ...
    TypeAlias { ty: TsType },
    /// const Foo = { ... } as const; type Foo = ...
    ConstEnum {
        members: Vec<ConstEnumMember>,
        nullable: bool,
    },
}

/// Type definition
#[derive(Debug, Clone, PartialEq)]
pub struct TsTypeDef {
    pub name: String,
    pub kind: TypeDefKind,
}

/// TypeScript expression
#[derive(Debug, Clone)]
pub enum TsExpr {
    /// Identifier: foo
    Ident(String),
    /// Literal value: "bar", 42
    Literal(TsLiteral),
    /// Function call: foo(a, b)
    Call {
        callee: Box<TsExpr>,
        args: Vec<TsExpr>,
    },
    /// Object literal: { a: 1, b: 2 }
    Object(Vec<(String, TsExpr)>),
    /// Member access: foo.bar
    Member { object: Box<TsExpr>, prop: String },
    /// Template literal: `${foo}/bar`
    Template(Vec<TemplatePart>),
    /// Binary expression: a !== undefined
    BinOp {
        left: Box<TsExpr>,
        op: BinOp,
        right: Box<TsExpr>,
    },
    /// new Blob(...)
    New {
        callee: Box<TsExpr>,
        args: Vec<TsExpr>,
    },
    /// Ternary/conditional: cond ? a : b
    Ternary {
        cond: Box<TsExpr>,
        then_expr: Box<TsExpr>,
        else_expr: Box<TsExpr>,
    },
    /// Array literal: [a, b, c]
    Array(Vec<TsExpr>),
    /// Type cast: (expr as Type)
    Cast { expr: Box<TsExpr>, ty: TsType },
    /// Raw code that doesn't fit the AST
    Raw(String),
}

impl TsExpr {
    pub fn ident(name: impl Into<String>) -> Self {
        TsExpr::Ident(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        TsExpr::Literal(TsLiteral::String(value.into()))
    }

    /// `self.method(args)`
    pub fn method(self, method: &str, args: Vec<TsExpr>) -> Self {
        TsExpr::Call {
            callee: Box::new(TsExpr::Member {
                object: Box::new(self),
                prop: method.to_string(),
            }),
            args,
        }
    }

    pub fn bin(self, op: BinOp, right: TsExpr) -> Self {
        TsExpr::BinOp {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy)]
pub enum BinOp {
    StrictNotEqual,
    And,
    InstanceOf,
}

/// Template literal part
#[derive(Debug, Clone)]
pub enum TemplatePart {
    /// Static string part
    Static(String),
    /// Dynamic expression part: ${expr}
    Dynamic(TsExpr),
}

/// Statement in a generated code block
#[derive(Debug, Clone)]
pub enum TsStmt {
    /// const declaration
    Const {
        name: String,
        ty: Option<TsType>,
        init: TsExpr,
    },
    /// Expression statement
    Expr(TsExpr),
    /// If statement
    If {
        cond: TsExpr,
        then_body: Vec<TsStmt>,
    },
    /// collection.forEach((a, b) => { ... });
    ForEach {
        collection: TsExpr,
        params: Vec<String>,
        body: Vec<TsStmt>,
    },
}

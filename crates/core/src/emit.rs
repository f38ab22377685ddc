//! TypeScript code emission via the Emit trait.
//!
//! Each IR type implements `Emit`, turning the structured form built by the
//! compiler into the exact text consumed downstream. The shapes of const enums,
//! aliases and interfaces rendered here are part of the output contract.

use tsforge_common::{escape_js_string, has_top_level_union, quote_if_needed, split_top_level};

use crate::types::{
    BinOp, ConstEnumMember, TemplatePart, TsExpr, TsLiteral, TsPrimitive, TsProp, TsStmt, TsType,
    TsTypeDef, TypeDefKind,
};

/// Trait for emitting TypeScript code from IR nodes.
pub trait Emit {
    /// Convert the node to its TypeScript string representation.
    fn emit(&self) -> String;
}

/// Parenthesize a rendered type if it has a top-level `|` or `&`.
pub(crate) fn wrap_compound(text: &str) -> String {
    if has_top_level_union(text) || split_top_level(text, '&').len() > 1 {
        format!("({text})")
    } else {
        text.to_string()
    }
}

// =============================================================================
// Primitive Types
// =============================================================================

impl Emit for TsPrimitive {
    fn emit(&self) -> String {
        match self {
            TsPrimitive::String => "string".to_string(),
            TsPrimitive::Number => "number".to_string(),
            TsPrimitive::Boolean => "boolean".to_string(),
            TsPrimitive::Null => "null".to_string(),
            TsPrimitive::Void => "void".to_string(),
            TsPrimitive::Unknown => "unknown".to_string(),
            TsPrimitive::Never => "never".to_string(),
        }
    }
}

impl Emit for TsLiteral {
    fn emit(&self) -> String {
        match self {
            TsLiteral::String(s) => format!("\"{}\"", escape_js_string(s)),
            TsLiteral::Number(n) => n.to_string(),
            TsLiteral::Int(i) => i.to_string(),
            TsLiteral::Bool(b) => b.to_string(),
            TsLiteral::Null => "null".to_string(),
        }
    }
}

// =============================================================================
// Types
// =============================================================================

impl Emit for TsType {
    fn emit(&self) -> String {
        match self {
            TsType::Primitive(p) => p.emit(),
            TsType::Array(inner) => format!("{}[]", wrap_compound(&inner.emit())),
            TsType::Union(types) => types.iter().map(|t| t.emit()).collect::<Vec<_>>().join(" | "),
            TsType::Intersection(types) => types
                .iter()
                .map(|t| {
                    let s = t.emit();
                    if has_top_level_union(&s) {
                        format!("({s})")
                    } else {
                        s
                    }
                })
                .collect::<Vec<_>>()
                .join(" & "),
            TsType::Object(props) => {
                if props.is_empty() {
                    "{}".to_string()
                } else {
                    let parts: Vec<_> = props.iter().map(|p| p.emit()).collect();
                    format!("{{ {} }}", parts.join("; "))
                }
            }
            TsType::Record { key, value } => {
                format!("Record<{}, {}>", key.emit(), value.emit())
            }
            TsType::Literal(lit) => lit.emit(),
            TsType::Ref(name) => name.clone(),
        }
    }
}

impl Emit for TsProp {
    fn emit(&self) -> String {
        let readonly = if self.readonly { "readonly " } else { "" };
        let key = quote_if_needed(&self.name);
        let opt = if self.optional { "?" } else { "" };
        format!("{}{}{}: {}", readonly, key, opt, self.ty.emit())
    }
}

// =============================================================================
// Type Definitions
// =============================================================================

impl Emit for ConstEnumMember {
    fn emit(&self) -> String {
        match self {
            ConstEnumMember::Entry {
                key,
                value,
                description,
            } => {
                let doc = description
                    .as_ref()
                    .map(|d| format!("  /** {d} */\n"))
                    .unwrap_or_default();
                format!("{}  {}: {},\n", doc, key, value.emit())
            }
            ConstEnumMember::Spread(name) => format!("  ...{name},\n"),
        }
    }
}

impl Emit for TsTypeDef {
    fn emit(&self) -> String {
        match &self.kind {
            TypeDefKind::Interface { properties } => {
                let mut output = format!("export interface {} {{\n", self.name);
                for prop in properties {
                    output.push_str(&format!("  {};\n", prop.emit()));
                }
                output.push_str("}\n");
                output
            }
            TypeDefKind::TypeAlias { ty } => {
                format!("export type {} = {};\n", self.name, ty.emit())
            }
            TypeDefKind::ConstEnum { members, nullable } => {
                let mut output = format!("export const {} = {{\n", self.name);
                for member in members {
                    output.push_str(&member.emit());
                }
                output.push_str("} as const;\n\n");
                let null_suffix = if *nullable { " | null" } else { "" };
                output.push_str(&format!(
                    "export type {} = (typeof {})[keyof typeof {}]{};\n",
                    self.name, self.name, self.name, null_suffix
                ));
                output
            }
        }
    }
}

// =============================================================================
// Expressions
// =============================================================================

impl Emit for BinOp {
    fn emit(&self) -> String {
        match self {
            BinOp::StrictNotEqual => "!==".to_string(),
            BinOp::And => "&&".to_string(),
            BinOp::InstanceOf => "instanceof".to_string(),
        }
    }
}

impl Emit for TsExpr {
    fn emit(&self) -> String {
        match self {
            TsExpr::Ident(name) => name.clone(),
            TsExpr::Literal(lit) => lit.emit(),
            TsExpr::Call { callee, args } => {
                let args_str = args.iter().map(|a| a.emit()).collect::<Vec<_>>().join(", ");
                format!("{}({})", callee.emit(), args_str)
            }
            TsExpr::Object(props) => {
                if props.is_empty() {
                    "{}".to_string()
                } else {
                    let parts: Vec<_> = props
                        .iter()
                        .map(|(k, v)| format!("{}: {}", quote_if_needed(k), v.emit()))
                        .collect();
                    format!("{{ {} }}", parts.join(", "))
                }
            }
            TsExpr::Member { object, prop } => {
                format!("{}.{}", object.emit(), prop)
            }
            TsExpr::Template(parts) => {
                let content: String = parts
                    .iter()
                    .map(|p| match p {
                        TemplatePart::Static(s) => s.replace('`', "\\`"),
                        TemplatePart::Dynamic(e) => format!("${{{}}}", e.emit()),
                    })
                    .collect();
                format!("`{content}`")
            }
            TsExpr::BinOp { left, op, right } => {
                format!("{} {} {}", left.emit(), op.emit(), right.emit())
            }
            TsExpr::New { callee, args } => {
                let args_str = args.iter().map(|a| a.emit()).collect::<Vec<_>>().join(", ");
                format!("new {}({})", callee.emit(), args_str)
            }
            TsExpr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                format!("{} ? {} : {}", cond.emit(), then_expr.emit(), else_expr.emit())
            }
            TsExpr::Array(items) => {
                let items_str = items.iter().map(|i| i.emit()).collect::<Vec<_>>().join(", ");
                format!("[{items_str}]")
            }
            TsExpr::Cast { expr, ty } => {
                format!("({} as {})", expr.emit(), ty.emit())
            }
            TsExpr::Raw(code) => code.clone(),
        }
    }
}

// =============================================================================
// Statements
// =============================================================================

impl Emit for TsStmt {
    fn emit(&self) -> String {
        self.emit_indented(0)
    }
}

impl TsStmt {
    /// Emit with specified indentation level (2 spaces per level)
    pub fn emit_indented(&self, indent: usize) -> String {
        let prefix = "  ".repeat(indent);
        match self {
            TsStmt::Const { name, ty, init } => {
                let ty_str = ty.as_ref().map(|t| format!(": {}", t.emit())).unwrap_or_default();
                format!("{}const {}{} = {};\n", prefix, name, ty_str, init.emit())
            }
            TsStmt::Expr(expr) => {
                format!("{}{};\n", prefix, expr.emit())
            }
            TsStmt::If { cond, then_body } => {
                let mut output = format!("{}if ({}) {{\n", prefix, cond.emit());
                for stmt in then_body {
                    output.push_str(&stmt.emit_indented(indent + 1));
                }
                output.push_str(&format!("{prefix}}}\n"));
                output
            }
            TsStmt::ForEach {
                collection,
                params,
                body,
            } => {
                let mut output = format!(
                    "{}{}.forEach(({}) => {{\n",
                    prefix,
                    collection.emit(),
                    params.join(", ")
                );
                for stmt in body {
                    output.push_str(&stmt.emit_indented(indent + 1));
                }
                output.push_str(&format!("{prefix}}});\n"));
                output
            }
        }
    }
}

/// Emit a block of statements at indentation level zero.
pub fn emit_block(stmts: &[TsStmt]) -> String {
    stmts.iter().map(|s| s.emit_indented(0)).collect()
}

// =============================================================================
// Tests
// =============================================================================

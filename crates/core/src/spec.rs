//! OpenAPI document structs for serde deserialization.
//!
//! Only the parts of an OpenAPI 3.x document the engine reads are typed here.
//! Schemas keep every unknown keyword in [`SchemaObject::extra`] so vendor
//! extensions (`x-brand`, `x-enumNames`, ...) survive a round trip.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One parsed OpenAPI document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub openapi: Option<String>,
    pub json_schema_dialect: Option<String>,
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    #[serde(default)]
    pub components: Components,
    /// The document as it was parsed, used to resolve pointers into any section.
    #[serde(skip)]
    pub(crate) raw: Value,
}

impl Document {
    /// Build a document from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let mut doc: Document = serde_json::from_value(value.clone())?;
        doc.raw = value;
        Ok(doc)
    }

    /// The document as it was parsed.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Replace a component schema, keeping the raw document in sync.
    pub(crate) fn set_schema(&mut self, name: &str, schema: Schema) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(&schema)?;
        if !self.raw.is_object() {
            self.raw = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(root) = &mut self.raw {
            let components = root
                .entry("components")
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if let Value::Object(components) = components {
                let schemas = components
                    .entry("schemas")
                    .or_insert_with(|| Value::Object(serde_json::Map::new()));
                if let Value::Object(schemas) = schemas {
                    schemas.insert(name.to_string(), value);
                }
            }
        }
        self.components.schemas.insert(name.to_string(), schema);
        Ok(())
    }

    /// Whether the document's dialect allows arrays without an item schema.
    ///
    /// True for OpenAPI 3.1 and later, or when a `jsonSchemaDialect` is declared.
    pub fn allows_untyped_arrays(&self) -> bool {
        if self.json_schema_dialect.is_some() {
            return true;
        }
        let Some(version) = &self.openapi else {
            return false;
        };
        let mut parts = version.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
        let major = parts.next().unwrap_or(0);
        let minor = parts.next().unwrap_or(0);
        major > 3 || (major == 3 && minor >= 1)
    }
}

/// Reusable components.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default)]
    pub schemas: IndexMap<String, Schema>,
    #[serde(default)]
    pub parameters: IndexMap<String, RefOr<Parameter>>,
    #[serde(default)]
    pub request_bodies: IndexMap<String, RefOr<RequestBody>>,
    #[serde(default)]
    pub responses: IndexMap<String, RefOr<Response>>,
}

/// Either a `$ref` pointer or an inline item.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    Ref {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Item(T),
}

/// A path item containing operations for different HTTP methods.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    pub get: Option<Operation>,
    pub put: Option<Operation>,
    pub post: Option<Operation>,
    pub delete: Option<Operation>,
    pub options: Option<Operation>,
    pub head: Option<Operation>,
    pub patch: Option<Operation>,
    pub trace: Option<Operation>,
    /// Path-level parameters shared by all operations.
    #[serde(default)]
    pub parameters: Vec<RefOr<Parameter>>,
}

/// An API operation (endpoint).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub parameters: Vec<RefOr<Parameter>>,
    pub request_body: Option<RefOr<RequestBody>>,
    #[serde(default)]
    pub responses: IndexMap<String, RefOr<Response>>,
}

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

/// A parameter (path, query, header, or cookie).
#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    pub description: Option<String>,
    pub schema: Option<Schema>,
    /// Parameters may describe their value through a media type map instead of `schema`.
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// A request body definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBody {
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// A response definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    pub description: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// Media type content (e.g., application/json).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaType {
    pub schema: Option<Schema>,
    /// Per-property encoding for multipart and url-encoded bodies.
    #[serde(default)]
    pub encoding: IndexMap<String, Encoding>,
}

/// Encoding of a single multipart/url-encoded property.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encoding {
    pub content_type: Option<String>,
    pub style: Option<String>,
    pub explode: Option<bool>,
}

/// A JSON Schema node: either a boolean schema or a keyword object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Schema {
    /// `true` accepts anything, `false` accepts nothing.
    Bool(bool),
    Object(Box<SchemaObject>),
}

impl Schema {
    /// Keyword object of this schema, if it is not a boolean schema.
    pub fn as_object(&self) -> Option<&SchemaObject> {
        match self {
            Schema::Object(obj) => Some(obj),
            Schema::Bool(_) => None,
        }
    }

    /// `$ref` pointer of this schema, if any.
    pub fn reference(&self) -> Option<&str> {
        self.as_object().and_then(|obj| obj.reference.as_deref())
    }

    /// Whether this schema (not following references) is marked read-only.
    pub fn is_read_only(&self) -> bool {
        self.as_object().is_some_and(|obj| obj.read_only == Some(true))
    }
}

impl From<SchemaObject> for Schema {
    fn from(obj: SchemaObject) -> Self {
        Schema::Object(Box::new(obj))
    }
}

/// JSON Schema keyword object used in OpenAPI.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaObject {
    /// The type of the schema (string, number, integer, boolean, object, array, null).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,

    /// Reference to another schema.
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Properties for object types, in declaration order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,

    /// Required property names for object types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// Item schema for array types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    /// Fixed-position item schemas for tuple arrays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_items: Option<Vec<Schema>>,

    /// Additional properties for object types (for Record/dict types).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,

    /// Enum values (can be strings, numbers, booleans, or null).
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    /// Constant value - schema matches only this exact value.
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,

    /// Intersection type (all of these schemas combined).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<Schema>>,

    /// Union type (exactly one of these schemas).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Schema>>,

    /// Union type (any of these schemas).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<Schema>>,

    /// Discriminator for polymorphic oneOf/anyOf schemas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,

    /// Format hint (e.g., date-time, binary).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// OpenAPI 3.0 nullable flag (3.1 uses type arrays instead).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_media_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Value>,

    /// Every other keyword, including vendor extensions.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Which combinator a schema uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    AllOf,
    OneOf,
    AnyOf,
}

impl Combinator {
    /// PascalCase label used when naming promoted members.
    pub fn label(self) -> &'static str {
        match self {
            Combinator::AllOf => "AllOf",
            Combinator::OneOf => "OneOf",
            Combinator::AnyOf => "AnyOf",
        }
    }
}

impl SchemaObject {
    /// All declared type names, in declaration order.
    pub fn types(&self) -> Vec<&str> {
        match &self.schema_type {
            Some(SchemaType::Single(t)) => vec![t.as_str()],
            Some(SchemaType::Multiple(types)) => types.iter().map(String::as_str).collect(),
            None => Vec::new(),
        }
    }

    /// Declared type names other than `null`.
    pub fn non_null_types(&self) -> Vec<&str> {
        self.types().into_iter().filter(|t| *t != "null").collect()
    }

    /// Check if this schema is nullable via the 3.0 flag or a type array containing `null`.
    pub fn is_nullable(&self) -> bool {
        if self.nullable == Some(true) {
            return true;
        }
        matches!(&self.schema_type, Some(SchemaType::Multiple(types)) if types.iter().any(|t| t == "null"))
    }

    /// The first combinator present, checked in allOf, oneOf, anyOf order.
    pub fn combinator(&self) -> Option<(Combinator, &[Schema])> {
        if let Some(members) = &self.all_of {
            return Some((Combinator::AllOf, members));
        }
        if let Some(members) = &self.one_of {
            return Some((Combinator::OneOf, members));
        }
        self.any_of
            .as_deref()
            .map(|members| (Combinator::AnyOf, members))
    }

    /// A copy of this schema with every combinator keyword removed.
    pub fn without_combinators(&self) -> SchemaObject {
        SchemaObject {
            all_of: None,
            one_of: None,
            any_of: None,
            ..self.clone()
        }
    }

    /// String value of a vendor extension keyword.
    pub fn extension_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// String-array value of a vendor extension keyword.
    pub fn extension_strings(&self, key: &str) -> Option<Vec<String>> {
        let items = self.extra.get(key)?.as_array()?;
        items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only == Some(true)
    }
}

/// Discriminator for polymorphic schemas (oneOf/anyOf).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    /// The property name that contains the discriminator value.
    pub property_name: String,
    /// Mapping from discriminator values to schema refs.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mapping: IndexMap<String, String>,
    /// Variants mistakenly nested inside the discriminator object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Schema>>,
}

/// Schema type can be a single type or an array of types (for nullable).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schema_keywords() {
        let schema: Schema = serde_json::from_str(
            r##"{
                "type": ["string", "null"],
                "enum": ["a", "b"],
                "x-brand": "UserId",
                "x-enumNames": ["A", "B"]
            }"##,
        )
        .unwrap();

        let obj = schema.as_object().unwrap();
        assert!(obj.is_nullable());
        assert_eq!(obj.non_null_types(), vec!["string"]);
        assert_eq!(obj.extension_str("x-brand"), Some("UserId"));
        assert_eq!(
            obj.extension_strings("x-enumNames"),
            Some(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_boolean_schema_and_additional_properties() {
        let schema: Schema = serde_json::from_str(
            r##"{"type": "object", "additionalProperties": false, "properties": {"a": true}}"##,
        )
        .unwrap();
        let obj = schema.as_object().unwrap();
        assert_eq!(
            obj.additional_properties.as_deref(),
            Some(&Schema::Bool(false))
        );
        assert_eq!(obj.properties.get("a"), Some(&Schema::Bool(true)));
    }

    #[test]
    fn test_schema_round_trip_keeps_extensions() {
        let json = serde_json::json!({
            "type": "string",
            "x-enum-descriptions": ["first"],
            "enum": ["a"]
        });
        let schema: Schema = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(serde_json::to_value(&schema).unwrap(), json);
    }

    #[test]
    fn test_parameter_ref_or_item() {
        let params: Vec<RefOr<Parameter>> = serde_json::from_str(
            r##"[
                {"$ref": "#/components/parameters/Limit"},
                {"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}
            ]"##,
        )
        .unwrap();
        assert!(matches!(&params[0], RefOr::Ref { reference } if reference == "#/components/parameters/Limit"));
        assert!(matches!(&params[1], RefOr::Item(p) if p.location == ParameterLocation::Path));
    }

    #[test]
    fn test_allows_untyped_arrays() {
        let doc = Document::from_value(serde_json::json!({"openapi": "3.1.0"})).unwrap();
        assert!(doc.allows_untyped_arrays());
        let doc = Document::from_value(serde_json::json!({"openapi": "3.0.3"})).unwrap();
        assert!(!doc.allows_untyped_arrays());
        let doc = Document::from_value(serde_json::json!({
            "openapi": "3.0.3",
            "jsonSchemaDialect": "https://json-schema.org/draft/2020-12/schema"
        }))
        .unwrap();
        assert!(doc.allows_untyped_arrays());
    }
}

//! Per-run state and the resolution context threaded through every call.

use std::collections::HashMap;

use tracing::warn;

use crate::brand::BrandRegistry;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::policy::OutputPolicy;
use crate::resolver::ResolvedRef;
use crate::spec::Document;
use crate::value::CompiledValue;
use crate::workspace::Workspace;

/// Memoization key for compiled values.
///
/// Equality is structural: the schema is keyed by its serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ValueKey {
    pub schema: String,
    pub name: Option<String>,
    pub combined: bool,
    pub document: String,
    pub declaration: Option<String>,
}

/// Which documents define each component schema name.
#[derive(Debug, Default)]
pub(crate) struct ComponentIndex {
    documents: HashMap<String, Vec<String>>,
}

impl ComponentIndex {
    /// Index converted component names of every document, root first.
    pub fn build(workspace: &Workspace, policy: &OutputPolicy) -> Self {
        let mut documents: HashMap<String, Vec<String>> = HashMap::new();
        for (key, doc) in workspace.documents() {
            for name in doc.components.schemas.keys() {
                let entry = documents.entry(policy.type_name(name)).or_default();
                if !entry.iter().any(|d| d == key) {
                    entry.push(key.to_string());
                }
            }
        }
        Self { documents }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.documents.contains_key(name)
    }

    /// The document whose declaration keeps the plain name when several define it.
    pub fn keeper(&self, name: &str) -> Option<&str> {
        self.documents
            .get(name)
            .and_then(|docs| docs.first())
            .map(String::as_str)
    }

    /// Whether more than one document defines `name`.
    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.documents.get(name).is_some_and(|docs| docs.len() > 1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }
}

/// State owned by exactly one generation run.
#[derive(Debug, Default)]
pub struct RunState {
    pub(crate) values: HashMap<ValueKey, CompiledValue>,
    pub(crate) refs: HashMap<(String, String), ResolvedRef>,
    /// Whether each reference key reaches a read-only property
    pub(crate) readonly: HashMap<String, bool>,
    pub(crate) components: ComponentIndex,
    pub brands: BrandRegistry,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunState {
    /// Create the state for a run over `workspace`.
    ///
    /// The brand registry is seeded with every component name so a brand can
    /// never take the name of a declaration.
    pub fn new(workspace: &Workspace, policy: &OutputPolicy) -> Self {
        let components = ComponentIndex::build(workspace, policy);
        let mut brands = BrandRegistry::new();
        for name in components.names() {
            brands.reserve(name);
        }
        Self {
            components,
            brands,
            ..Self::default()
        }
    }

    /// Record a non-fatal finding and log it.
    pub fn diagnose(
        &mut self,
        kind: DiagnosticKind,
        name: impl Into<String>,
        document: impl Into<String>,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            kind,
            name: name.into(),
            document: document.into(),
            message: message.into(),
        };
        warn!(
            kind = ?diagnostic.kind,
            name = %diagnostic.name,
            document = %diagnostic.document,
            "{}",
            diagnostic.message
        );
        self.diagnostics.push(diagnostic);
    }
}

/// Resolution context passed by reference through every compile call.
#[derive(Debug)]
pub struct Context<'a> {
    pub workspace: &'a Workspace,
    pub policy: &'a OutputPolicy,
    pub state: &'a mut RunState,
    /// Key of the document the schema being compiled lives in
    pub document: String,
    /// References currently being expanded, innermost last
    pub ancestors: Vec<String>,
    /// Name of the top-level declaration being compiled
    pub declaration: Option<String>,
}

impl<'a> Context<'a> {
    pub fn new(
        workspace: &'a Workspace,
        policy: &'a OutputPolicy,
        state: &'a mut RunState,
        document: impl Into<String>,
    ) -> Self {
        Self {
            workspace,
            policy,
            state,
            document: document.into(),
            ancestors: Vec::new(),
            declaration: None,
        }
    }

    /// The document currently being compiled.
    pub fn current_document(&self) -> Option<&'a Document> {
        self.workspace.document(&self.document)
    }

    /// Run `f` with `document` as the current document, restoring it afterwards.
    pub fn in_document<T>(&mut self, document: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        if document == self.document {
            return f(self);
        }
        let previous = std::mem::replace(&mut self.document, document.to_string());
        let result = f(self);
        self.document = previous;
        result
    }

    /// Run `f` with `reference` pushed onto the ancestor stack.
    pub fn with_ancestor<T>(&mut self, reference: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.ancestors.push(reference.to_string());
        let result = f(self);
        self.ancestors.pop();
        result
    }

    pub fn is_ancestor(&self, reference: &str) -> bool {
        self.ancestors.iter().any(|a| a == reference)
    }

    /// Whether `name` is a component declaration name anywhere in the workspace.
    pub fn is_component_name(&self, name: &str) -> bool {
        self.state.components.contains(name)
    }
}


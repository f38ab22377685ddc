//! Declaration de-duplication and dependency ordering.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::context::RunState;
use crate::error::{DiagnosticKind, GenerationError};
use crate::value::Declaration;

/// Keep the first declaration of every name.
///
/// A later declaration with the same name and body is dropped silently. One
/// with a different body is dropped with a diagnostic, or fails the run when
/// `strict` is set.
pub fn dedupe_declarations(
    declarations: Vec<Declaration>,
    strict: bool,
    state: &mut RunState,
) -> Result<Vec<Declaration>, GenerationError> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Declaration> = Vec::with_capacity(declarations.len());

    for decl in declarations {
        let Some(&existing) = index.get(&decl.name) else {
            index.insert(decl.name.clone(), kept.len());
            kept.push(decl);
            continue;
        };
        if kept[existing].body == decl.body {
            trace!(name = %decl.name, "Dropped identical declaration.");
            continue;
        }
        if strict {
            return Err(GenerationError::DuplicateDeclaration {
                name: decl.name,
                document: decl.document,
            });
        }
        let message = format!(
            "Declaration '{}' from '{}' differs from the one already emitted from '{}'; keeping the first",
            decl.name, decl.document, kept[existing].document
        );
        state.diagnose(
            DiagnosticKind::DuplicateDeclaration,
            decl.name,
            decl.document,
            message,
        );
    }
    Ok(kept)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Order declarations so each comes after the declarations it depends on.
///
/// Depth-first over the input order. A dependency cycle is broken where the
/// traversal re-enters it, so cyclic groups come out in visit order. Every
/// declaration appears exactly once; dependencies on unknown names are ignored.
pub fn sort_declarations(declarations: Vec<Declaration>) -> Vec<Declaration> {
    let index: HashMap<&str, usize> = declarations
        .iter()
        .enumerate()
        .map(|(i, d)| (d.name.as_str(), i))
        .collect();
    let mut marks = vec![Mark::Unvisited; declarations.len()];
    let mut order = Vec::with_capacity(declarations.len());

    for start in 0..declarations.len() {
        visit(start, &declarations, &index, &mut marks, &mut order);
    }
    debug!(declarations = order.len(), "Sorted declarations.");

    let mut slots: Vec<Option<Declaration>> = declarations.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots.get_mut(i).and_then(Option::take))
        .collect()
}

fn visit(
    node: usize,
    declarations: &[Declaration],
    index: &HashMap<&str, usize>,
    marks: &mut [Mark],
    order: &mut Vec<usize>,
) {
    if marks[node] != Mark::Unvisited {
        return;
    }
    marks[node] = Mark::Visiting;
    for dep in &declarations[node].dependencies {
        if let Some(&next) = index.get(dep.as_str()) {
            visit(next, declarations, index, marks, order);
        }
    }
    marks[node] = Mark::Done;
    order.push(node);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::value::ImportDescriptor;

    fn decl(name: &str, deps: &[&str]) -> Declaration {
        Declaration::new(name, format!("export type {name} = unknown;\n"), "api.json").with_imports(
            deps.iter()
                .map(|d| ImportDescriptor::new(*d, "api.json"))
                .collect(),
        )
    }

    fn names(decls: &[Declaration]) -> Vec<&str> {
        decls.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let sorted = sort_declarations(vec![
            decl("Order", &["Pet", "Customer"]),
            decl("Pet", &["Tag"]),
            decl("Tag", &[]),
            decl("Customer", &[]),
        ]);
        assert_eq!(names(&sorted), vec!["Tag", "Pet", "Customer", "Order"]);
    }

    #[test]
    fn test_cycle_emits_each_once() {
        let sorted = sort_declarations(vec![
            decl("A", &["B"]),
            decl("B", &["C"]),
            decl("C", &["A"]),
            decl("D", &["Missing"]),
        ]);
        assert_eq!(names(&sorted), vec!["C", "B", "A", "D"]);
    }

    #[test]
    fn test_dedupe_identical_is_silent() {
        let mut state = RunState::default();
        let kept = dedupe_declarations(vec![decl("A", &[]), decl("A", &[])], false, &mut state).unwrap();
        assert_eq!(kept.len(), 1);
        assert!(state.diagnostics.is_empty());
    }

    #[test]
    fn test_dedupe_conflicting_bodies() {
        let other = Declaration::new("A", "export type A = string;\n", "other.json");

        let mut state = RunState::default();
        let kept =
            dedupe_declarations(vec![decl("A", &[]), other.clone()], false, &mut state).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].document, "api.json");
        assert_eq!(state.diagnostics[0].kind, DiagnosticKind::DuplicateDeclaration);

        let mut state = RunState::default();
        let err = dedupe_declarations(vec![decl("A", &[]), other], true, &mut state).unwrap_err();
        assert!(matches!(err, GenerationError::DuplicateDeclaration { ref document, .. } if document == "other.json"));
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let mut state = RunState::default();
        let input = vec![decl("A", &[]), decl("B", &["A"]), decl("A", &[])];
        let once = dedupe_declarations(input, false, &mut state).unwrap();
        let twice = dedupe_declarations(once.clone(), false, &mut state).unwrap();
        assert_eq!(once, twice);
    }
}

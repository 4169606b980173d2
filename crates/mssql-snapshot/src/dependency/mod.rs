//! Foreign-key dependency ordering of tables.
//!
//! Tables are ordered by a depth-first post-order walk so that every
//! referenced table precedes the tables that reference it. A back-edge to a
//! table still being visited closes a cycle; that edge is skipped and the
//! walk continues, so circular foreign keys degrade the ordering instead of
//! aborting it.

use std::collections::{HashMap, HashSet};

use tracing::debug;

/// Table name to the tables it references, both as `schema.table`.
pub type DependencyMap = HashMap<String, Vec<String>>;

/// Build the dependency map from `(dependent, referenced)` edges.
///
/// Only edges whose ends are both in `tables` are kept. Self-references and
/// duplicate edges are dropped.
pub fn build_dependency_map(tables: &[String], edges: &[(String, String)]) -> DependencyMap {
    let known: HashSet<&str> = tables.iter().map(String::as_str).collect();
    let mut map = DependencyMap::new();

    for (dependent, referenced) in edges {
        if dependent == referenced
            || !known.contains(dependent.as_str())
            || !known.contains(referenced.as_str())
        {
            continue;
        }
        let deps = map.entry(dependent.clone()).or_default();
        if !deps.contains(referenced) {
            deps.push(referenced.clone());
        }
    }

    map
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Order `tables` so referenced tables come before their dependents.
///
/// Every input table appears exactly once in the output. Tables are visited
/// in input order, and so are each table's dependencies, which makes the
/// result deterministic for a given input.
pub fn resolve_table_order(tables: &[String], dependencies: &DependencyMap) -> Vec<String> {
    let index: HashMap<&str, usize> = tables
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();
    let mut marks = vec![Mark::Unvisited; tables.len()];
    let mut order = Vec::with_capacity(tables.len());
    let no_deps: Vec<String> = Vec::new();

    for start in 0..tables.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }

        // Explicit stack of (table, next dependency to visit) instead of
        // recursion, so long reference chains cannot overflow the stack.
        marks[start] = Mark::InProgress;
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let deps = dependencies.get(&tables[node]).unwrap_or(&no_deps);

            if next < deps.len() {
                frame.1 += 1;
                let Some(&dep) = index.get(deps[next].as_str()) else {
                    continue;
                };
                match marks[dep] {
                    Mark::Unvisited => {
                        marks[dep] = Mark::InProgress;
                        stack.push((dep, 0));
                    }
                    Mark::InProgress => {
                        debug!(
                            "Circular foreign key {} -> {} skipped",
                            tables[node], tables[dep]
                        );
                    }
                    Mark::Done => {}
                }
            } else {
                marks[node] = Mark::Done;
                order.push(tables[node].clone());
                stack.pop();
            }
        }
    }

    order
}

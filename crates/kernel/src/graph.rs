//! Dependency ordering for registered subsystems.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use crate::error::KernelError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Visited,
}

/// Compute a bring-up order over `graph` (node -> declared dependencies).
///
/// Iterative depth-first search with explicit visiting/visited marks. Roots
/// are taken in map order and dependencies in declaration order, so the
/// result is deterministic for a given registration sequence. Nothing is
/// partially returned: on error the caller has no order at all.
pub(crate) fn topological_order<'a, I>(nodes: I) -> Result<Vec<String>, KernelError>
where
    I: IntoIterator<Item = (&'a str, &'a IndexSet<String>)>,
{
    let graph: IndexMap<&'a str, &'a IndexSet<String>> = nodes.into_iter().collect();
    let mut marks: HashMap<&'a str, Mark> = HashMap::with_capacity(graph.len());
    let mut order = Vec::with_capacity(graph.len());

    for &root in graph.keys() {
        if marks.contains_key(root) {
            continue;
        }
        marks.insert(root, Mark::Visiting);
        // Each frame is (node, index of the next dependency to visit).
        let mut stack: Vec<(&'a str, usize)> = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let (name, next) = *frame;
            let deps = graph.get(name).copied();
            let Some(dep) = deps.and_then(|d| d.get_index(next)) else {
                marks.insert(name, Mark::Visited);
                order.push(name.to_owned());
                stack.pop();
                continue;
            };
            frame.1 += 1;

            let Some((&dep, _)) = graph.get_key_value(dep.as_str()) else {
                return Err(KernelError::UnknownDependency {
                    system: name.to_owned(),
                    dependency: dep.clone(),
                });
            };
            match marks.get(dep) {
                Some(Mark::Visited) => {}
                Some(Mark::Visiting) => {
                    let start = stack.iter().position(|(n, _)| *n == dep).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|(n, _)| (*n).to_owned()).collect();
                    cycle.push(dep.to_owned());
                    return Err(KernelError::CircularDependency { cycle });
                }
                None => {
                    marks.insert(dep, Mark::Visiting);
                    stack.push((dep, 0));
                }
            }
        }
    }

    Ok(order)
}

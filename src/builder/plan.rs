//! Build-order planning.
//!
//! Greedy topological ordering over the variable-level dependency graph.
//! Variables not present in the graph (system paths, the already-installed
//! base when it is not being built) count as satisfied. The plan is total:
//! when no remaining module is buildable the rest is appended alphabetically
//! with a warning, so a dependency cycle degrades the order instead of
//! aborting the build.

use std::collections::{BTreeMap, BTreeSet};

use crate::introspect::Dependency;

/// Compute the build order for a set of modules.
///
/// `graph` maps each buildable variable name to its dependency record;
/// `build_first` seeds the front of the order regardless of edges (the base
/// module: everything implicitly needs it even when no descriptor says so);
/// `skip` names variables assumed up to date. The result is deterministic:
/// ties break alphabetically.
pub fn build_order(
    graph: &BTreeMap<String, Dependency>,
    build_first: &[String],
    skip: &[String],
) -> Vec<String> {
    let buildable: BTreeSet<&String> = graph
        .keys()
        .filter(|variable| !skip.contains(variable))
        .collect();

    // Only edges between buildable modules constrain the order.
    let mut remaining: BTreeMap<&String, BTreeSet<&String>> = graph
        .iter()
        .filter(|(variable, _)| buildable.contains(variable))
        .map(|(variable, dependency)| {
            let edges = dependency
                .dependencies
                .keys()
                .chain(dependency.missing_paths.keys())
                .filter(|needed| buildable.contains(needed) && *needed != variable)
                .collect();
            (variable, edges)
        })
        .collect();

    let mut order: Vec<String> = Vec::new();
    let mut done: BTreeSet<&String> = BTreeSet::new();

    for variable in build_first {
        if let Some((key, _)) = remaining.remove_entry(variable) {
            done.insert(key);
            order.push(variable.clone());
        }
    }

    while !remaining.is_empty() {
        let ready: Vec<&String> = remaining
            .iter()
            .filter(|(_, edges)| edges.iter().all(|needed| done.contains(needed)))
            .map(|(variable, _)| *variable)
            .collect();

        if ready.is_empty() {
            let stalled: Vec<&String> = remaining.keys().copied().collect();
            tracing::warn!(
                "Unable to order remaining modules (dependency cycle?): {:?}",
                stalled
            );
            for variable in stalled {
                order.push(variable.clone());
            }
            break;
        }

        for variable in ready {
            remaining.remove(variable);
            done.insert(variable);
            order.push(variable.clone());
        }
    }

    order
}

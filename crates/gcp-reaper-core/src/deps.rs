//! Dependency-aware shutdown ordering
//!
//! A kind may only be shut down once every kind it depends on has no
//! remaining instances, so kinds are processed in topological order of the
//! declared dependency graph. Cycles and dependencies on unregistered kinds
//! are configuration errors and fail the run before any mutation happens.

use std::collections::BTreeMap;

use crate::error::RunError;
use crate::resource::Registry;

/// Topological shutdown order over the registry's dependency graph.
///
/// Kahn's algorithm with name-ordered tie-breaking, so the order is
/// deterministic for a given kind set.
pub fn resolve_order(registry: &Registry) -> Result<Vec<&'static str>, RunError> {
    // dependency -> dependents, plus per-kind count of unmet dependencies
    let mut dependents: BTreeMap<&'static str, Vec<&'static str>> = BTreeMap::new();
    let mut unmet: BTreeMap<&'static str, usize> = BTreeMap::new();

    for resource in registry.iter() {
        let name = resource.name();
        unmet.entry(name).or_insert(0);
        for &dep in resource.dependencies() {
            if registry.get(dep).is_none() {
                return Err(RunError::UnknownDependency {
                    kind: name.into(),
                    dependency: dep.into(),
                });
            }
            dependents.entry(dep).or_default().push(name);
            *unmet.entry(name).or_insert(0) += 1;
        }
    }

    // BTreeMap iteration keeps the ready set name-ordered
    let mut order = Vec::with_capacity(unmet.len());
    loop {
        let Some(next) = unmet
            .iter()
            .find(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
        else {
            break;
        };
        unmet.remove(next);
        order.push(next);
        for &dependent in dependents.get(next).into_iter().flatten() {
            if let Some(count) = unmet.get_mut(dependent) {
                *count -= 1;
            }
        }
    }

    if !unmet.is_empty() {
        // everything left participates in (or depends on) a cycle
        return Err(RunError::DependencyCycle {
            kinds: unmet.keys().map(|name| (*name).to_string()).collect(),
        });
    }

    Ok(order)
}

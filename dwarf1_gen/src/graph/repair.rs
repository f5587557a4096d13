/* Sibling chain repair
 *
 * The encoder sometimes loses the link into a run of tags, leaving two tags
 * that both claim the same sibling. The second claimant ends a stray run;
 * walking back from it finds the run's first tag, and the first claimant is
 * re-pointed there so the run is spliced back into its chain.
 */

use crate::error::GraphError;
use dwarf1_types::{TagKind, TagStore};
use std::collections::HashMap;
use tracing::{debug, warn};

/* One re-pointed link */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relink {
    /* Tag whose sibling was changed */
    pub left_id: u32,
    /* First tag of the stray run, the new sibling */
    pub run_start_id: u32,
    /* Target both claimants pointed at */
    pub target_id: u32,
}

/* A unit that could not be repaired and must be skipped */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairFailure {
    pub unit_id: Option<u32>,
    pub error: GraphError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub relinked: Vec<Relink>,
    pub failures: Vec<RepairFailure>,
    pub terminated_units: usize,
    pub first_children: usize,
}

impl RepairReport {
    pub fn failed_unit(&self, unit_id: u32) -> Option<&GraphError> {
        self.failures
            .iter()
            .find(|failure| failure.unit_id == Some(unit_id))
            .map(|failure| &failure.error)
    }
}

/* The last unit's sibling points past the end of the section. Returns the
   number of units whose link was cleared. */
pub fn terminate_final_unit(store: &mut TagStore) -> usize {
    let dangling: Vec<usize> = store
        .iter()
        .enumerate()
        .filter(|(_, tag)| tag.kind == TagKind::CompileUnit)
        .filter(|(_, tag)| tag.sibling_id.is_some_and(|id| !store.contains(id)))
        .map(|(position, _)| position)
        .collect();

    for &position in &dangling {
        store[position].sibling_id = None;
    }
    dangling.len()
}

/* Sibling targets claimed by more than one tag, in store order */
fn ambiguous_targets(store: &TagStore) -> Vec<u32> {
    let mut claims: HashMap<u32, usize> = HashMap::new();
    for tag in store.iter().filter(|tag| !tag.is_end()) {
        if let Some(sibling) = tag.sibling_id {
            *claims.entry(sibling).or_default() += 1;
        }
    }

    store
        .iter()
        .filter(|tag| claims.get(&tag.id).is_some_and(|&count| count > 1))
        .map(|tag| tag.id)
        .collect()
}

/* Positions searched for the claimants of `target`: from the unit holding
   the target up to (not including) the target. A unit tag as target belongs
   to the boundary of the previous unit. */
fn search_range(store: &TagStore, target: usize) -> (Option<usize>, std::ops::Range<usize>) {
    let last_unit_before = |end: usize| {
        (0..end)
            .rev()
            .find(|&position| store[position].kind == TagKind::CompileUnit)
    };

    let unit = if store[target].kind == TagKind::CompileUnit {
        last_unit_before(target)
    } else {
        last_unit_before(target + 1)
    };
    let start = unit.unwrap_or(0);
    (unit, start..target)
}

fn repair_target(
    store: &mut TagStore,
    target_id: u32,
    range: std::ops::Range<usize>,
) -> Result<Relink, GraphError> {
    let claimants: Vec<usize> = range
        .clone()
        .filter(|&position| !store[position].is_end())
        .filter(|&position| store[position].sibling_id == Some(target_id))
        .collect();

    let [left, stray] = claimants[..] else {
        return Err(GraphError::MalformedChain {
            target_id,
            predecessors: claimants.len(),
        });
    };

    /* walk back to the first tag of the stray run */
    let mut run_start = stray;
    let mut steps = 0;
    loop {
        let current_id = store[run_start].id;
        let Some(previous) = range
            .clone()
            .find(|&position| store[position].sibling_id == Some(current_id))
        else {
            break;
        };
        steps += 1;
        if steps > range.len() {
            return Err(GraphError::StrayRunUnbounded {
                target_id,
                stray_id: store[stray].id,
            });
        }
        run_start = previous;
    }

    let left_id = store[left].id;
    let run_start_id = store[run_start].id;
    if run_start <= left {
        return Err(GraphError::BackwardSibling {
            tag_id: left_id,
            sibling_id: run_start_id,
        });
    }

    store[left].sibling_id = Some(run_start_id);
    debug!(
        "relinked 0x{:X} -> 0x{:X} (stray run before 0x{:X})",
        left_id, run_start_id, target_id
    );

    Ok(Relink {
        left_id,
        run_start_id,
        target_id,
    })
}

/* Splice every stray run back into its chain. Failures are per unit and are
   reported rather than guessed around. */
pub fn repair_stray_chains(store: &mut TagStore) -> RepairReport {
    let mut report = RepairReport::default();

    for target_id in ambiguous_targets(store) {
        let Some(target) = store.index_of(target_id) else {
            continue;
        };
        let (unit, range) = search_range(store, target);
        let unit_id = unit.map(|position| store[position].id);

        match repair_target(store, target_id, range) {
            Ok(relink) => report.relinked.push(relink),
            Err(error) => {
                warn!("cannot repair chain into 0x{:X}: {}", target_id, error);
                report.failures.push(RepairFailure { unit_id, error });
            }
        }
    }

    report
}

/* Record the first child of every tag that is immediately followed by
   something other than its sibling. Returns the number of links set. */
pub fn link_first_children(store: &mut TagStore) -> usize {
    let mut linked = 0;
    for position in 1..store.len() {
        if store[position].is_end() {
            continue;
        }
        let current_id = store[position].id;
        let previous = &mut store[position - 1];
        if previous.sibling_id != Some(current_id) && previous.kind.can_have_children() {
            previous.first_child_id = Some(current_id);
            linked += 1;
        }
    }
    linked
}

//! Leadership decisions over a frozen snapshot of the instance set.
//!
//! Pure functions: no waiting, no polling. Callers take the snapshot after the
//! wait that is supposed to establish the state they query.


use std::collections::HashMap;

use tracing::debug;

use crate::ConsistencyViolation;
use crate::InstanceSnapshot;

/// Unique current leader: the live instance with the highest announced term.
///
/// # Errors
/// `ConsistencyViolation::SameTermLeaders` when two live instances announce the
/// same term.
pub fn find_leader(
    instances: &[InstanceSnapshot]
) -> Result<Option<InstanceSnapshot>, ConsistencyViolation> {
    let mut claims: HashMap<u64, u32> = HashMap::new();
    let mut best: Option<&InstanceSnapshot> = None;

    for instance in instances.iter().filter(|i| !i.killed) {
        let Some(term) = instance.leader_of_term else {
            continue;
        };

        if let Some(holder) = claims.insert(term, instance.index) {
            return Err(ConsistencyViolation::SameTermLeaders {
                term,
                instances: vec![holder, instance.index],
            });
        }

        if best.map_or(true, |b| Some(term) > b.leader_of_term) {
            best = Some(instance);
        }
    }

    debug!(
        "find_leader: {:?}",
        best.map(|b| (b.index, b.leader_of_term))
    );
    Ok(best.cloned())
}

/// Live instances holding the maximum announced term.
///
/// Instances that led an earlier term and stepped down stay labelled, so they
/// are skipped here. Used at startup, where exactly one entry is expected.
///
/// # Errors
/// `ConsistencyViolation::SameTermLeaders` on any shared term, at the maximum
/// or below it.
pub fn find_leaders(
    instances: &[InstanceSnapshot]
) -> Result<Vec<InstanceSnapshot>, ConsistencyViolation> {
    let mut leaders: Vec<InstanceSnapshot> = instances
        .iter()
        .filter(|i| !i.killed && i.leader_of_term.is_some())
        .cloned()
        .collect();
    leaders.sort_by(|a, b| b.leader_of_term.cmp(&a.leader_of_term));

    if let Some(pair) = leaders
        .windows(2)
        .find(|pair| pair[0].leader_of_term == pair[1].leader_of_term)
    {
        return Err(ConsistencyViolation::SameTermLeaders {
            term: pair[0].leader_of_term.unwrap_or_default(),
            instances: leaders
                .iter()
                .filter(|l| l.leader_of_term == pair[0].leader_of_term)
                .map(|l| l.index)
                .collect(),
        });
    }

    let max_term = leaders.first().and_then(|l| l.leader_of_term);
    leaders.retain(|l| l.leader_of_term == max_term);
    Ok(leaders)
}

/// A replacement leader must hold a strictly higher term than the one it replaced.
pub fn ensure_term_advanced(
    previous: u64,
    current: u64,
) -> Result<(), ConsistencyViolation> {
    if current > previous {
        Ok(())
    } else {
        Err(ConsistencyViolation::TermNotIncreased { previous, current })
    }
}

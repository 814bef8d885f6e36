//! Coalition read-out: are enough power centers lined up for or against the
//! player?

use serde::{Deserialize, Serialize};

use crate::{Constants, PowerCenterId, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "members", rename_all = "snake_case")]
pub enum CoalitionStatus {
    AgainstYou(Vec<PowerCenterId>),
    Strong(Vec<PowerCenterId>),
    Balanced,
}

impl std::fmt::Display for CoalitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let join = |ids: &[PowerCenterId]| {
            ids.iter()
                .map(PowerCenterId::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            CoalitionStatus::AgainstYou(ids) => write!(f, "Coalition against you: {}", join(ids)),
            CoalitionStatus::Strong(ids) => write!(f, "Strong coalition: {}", join(ids)),
            CoalitionStatus::Balanced => f.write_str("Political balance maintained"),
        }
    }
}

/// A hostile bloc takes precedence over a friendly one.
pub fn assess_coalition(snapshot: &Snapshot, constants: &Constants) -> CoalitionStatus {
    let hostile: Vec<PowerCenterId> = snapshot
        .power
        .iter()
        .filter(|(_, value)| **value < constants.coalition_hostile_below)
        .map(|(id, _)| id.clone())
        .collect();
    if hostile.len() >= constants.coalition_min_members {
        return CoalitionStatus::AgainstYou(hostile);
    }

    let allies: Vec<PowerCenterId> = snapshot
        .power
        .iter()
        .filter(|(_, value)| **value > constants.coalition_allied_above)
        .map(|(id, _)| id.clone())
        .collect();
    if allies.len() >= constants.coalition_min_members {
        return CoalitionStatus::Strong(allies);
    }

    CoalitionStatus::Balanced
}

//! Map pools: named, ordered sets of map identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a map pool.
pub type MapPoolId = Uuid;

/// A named, ordered map list. Veto-bearing tournaments require their pool to
/// hold exactly seven maps, checked when a tournament adopts the pool; the
/// tournament then snapshots the maps, so later pool edits do not reach it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapPool {
    pub id: MapPoolId,
    pub name: String,
    pub maps: Vec<String>,
    pub is_default: bool,
    pub enabled: bool,
}

impl MapPool {
    pub fn new(name: impl Into<String>, maps: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            maps,
            is_default: false,
            enabled: true,
        }
    }
}

/// The seven-map Active Duty pool seeded as the default.
pub fn active_duty_maps() -> Vec<String> {
    [
        "de_ancient",
        "de_anubis",
        "de_dust2",
        "de_inferno",
        "de_mirage",
        "de_nuke",
        "de_train",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

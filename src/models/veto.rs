//! Map veto: the ban/pick sequence teams perform to arrive at the map list.

use crate::models::game_match::Side;
use crate::models::tournament::OrchestratorError;
use serde::{Deserialize, Serialize};

/// Maps a veto pool must contain: six veto steps plus the decider.
pub const VETO_POOL_SIZE: usize = 7;

/// Series length for veto-bearing formats.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesFormat {
    #[default]
    Bo1,
    Bo3,
    Bo5,
}

impl SeriesFormat {
    /// Maps played in a full series.
    pub fn maps_in_series(self) -> usize {
        match self {
            SeriesFormat::Bo1 => 1,
            SeriesFormat::Bo3 => 3,
            SeriesFormat::Bo5 => 5,
        }
    }

    /// Map wins that take the series.
    pub fn maps_to_win(self) -> u32 {
        match self {
            SeriesFormat::Bo1 => 1,
            SeriesFormat::Bo3 => 2,
            SeriesFormat::Bo5 => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VetoAction {
    Ban,
    Pick,
}

/// One step of the veto sequence: which side acts and how.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct VetoStep {
    pub side: Side,
    pub action: VetoAction,
}

/// A recorded ban or pick.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct VetoRecord {
    pub side: Side,
    pub action: VetoAction,
    pub map: String,
}

/// Veto state for one match over a 7-map pool. All sequences remove six maps;
/// the last remaining map is the decider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VetoState {
    pub format: SeriesFormat,
    /// Maps still available to ban or pick.
    pub remaining: Vec<String>,
    pub steps: Vec<VetoStep>,
    pub history: Vec<VetoRecord>,
    /// Maps in play order (picks first, decider appended on completion).
    pub map_list: Vec<String>,
    pub completed: bool,
}

impl VetoState {
    pub fn new(format: SeriesFormat, pool: Vec<String>) -> Self {
        Self {
            format,
            remaining: pool,
            steps: veto_steps(format),
            history: Vec::new(),
            map_list: Vec::new(),
            completed: false,
        }
    }

    /// The step expected next, or None once the veto is complete.
    pub fn on_the_clock(&self) -> Option<VetoStep> {
        self.steps.get(self.history.len()).copied()
    }

    /// Apply one ban or pick. Validates turn order and map availability; the
    /// step itself decides whether the action is a ban or a pick.
    pub fn apply(&mut self, side: Side, map: &str) -> Result<(), OrchestratorError> {
        let step = match self.on_the_clock() {
            Some(s) => s,
            None => return Err(OrchestratorError::VetoComplete),
        };
        if step.side != side {
            return Err(OrchestratorError::NotYourTurn);
        }
        let idx = self
            .remaining
            .iter()
            .position(|m| m == map)
            .ok_or_else(|| OrchestratorError::MapNotAvailable(map.to_string()))?;
        let map = self.remaining.remove(idx);
        if step.action == VetoAction::Pick {
            self.map_list.push(map.clone());
        }
        self.history.push(VetoRecord {
            side,
            action: step.action,
            map,
        });
        if self.history.len() == self.steps.len() {
            if let Some(decider) = self.remaining.first().cloned() {
                self.map_list.push(decider);
            }
            self.completed = true;
        }
        Ok(())
    }
}

/// Ban/pick order per format, alternating sides starting with team 1.
fn veto_steps(format: SeriesFormat) -> Vec<VetoStep> {
    use VetoAction::*;
    let actions: &[VetoAction] = match format {
        SeriesFormat::Bo1 => &[Ban, Ban, Ban, Ban, Ban, Ban],
        SeriesFormat::Bo3 => &[Ban, Ban, Pick, Pick, Ban, Ban],
        SeriesFormat::Bo5 => &[Ban, Ban, Pick, Pick, Pick, Pick],
    };
    actions
        .iter()
        .enumerate()
        .map(|(i, &action)| VetoStep {
            side: if i % 2 == 0 { Side::Team1 } else { Side::Team2 },
            action,
        })
        .collect()
}

//! ELO calculation templates: per-statistic weights on top of a base
//! win/loss update, with optional clamps on the total adjustment.

use crate::models::game_match::PlayerMatchStats;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a rating template.
pub type TemplateId = Uuid;

/// Name of the immutable system default template.
pub const SYSTEM_TEMPLATE_NAME: &str = "pure-win-loss";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EloTemplate {
    pub id: TemplateId,
    pub name: String,
    pub k_factor: f64,
    pub kills_weight: f64,
    pub deaths_weight: f64,
    pub assists_weight: f64,
    pub mvps_weight: f64,
    /// Clamps on the total per-player delta (base + weighted stats).
    pub min_adjustment: Option<f64>,
    pub max_adjustment: Option<f64>,
    /// The seeded default; cannot be edited or deleted.
    pub is_system: bool,
}

impl EloTemplate {
    pub fn new(name: impl Into<String>, k_factor: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            k_factor,
            kills_weight: 0.0,
            deaths_weight: 0.0,
            assists_weight: 0.0,
            mvps_weight: 0.0,
            min_adjustment: None,
            max_adjustment: None,
            is_system: false,
        }
    }

    /// The immutable `pure-win-loss` default: base update only, no clamps.
    pub fn pure_win_loss() -> Self {
        let mut t = Self::new(SYSTEM_TEMPLATE_NAME, 32.0);
        t.is_system = true;
        t
    }

    /// Weighted per-statistic contribution for one player.
    pub fn stat_adjustment(&self, stats: &PlayerMatchStats) -> f64 {
        f64::from(stats.kills) * self.kills_weight
            + f64::from(stats.deaths) * self.deaths_weight
            + f64::from(stats.assists) * self.assists_weight
            + f64::from(stats.mvps) * self.mvps_weight
    }

    /// Apply the min/max clamps to a total delta.
    pub fn clamp(&self, delta: f64) -> f64 {
        let mut d = delta;
        if let Some(max) = self.max_adjustment {
            d = d.min(max);
        }
        if let Some(min) = self.min_adjustment {
            d = d.max(min);
        }
        d
    }
}

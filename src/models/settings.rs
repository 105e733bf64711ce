//! Application settings and the field-by-field update validation.
//!
//! Every field of a settings update is independently optional and
//! independently type-checked; nothing is stored unless the whole body
//! validates. The HTTP surface uses camelCase keys.

use crate::models::tournament::OrchestratorError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rating for players created or imported without an explicit value,
/// restored when `defaultPlayerElo` is set to null.
pub const DEFAULT_PLAYER_ELO: i64 = 1000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub webhook_url: Option<String>,
    pub steam_api_key: Option<String>,
    pub default_player_elo: i64,
    pub simulate_matches: bool,
    pub matchzy_chat_prefix: Option<String>,
    pub matchzy_admin_chat_prefix: Option<String>,
    pub matchzy_knife_enabled_default: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            steam_api_key: None,
            default_player_elo: DEFAULT_PLAYER_ELO,
            simulate_matches: false,
            matchzy_chat_prefix: None,
            matchzy_admin_chat_prefix: None,
            matchzy_knife_enabled_default: true,
        }
    }
}

impl AppSettings {
    /// Apply a partial update from a raw JSON body.
    ///
    /// Fractional `defaultPlayerElo` values are rounded; `null` clears the
    /// nullable fields and restores the default for the scalar ones.
    /// `simulateMatches` is silently ignored when running in production.
    pub fn apply_update(&mut self, body: &Value, production: bool) -> Result<(), OrchestratorError> {
        let obj = body.as_object().ok_or_else(|| {
            OrchestratorError::Validation("request body must be an object".to_string())
        })?;

        // Validate every present field before storing anything.
        let webhook_url = optional_string(obj, "webhookUrl")?;
        let steam_api_key = optional_string(obj, "steamApiKey")?;
        let default_player_elo = optional_number(obj, "defaultPlayerElo")?;
        let simulate_matches = optional_bool(obj, "simulateMatches")?;
        let chat_prefix = optional_string(obj, "matchzyChatPrefix")?;
        let admin_chat_prefix = optional_string(obj, "matchzyAdminChatPrefix")?;
        let knife_default = optional_bool(obj, "matchzyKnifeEnabledDefault")?;

        if let Some(v) = webhook_url {
            self.webhook_url = v;
        }
        if let Some(v) = steam_api_key {
            self.steam_api_key = v;
        }
        if let Some(v) = default_player_elo {
            self.default_player_elo = match v {
                Some(n) => n.round() as i64,
                None => DEFAULT_PLAYER_ELO,
            };
        }
        if let Some(v) = simulate_matches {
            if !production {
                self.simulate_matches = v.unwrap_or(false);
            }
        }
        if let Some(v) = chat_prefix {
            self.matchzy_chat_prefix = v;
        }
        if let Some(v) = admin_chat_prefix {
            self.matchzy_admin_chat_prefix = v;
        }
        if let Some(v) = knife_default {
            self.matchzy_knife_enabled_default = v.unwrap_or(true);
        }
        Ok(())
    }
}

/// Outer `None` = field absent; inner `None` = explicit null.
fn optional_string(
    obj: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<Option<String>>, OrchestratorError> {
    match obj.get(key) {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(Value::String(s)) => Ok(Some(Some(s.clone()))),
        Some(_) => Err(OrchestratorError::Validation(format!(
            "{key} must be a string or null"
        ))),
    }
}

fn optional_number(
    obj: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<Option<f64>>, OrchestratorError> {
    match obj.get(key) {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) => Ok(Some(Some(f))),
            None => Err(OrchestratorError::Validation(format!(
                "{key} must be a number or null"
            ))),
        },
        Some(_) => Err(OrchestratorError::Validation(format!(
            "{key} must be a number or null"
        ))),
    }
}

fn optional_bool(
    obj: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<Option<bool>>, OrchestratorError> {
    match obj.get(key) {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(Value::Bool(b)) => Ok(Some(Some(*b))),
        Some(_) => Err(OrchestratorError::Validation(format!(
            "{key} must be a boolean or null"
        ))),
    }
}

//! In-memory application store: entity collections and their CRUD rules.
//!
//! Everything the orchestrator knows lives here. The web binary wraps an
//! [`App`] in a `RwLock`; nothing in this module is aware of HTTP.

use crate::models::{
    active_duty_maps, is_valid_steam64, AppSettings, EloTemplate, GameServer, MapPool, MapPoolId,
    MatchId, OrchestratorError, Player, PlayerId, SeriesFormat, ServerId, Team, TeamId, TemplateId,
    Tournament, TournamentId, TournamentStatus, TournamentType, VETO_POOL_SIZE,
};
use std::collections::{HashMap, HashSet};

/// Setup-phase edits to a tournament. Absent fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct TournamentUpdate {
    pub name: Option<String>,
    pub kind: Option<TournamentType>,
    pub format: Option<SeriesFormat>,
    pub map_pool_id: Option<MapPoolId>,
    pub team_size: Option<u32>,
    pub elo_template_id: Option<Option<TemplateId>>,
}

/// The whole application state.
pub struct App {
    /// True when running with `APP_ENV=production`.
    pub production: bool,
    pub settings: AppSettings,
    pub players: HashMap<PlayerId, Player>,
    pub teams: HashMap<TeamId, Team>,
    pub servers: HashMap<ServerId, GameServer>,
    pub map_pools: HashMap<MapPoolId, MapPool>,
    pub elo_templates: HashMap<TemplateId, EloTemplate>,
    pub tournaments: HashMap<TournamentId, Tournament>,
}

impl App {
    /// Fresh store with the built-in map pool and rating template seeded.
    pub fn new(production: bool) -> Self {
        let mut map_pools = HashMap::new();
        let mut pool = MapPool::new("Active Duty", active_duty_maps());
        pool.is_default = true;
        map_pools.insert(pool.id, pool);

        let mut elo_templates = HashMap::new();
        let template = EloTemplate::pure_win_loss();
        elo_templates.insert(template.id, template);

        Self {
            production,
            settings: AppSettings::default(),
            players: HashMap::new(),
            teams: HashMap::new(),
            servers: HashMap::new(),
            map_pools,
            elo_templates,
            tournaments: HashMap::new(),
        }
    }

    pub fn default_map_pool(&self) -> Option<&MapPool> {
        self.map_pools.values().find(|p| p.is_default)
    }

    pub fn system_template(&self) -> Option<&EloTemplate> {
        self.elo_templates.values().find(|t| t.is_system)
    }

    /// Id of the tournament owning the given match, if any.
    pub fn tournament_of_match(&self, match_id: MatchId) -> Option<TournamentId> {
        self.tournaments
            .values()
            .find(|t| t.matches.iter().any(|m| m.id == match_id))
            .map(|t| t.id)
    }

    // ---- players ----

    /// Create a player. The Steam id must be a valid, unused Steam64 id.
    pub fn create_player(
        &mut self,
        steam_id: &str,
        name: &str,
        avatar: Option<String>,
        starting_elo: Option<i64>,
    ) -> Result<&Player, OrchestratorError> {
        let steam_id = steam_id.trim();
        if !is_valid_steam64(steam_id) {
            return Err(OrchestratorError::InvalidSteamId(steam_id.to_string()));
        }
        if self.players.values().any(|p| p.steam_id == steam_id) {
            return Err(OrchestratorError::DuplicateSteamId(steam_id.to_string()));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(OrchestratorError::Validation(
                "name must not be empty".to_string(),
            ));
        }
        let elo = starting_elo.unwrap_or(self.settings.default_player_elo);
        let mut player = Player::new(steam_id, name, elo);
        player.avatar = avatar;
        let id = player.id;
        Ok(self.players.entry(id).or_insert(player))
    }

    /// Remove a player that is not on a team or in a tournament.
    pub fn delete_player(&mut self, id: PlayerId) -> Result<(), OrchestratorError> {
        if !self.players.contains_key(&id) {
            return Err(OrchestratorError::PlayerNotFound(id));
        }
        if self.teams.values().any(|t| t.players.contains(&id)) {
            return Err(OrchestratorError::Validation(
                "Player is on a team".to_string(),
            ));
        }
        let registered = self
            .tournaments
            .values()
            .any(|t| t.registered_players.contains(&id) && !t.is_finished());
        if registered {
            return Err(OrchestratorError::Validation(
                "Player is registered in an active tournament".to_string(),
            ));
        }
        self.players.remove(&id);
        Ok(())
    }

    // ---- teams ----

    /// Create a team. The name is unique (case-insensitive), the roster is
    /// non-empty, every player exists and appears only once.
    pub fn create_team(
        &mut self,
        name: &str,
        tag: &str,
        players: Vec<PlayerId>,
    ) -> Result<&Team, OrchestratorError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OrchestratorError::Validation(
                "name must not be empty".to_string(),
            ));
        }
        if self.teams.values().any(|t| t.name.eq_ignore_ascii_case(name)) {
            return Err(OrchestratorError::DuplicateName(name.to_string()));
        }
        if players.is_empty() {
            return Err(OrchestratorError::EmptyRoster);
        }
        let mut seen = HashSet::new();
        for pid in &players {
            let player = self
                .players
                .get(pid)
                .ok_or(OrchestratorError::PlayerNotFound(*pid))?;
            if !seen.insert(*pid) {
                return Err(OrchestratorError::DuplicateSteamId(player.steam_id.clone()));
            }
        }
        let team = Team::new(name, tag.trim(), players);
        let id = team.id;
        Ok(self.teams.entry(id).or_insert(team))
    }

    /// Remove a team that is not part of an unfinished tournament.
    pub fn delete_team(&mut self, id: TeamId) -> Result<(), OrchestratorError> {
        if !self.teams.contains_key(&id) {
            return Err(OrchestratorError::TeamNotFound(id));
        }
        let in_use = self
            .tournaments
            .values()
            .any(|t| t.team_ids.contains(&id) && !t.is_finished());
        if in_use {
            return Err(OrchestratorError::Validation(
                "Team is in an active tournament".to_string(),
            ));
        }
        self.teams.remove(&id);
        Ok(())
    }

    // ---- servers ----

    /// Register a game server. host:port must be unique.
    pub fn create_server(
        &mut self,
        name: &str,
        host: &str,
        port: u16,
        rcon_password: &str,
    ) -> Result<&GameServer, OrchestratorError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(OrchestratorError::Validation(
                "host must not be empty".to_string(),
            ));
        }
        let server = GameServer::new(name.trim(), host, port, rcon_password);
        if self.servers.values().any(|s| s.address() == server.address()) {
            return Err(OrchestratorError::DuplicateServerAddress(server.address()));
        }
        let id = server.id;
        Ok(self.servers.entry(id).or_insert(server))
    }

    /// Remove a server that has no match loaded.
    pub fn delete_server(&mut self, id: ServerId) -> Result<(), OrchestratorError> {
        let server = self
            .servers
            .get(&id)
            .ok_or(OrchestratorError::ServerNotFound(id))?;
        if server.current_match.is_some() {
            return Err(OrchestratorError::ServerBusy);
        }
        self.servers.remove(&id);
        Ok(())
    }

    // ---- map pools ----

    pub fn create_map_pool(
        &mut self,
        name: &str,
        maps: Vec<String>,
    ) -> Result<&MapPool, OrchestratorError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OrchestratorError::Validation(
                "name must not be empty".to_string(),
            ));
        }
        if self
            .map_pools
            .values()
            .any(|p| p.name.eq_ignore_ascii_case(name))
        {
            return Err(OrchestratorError::DuplicateName(name.to_string()));
        }
        let maps = clean_map_list(maps)?;
        let pool = MapPool::new(name, maps);
        let id = pool.id;
        Ok(self.map_pools.entry(id).or_insert(pool))
    }

    pub fn update_map_pool(
        &mut self,
        id: MapPoolId,
        name: Option<String>,
        maps: Option<Vec<String>>,
        enabled: Option<bool>,
    ) -> Result<&MapPool, OrchestratorError> {
        if !self.map_pools.contains_key(&id) {
            return Err(OrchestratorError::MapPoolNotFound(id));
        }
        if let Some(new_name) = &name {
            let new_name = new_name.trim();
            if new_name.is_empty() {
                return Err(OrchestratorError::Validation(
                    "name must not be empty".to_string(),
                ));
            }
            let taken = self
                .map_pools
                .values()
                .any(|p| p.id != id && p.name.eq_ignore_ascii_case(new_name));
            if taken {
                return Err(OrchestratorError::DuplicateName(new_name.to_string()));
            }
        }
        let maps = maps.map(clean_map_list).transpose()?;
        let pool = self
            .map_pools
            .get_mut(&id)
            .ok_or(OrchestratorError::MapPoolNotFound(id))?;
        if let Some(new_name) = name {
            pool.name = new_name.trim().to_string();
        }
        if let Some(new_maps) = maps {
            pool.maps = new_maps;
        }
        if let Some(flag) = enabled {
            pool.enabled = flag;
        }
        Ok(&*pool)
    }

    /// Remove a pool. The built-in default and pools referenced by
    /// unfinished tournaments stay.
    pub fn delete_map_pool(&mut self, id: MapPoolId) -> Result<(), OrchestratorError> {
        let pool = self
            .map_pools
            .get(&id)
            .ok_or(OrchestratorError::MapPoolNotFound(id))?;
        if pool.is_default {
            return Err(OrchestratorError::Validation(
                "The default map pool cannot be deleted".to_string(),
            ));
        }
        let in_use = self
            .tournaments
            .values()
            .any(|t| t.map_pool_id == id && !t.is_finished());
        if in_use {
            return Err(OrchestratorError::Validation(
                "Map pool is used by an active tournament".to_string(),
            ));
        }
        self.map_pools.remove(&id);
        Ok(())
    }

    // ---- rating templates ----

    /// Store a user-defined rating template. The `is_system` flag is
    /// reserved for the built-in template.
    pub fn create_elo_template(
        &mut self,
        mut template: EloTemplate,
    ) -> Result<&EloTemplate, OrchestratorError> {
        let name = template.name.trim().to_string();
        if name.is_empty() {
            return Err(OrchestratorError::Validation(
                "name must not be empty".to_string(),
            ));
        }
        if self
            .elo_templates
            .values()
            .any(|t| t.name.eq_ignore_ascii_case(&name))
        {
            return Err(OrchestratorError::DuplicateName(name));
        }
        if template.k_factor <= 0.0 {
            return Err(OrchestratorError::Validation(
                "kFactor must be positive".to_string(),
            ));
        }
        template.name = name;
        template.is_system = false;
        let id = template.id;
        Ok(self.elo_templates.entry(id).or_insert(template))
    }

    /// Replace a template's tunables. System templates are immutable.
    pub fn update_elo_template(
        &mut self,
        id: TemplateId,
        update: EloTemplate,
    ) -> Result<&EloTemplate, OrchestratorError> {
        let existing = self
            .elo_templates
            .get(&id)
            .ok_or(OrchestratorError::TemplateNotFound(id))?;
        if existing.is_system {
            return Err(OrchestratorError::TemplateImmutable);
        }
        let name = update.name.trim().to_string();
        if name.is_empty() {
            return Err(OrchestratorError::Validation(
                "name must not be empty".to_string(),
            ));
        }
        let taken = self
            .elo_templates
            .values()
            .any(|t| t.id != id && t.name.eq_ignore_ascii_case(&name));
        if taken {
            return Err(OrchestratorError::DuplicateName(name));
        }
        if update.k_factor <= 0.0 {
            return Err(OrchestratorError::Validation(
                "kFactor must be positive".to_string(),
            ));
        }
        let template = self
            .elo_templates
            .get_mut(&id)
            .ok_or(OrchestratorError::TemplateNotFound(id))?;
        template.name = name;
        template.k_factor = update.k_factor;
        template.kills_weight = update.kills_weight;
        template.deaths_weight = update.deaths_weight;
        template.assists_weight = update.assists_weight;
        template.mvps_weight = update.mvps_weight;
        template.min_adjustment = update.min_adjustment;
        template.max_adjustment = update.max_adjustment;
        Ok(&*template)
    }

    pub fn delete_elo_template(&mut self, id: TemplateId) -> Result<(), OrchestratorError> {
        let template = self
            .elo_templates
            .get(&id)
            .ok_or(OrchestratorError::TemplateNotFound(id))?;
        if template.is_system {
            return Err(OrchestratorError::TemplateImmutable);
        }
        let in_use = self
            .tournaments
            .values()
            .any(|t| t.elo_template_id == Some(id) && !t.is_finished());
        if in_use {
            return Err(OrchestratorError::Validation(
                "Rating template is used by an active tournament".to_string(),
            ));
        }
        self.elo_templates.remove(&id);
        Ok(())
    }

    // ---- tournaments ----

    /// Create a tournament with a snapshot of the chosen pool's maps.
    /// Veto formats need a full 7-map pool. The rating template defaults
    /// to the built-in one.
    pub fn create_tournament(
        &mut self,
        name: &str,
        kind: TournamentType,
        format: SeriesFormat,
        map_pool_id: Option<MapPoolId>,
        elo_template_id: Option<TemplateId>,
        team_size: Option<u32>,
    ) -> Result<&Tournament, OrchestratorError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OrchestratorError::Validation(
                "name must not be empty".to_string(),
            ));
        }
        if self
            .tournaments
            .values()
            .any(|t| t.name.eq_ignore_ascii_case(name))
        {
            return Err(OrchestratorError::DuplicateName(name.to_string()));
        }
        let pool = match map_pool_id {
            Some(id) => self
                .map_pools
                .get(&id)
                .ok_or(OrchestratorError::MapPoolNotFound(id))?,
            None => self.default_map_pool().ok_or_else(|| {
                OrchestratorError::Validation("no default map pool configured".to_string())
            })?,
        };
        if kind.uses_veto() && pool.maps.len() != VETO_POOL_SIZE {
            return Err(OrchestratorError::WrongMapCount {
                required: VETO_POOL_SIZE,
                actual: pool.maps.len(),
            });
        }
        let template_id = match elo_template_id {
            Some(id) => {
                if !self.elo_templates.contains_key(&id) {
                    return Err(OrchestratorError::TemplateNotFound(id));
                }
                Some(id)
            }
            None => self.system_template().map(|t| t.id),
        };
        let team_size = team_size.unwrap_or(crate::models::DEFAULT_TEAM_SIZE);
        if team_size == 0 {
            return Err(OrchestratorError::Validation(
                "teamSize must be at least 1".to_string(),
            ));
        }
        let mut tournament = Tournament::new(name, kind, format, pool.id, pool.maps.clone());
        tournament.elo_template_id = template_id;
        tournament.team_size = team_size;
        if kind == TournamentType::Shuffle {
            tournament.expected_players_total = team_size * 2;
        }
        let id = tournament.id;
        Ok(self.tournaments.entry(id).or_insert(tournament))
    }

    /// Edit a tournament still in setup.
    pub fn update_tournament(
        &mut self,
        id: TournamentId,
        update: TournamentUpdate,
    ) -> Result<&Tournament, OrchestratorError> {
        let current = self
            .tournaments
            .get(&id)
            .ok_or(OrchestratorError::TournamentNotFound(id))?;
        if current.status() != TournamentStatus::Setup {
            return Err(OrchestratorError::InvalidState);
        }
        if let Some(new_name) = &update.name {
            let new_name = new_name.trim();
            if new_name.is_empty() {
                return Err(OrchestratorError::Validation(
                    "name must not be empty".to_string(),
                ));
            }
            let taken = self
                .tournaments
                .values()
                .any(|t| t.id != id && t.name.eq_ignore_ascii_case(new_name));
            if taken {
                return Err(OrchestratorError::DuplicateName(new_name.to_string()));
            }
        }
        let kind = update.kind.unwrap_or(current.kind);
        let pool_snapshot = match update.map_pool_id {
            Some(pool_id) => {
                let pool = self
                    .map_pools
                    .get(&pool_id)
                    .ok_or(OrchestratorError::MapPoolNotFound(pool_id))?;
                Some((pool.id, pool.maps.clone()))
            }
            None => None,
        };
        let effective_maps = pool_snapshot
            .as_ref()
            .map(|(_, maps)| maps.len())
            .unwrap_or(current.maps.len());
        if kind.uses_veto() && effective_maps != VETO_POOL_SIZE {
            return Err(OrchestratorError::WrongMapCount {
                required: VETO_POOL_SIZE,
                actual: effective_maps,
            });
        }
        if let Some(Some(template_id)) = update.elo_template_id {
            if !self.elo_templates.contains_key(&template_id) {
                return Err(OrchestratorError::TemplateNotFound(template_id));
            }
        }
        if let Some(size) = update.team_size {
            if size == 0 {
                return Err(OrchestratorError::Validation(
                    "teamSize must be at least 1".to_string(),
                ));
            }
        }
        let tournament = self
            .tournaments
            .get_mut(&id)
            .ok_or(OrchestratorError::TournamentNotFound(id))?;
        if let Some(new_name) = update.name {
            tournament.name = new_name.trim().to_string();
        }
        tournament.kind = kind;
        if let Some(format) = update.format {
            tournament.format = format;
        }
        if let Some((pool_id, maps)) = pool_snapshot {
            tournament.map_pool_id = pool_id;
            tournament.maps = maps;
        }
        if let Some(size) = update.team_size {
            tournament.team_size = size;
        }
        if let Some(template) = update.elo_template_id {
            tournament.elo_template_id = template;
        }
        if tournament.kind == TournamentType::Shuffle {
            tournament.expected_players_total = tournament.team_size * 2;
            tournament.team_ids.clear();
        } else {
            tournament.expected_players_total = crate::models::DEFAULT_EXPECTED_PLAYERS;
            tournament.registered_players.clear();
        }
        Ok(&*tournament)
    }

    /// Delete a tournament, releasing any servers its matches still hold.
    pub fn delete_tournament(&mut self, id: TournamentId) -> Result<(), OrchestratorError> {
        let tournament = self
            .tournaments
            .get(&id)
            .ok_or(OrchestratorError::TournamentNotFound(id))?;
        let match_ids: HashSet<MatchId> = tournament.matches.iter().map(|m| m.id).collect();
        for server in self.servers.values_mut() {
            let holds = server
                .current_match
                .map(|mid| match_ids.contains(&mid))
                .unwrap_or(false);
            if holds {
                server.current_match = None;
            }
        }
        self.tournaments.remove(&id);
        Ok(())
    }

    /// Add a pre-formed team (team-based formats, setup only). Rosters may
    /// not overlap with teams already entered.
    pub fn add_team_to_tournament(
        &mut self,
        id: TournamentId,
        team_id: TeamId,
    ) -> Result<(), OrchestratorError> {
        let tournament = self
            .tournaments
            .get(&id)
            .ok_or(OrchestratorError::TournamentNotFound(id))?;
        if !tournament.kind.team_based() {
            return Err(OrchestratorError::Validation(
                "Shuffle tournaments take individual players, not teams".to_string(),
            ));
        }
        if tournament.status() != TournamentStatus::Setup {
            return Err(OrchestratorError::InvalidState);
        }
        let team = self
            .teams
            .get(&team_id)
            .ok_or(OrchestratorError::TeamNotFound(team_id))?;
        if tournament.team_ids.contains(&team_id) {
            return Err(OrchestratorError::DuplicateName(team.name.clone()));
        }
        for other_id in &tournament.team_ids {
            let Some(other) = self.teams.get(other_id) else {
                continue;
            };
            for pid in &team.players {
                if other.players.contains(pid) {
                    let steam = self
                        .players
                        .get(pid)
                        .map(|p| p.steam_id.clone())
                        .unwrap_or_default();
                    return Err(OrchestratorError::DuplicateSteamId(steam));
                }
            }
        }
        let tournament = self
            .tournaments
            .get_mut(&id)
            .ok_or(OrchestratorError::TournamentNotFound(id))?;
        tournament.team_ids.push(team_id);
        Ok(())
    }

    /// Drop a team from a tournament still in setup.
    pub fn remove_team_from_tournament(
        &mut self,
        id: TournamentId,
        team_id: TeamId,
    ) -> Result<(), OrchestratorError> {
        let tournament = self
            .tournaments
            .get_mut(&id)
            .ok_or(OrchestratorError::TournamentNotFound(id))?;
        if tournament.status() != TournamentStatus::Setup {
            return Err(OrchestratorError::InvalidState);
        }
        if !tournament.team_ids.contains(&team_id) {
            return Err(OrchestratorError::TeamNotFound(team_id));
        }
        tournament.team_ids.retain(|t| *t != team_id);
        Ok(())
    }

    /// Register an individual player with a shuffle tournament. Allowed
    /// between rounds; the next round picks up the change.
    pub fn register_player(
        &mut self,
        id: TournamentId,
        player_id: PlayerId,
    ) -> Result<(), OrchestratorError> {
        if !self.players.contains_key(&player_id) {
            return Err(OrchestratorError::PlayerNotFound(player_id));
        }
        let tournament = self
            .tournaments
            .get_mut(&id)
            .ok_or(OrchestratorError::TournamentNotFound(id))?;
        if tournament.kind != TournamentType::Shuffle {
            return Err(OrchestratorError::Validation(
                "Only shuffle tournaments register individual players".to_string(),
            ));
        }
        if tournament.is_finished() {
            return Err(OrchestratorError::InvalidState);
        }
        if tournament.registered_players.contains(&player_id) {
            return Err(OrchestratorError::Validation(
                "Player is already registered".to_string(),
            ));
        }
        tournament.registered_players.push(player_id);
        Ok(())
    }

    /// Unregister a player from a shuffle tournament still in setup.
    pub fn unregister_player(
        &mut self,
        id: TournamentId,
        player_id: PlayerId,
    ) -> Result<(), OrchestratorError> {
        let tournament = self
            .tournaments
            .get_mut(&id)
            .ok_or(OrchestratorError::TournamentNotFound(id))?;
        if tournament.status() != TournamentStatus::Setup {
            return Err(OrchestratorError::InvalidState);
        }
        if !tournament.registered_players.contains(&player_id) {
            return Err(OrchestratorError::PlayerNotFound(player_id));
        }
        tournament.registered_players.retain(|p| *p != player_id);
        Ok(())
    }
}

/// Trim map names and reject empty lists or blank entries.
fn clean_map_list(maps: Vec<String>) -> Result<Vec<String>, OrchestratorError> {
    let maps: Vec<String> = maps.into_iter().map(|m| m.trim().to_string()).collect();
    if maps.is_empty() {
        return Err(OrchestratorError::Validation(
            "maps must not be empty".to_string(),
        ));
    }
    if maps.iter().any(|m| m.is_empty()) {
        return Err(OrchestratorError::Validation(
            "map names must not be empty".to_string(),
        ));
    }
    Ok(maps)
}

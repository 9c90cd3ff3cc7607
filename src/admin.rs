//! Role administration

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::constants::*;
use crate::error::{BanError, Result};
use crate::model::{PlayerId, Role};
use crate::panel::{page, parse, to_value, Panel};
use crate::resources::{is_permission, is_resource, resources};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RolesArgs {
    #[serde(default)]
    default_only: bool,
}

#[derive(Deserialize)]
struct IdArgs {
    id: u64,
}

#[derive(Deserialize)]
struct RoleInput {
    name: String,
    parent: Option<u64>,
    #[serde(default)]
    resources: Vec<ResourceInput>,
}

#[derive(Deserialize)]
struct ResourceInput {
    name: String,
    permissions: Vec<PermissionInput>,
}

#[derive(Deserialize)]
struct PermissionInput {
    name: String,
    allowed: bool,
}

#[derive(Deserialize)]
struct CreateArgs {
    input: RoleInput,
}

#[derive(Deserialize)]
struct UpdateArgs {
    id: u64,
    input: RoleInput,
}

#[derive(Deserialize)]
struct AssignArgs {
    players: Vec<PlayerId>,
    role: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignServerArgs {
    players: Vec<PlayerId>,
    role: u64,
    server_id: String,
}

#[derive(Deserialize)]
struct SetRolesArgs {
    player: PlayerId,
    input: SetRolesInput,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetRolesInput {
    #[serde(default)]
    roles: Vec<u64>,
    #[serde(default)]
    server_roles: Vec<ServerRoleInput>,
}

#[derive(Deserialize)]
struct ServerRoleInput {
    server: String,
    role: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPlayersArgs {
    email: Option<String>,
    role: Option<u64>,
    server_role: Option<u64>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl RoleInput {
    fn into_role(self, id: u64) -> Result<Role> {
        let name = self.name.trim();
        if name.is_empty() || name.chars().count() > MAX_ROLE_NAME_LEN {
            return Err(BanError::Invalid(format!("Name must be between 1 and {} characters", MAX_ROLE_NAME_LEN)));
        }
        let mut grants: BTreeMap<String, BTreeMap<String, bool>> = BTreeMap::new();
        for r in self.resources {
            if !is_resource(&r.name) {
                return Err(BanError::Invalid(format!("Invalid resource {}", r.name)));
            }
            for p in r.permissions {
                if !is_permission(&r.name, &p.name) {
                    return Err(BanError::Invalid(format!("Invalid permission {}:{}", r.name, p.name)));
                }
                grants.entry(r.name.clone()).or_default().insert(p.name, p.allowed);
            }
        }
        Ok(Role { id, name: name.to_string(), parent: self.parent, grants })
    }
}

impl Panel {
    fn require_role(&self, id: u64) -> Result<Role> {
        self.store().get_role(id)?.ok_or(BanError::RoleNotFound(id))
    }

    /// Global and per-server roles of one player
    fn player_roles_view(&self, player: &PlayerId) -> Result<Value> {
        let role_ref = |id: u64| -> Result<Value> {
            let name = self.store().get_role(id)?.map(|r| r.name);
            Ok(json!({ "id": id, "name": name }))
        };
        let roles = self
            .store()
            .player_roles(player)?
            .into_iter()
            .map(role_ref)
            .collect::<Result<Vec<_>>>()?;
        let mut server_roles = Vec::new();
        for sr in self.store().player_server_roles(player)? {
            let name = self.store().get_server(&sr.server)?.map(|s| s.name);
            server_roles.push(json!({
                "server": { "id": sr.server, "name": name },
                "role": role_ref(sr.role)?,
            }));
        }
        let email = self.store().get_account(player)?.and_then(|a| a.email);
        Ok(json!({ "id": player, "email": email, "roles": roles, "serverRoles": server_roles }))
    }

    pub(crate) fn roles(&self, args: Value) -> Result<Value> {
        let a: RolesArgs = parse(args)?;
        let roles: Vec<Role> = self
            .store()
            .list_roles()?
            .into_iter()
            .filter(|r| !a.default_only || r.id <= ROLE_ADMIN)
            .collect();
        to_value(roles)
    }

    pub(crate) fn role(&self, args: Value) -> Result<Value> {
        let IdArgs { id } = parse(args)?;
        to_value(self.require_role(id)?)
    }

    pub(crate) fn resources(&self) -> Result<Value> {
        to_value(resources())
    }

    pub(crate) fn create_role(&self, args: Value) -> Result<Value> {
        let CreateArgs { input } = parse(args)?;
        let role = input.into_role(0)?;
        let role = self.store().transact(|tx| tx.create_role(role))?;
        info!(id = role.id, name = %role.name, "role created");
        to_value(role)
    }

    pub(crate) fn update_role(&self, args: Value) -> Result<Value> {
        let UpdateArgs { id, input } = parse(args)?;
        self.require_role(id)?;
        let role = input.into_role(id)?;
        self.store().transact(|tx| tx.put_role(&role))?;
        info!(id, "role updated");
        to_value(role)
    }

    pub(crate) fn delete_role(&self, args: Value) -> Result<Value> {
        let IdArgs { id } = parse(args)?;
        if id <= ROLE_ADMIN {
            return Err(BanError::DefaultRole);
        }
        let role = self
            .store()
            .transact(|tx| tx.delete_role(id))?
            .ok_or(BanError::RoleNotFound(id))?;
        info!(id, "role deleted");
        to_value(role)
    }

    pub(crate) fn assign_role(&self, args: Value) -> Result<Value> {
        let a: AssignArgs = parse(args)?;
        let role = self.require_role(a.role)?;
        self.store().transact(|tx| {
            for p in &a.players {
                tx.assign_role(p, role.id)?;
            }
            Ok(())
        })?;
        info!(role = role.id, players = a.players.len(), "role assigned");
        to_value(role)
    }

    pub(crate) fn assign_server_role(&self, args: Value) -> Result<Value> {
        let a: AssignServerArgs = parse(args)?;
        self.require_server(&a.server_id)?;
        let role = self.require_role(a.role)?;
        self.store().transact(|tx| {
            for p in &a.players {
                tx.assign_server_role(p, &a.server_id, role.id)?;
            }
            Ok(())
        })?;
        info!(role = role.id, server = %a.server_id, players = a.players.len(), "server role assigned");
        to_value(role)
    }

    /// Replace every role a player holds
    pub(crate) fn set_roles(&self, args: Value) -> Result<Value> {
        let SetRolesArgs { player, input } = parse(args)?;
        for id in &input.roles {
            self.require_role(*id)?;
        }
        for sr in &input.server_roles {
            self.require_server(&sr.server)?;
            self.require_role(sr.role)?;
        }
        self.store().transact(|tx| {
            tx.clear_player_roles(&player)?;
            for id in &input.roles {
                tx.assign_role(&player, *id)?;
            }
            for sr in &input.server_roles {
                tx.assign_server_role(&player, &sr.server, sr.role)?;
            }
            Ok(())
        })?;
        info!(%player, roles = input.roles.len(), server_roles = input.server_roles.len(), "player roles replaced");
        self.player_roles_view(&player)
    }

    pub(crate) fn list_players(&self, args: Value) -> Result<Value> {
        let a: ListPlayersArgs = parse(args)?;
        let email = a.email.map(|e| e.to_lowercase());
        let mut rows = Vec::new();
        for player in self.store().known_players()? {
            if let Some(role) = a.role {
                if !self.store().player_roles(&player)?.contains(&role) {
                    continue;
                }
            }
            if let Some(role) = a.server_role {
                if !self.store().player_server_roles(&player)?.iter().any(|sr| sr.role == role) {
                    continue;
                }
            }
            if let Some(email) = &email {
                let found = self.store().get_account(&player)?.and_then(|acc| acc.email);
                if !found.is_some_and(|f| f.to_lowercase().contains(email.as_str())) {
                    continue;
                }
            }
            rows.push(player);
        }
        let total = rows.len();
        let players = page(rows, a.limit, a.offset)
            .iter()
            .map(|p| self.player_roles_view(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(json!({ "total": total, "players": players }))
    }
}

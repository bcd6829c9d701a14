//! Guild roles and level rewards.

use crate::handle::ApiHandle;
use cardinal_cache::{Entity, EntityCache, WeakEntityCache};
use cardinal_error::{CardinalResult, ClientError, ClientErrorKind};
use cardinal_interface::Method;
use derive_getters::Getters;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Settings of a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct RoleData {
    /// Role identifier
    #[serde(rename = "roleID")]
    role_id: String,
    /// Guild the role belongs to
    #[serde(rename = "guildID")]
    guild_id: String,
    /// Given to every new member
    is_default: bool,
    /// Level at which the role is granted (0 = never)
    reward: u32,
    /// Members with this role are ignored by the bot
    ignored: bool,
    /// Members with this role earn no xp
    xp_blacklisted: bool,
}

impl RoleData {
    /// Defaults for a role the API has not described yet.
    pub fn new(role_id: impl Into<String>, guild_id: impl Into<String>) -> Self {
        Self {
            role_id: role_id.into(),
            guild_id: guild_id.into(),
            is_default: false,
            reward: 0,
            ignored: false,
            xp_blacklisted: false,
        }
    }

    /// Merge every field present in `patch`.
    pub fn apply(&mut self, patch: RolePatch) {
        let RolePatch {
            role_id: _,
            is_default,
            reward,
            ignored,
            xp_blacklisted,
        } = patch;

        if let Some(value) = is_default {
            self.is_default = value;
        }
        if let Some(value) = reward {
            self.reward = value;
        }
        if let Some(value) = ignored {
            self.ignored = value;
        }
        if let Some(value) = xp_blacklisted {
            self.xp_blacklisted = value;
        }
    }
}

/// Partial role payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, derive_setters::Setters)]
#[serde(default, rename_all = "camelCase")]
#[setters(prefix = "with_", strip_option, into)]
pub struct RolePatch {
    #[serde(rename = "roleID", skip_serializing_if = "Option::is_none")]
    #[setters(skip)]
    role_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reward: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ignored: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    xp_blacklisted: Option<bool>,
}

impl RolePatch {
    /// A payload describing the role `role_id`.
    pub fn new(role_id: impl Into<String>) -> Self {
        Self {
            role_id: Some(role_id.into()),
            ..Self::default()
        }
    }

    /// Identifier carried by this payload, if any.
    pub fn role_id(&self) -> Option<&str> {
        self.role_id.as_deref()
    }
}

/// A role of a guild.
pub struct Role {
    id: String,
    guild_id: String,
    api: ApiHandle,
    owner: WeakEntityCache<Role>,
    data: RwLock<RoleData>,
}

impl Entity for Role {
    type Id = String;
    const KIND: &'static str = "role";

    fn id(&self) -> String {
        self.id.clone()
    }
}

impl Role {
    fn new(data: RoleData, api: ApiHandle, owner: WeakEntityCache<Role>) -> Self {
        Self {
            id: data.role_id.clone(),
            guild_id: data.guild_id.clone(),
            api,
            owner,
            data: RwLock::new(data),
        }
    }

    /// Role identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Identifier of the guild this role belongs to.
    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    /// Snapshot of the role settings.
    pub fn data(&self) -> RoleData {
        self.data.read().clone()
    }

    /// Level at which the role is granted (0 = never).
    pub fn reward(&self) -> u32 {
        self.data.read().reward
    }

    fn path(&self) -> String {
        format!("/guilds/{}/roles/{}", self.guild_id, self.id)
    }

    fn replace(&self, data: RoleData) {
        *self.data.write() = data;
    }

    /// Update settings on the server and merge the answer.
    #[instrument(skip(self, patch), fields(guild_id = %self.guild_id, role_id = %self.id))]
    pub async fn edit(&self, patch: RolePatch) -> CardinalResult<&Self> {
        let response = self.api.send(&self.path(), Method::Patch, &patch).await?;
        let echoed: RolePatch = response.decode_or_default()?;
        {
            let mut data = self.data.write();
            data.apply(patch);
            data.apply(echoed);
        }
        debug!("Role edited");
        Ok(self)
    }

    /// Delete the role on the server and evict it from the guild's role
    /// cache.
    #[instrument(skip(self), fields(guild_id = %self.guild_id, role_id = %self.id))]
    pub async fn delete(&self) -> CardinalResult<bool> {
        self.api.request(&self.path(), Method::Delete, None).await?;
        let evicted = self.owner.remove_instance(&self.id, self);
        debug!(evicted, "Role deleted");
        Ok(evicted)
    }
}

impl fmt::Debug for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Role").field(&*self.data.read()).finish()
    }
}

/// Cache-or-fetch gateway for the roles of one guild.
#[derive(Debug, Clone)]
pub struct RoleManager {
    api: ApiHandle,
    guild_id: String,
    cache: EntityCache<Role>,
}

impl RoleManager {
    pub(crate) fn new(api: ApiHandle, guild_id: String) -> Self {
        Self {
            api,
            guild_id,
            cache: EntityCache::new(),
        }
    }

    fn collection(&self) -> String {
        format!("/guilds/{}/roles/", self.guild_id)
    }

    fn build(&self, data: RoleData) -> Role {
        Role::new(data, self.api.clone(), self.cache.downgrade())
    }

    fn store(&self, data: RoleData) -> Arc<Role> {
        let replacement = data.clone();
        self.cache.upsert(
            data.role_id.clone(),
            || self.build(data),
            |existing| existing.replace(replacement),
        )
    }

    /// Return the cached role, or fetch it. `Ok(None)` on 404.
    #[instrument(skip(self), fields(guild_id = %self.guild_id))]
    pub async fn resolve(&self, id: &str) -> CardinalResult<Option<Arc<Role>>> {
        let path = format!("{}{id}", self.collection());
        let path = path.as_str();

        self.cache
            .get_or_fetch(&id.to_string(), move || async move {
                let Some(patch) = self.api.fetch_one::<RolePatch>(path).await? else {
                    return Ok(None);
                };
                let role_id = patch.role_id.clone().unwrap_or_else(|| id.to_string());
                let mut data = RoleData::new(role_id, self.guild_id.clone());
                data.apply(patch);
                Ok(Some(self.build(data)))
            })
            .await
    }

    /// Register a role with the API and cache it.
    #[instrument(skip(self, payload), fields(guild_id = %self.guild_id, role_id = ?payload.role_id()))]
    pub async fn create(&self, payload: RolePatch) -> CardinalResult<Arc<Role>> {
        let role_id = payload
            .role_id
            .clone()
            .ok_or_else(|| ClientError::new(ClientErrorKind::MissingIdentifier("roleID")))?;
        let mut data = RoleData::new(role_id, self.guild_id.clone());
        data.apply(payload);

        let response = self.api.send(&self.collection(), Method::Post, &data).await?;
        data.apply(response.decode_or_default()?);
        debug!("Role created");
        Ok(self.store(data))
    }

    /// Roles granted at `level`, in server order. Every returned role is
    /// cached.
    #[instrument(skip(self), fields(guild_id = %self.guild_id))]
    pub async fn rewards(&self, level: u32) -> CardinalResult<Vec<Arc<Role>>> {
        let path = format!("{}?reward={level}", self.collection());
        let patches: Vec<RolePatch> = self.api.fetch_all(&path).await?;

        let records = patches
            .into_iter()
            .map(|patch| -> CardinalResult<RoleData> {
                let role_id = patch
                    .role_id
                    .clone()
                    .ok_or_else(|| ClientError::new(ClientErrorKind::MissingIdentifier("roleID")))?;
                let mut data = RoleData::new(role_id, self.guild_id.clone());
                data.apply(patch);
                Ok(data)
            })
            .collect::<CardinalResult<Vec<_>>>()?;
        let roles: Vec<_> = records.into_iter().map(|data| self.store(data)).collect();

        debug!(count = roles.len(), "Fetched reward roles");
        Ok(roles)
    }

    /// The cached role, without fetching.
    pub fn cached(&self, id: &str) -> Option<Arc<Role>> {
        self.cache.get(&id.to_string())
    }

    /// Number of cached roles.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no role is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

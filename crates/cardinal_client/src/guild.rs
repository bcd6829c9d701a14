//! Guilds and the client-level guild manager.

use crate::handle::ApiHandle;
use crate::wire::{commands, nullable};
use crate::{ChannelManager, MemberManager, RoleManager};
use cardinal_cache::{Entity, EntityCache, WeakEntityCache};
use cardinal_error::{CardinalResult, ClientError, ClientErrorKind};
use cardinal_interface::Method;
use derive_getters::Getters;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Settings of a guild as stored by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct GuildData {
    /// Guild identifier
    #[serde(rename = "guildID")]
    guild_id: String,
    /// Display name
    guild_name: Option<String>,
    /// Command prefix of the bot
    prefix: String,
    /// Channel receiving reports
    report_channel: Option<String>,
    /// Channel receiving welcome messages
    welcome_channel: Option<String>,
    /// Message posted for new members
    welcome_msg: Option<String>,
    /// Message sent privately to new members
    private_welcome_msg: Option<String>,
    /// Channel receiving level-up messages
    lvl_channel: Option<String>,
    /// Whether reward roles replace each other on level-up
    lvl_replace: bool,
    /// Level from which level-up messages are sent (0 = never)
    lvl_response: u32,
    /// Names of disabled commands, in order
    #[serde(serialize_with = "commands::serialize_list")]
    disabled_commands: Vec<String>,
    /// Whether moderation commands are allowed
    allow_moderation: bool,
    /// Warns before an automatic ban (0 = never)
    max_warns: u32,
    /// Length of a ban in days (0-7)
    ban_time: u8,
}

impl GuildData {
    /// Defaults for a guild the API has not described yet.
    pub fn new(guild_id: impl Into<String>) -> Self {
        Self {
            guild_id: guild_id.into(),
            guild_name: None,
            prefix: "%".to_string(),
            report_channel: None,
            welcome_channel: None,
            welcome_msg: None,
            private_welcome_msg: None,
            lvl_channel: None,
            lvl_replace: false,
            lvl_response: 0,
            disabled_commands: Vec::new(),
            allow_moderation: true,
            max_warns: 3,
            ban_time: 1,
        }
    }

    /// Merge every field present in `patch`. The identifier is never
    /// touched.
    pub fn apply(&mut self, patch: GuildPatch) {
        let GuildPatch {
            guild_id: _,
            guild_name,
            prefix,
            report_channel,
            welcome_channel,
            welcome_msg,
            private_welcome_msg,
            lvl_channel,
            lvl_replace,
            lvl_response,
            disabled_commands,
            allow_moderation,
            max_warns,
            ban_time,
        } = patch;

        if let Some(value) = guild_name {
            self.guild_name = value;
        }
        if let Some(value) = prefix {
            self.prefix = value;
        }
        if let Some(value) = report_channel {
            self.report_channel = value;
        }
        if let Some(value) = welcome_channel {
            self.welcome_channel = value;
        }
        if let Some(value) = welcome_msg {
            self.welcome_msg = value;
        }
        if let Some(value) = private_welcome_msg {
            self.private_welcome_msg = value;
        }
        if let Some(value) = lvl_channel {
            self.lvl_channel = value;
        }
        if let Some(value) = lvl_replace {
            self.lvl_replace = value;
        }
        if let Some(value) = lvl_response {
            self.lvl_response = value;
        }
        if let Some(value) = disabled_commands {
            self.disabled_commands = value;
        }
        if let Some(value) = allow_moderation {
            self.allow_moderation = value;
        }
        if let Some(value) = max_warns {
            self.max_warns = value;
        }
        if let Some(value) = ban_time {
            self.ban_time = value;
        }
    }
}

/// Partial guild payload.
///
/// Used both for what the server sends back and for what `create` and
/// `edit` send. Absent fields are left alone; for nullable fields an
/// explicit `null` clears the value.
///
/// ```
/// use cardinal_client::GuildPatch;
///
/// let patch = GuildPatch::new("1234")
///     .with_prefix("!")
///     .with_max_warns(5_u32)
///     .with_disabled_commands(vec!["ban".to_string(), "kick".to_string()]);
///
/// let body = serde_json::to_value(&patch).unwrap();
/// assert_eq!(body["guildID"], "1234");
/// assert_eq!(body["disabledCommands"], "ban/kick");
/// assert!(body.get("reportChannel").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, derive_setters::Setters)]
#[serde(default, rename_all = "camelCase")]
#[setters(prefix = "with_", strip_option, into)]
pub struct GuildPatch {
    #[serde(rename = "guildID", skip_serializing_if = "Option::is_none")]
    #[setters(skip)]
    guild_id: Option<String>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    guild_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    report_channel: Option<Option<String>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    welcome_channel: Option<Option<String>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    welcome_msg: Option<Option<String>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    private_welcome_msg: Option<Option<String>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    lvl_channel: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lvl_replace: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lvl_response: Option<u32>,
    #[serde(with = "commands", skip_serializing_if = "Option::is_none")]
    disabled_commands: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allow_moderation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_warns: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ban_time: Option<u8>,
}

impl GuildPatch {
    /// A payload describing the guild `guild_id`, as `create` expects.
    pub fn new(guild_id: impl Into<String>) -> Self {
        Self {
            guild_id: Some(guild_id.into()),
            ..Self::default()
        }
    }

    /// Identifier carried by this payload, if any.
    pub fn guild_id(&self) -> Option<&str> {
        self.guild_id.as_deref()
    }
}

/// A guild known to the API.
///
/// Owns the member, role and channel managers scoped to it. Those
/// managers live as long as the guild instance, across `edit` and
/// `reset`.
pub struct Guild {
    id: String,
    api: ApiHandle,
    owner: WeakEntityCache<Guild>,
    data: RwLock<GuildData>,
    members: MemberManager,
    roles: RoleManager,
    channels: ChannelManager,
}

impl Entity for Guild {
    type Id = String;
    const KIND: &'static str = "guild";

    fn id(&self) -> String {
        self.id.clone()
    }
}

impl Guild {
    fn new(data: GuildData, api: ApiHandle, owner: WeakEntityCache<Guild>) -> Self {
        let id = data.guild_id.clone();
        Self {
            members: MemberManager::new(api.clone(), id.clone()),
            roles: RoleManager::new(api.clone(), id.clone()),
            channels: ChannelManager::new(api.clone(), id.clone()),
            id,
            api,
            owner,
            data: RwLock::new(data),
        }
    }

    /// Guild identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshot of the current settings.
    pub fn data(&self) -> GuildData {
        self.data.read().clone()
    }

    /// Display name.
    pub fn name(&self) -> Option<String> {
        self.data.read().guild_name.clone()
    }

    /// Command prefix.
    pub fn prefix(&self) -> String {
        self.data.read().prefix.clone()
    }

    /// Disabled command names, in order.
    pub fn disabled_commands(&self) -> Vec<String> {
        self.data.read().disabled_commands.clone()
    }

    /// Members of this guild.
    pub fn members(&self) -> &MemberManager {
        &self.members
    }

    /// Roles of this guild.
    pub fn roles(&self) -> &RoleManager {
        &self.roles
    }

    /// Channels of this guild.
    pub fn channels(&self) -> &ChannelManager {
        &self.channels
    }

    fn path(&self) -> String {
        format!("/guilds/{}", self.id)
    }

    fn replace(&self, data: GuildData) {
        *self.data.write() = data;
    }

    /// Update settings on the server, then merge what was sent and what
    /// the server answered.
    #[instrument(skip(self, patch), fields(guild_id = %self.id))]
    pub async fn edit(&self, patch: GuildPatch) -> CardinalResult<&Self> {
        let response = self.api.send(&self.path(), Method::Patch, &patch).await?;
        let echoed: GuildPatch = response.decode_or_default()?;

        {
            let mut data = self.data.write();
            data.apply(patch);
            data.apply(echoed);
        }
        debug!("Guild edited");
        Ok(self)
    }

    /// Restore default settings on the server. Members, roles and
    /// channels are kept, and so are the managers caching them.
    #[instrument(skip(self), fields(guild_id = %self.id))]
    pub async fn reset(&self) -> CardinalResult<&Self> {
        let path = format!("{}/reset", self.path());
        let response = self.api.request(&path, Method::Post, None).await?;
        let echoed: GuildPatch = response.decode_or_default()?;
        self.data.write().apply(echoed);
        debug!("Guild reset");
        Ok(self)
    }

    /// Delete the guild on the server and evict it from the client cache.
    ///
    /// Returns whether the guild was still cached.
    #[instrument(skip(self), fields(guild_id = %self.id))]
    pub async fn delete(&self) -> CardinalResult<bool> {
        self.api.request(&self.path(), Method::Delete, None).await?;
        let evicted = self.owner.remove_instance(&self.id, self);
        debug!(evicted, "Guild deleted");
        Ok(evicted)
    }
}

impl fmt::Debug for Guild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guild")
            .field("data", &*self.data.read())
            .field("members", &self.members)
            .field("roles", &self.roles)
            .field("channels", &self.channels)
            .finish()
    }
}

/// Cache-or-fetch gateway for guilds.
#[derive(Debug, Clone)]
pub struct GuildManager {
    api: ApiHandle,
    cache: EntityCache<Guild>,
}

impl GuildManager {
    pub(crate) fn new(api: ApiHandle) -> Self {
        Self {
            api,
            cache: EntityCache::new(),
        }
    }

    fn store(&self, data: GuildData) -> Arc<Guild> {
        let replacement = data.clone();
        self.cache.upsert(
            data.guild_id.clone(),
            || Guild::new(data, self.api.clone(), self.cache.downgrade()),
            |existing| existing.replace(replacement),
        )
    }

    /// Return the cached guild, or fetch it.
    ///
    /// `Ok(None)` when the API does not know the guild.
    ///
    /// # Errors
    ///
    /// Any failure other than a 404, including payloads without a
    /// `guildID`.
    #[instrument(skip(self))]
    pub async fn resolve(&self, id: &str) -> CardinalResult<Option<Arc<Guild>>> {
        let api = &self.api;
        let owner = self.cache.downgrade();
        let path = format!("/guilds/{id}");
        let path = path.as_str();

        self.cache
            .get_or_fetch(&id.to_string(), move || async move {
                let Some(patch) = api.fetch_one::<GuildPatch>(path).await? else {
                    return Ok(None);
                };
                let guild_id = patch.guild_id.clone().ok_or_else(|| {
                    ClientError::new(ClientErrorKind::MissingIdentifier("guildID"))
                })?;
                let mut data = GuildData::new(guild_id);
                data.apply(patch);
                Ok(Some(Guild::new(data, api.clone(), owner)))
            })
            .await
    }

    /// Register a guild with the API and cache it.
    ///
    /// # Errors
    ///
    /// Fails without caching anything if the payload has no identifier
    /// or the request fails.
    #[instrument(skip(self, payload), fields(guild_id = ?payload.guild_id()))]
    pub async fn create(&self, payload: GuildPatch) -> CardinalResult<Arc<Guild>> {
        let guild_id = payload
            .guild_id
            .clone()
            .ok_or_else(|| ClientError::new(ClientErrorKind::MissingIdentifier("guildID")))?;
        let mut data = GuildData::new(guild_id);
        data.apply(payload);

        let response = self.api.send("/guilds/", Method::Post, &data).await?;
        data.apply(response.decode_or_default()?);
        debug!("Guild created");
        Ok(self.store(data))
    }

    /// The cached guild, without fetching.
    pub fn cached(&self, id: &str) -> Option<Arc<Guild>> {
        self.cache.get(&id.to_string())
    }

    /// Number of cached guilds.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no guild is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_apply_to_absent_and_null() {
        let patch: GuildPatch = serde_json::from_value(json!({
            "guildID": "1",
            "prefix": null,
            "maxWarns": null,
        }))
        .unwrap();
        let mut data = GuildData::new("1");
        data.apply(patch);

        assert_eq!(data.prefix(), "%");
        assert_eq!(*data.max_warns(), 3);
        assert_eq!(*data.ban_time(), 1);
        assert!(*data.allow_moderation());
        assert!(!*data.lvl_replace());
        assert_eq!(*data.lvl_response(), 0);
        assert!(data.disabled_commands().is_empty());
        assert_eq!(*data.report_channel(), None);
    }

    #[test]
    fn test_falsy_values_are_kept() {
        let patch: GuildPatch = serde_json::from_value(json!({
            "allowModeration": false,
            "maxWarns": 0,
            "banTime": 0,
            "prefix": "",
        }))
        .unwrap();
        let mut data = GuildData::new("1");
        data.apply(patch);

        assert!(!*data.allow_moderation());
        assert_eq!(*data.max_warns(), 0);
        assert_eq!(*data.ban_time(), 0);
        assert_eq!(data.prefix(), "");
    }

    #[test]
    fn test_apply_never_changes_identifier() {
        let patch: GuildPatch = serde_json::from_value(json!({ "guildID": "2" })).unwrap();
        let mut data = GuildData::new("1");
        data.apply(patch);
        assert_eq!(data.guild_id(), "1");
    }

    #[test]
    fn test_null_clears_nullable_field() {
        let mut data = GuildData::new("1");
        data.apply(GuildPatch::default().with_report_channel("99".to_string()));
        assert_eq!(data.report_channel().as_deref(), Some("99"));

        data.apply(serde_json::from_value(json!({ "reportChannel": null })).unwrap());
        assert_eq!(*data.report_channel(), None);
    }

    #[test]
    fn test_data_serializes_commands_joined() {
        let mut data = GuildData::new("1");
        data.apply(GuildPatch::default().with_disabled_commands(vec![
            "ban".to_string(),
            "kick".to_string(),
            "warn".to_string(),
        ]));

        let body = serde_json::to_value(&data).unwrap();
        assert_eq!(body["disabledCommands"], "ban/kick/warn");
        assert_eq!(body["guildID"], "1");
        assert_eq!(body["prefix"], "%");
        assert!(body["reportChannel"].is_null());
    }
}

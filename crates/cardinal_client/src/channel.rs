//! Guild channels.

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

/// Settings of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct ChannelData {
    /// Channel identifier
    #[serde(rename = "channelID")]
    channel_id: String,
    /// Guild the channel belongs to
    #[serde(rename = "guildID")]
    guild_id: String,
    /// Messages in this channel are ignored by the bot
    ignored: bool,
    /// Messages in this channel earn no xp
    xp_blacklisted: bool,
}

impl ChannelData {
    /// Defaults for a channel the API has not described yet.
    pub fn new(channel_id: impl Into<String>, guild_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            guild_id: guild_id.into(),
            ignored: false,
            xp_blacklisted: false,
        }
    }

    /// Merge every field present in `patch`.
    pub fn apply(&mut self, patch: ChannelPatch) {
        if let Some(value) = patch.ignored {
            self.ignored = value;
        }
        if let Some(value) = patch.xp_blacklisted {
            self.xp_blacklisted = value;
        }
    }
}

/// Partial channel payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, derive_setters::Setters)]
#[serde(default, rename_all = "camelCase")]
#[setters(prefix = "with_", strip_option, into)]
pub struct ChannelPatch {
    #[serde(rename = "channelID", skip_serializing_if = "Option::is_none")]
    #[setters(skip)]
    channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ignored: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    xp_blacklisted: Option<bool>,
}

impl ChannelPatch {
    /// A payload describing the channel `channel_id`.
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: Some(channel_id.into()),
            ..Self::default()
        }
    }

    /// Identifier carried by this payload, if any.
    pub fn channel_id(&self) -> Option<&str> {
        self.channel_id.as_deref()
    }
}

/// A channel of a guild.
pub struct Channel {
    id: String,
    guild_id: String,
    api: ApiHandle,
    owner: WeakEntityCache<Channel>,
    data: RwLock<ChannelData>,
}

impl Entity for Channel {
    type Id = String;
    const KIND: &'static str = "channel";

    fn id(&self) -> String {
        self.id.clone()
    }
}

impl Channel {
    fn new(data: ChannelData, api: ApiHandle, owner: WeakEntityCache<Channel>) -> Self {
        Self {
            id: data.channel_id.clone(),
            guild_id: data.guild_id.clone(),
            api,
            owner,
            data: RwLock::new(data),
        }
    }

    /// Channel identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Identifier of the guild this channel belongs to.
    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    /// Snapshot of the channel settings.
    pub fn data(&self) -> ChannelData {
        self.data.read().clone()
    }

    fn path(&self) -> String {
        format!("/guilds/{}/channels/{}", self.guild_id, self.id)
    }

    fn replace(&self, data: ChannelData) {
        *self.data.write() = data;
    }

    /// Update settings on the server and merge the answer.
    #[instrument(skip(self, patch), fields(guild_id = %self.guild_id, channel_id = %self.id))]
    pub async fn edit(&self, patch: ChannelPatch) -> CardinalResult<&Self> {
        let response = self.api.send(&self.path(), Method::Patch, &patch).await?;
        let echoed: ChannelPatch = response.decode_or_default()?;
        {
            let mut data = self.data.write();
            data.apply(patch);
            data.apply(echoed);
        }
        debug!("Channel edited");
        Ok(self)
    }

    /// Delete the channel on the server and evict it from the guild's
    /// channel cache.
    #[instrument(skip(self), fields(guild_id = %self.guild_id, channel_id = %self.id))]
    pub async fn delete(&self) -> CardinalResult<bool> {
        self.api.request(&self.path(), Method::Delete, None).await?;
        let evicted = self.owner.remove_instance(&self.id, self);
        debug!(evicted, "Channel deleted");
        Ok(evicted)
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Channel").field(&*self.data.read()).finish()
    }
}

/// Cache-or-fetch gateway for the channels of one guild.
#[derive(Debug, Clone)]
pub struct ChannelManager {
    api: ApiHandle,
    guild_id: String,
    cache: EntityCache<Channel>,
}

impl ChannelManager {
    pub(crate) fn new(api: ApiHandle, guild_id: String) -> Self {
        Self {
            api,
            guild_id,
            cache: EntityCache::new(),
        }
    }

    fn collection(&self) -> String {
        format!("/guilds/{}/channels/", self.guild_id)
    }

    fn build(&self, data: ChannelData) -> Channel {
        Channel::new(data, self.api.clone(), self.cache.downgrade())
    }

    fn store(&self, data: ChannelData) -> Arc<Channel> {
        let replacement = data.clone();
        self.cache.upsert(
            data.channel_id.clone(),
            || self.build(data),
            |existing| existing.replace(replacement),
        )
    }

    /// Return the cached channel, or fetch it. `Ok(None)` on 404.
    #[instrument(skip(self), fields(guild_id = %self.guild_id))]
    pub async fn resolve(&self, id: &str) -> CardinalResult<Option<Arc<Channel>>> {
        let path = format!("{}{id}", self.collection());
        let path = path.as_str();

        self.cache
            .get_or_fetch(&id.to_string(), move || async move {
                let Some(patch) = self.api.fetch_one::<ChannelPatch>(path).await? else {
                    return Ok(None);
                };
                let channel_id = patch.channel_id.clone().unwrap_or_else(|| id.to_string());
                let mut data = ChannelData::new(channel_id, self.guild_id.clone());
                data.apply(patch);
                Ok(Some(self.build(data)))
            })
            .await
    }

    /// Register a channel with the API and cache it.
    #[instrument(skip(self, payload), fields(guild_id = %self.guild_id, channel_id = ?payload.channel_id()))]
    pub async fn create(&self, payload: ChannelPatch) -> CardinalResult<Arc<Channel>> {
        let channel_id = payload
            .channel_id
            .clone()
            .ok_or_else(|| ClientError::new(ClientErrorKind::MissingIdentifier("channelID")))?;
        let mut data = ChannelData::new(channel_id, self.guild_id.clone());
        data.apply(payload);

        let response = self.api.send(&self.collection(), Method::Post, &data).await?;
        data.apply(response.decode_or_default()?);
        debug!("Channel created");

        Ok(self.store(data))
    }

    /// The cached channel, without fetching.
    pub fn cached(&self, id: &str) -> Option<Arc<Channel>> {
        self.cache.get(&id.to_string())
    }

    /// Number of cached channels.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no channel is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

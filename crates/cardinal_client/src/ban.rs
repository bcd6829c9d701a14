//! Bans of a member.

use crate::handle::ApiHandle;
use crate::wire::{nullable, timestamp};
use cardinal_cache::{Entity, EntityCache, WeakEntityCache};
use cardinal_error::{CardinalResult, ClientError, ClientErrorKind, JsonError};
use cardinal_interface::Method;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A ban as stored by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct BanData {
    /// Server-assigned identifier
    #[serde(rename = "banID")]
    ban_id: u64,
    /// Banned member
    #[serde(rename = "memberID")]
    member_id: String,
    /// Guild the ban applies to
    #[serde(rename = "guildID")]
    guild_id: String,
    /// Moderator who issued the ban
    #[serde(rename = "bannerID")]
    banner_id: Option<String>,
    /// When the ban was issued
    banned_at: DateTime<Utc>,
    /// Reason given
    ban_reason: Option<String>,
    /// Issued automatically after too many warns
    auto_ban: bool,
}

impl BanData {
    fn new(ban_id: u64, member_id: String, guild_id: String) -> Self {
        Self {
            ban_id,
            member_id,
            guild_id,
            banner_id: None,
            banned_at: Utc::now(),
            ban_reason: None,
            auto_ban: true,
        }
    }

    /// Merge every field present in `patch`.
    pub fn apply(&mut self, patch: BanPatch) {
        let BanPatch {
            ban_id: _,
            banner_id,
            banned_at,
            ban_reason,
            auto_ban,
        } = patch;

        if let Some(value) = banner_id {
            self.banner_id = value;
        }
        if let Some(value) = banned_at {
            self.banned_at = value;
        }
        if let Some(value) = ban_reason {
            self.ban_reason = value;
        }
        if let Some(value) = auto_ban {
            self.auto_ban = value;
        }
    }
}

/// Partial ban payload. The identifier is assigned by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, derive_setters::Setters)]
#[serde(default, rename_all = "camelCase")]
#[setters(prefix = "with_", strip_option, into)]
pub struct BanPatch {
    #[serde(rename = "banID", skip_serializing_if = "Option::is_none")]
    #[setters(skip)]
    ban_id: Option<u64>,
    #[serde(
        rename = "bannerID",
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    banner_id: Option<Option<String>>,
    #[serde(deserialize_with = "timestamp", skip_serializing_if = "Option::is_none")]
    banned_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    ban_reason: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_ban: Option<bool>,
}

/// A ban of a member.
pub struct Ban {
    id: u64,
    guild_id: String,
    member_id: String,
    api: ApiHandle,
    owner: WeakEntityCache<Ban>,
    data: RwLock<BanData>,
}

impl Entity for Ban {
    type Id = u64;
    const KIND: &'static str = "ban";

    fn id(&self) -> u64 {
        self.id
    }
}

impl Ban {
    fn new(data: BanData, api: ApiHandle, owner: WeakEntityCache<Ban>) -> Self {
        Self {
            id: data.ban_id,
            guild_id: data.guild_id.clone(),
            member_id: data.member_id.clone(),
            api,
            owner,
            data: RwLock::new(data),
        }
    }

    /// Ban identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Identifier of the banned member.
    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    /// Identifier of the guild.
    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    /// Snapshot of the ban.
    pub fn data(&self) -> BanData {
        self.data.read().clone()
    }

    /// Whether the ban was issued automatically.
    pub fn is_auto_ban(&self) -> bool {
        self.data.read().auto_ban
    }

    fn replace(&self, data: BanData) {
        *self.data.write() = data;
    }

    /// Lift the ban on the server and evict it from the member's ban
    /// cache.
    #[instrument(skip(self), fields(member_id = %self.member_id, ban_id = self.id))]
    pub async fn delete(&self) -> CardinalResult<bool> {
        let path = format!(
            "/guilds/{}/members/{}/bans/{}",
            self.guild_id, self.member_id, self.id
        );
        self.api.request(&path, Method::Delete, None).await?;
        let evicted = self.owner.remove_instance(&self.id, self);
        debug!(evicted, "Ban deleted");
        Ok(evicted)
    }
}

impl fmt::Debug for Ban {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ban").field(&*self.data.read()).finish()
    }
}

/// Cache-or-fetch gateway for the bans of one member.
#[derive(Debug, Clone)]
pub struct BanManager {
    api: ApiHandle,
    guild_id: String,
    member_id: String,
    cache: EntityCache<Ban>,
}

impl BanManager {
    pub(crate) fn new(api: ApiHandle, guild_id: String, member_id: String) -> Self {
        Self {
            api,
            guild_id,
            member_id,
            cache: EntityCache::new(),
        }
    }

    fn collection(&self) -> String {
        format!("/guilds/{}/members/{}/bans/", self.guild_id, self.member_id)
    }

    fn data_from(&self, ban_id: u64, patch: BanPatch) -> BanData {
        let mut data = BanData::new(ban_id, self.member_id.clone(), self.guild_id.clone());
        data.apply(patch);
        data
    }

    fn build(&self, data: BanData) -> Ban {
        Ban::new(data, self.api.clone(), self.cache.downgrade())
    }

    fn store(&self, data: BanData) -> Arc<Ban> {
        let replacement = data.clone();
        self.cache.upsert(
            data.ban_id,
            || self.build(data),
            |existing| existing.replace(replacement),
        )
    }

    /// Return the cached ban, or fetch it. `Ok(None)` on 404.
    #[instrument(skip(self), fields(member_id = %self.member_id))]
    pub async fn resolve(&self, id: u64) -> CardinalResult<Option<Arc<Ban>>> {
        let path = format!("{}{id}", self.collection());
        let path = path.as_str();

        self.cache
            .get_or_fetch(&id, move || async move {
                let Some(patch) = self.api.fetch_one::<BanPatch>(path).await? else {
                    return Ok(None);
                };
                let data = self.data_from(patch.ban_id.unwrap_or(id), patch);
                Ok(Some(self.build(data)))
            })
            .await
    }

    /// All bans of the member, in server order. Every returned ban is
    /// cached.
    #[instrument(skip(self), fields(member_id = %self.member_id))]
    pub async fn fetch(&self) -> CardinalResult<Vec<Arc<Ban>>> {
        let patches: Vec<BanPatch> = self.api.fetch_all(&self.collection()).await?;

        let records = patches
            .into_iter()
            .map(|patch| -> CardinalResult<BanData> {
                let ban_id = patch
                    .ban_id
                    .ok_or_else(|| ClientError::new(ClientErrorKind::MissingIdentifier("banID")))?;
                Ok(self.data_from(ban_id, patch))
            })
            .collect::<CardinalResult<Vec<_>>>()?;
        let bans: Vec<_> = records.into_iter().map(|data| self.store(data)).collect();

        debug!(count = bans.len(), "Fetched bans");
        Ok(bans)
    }

    /// Ban the member and cache the ban under the identifier the server
    /// assigns.
    #[instrument(skip(self, payload), fields(member_id = %self.member_id))]
    pub async fn create(&self, payload: BanPatch) -> CardinalResult<Arc<Ban>> {
        let pending = self.data_from(0, payload);
        let mut body = serde_json::to_value(&pending).map_err(JsonError::from)?;
        if let Some(fields) = body.as_object_mut() {
            fields.remove("banID");
        }

        let response = self
            .api
            .request(&self.collection(), Method::Post, Some(&body))
            .await?;
        let echoed: BanPatch = response.decode_or_default()?;
        let ban_id = echoed
            .ban_id
            .ok_or_else(|| ClientError::new(ClientErrorKind::MissingIdentifier("banID")))?;

        let mut data = pending;
        data.ban_id = ban_id;
        data.apply(echoed);
        debug!(ban_id, "Ban created");
        Ok(self.store(data))
    }

    /// The cached ban, without fetching.
    pub fn cached(&self, id: u64) -> Option<Arc<Ban>> {
        self.cache.get(&id)
    }

    /// Number of cached bans.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no ban is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

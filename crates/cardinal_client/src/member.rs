//! Guild members and their leveling state.

use crate::handle::ApiHandle;
use crate::leveling::next_level;
use crate::wire::timestamp;
use crate::{BanManager, WarnManager};
use cardinal_cache::{Entity, EntityCache, WeakEntityCache};
use cardinal_error::{CardinalResult, ClientError, ClientErrorKind};
use cardinal_interface::Method;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A member's record in one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct MemberData {
    /// Member identifier
    #[serde(rename = "memberID")]
    member_id: String,
    /// Guild the member belongs to
    #[serde(rename = "guildID")]
    guild_id: String,
    /// When the member first joined
    joined_at: DateTime<Utc>,
    /// Times the member left the guild
    left: u32,
    /// Total experience
    xp: u64,
    /// Current level
    level: u32,
}

impl MemberData {
    /// Defaults for a member that just joined.
    pub fn new(member_id: impl Into<String>, guild_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            guild_id: guild_id.into(),
            joined_at: Utc::now(),
            left: 0,
            xp: 0,
            level: 0,
        }
    }

    /// Merge every field present in `patch`. Identifiers are never
    /// touched.
    pub fn apply(&mut self, patch: MemberPatch) {
        let MemberPatch {
            member_id: _,
            joined_at,
            left,
            xp,
            level,
        } = patch;

        if let Some(value) = joined_at {
            self.joined_at = value;
        }
        if let Some(value) = left {
            self.left = value;
        }
        if let Some(value) = xp {
            self.xp = value;
        }
        if let Some(value) = level {
            self.level = value;
        }
    }
}

/// Partial member payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, derive_setters::Setters)]
#[serde(default, rename_all = "camelCase")]
#[setters(prefix = "with_", strip_option, into)]
pub struct MemberPatch {
    #[serde(rename = "memberID", skip_serializing_if = "Option::is_none")]
    #[setters(skip)]
    member_id: Option<String>,
    #[serde(deserialize_with = "timestamp", skip_serializing_if = "Option::is_none")]
    joined_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    left: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    xp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<u32>,
}

impl MemberPatch {
    /// A payload describing the member `member_id`.
    pub fn new(member_id: impl Into<String>) -> Self {
        Self {
            member_id: Some(member_id.into()),
            ..Self::default()
        }
    }

    /// Identifier carried by this payload, if any.
    pub fn member_id(&self) -> Option<&str> {
        self.member_id.as_deref()
    }
}

/// A member of a guild.
///
/// Owns the warn and ban managers scoped to it.
pub struct Member {
    id: String,
    guild_id: String,
    api: ApiHandle,
    owner: WeakEntityCache<Member>,
    data: RwLock<MemberData>,
    warns: WarnManager,
    bans: BanManager,
}

impl Entity for Member {
    type Id = String;
    const KIND: &'static str = "member";

    fn id(&self) -> String {
        self.id.clone()
    }
}

impl Member {
    fn new(data: MemberData, api: ApiHandle, owner: WeakEntityCache<Member>) -> Self {
        let id = data.member_id.clone();
        let guild_id = data.guild_id.clone();
        Self {
            warns: WarnManager::new(api.clone(), guild_id.clone(), id.clone()),
            bans: BanManager::new(api.clone(), guild_id.clone(), id.clone()),
            id,
            guild_id,
            api,
            owner,
            data: RwLock::new(data),
        }
    }

    /// Member identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Identifier of the guild this member belongs to.
    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    /// Snapshot of the member record.
    pub fn data(&self) -> MemberData {
        self.data.read().clone()
    }

    /// Total experience.
    pub fn xp(&self) -> u64 {
        self.data.read().xp
    }

    /// Current level.
    pub fn level(&self) -> u32 {
        self.data.read().level
    }

    /// Times the member left the guild.
    pub fn left(&self) -> u32 {
        self.data.read().left
    }

    /// Warns of this member.
    pub fn warns(&self) -> &WarnManager {
        &self.warns
    }

    /// Bans of this member.
    pub fn bans(&self) -> &BanManager {
        &self.bans
    }

    fn path(&self) -> String {
        format!("/guilds/{}/members/{}", self.guild_id, self.id)
    }

    fn replace(&self, data: MemberData) {
        *self.data.write() = data;
    }

    async fn patch(&self, patch: MemberPatch) -> CardinalResult<()> {
        let response = self.api.send(&self.path(), Method::Patch, &patch).await?;
        let echoed: MemberPatch = response.decode_or_default()?;

        let mut data = self.data.write();
        data.apply(patch);
        data.apply(echoed);
        Ok(())
    }

    /// Count one more departure from the guild.
    #[instrument(skip(self), fields(guild_id = %self.guild_id, member_id = %self.id))]
    pub async fn add_left(&self) -> CardinalResult<&Self> {
        let left = self.data.read().left.saturating_add(1);
        self.patch(MemberPatch::default().with_left(left)).await?;
        debug!(left, "Departure recorded");
        Ok(self)
    }

    /// Add experience, advancing at most one level.
    ///
    /// Xp and level are computed locally and sent in a single request.
    /// The total saturates at `u64::MAX`.
    #[instrument(skip(self), fields(guild_id = %self.guild_id, member_id = %self.id))]
    pub async fn add_xp(&self, amount: u64) -> CardinalResult<&Self> {
        let (previous, xp) = {
            let data = self.data.read();
            (data.level, data.xp.saturating_add(amount))
        };
        let level = next_level(previous, xp);

        self.patch(MemberPatch::default().with_xp(xp).with_level(level))
            .await?;

        if level > previous {
            info!(level, "Member leveled up");
        }
        Ok(self)
    }

    /// Reset the member's record on the server.
    #[instrument(skip(self), fields(guild_id = %self.guild_id, member_id = %self.id))]
    pub async fn reset(&self) -> CardinalResult<&Self> {
        let path = format!("{}/reset", self.path());
        let response = self.api.request(&path, Method::Post, None).await?;
        let echoed: MemberPatch = response.decode_or_default()?;
        self.data.write().apply(echoed);
        debug!("Member reset");
        Ok(self)
    }

    /// Delete the member on the server and evict it from the guild's
    /// member cache.
    #[instrument(skip(self), fields(guild_id = %self.guild_id, member_id = %self.id))]
    pub async fn delete(&self) -> CardinalResult<bool> {
        self.api.request(&self.path(), Method::Delete, None).await?;
        let evicted = self.owner.remove_instance(&self.id, self);
        debug!(evicted, "Member deleted");
        Ok(evicted)
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("data", &*self.data.read())
            .field("warns", &self.warns)
            .field("bans", &self.bans)
            .finish()
    }
}

/// Cache-or-fetch gateway for the members of one guild.
#[derive(Debug, Clone)]
pub struct MemberManager {
    api: ApiHandle,
    guild_id: String,
    cache: EntityCache<Member>,
}

impl MemberManager {
    pub(crate) fn new(api: ApiHandle, guild_id: String) -> Self {
        Self {
            api,
            guild_id,
            cache: EntityCache::new(),
        }
    }

    fn collection(&self) -> String {
        format!("/guilds/{}/members/", self.guild_id)
    }

    fn build(&self, data: MemberData) -> Member {
        Member::new(data, self.api.clone(), self.cache.downgrade())
    }

    fn store(&self, data: MemberData) -> Arc<Member> {
        let replacement = data.clone();
        self.cache.upsert(
            data.member_id.clone(),
            || self.build(data),
            |existing| existing.replace(replacement),
        )
    }

    /// Return the cached member, or fetch it. `Ok(None)` on 404.
    #[instrument(skip(self), fields(guild_id = %self.guild_id))]
    pub async fn resolve(&self, id: &str) -> CardinalResult<Option<Arc<Member>>> {
        let path = format!("{}{id}", self.collection());
        let path = path.as_str();

        self.cache
            .get_or_fetch(&id.to_string(), move || async move {
                let Some(patch) = self.api.fetch_one::<MemberPatch>(path).await? else {
                    return Ok(None);
                };
                let member_id = patch.member_id.clone().unwrap_or_else(|| id.to_string());
                let mut data = MemberData::new(member_id, self.guild_id.clone());
                data.apply(patch);
                Ok(Some(self.build(data)))
            })
            .await
    }

    /// Register a member with the API and cache it.
    #[instrument(skip(self, payload), fields(guild_id = %self.guild_id, member_id = ?payload.member_id()))]
    pub async fn create(&self, payload: MemberPatch) -> CardinalResult<Arc<Member>> {
        let member_id = payload
            .member_id
            .clone()
            .ok_or_else(|| ClientError::new(ClientErrorKind::MissingIdentifier("memberID")))?;
        let mut data = MemberData::new(member_id, self.guild_id.clone());
        data.apply(payload);

        let response = self.api.send(&self.collection(), Method::Post, &data).await?;
        data.apply(response.decode_or_default()?);
        debug!("Member created");

        Ok(self.store(data))
    }

    /// Reset every member of the guild on the server and drop the whole
    /// member cache. Returns how many cached members were dropped.
    #[instrument(skip(self), fields(guild_id = %self.guild_id))]
    pub async fn reset_members(&self) -> CardinalResult<usize> {
        let path = format!("{}reset", self.collection());
        self.api.request(&path, Method::Post, None).await?;
        let cleared = self.cache.clear();
        debug!(cleared, "Members reset");
        Ok(cleared)
    }

    /// The cached member, without fetching.
    pub fn cached(&self, id: &str) -> Option<Arc<Member>> {
        self.cache.get(&id.to_string())
    }

    /// Number of cached members.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no member is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

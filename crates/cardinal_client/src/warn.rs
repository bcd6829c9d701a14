//! Warnings issued to a member.

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

/// A warning as stored by the API.
///
/// The API spells the issuer fields `warnnerID` and `warnnedAt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct WarnData {
    /// Server-assigned identifier
    #[serde(rename = "warnID")]
    warn_id: u64,
    /// Warned member
    #[serde(rename = "memberID")]
    member_id: String,
    /// Guild the warning was issued in
    #[serde(rename = "guildID")]
    guild_id: String,
    /// Moderator who issued the warning
    #[serde(rename = "warnnerID")]
    warner_id: Option<String>,
    /// When the warning was issued
    #[serde(rename = "warnnedAt")]
    warned_at: DateTime<Utc>,
    /// Reason given
    warn_reason: Option<String>,
}

impl WarnData {
    fn new(warn_id: u64, member_id: String, guild_id: String) -> Self {
        Self {
            warn_id,
            member_id,
            guild_id,
            warner_id: None,
            warned_at: Utc::now(),
            warn_reason: None,
        }
    }

    /// Merge every field present in `patch`.
    pub fn apply(&mut self, patch: WarnPatch) {
        let WarnPatch {
            warn_id: _,
            warner_id,
            warned_at,
            warn_reason,
        } = patch;

        if let Some(value) = warner_id {
            self.warner_id = value;
        }
        if let Some(value) = warned_at {
            self.warned_at = value;
        }
        if let Some(value) = warn_reason {
            self.warn_reason = value;
        }
    }
}

/// Partial warning payload. The identifier is assigned by the server.
///
/// ```
/// use cardinal_client::WarnPatch;
///
/// let warn = WarnPatch::default()
///     .with_warner_id("42".to_string())
///     .with_warn_reason("spam".to_string());
///
/// let body = serde_json::to_value(&warn).unwrap();
/// assert_eq!(body["warnnerID"], "42");
/// assert_eq!(body["warnReason"], "spam");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, derive_setters::Setters)]
#[serde(default, rename_all = "camelCase")]
#[setters(prefix = "with_", strip_option, into)]
pub struct WarnPatch {
    #[serde(rename = "warnID", skip_serializing_if = "Option::is_none")]
    #[setters(skip)]
    warn_id: Option<u64>,
    #[serde(
        rename = "warnnerID",
        alias = "warnerID",
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    warner_id: Option<Option<String>>,
    #[serde(
        rename = "warnnedAt",
        alias = "warnedAt",
        deserialize_with = "timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    warned_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    warn_reason: Option<Option<String>>,
}

/// A warning issued to a member.
pub struct Warn {
    id: u64,
    guild_id: String,
    member_id: String,
    api: ApiHandle,
    owner: WeakEntityCache<Warn>,
    data: RwLock<WarnData>,
}

impl Entity for Warn {
    type Id = u64;
    const KIND: &'static str = "warn";

    fn id(&self) -> u64 {
        self.id
    }
}

impl Warn {
    fn new(data: WarnData, api: ApiHandle, owner: WeakEntityCache<Warn>) -> Self {
        Self {
            id: data.warn_id,
            guild_id: data.guild_id.clone(),
            member_id: data.member_id.clone(),
            api,
            owner,
            data: RwLock::new(data),
        }
    }

    /// Warning identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Identifier of the warned member.
    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    /// Identifier of the guild.
    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    /// Snapshot of the warning.
    pub fn data(&self) -> WarnData {
        self.data.read().clone()
    }

    /// Reason given, if any.
    pub fn reason(&self) -> Option<String> {
        self.data.read().warn_reason.clone()
    }

    fn replace(&self, data: WarnData) {
        *self.data.write() = data;
    }

    /// Delete the warning on the server and evict it from the member's
    /// warn cache.
    #[instrument(skip(self), fields(member_id = %self.member_id, warn_id = self.id))]
    pub async fn delete(&self) -> CardinalResult<bool> {
        let path = format!(
            "/guilds/{}/members/{}/warns/{}",
            self.guild_id, self.member_id, self.id
        );
        self.api.request(&path, Method::Delete, None).await?;
        let evicted = self.owner.remove_instance(&self.id, self);
        debug!(evicted, "Warn deleted");
        Ok(evicted)
    }
}

impl fmt::Debug for Warn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Warn").field(&*self.data.read()).finish()
    }
}

/// Cache-or-fetch gateway for the warnings of one member.
#[derive(Debug, Clone)]
pub struct WarnManager {
    api: ApiHandle,
    guild_id: String,
    member_id: String,
    cache: EntityCache<Warn>,
}

impl WarnManager {
    pub(crate) fn new(api: ApiHandle, guild_id: String, member_id: String) -> Self {
        Self {
            api,
            guild_id,
            member_id,
            cache: EntityCache::new(),
        }
    }

    fn collection(&self) -> String {
        format!("/guilds/{}/members/{}/warns/", self.guild_id, self.member_id)
    }

    fn data_from(&self, warn_id: u64, patch: WarnPatch) -> WarnData {
        let mut data = WarnData::new(warn_id, self.member_id.clone(), self.guild_id.clone());
        data.apply(patch);
        data
    }

    fn build(&self, data: WarnData) -> Warn {
        Warn::new(data, self.api.clone(), self.cache.downgrade())
    }

    fn store(&self, data: WarnData) -> Arc<Warn> {
        let replacement = data.clone();
        self.cache.upsert(
            data.warn_id,
            || self.build(data),
            |existing| existing.replace(replacement),
        )
    }

    /// Return the cached warning, or fetch it. `Ok(None)` on 404.
    #[instrument(skip(self), fields(member_id = %self.member_id))]
    pub async fn resolve(&self, id: u64) -> CardinalResult<Option<Arc<Warn>>> {
        let path = format!("{}{id}", self.collection());
        let path = path.as_str();

        self.cache
            .get_or_fetch(&id, move || async move {
                let Some(patch) = self.api.fetch_one::<WarnPatch>(path).await? else {
                    return Ok(None);
                };
                let data = self.data_from(patch.warn_id.unwrap_or(id), patch);
                Ok(Some(self.build(data)))
            })
            .await
    }

    /// All warnings of the member, in server order. Every returned warning
    /// is cached.
    #[instrument(skip(self), fields(member_id = %self.member_id))]
    pub async fn fetch(&self) -> CardinalResult<Vec<Arc<Warn>>> {
        let patches: Vec<WarnPatch> = self.api.fetch_all(&self.collection()).await?;

        // Nothing is cached unless every item carries its id.
        let records = patches
            .into_iter()
            .map(|patch| -> CardinalResult<WarnData> {
                let warn_id = patch
                    .warn_id
                    .ok_or_else(|| ClientError::new(ClientErrorKind::MissingIdentifier("warnID")))?;
                Ok(self.data_from(warn_id, patch))
            })
            .collect::<CardinalResult<Vec<_>>>()?;
        let warns: Vec<_> = records.into_iter().map(|data| self.store(data)).collect();

        debug!(count = warns.len(), "Fetched warns");
        Ok(warns)
    }

    /// Issue a warning and cache it under the identifier the server
    /// assigns.
    ///
    /// # Errors
    ///
    /// Fails if the request fails or the answer carries no `warnID`.
    #[instrument(skip(self, payload), fields(member_id = %self.member_id))]
    pub async fn create(&self, payload: WarnPatch) -> CardinalResult<Arc<Warn>> {
        let pending = self.data_from(0, payload);
        let mut body = serde_json::to_value(&pending).map_err(JsonError::from)?;
        if let Some(fields) = body.as_object_mut() {
            fields.remove("warnID");
        }

        let response = self
            .api
            .request(&self.collection(), Method::Post, Some(&body))
            .await?;
        let echoed: WarnPatch = response.decode_or_default()?;
        let warn_id = echoed
            .warn_id
            .ok_or_else(|| ClientError::new(ClientErrorKind::MissingIdentifier("warnID")))?;

        let mut data = pending;
        data.warn_id = warn_id;
        data.apply(echoed);
        debug!(warn_id, "Warn created");
        Ok(self.store(data))
    }

    /// The cached warning, without fetching.
    pub fn cached(&self, id: u64) -> Option<Arc<Warn>> {
        self.cache.get(&id)
    }

    /// Number of cached warnings.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no warning is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepts_both_spellings() {
        let doubled: WarnPatch = serde_json::from_value(json!({
            "warnID": 7,
            "warnnerID": "42",
            "warnnedAt": "2021-03-01T12:00:00Z",
        }))
        .unwrap();
        let single: WarnPatch = serde_json::from_value(json!({
            "warnID": 7,
            "warnerID": "42",
            "warnedAt": "2021-03-01T12:00:00Z",
        }))
        .unwrap();
        assert_eq!(doubled, single);
    }

    #[test]
    fn test_serializes_double_n_spelling() {
        let mut data = WarnData::new(7, "m".to_string(), "g".to_string());
        data.apply(WarnPatch::default().with_warner_id("42".to_string()));

        let body = serde_json::to_value(&data).unwrap();
        assert_eq!(body["warnnerID"], "42");
        assert!(body.get("warnnedAt").is_some());
        assert!(body["warnReason"].is_null());
    }
}

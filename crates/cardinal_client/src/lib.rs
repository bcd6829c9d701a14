//! Cardinal API client.
//!
//! A [`Client`] owns the [`GuildManager`]; every guild owns member, role
//! and channel managers, and every member owns warn and ban managers.
//! Managers resolve entities lazily and keep exactly one live instance
//! per identifier, so the same `Arc` is handed out for as long as the
//! entity stays cached.

#![warn(missing_docs)]

mod ban;
mod channel;
mod client;
mod guild;
mod handle;
mod leveling;
mod member;
mod role;
mod warn;
mod wire;

pub use ban::{Ban, BanData, BanManager, BanPatch};
pub use channel::{Channel, ChannelData, ChannelManager, ChannelPatch};
pub use client::Client;
pub use guild::{Guild, GuildData, GuildManager, GuildPatch};
pub use leveling::{level_for_xp, xp_for_level};
pub use member::{Member, MemberData, MemberManager, MemberPatch};
pub use role::{Role, RoleData, RoleManager, RolePatch};
pub use warn::{Warn, WarnData, WarnManager, WarnPatch};
pub use wire::{join_commands, split_commands};

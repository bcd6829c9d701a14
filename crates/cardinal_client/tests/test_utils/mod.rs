//! Test helpers for the client tests.
//!
//! Builds clients on top of the scripted transport and provides payloads
//! for the entities the tests work with.

#![allow(dead_code)]

use cardinal_api::ApiConfig;
use cardinal_client::{Client, Guild, Member};
use cardinal_interface::Method;
use serde_json::{Value, json};
use std::sync::Arc;

pub use cardinal_interface::testing::{MockResponse, MockTransport};

pub const GUILD: &str = "g1";
pub const MEMBER: &str = "m1";

/// A client sending everything through `transport`, with fast retries.
pub fn client_with(transport: &Arc<MockTransport>) -> Client {
    Client::with_transport(
        ApiConfig::default().with_retry_backoff_ms(1),
        transport.clone(),
    )
}

pub fn guild_path() -> String {
    format!("/guilds/{GUILD}")
}

pub fn member_path() -> String {
    format!("/guilds/{GUILD}/members/{MEMBER}")
}

pub fn guild_payload() -> Value {
    json!({
        "guildID": GUILD,
        "guildName": "Test Guild",
        "prefix": "!",
        "disabledCommands": "ban/kick/warn",
        "maxWarns": 5,
    })
}

pub fn member_payload(xp: u64, level: u32) -> Value {
    json!({
        "memberID": MEMBER,
        "guildID": GUILD,
        "joinedAt": "2021-03-01T12:00:00Z",
        "left": 0,
        "xp": xp,
        "level": level,
    })
}

/// Script the guild GET and resolve it.
pub async fn resolved_guild(transport: &Arc<MockTransport>, client: &Client) -> Arc<Guild> {
    transport.on(Method::Get, guild_path(), MockResponse::Json(guild_payload()));
    client
        .guilds()
        .resolve(GUILD)
        .await
        .expect("guild fetch should succeed")
        .expect("guild should exist")
}

/// Script guild and member GETs and resolve the member.
pub async fn resolved_member(
    transport: &Arc<MockTransport>,
    client: &Client,
    xp: u64,
    level: u32,
) -> Arc<Member> {
    let guild = resolved_guild(transport, client).await;
    transport.on(
        Method::Get,
        member_path(),
        MockResponse::Json(member_payload(xp, level)),
    );
    guild
        .members()
        .resolve(MEMBER)
        .await
        .expect("member fetch should succeed")
        .expect("member should exist")
}

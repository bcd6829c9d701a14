//! Identity, absence and eviction across every child manager.

mod test_utils;

use cardinal_interface::Method;
use serde_json::json;
use std::sync::Arc;
use test_utils::*;

fn role_path() -> String {
    format!("/guilds/{GUILD}/roles/r1")
}

fn channel_path() -> String {
    format!("/guilds/{GUILD}/channels/c1")
}

fn warn_path() -> String {
    format!("{}/warns/7", member_path())
}

#[tokio::test]
async fn test_member_resolve_twice_is_same_instance() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport);
    let first = resolved_member(&transport, &client, 0, 0).await;
    let guild = client.guilds().cached(GUILD).expect("guild cached");

    let second = guild
        .members()
        .resolve(MEMBER)
        .await
        .expect("cached resolve")
        .expect("member cached");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(transport.count(Method::Get, &member_path()), 1);
}

#[tokio::test]
async fn test_role_resolve_twice_is_same_instance() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport);
    let guild = resolved_guild(&transport, &client).await;
    transport.on(
        Method::Get,
        role_path(),
        MockResponse::Json(json!({ "roleID": "r1", "reward": 2 })),
    );

    let first = guild.roles().resolve("r1").await.expect("fetch").expect("role");
    let second = guild.roles().resolve("r1").await.expect("cached").expect("role");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.reward(), 2);
    assert_eq!(transport.count(Method::Get, &role_path()), 1);
}

#[tokio::test]
async fn test_channel_resolve_twice_is_same_instance() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport);
    let guild = resolved_guild(&transport, &client).await;
    transport.on(
        Method::Get,
        channel_path(),
        MockResponse::Json(json!({ "channelID": "c1" })),
    );

    let first = guild.channels().resolve("c1").await.expect("fetch").expect("channel");
    let second = guild.channels().resolve("c1").await.expect("cached").expect("channel");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(transport.count(Method::Get, &channel_path()), 1);
}

#[tokio::test]
async fn test_warn_resolve_twice_is_same_instance() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport);
    let member = resolved_member(&transport, &client, 0, 0).await;
    transport.on(
        Method::Get,
        warn_path(),
        MockResponse::Json(json!({ "warnID": 7, "warnReason": "spam" })),
    );

    let first = member.warns().resolve(7).await.expect("fetch").expect("warn");
    let second = member.warns().resolve(7).await.expect("cached").expect("warn");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.reason().as_deref(), Some("spam"));
    assert_eq!(transport.count(Method::Get, &warn_path()), 1);
}

#[tokio::test]
async fn test_child_not_found_is_none() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport);
    let member = resolved_member(&transport, &client, 0, 0).await;
    let guild = client.guilds().cached(GUILD).expect("guild cached");

    assert!(matches!(guild.members().resolve("ghost").await, Ok(None)));
    assert!(matches!(guild.roles().resolve("ghost").await, Ok(None)));
    assert!(matches!(guild.channels().resolve("ghost").await, Ok(None)));
    assert!(matches!(member.warns().resolve(404).await, Ok(None)));

    assert_eq!(guild.members().len(), 1);
    assert!(guild.roles().is_empty());
    assert!(guild.channels().is_empty());
    assert!(member.warns().is_empty());
}

#[tokio::test]
async fn test_member_delete_then_resolve_fetches_again() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport);
    let member = resolved_member(&transport, &client, 0, 0).await;
    let guild = client.guilds().cached(GUILD).expect("guild cached");
    transport.on(Method::Delete, member_path(), MockResponse::Empty);

    assert!(member.delete().await.expect("delete"));
    let again = guild
        .members()
        .resolve(MEMBER)
        .await
        .expect("refetch")
        .expect("member exists");

    assert!(!Arc::ptr_eq(&member, &again));
    assert_eq!(transport.count(Method::Get, &member_path()), 2);
}

#[tokio::test]
async fn test_role_delete_then_resolve_fetches_again() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport);
    let guild = resolved_guild(&transport, &client).await;
    transport
        .on(Method::Get, role_path(), MockResponse::Json(json!({ "roleID": "r1" })))
        .on(Method::Delete, role_path(), MockResponse::Empty);

    let role = guild.roles().resolve("r1").await.expect("fetch").expect("role");
    assert!(role.delete().await.expect("delete"));
    let again = guild.roles().resolve("r1").await.expect("refetch").expect("role");

    assert!(!Arc::ptr_eq(&role, &again));
    assert_eq!(transport.count(Method::Get, &role_path()), 2);
}

#[tokio::test]
async fn test_channel_delete_then_resolve_fetches_again() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport);
    let guild = resolved_guild(&transport, &client).await;
    transport
        .on(
            Method::Get,
            channel_path(),
            MockResponse::Json(json!({ "channelID": "c1" })),
        )
        .on(Method::Delete, channel_path(), MockResponse::Empty);

    let channel = guild.channels().resolve("c1").await.expect("fetch").expect("channel");
    assert!(channel.delete().await.expect("delete"));
    let again = guild.channels().resolve("c1").await.expect("refetch").expect("channel");

    assert!(!Arc::ptr_eq(&channel, &again));
    assert_eq!(transport.count(Method::Get, &channel_path()), 2);
}

#[tokio::test]
async fn test_warn_delete_then_resolve_fetches_again() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport);
    let member = resolved_member(&transport, &client, 0, 0).await;
    transport
        .on(Method::Get, warn_path(), MockResponse::Json(json!({ "warnID": 7 })))
        .on(Method::Delete, warn_path(), MockResponse::Empty);

    let warn = member.warns().resolve(7).await.expect("fetch").expect("warn");
    assert!(warn.delete().await.expect("delete"));
    let again = member.warns().resolve(7).await.expect("refetch").expect("warn");

    assert!(!Arc::ptr_eq(&warn, &again));
    assert_eq!(transport.count(Method::Get, &warn_path()), 2);
}

#[tokio::test]
async fn test_stale_delete_keeps_fresh_instance() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport);
    let stale = resolved_member(&transport, &client, 0, 0).await;
    let guild = client.guilds().cached(GUILD).expect("guild cached");
    transport.on(Method::Delete, member_path(), MockResponse::Empty);

    assert!(stale.delete().await.expect("first delete"));
    let fresh = guild
        .members()
        .resolve(MEMBER)
        .await
        .expect("refetch")
        .expect("member exists");

    assert!(!stale.delete().await.expect("second delete"));
    let cached = guild.members().cached(MEMBER).expect("fresh member stays cached");
    assert!(Arc::ptr_eq(&cached, &fresh));
}

#[tokio::test]
async fn test_concurrent_member_resolve_issues_one_request() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport);
    let guild = resolved_guild(&transport, &client).await;
    transport.on(
        Method::Get,
        member_path(),
        MockResponse::Json(member_payload(0, 0)),
    );

    let members = guild.members();
    let (a, b) = tokio::join!(members.resolve(MEMBER), members.resolve(MEMBER));
    let a = a.expect("first resolve").expect("first member");
    let b = b.expect("second resolve").expect("second member");

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(transport.count(Method::Get, &member_path()), 1);
}

use serde_json::json;

use crate::*;

#[tokio::test]
async fn unknown_command_gets_error_reply() -> Result<()> {
    let relay = Relay::start().await?;
    let c = relay.client().await?;
    let reply = c.request(json!({ "Type": "Teleport", "Where": "moon" })).await?;
    expect_fail(&reply, "Error", "Unknown command")
}

#[tokio::test]
async fn malformed_datagrams_get_error_reply_and_relay_keeps_going() -> Result<()> {
    let relay = Relay::start().await?;
    let c = relay.client().await?;

    for junk in [
        &b"\xff\xfe\x00"[..],
        &b"{\"Type\":"[..],
        &b"{\"Type\":\"Login\"}"[..],
        &b"[]"[..],
    ] {
        c.send_raw(junk).await?;
        let reply = c.recv().await?;
        expect_fail(&reply, "Error", "Malformed request")?;
    }

    // Still serving.
    expect_success(&c.register("alice").await?)
}

#[tokio::test]
async fn blank_search_query_fails() -> Result<()> {
    let relay = Relay::start().await?;
    let c = relay.client().await?;
    let reply = c
        .request(json!({ "Type": "SearchContacts", "Query": "   " }))
        .await?;
    expect_fail(&reply, "SearchContactsResult", "Search query is empty")
}

#[tokio::test]
async fn unknown_owner_queries_fail() -> Result<()> {
    let relay = Relay::start().await?;
    let c = relay.client().await?;
    let reply = c
        .request(json!({ "Type": "GetContacts", "OwnerLogin": "ghost" }))
        .await?;
    expect_fail(&reply, "GetContactsResult", "User not found")?;

    let reply = c
        .request(json!({ "Type": "GetHistory", "SenderLogin": "ghost" }))
        .await?;
    expect_fail(&reply, "GetHistoryResult", "User not found")
}

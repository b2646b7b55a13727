use serde_json::json;

use crate::*;

#[tokio::test]
async fn direct_message_is_delivered_exactly_once() -> Result<()> {
    let relay = Relay::start().await?;
    let alice = relay.online_user("alice").await?;
    let bob = relay.online_user("bob").await?;

    alice.send_message("alice", &["bob", "bob"], "hello bob").await?;

    let msg = bob.recv().await?;
    assert_eq!(msg["Type"], "ReceiveMessage");
    assert_eq!(msg["From"], "alice");
    assert_eq!(msg["Text"], "hello bob");
    assert!(msg["Timestamp"].is_string());

    bob.expect_nothing().await?;
    alice.expect_nothing().await?;

    let reply = bob
        .request(json!({ "Type": "GetHistory", "SenderLogin": "bob", "ContactLogin": "alice" }))
        .await?;
    assert_eq!(reply["Type"], "GetHistoryResult");
    let messages = reply["Data"]["Messages"].as_array().context("no Messages")?;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["From"], "alice");
    assert_eq!(messages[0]["To"], "bob");
    Ok(())
}

#[tokio::test]
async fn offline_recipient_finds_message_in_history() -> Result<()> {
    let relay = Relay::start().await?;
    let alice = relay.online_user("alice").await?;
    let bob = relay.client().await?;
    expect_success(&bob.register("bob").await?)?;

    alice.send_message("alice", &["bob"], "read this later").await?;
    bob.expect_nothing().await?;

    expect_success(&bob.login("bob").await?)?;
    let reply = bob
        .request(json!({ "Type": "GetHistory", "SenderLogin": "bob" }))
        .await?;
    let messages = reply["Data"]["Messages"].as_array().context("no Messages")?;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["Text"], "read this later");
    Ok(())
}

#[tokio::test]
async fn group_send_reaches_every_other_online_user() -> Result<()> {
    let relay = Relay::start().await?;
    let alice = relay.online_user("alice").await?;
    let bob = relay.online_user("bob").await?;
    let carol = relay.online_user("carol").await?;
    let dave = relay.online_user("dave").await?;

    alice.send_message("alice", &["Group"], "hi all").await?;

    for peer in [&bob, &carol, &dave] {
        let msg = peer.recv().await?;
        assert_eq!(msg["Type"], "ReceiveMessage");
        assert_eq!(msg["Text"], "hi all");
        peer.expect_nothing().await?;
    }
    alice.expect_nothing().await?;

    let reply = carol
        .request(json!({ "Type": "GetHistory", "SenderLogin": "carol", "ContactLogin": "Group" }))
        .await?;
    let messages = reply["Data"]["Messages"].as_array().context("no Messages")?;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["To"], "Group");
    assert_eq!(messages[0]["From"], "alice");
    Ok(())
}

#[tokio::test]
async fn sending_while_logged_out_fails() -> Result<()> {
    let relay = Relay::start().await?;
    let alice = relay.client().await?;
    expect_success(&alice.register("alice").await?)?;
    let _bob = relay.online_user("bob").await?;

    alice.send_message("alice", &["bob"], "psst").await?;
    let reply = alice.recv().await?;
    expect_fail(&reply, "SendMessageResult", "Sender is not logged in")
}

#[tokio::test]
async fn message_search() -> Result<()> {
    let relay = Relay::start().await?;
    let alice = relay.online_user("alice").await?;
    let bob = relay.online_user("bob").await?;

    alice.send_message("alice", &["bob"], "Pizza tonight?").await?;
    bob.recv().await?;
    bob.send_message("bob", &["alice"], "pizza sounds great").await?;
    alice.recv().await?;

    let reply = alice
        .request(json!({ "Type": "SearchMessages", "Query": "pizza" }))
        .await?;
    assert_eq!(reply["Type"], "SearchMessagesResult");
    assert_eq!(reply["Data"]["Messages"].as_array().map(Vec::len), Some(2));

    let reply = alice
        .request(json!({ "Type": "SearchMessages", "Query": "pizza", "SenderLogin": "bob" }))
        .await?;
    let found = reply["Data"]["Messages"].as_array().context("no Messages")?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["From"], "bob");

    let reply = alice
        .request(json!({ "Type": "SearchContacts", "Query": "bo" }))
        .await?;
    assert_eq!(reply["Data"]["Results"], json!(["bob"]));
    Ok(())
}

use serde_json::json;

use crate::*;

#[tokio::test]
async fn blocked_pair_cannot_message_either_way() -> Result<()> {
    let relay = Relay::start().await?;
    let alice = relay.online_user("alice").await?;
    let bob = relay.online_user("bob").await?;

    let reply = bob
        .request(json!({ "Type": "AddToBlacklist", "OwnerLogin": "bob", "ContactLogin": "alice" }))
        .await?;
    assert_eq!(reply["Type"], "AddToBlacklistResult");
    expect_success(&reply)?;

    alice.send_message("alice", &["bob"], "hey").await?;
    bob.expect_nothing().await?;
    alice.expect_nothing().await?;

    bob.send_message("bob", &["alice"], "go away").await?;
    alice.expect_nothing().await?;

    alice.send_message("alice", &["Group"], "anyone?").await?;
    bob.expect_nothing().await?;

    let reply = alice
        .request(json!({ "Type": "GetHistory", "SenderLogin": "alice", "ContactLogin": "bob" }))
        .await?;
    assert_eq!(reply["Data"]["Messages"], json!([]));
    Ok(())
}

#[tokio::test]
async fn blocked_user_cannot_be_added_as_contact() -> Result<()> {
    let relay = Relay::start().await?;
    let alice = relay.online_user("alice").await?;
    let bob = relay.online_user("bob").await?;

    expect_success(
        &bob.request(json!({ "Type": "AddToBlacklist", "OwnerLogin": "bob", "ContactLogin": "alice" }))
            .await?,
    )?;

    let reply = alice
        .request(json!({ "Type": "AddContact", "OwnerLogin": "alice", "ContactLogin": "bob" }))
        .await?;
    expect_fail(&reply, "AddContactResult", "This user is blacklisted")
}

#[tokio::test]
async fn unblocking_restores_delivery() -> Result<()> {
    let relay = Relay::start().await?;
    let alice = relay.online_user("alice").await?;
    let bob = relay.online_user("bob").await?;

    expect_success(
        &bob.request(json!({ "Type": "AddToBlacklist", "OwnerLogin": "bob", "ContactLogin": "alice" }))
            .await?,
    )?;
    let reply = bob
        .request(json!({ "Type": "GetBlacklist", "OwnerLogin": "bob" }))
        .await?;
    assert_eq!(reply["Data"]["Blacklist"], json!(["alice"]));

    expect_success(
        &bob.request(json!({ "Type": "RemoveFromBlacklist", "OwnerLogin": "bob", "ContactLogin": "alice" }))
            .await?,
    )?;

    alice.send_message("alice", &["bob"], "friends again?").await?;
    let msg = bob.recv().await?;
    assert_eq!(msg["Text"], "friends again?");
    Ok(())
}

use serde_json::json;

use crate::*;

#[tokio::test]
async fn register_login_logout() -> Result<()> {
    let relay = Relay::start().await?;
    let alice = relay.client().await?;

    let reply = alice.register("alice").await?;
    assert_eq!(reply["Type"], "RegisterResult");
    expect_success(&reply)?;

    let reply = alice.login("alice").await?;
    assert_eq!(reply["Type"], "LoginResult");
    expect_success(&reply)?;

    let reply = alice.logout("alice").await?;
    assert_eq!(reply["Type"], "LogoutResult");
    expect_success(&reply)?;

    let reply = alice.logout("alice").await?;
    expect_fail(&reply, "LogoutResult", "User is not logged in")
}

#[tokio::test]
async fn duplicate_login_is_rejected_without_touching_the_account() -> Result<()> {
    let relay = Relay::start().await?;
    let first = relay.client().await?;
    expect_success(&first.register("alice").await?)?;

    let second = relay.client().await?;
    let reply = second
        .request(json!({
            "Type": "Register",
            "Login": "alice",
            "Email": "someone-else@example.com",
            "Password": "another-password",
            "PasswordConfirm": "another-password",
        }))
        .await?;
    expect_fail(&reply, "RegisterResult", "Login is already taken")?;

    // Original credentials still work.
    expect_success(&first.login("alice").await?)
}

#[tokio::test]
async fn register_validation_reasons() -> Result<()> {
    let relay = Relay::start().await?;
    let c = relay.client().await?;

    let reply = c
        .request(json!({
            "Type": "Register", "Login": "bob", "Email": "bob@example.com",
            "Password": "password123", "PasswordConfirm": "password124",
        }))
        .await?;
    expect_fail(&reply, "RegisterResult", "Passwords do not match")?;

    let reply = c
        .request(json!({
            "Type": "Register", "Login": "bob", "Email": "bob@example.com",
            "Password": "short", "PasswordConfirm": "short",
        }))
        .await?;
    expect_fail(&reply, "RegisterResult", "Password must be at least 8 characters")?;

    let reply = c
        .request(json!({
            "Type": "Register", "Login": "bob", "Email": "bob.example.com",
            "Password": "password123", "PasswordConfirm": "password123",
        }))
        .await?;
    expect_fail(&reply, "RegisterResult", "Invalid email format")
}

#[tokio::test]
async fn wrong_password_is_rejected() -> Result<()> {
    let relay = Relay::start().await?;
    let alice = relay.client().await?;
    expect_success(&alice.register("alice").await?)?;

    let reply = alice
        .request(json!({ "Type": "Login", "Login": "alice", "Password": "not-the-password" }))
        .await?;
    expect_fail(&reply, "LoginResult", "Invalid login or password")?;

    let reply = alice
        .request(json!({ "Type": "Login", "Login": "nobody", "Password": PASSWORD }))
        .await?;
    expect_fail(&reply, "LoginResult", "Invalid login or password")
}

#[tokio::test]
async fn relogin_from_new_address_moves_delivery() -> Result<()> {
    let relay = Relay::start().await?;
    let bob = relay.online_user("bob").await?;
    let alice_a1 = relay.online_user("alice").await?;

    let alice_a2 = relay.client().await?;
    expect_success(&alice_a2.login("alice").await?)?;

    bob.send_message("bob", &["alice"], "where are you?").await?;

    let msg = alice_a2.recv().await?;
    assert_eq!(msg["Type"], "ReceiveMessage");
    assert_eq!(msg["From"], "bob");
    assert_eq!(msg["Text"], "where are you?");
    alice_a1.expect_nothing().await
}

#[tokio::test]
async fn contacts_hear_about_presence_changes() -> Result<()> {
    let relay = Relay::start().await?;
    let bob = relay.online_user("bob").await?;

    let alice = relay.client().await?;
    expect_success(&alice.register("alice").await?)?;
    let reply = alice
        .request(json!({ "Type": "AddContact", "OwnerLogin": "alice", "ContactLogin": "bob" }))
        .await?;
    assert_eq!(reply["Type"], "AddContactResult");
    expect_success(&reply)?;

    let reply = alice
        .request(json!({ "Type": "GetContacts", "OwnerLogin": "alice" }))
        .await?;
    assert_eq!(reply["Data"]["Contacts"], json!(["bob"]));

    expect_success(&alice.login("alice").await?)?;
    assert_eq!(bob.recv().await?, json!({ "Type": "UserOnline", "Login": "alice" }));

    expect_success(&alice.logout("alice").await?)?;
    assert_eq!(bob.recv().await?, json!({ "Type": "UserOffline", "Login": "alice" }));
    Ok(())
}

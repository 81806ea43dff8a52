use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;

use social_connect::connect::{Connection, ConnectionFactory, ConnectionKey};
use social_connect::error::ConnectError;
use social_connect::repositories::ConnectionSignUp;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{facebook_data, facebook_factory, twitter_data, twitter_factory, users_repository};

#[tokio::test]
async fn user_ids_with_connection_are_ascending() -> Result<()> {
    let users = users_repository().await?;
    let facebook = facebook_factory();
    let connection = facebook.create_connection(facebook_data("9"));

    users
        .create_connection_repository("1")?
        .add_connection(&connection)
        .await?;
    let equivalent = facebook.create_connection(facebook_data("9"));
    assert_eq!(users.find_user_ids_with_connection(&equivalent).await?, vec!["1"]);

    users
        .create_connection_repository("2")?
        .add_connection(&connection)
        .await?;
    assert_eq!(
        users.find_user_ids_with_connection(&equivalent).await?,
        vec!["1", "2"]
    );
    Ok(())
}

#[tokio::test]
async fn unknown_connection_without_sign_up_has_no_users() -> Result<()> {
    let users = users_repository().await?;
    let connection = twitter_factory().create_connection(twitter_data("stranger"));

    assert!(users.find_user_ids_with_connection(&connection).await?.is_empty());
    Ok(())
}

struct CountingSignUp {
    calls: AtomicUsize,
    user_id: Option<&'static str>,
}

#[async_trait]
impl ConnectionSignUp for CountingSignUp {
    async fn execute(&self, _connection: &Connection) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.user_id.map(str::to_string)
    }
}

#[tokio::test]
async fn sign_up_creates_user_and_stores_connection() -> Result<()> {
    let sign_up = Arc::new(CountingSignUp {
        calls: AtomicUsize::new(0),
        user_id: Some("new-user"),
    });
    let users = users_repository()
        .await?
        .with_connection_sign_up(sign_up.clone());
    let connection = twitter_factory().create_connection(twitter_data("newcomer"));

    assert_eq!(
        users.find_user_ids_with_connection(&connection).await?,
        vec!["new-user"]
    );
    let stored = users
        .create_connection_repository("new-user")?
        .get_connection(&ConnectionKey::new("twitter", "newcomer"))
        .await?;
    assert_eq!(stored.create_data(), twitter_data("newcomer"));

    // Linked now, so the hook is not consulted again.
    assert_eq!(
        users.find_user_ids_with_connection(&connection).await?,
        vec!["new-user"]
    );
    assert_eq!(sign_up.calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn declined_sign_up_stores_nothing() -> Result<()> {
    let users = users_repository().await?.with_connection_sign_up(Arc::new(CountingSignUp {
        calls: AtomicUsize::new(0),
        user_id: None,
    }));
    let connection = twitter_factory().create_connection(twitter_data("declined"));

    assert!(users.find_user_ids_with_connection(&connection).await?.is_empty());
    assert!(users.find_user_ids_with_connection(&connection).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn user_ids_connected_to_any_provider_user() -> Result<()> {
    let users = users_repository().await?;
    let twitter = twitter_factory();
    users
        .create_connection_repository("carol")?
        .add_connection(&twitter.create_connection(twitter_data("a")))
        .await?;
    users
        .create_connection_repository("alice")?
        .add_connection(&twitter.create_connection(twitter_data("b")))
        .await?;
    users
        .create_connection_repository("alice")?
        .add_connection(&twitter.create_connection(twitter_data("a")))
        .await?;
    users
        .create_connection_repository("bob")?
        .add_connection(&twitter.create_connection(twitter_data("z")))
        .await?;

    let wanted: HashSet<String> = ["a", "b", "missing"].iter().map(|s| s.to_string()).collect();
    let found = users.find_user_ids_connected_to("twitter", &wanted).await?;
    let expected: BTreeSet<String> = ["alice", "carol"].iter().map(|s| s.to_string()).collect();
    assert_eq!(found, expected);

    assert!(
        users
            .find_user_ids_connected_to("facebook", &wanted)
            .await?
            .is_empty()
    );
    assert!(
        users
            .find_user_ids_connected_to("twitter", &HashSet::new())
            .await?
            .is_empty()
    );
    Ok(())
}

#[tokio::test]
async fn empty_user_id_is_rejected() -> Result<()> {
    let users = users_repository().await?;
    assert!(matches!(
        users.create_connection_repository(""),
        Err(ConnectError::IllegalArgument(_))
    ));
    Ok(())
}

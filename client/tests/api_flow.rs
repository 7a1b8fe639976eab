use std::sync::Arc;

use home_economy_client::error::FALLBACK_MESSAGE;
use home_economy_client::{ApiClient, ApiError, AuthContext, FileTokenStore, MemoryTokenStore, QueryClient, TokenStore};
use home_economy_server::backend::storage::DbConnection;
use home_economy_server::{create_router, AppState, ServerConfig};
use shared::{
    AuthTokens, ChoreListRequest, ChoreStatus, CreateChoreRequest, CreateRewardRequest, CreateUserRequest,
    LoginRequest, RedeemRewardRequest, RegisterRequest, Role, TransactionListRequest,
};
use tempfile::TempDir;

/// Serve a fresh in-memory backend on an ephemeral port
async fn spawn_server() -> String {
    let config = ServerConfig::default();
    let db = DbConnection::init_in_memory().await.unwrap();
    let app = create_router(AppState::new(db, &config), &config.cors_origin).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::with_base_url(base_url, Arc::new(MemoryTokenStore::new())).unwrap()
}

fn registration() -> RegisterRequest {
    RegisterRequest {
        household_name: "The Parkers".to_string(),
        name: "Robin".to_string(),
        email: "robin@example.com".to_string(),
        password: "password123".to_string(),
    }
}

async fn add_child(parent: &ApiClient, base_url: &str) -> AuthContext {
    parent
        .create_user(&CreateUserRequest {
            name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
            password: "password123".to_string(),
            role: Role::Child,
        })
        .await
        .unwrap();

    let kid = AuthContext::new(client(base_url));
    kid.login("sam@example.com", "password123").await.unwrap();
    kid
}

#[tokio::test]
async fn test_chore_to_reward_flow() {
    let base_url = spawn_server().await;
    let parent = AuthContext::new(client(&base_url));
    parent.register(&registration()).await.unwrap();
    assert!(parent.is_parent());

    let kid = add_child(parent.api(), &base_url).await;
    assert!(!kid.is_parent());
    let kid_id = kid.current_user().unwrap().id;

    let chore = parent
        .api()
        .create_chore(&CreateChoreRequest {
            title: "Walk the dog".to_string(),
            description: String::new(),
            points: 30,
            money_reward: 1.5,
            due_date: None,
            assignee_id: Some(kid_id.clone()),
        })
        .await
        .unwrap();

    let completed = kid.api().complete_chore(&chore.id).await.unwrap();
    assert_eq!(completed.status, ChoreStatus::Completed);

    let approved = parent.api().approve_chore(&chore.id).await.unwrap();
    assert_eq!(approved.transaction.points_balance, 30);

    let reward = parent
        .api()
        .create_reward(&CreateRewardRequest {
            title: "Extra screen time".to_string(),
            description: String::new(),
            cost_points: 25,
            cost_money: 0.0,
        })
        .await
        .unwrap();

    let redeemed = kid
        .api()
        .redeem_reward(&reward.id, &RedeemRewardRequest::default())
        .await
        .unwrap();
    assert_eq!(redeemed.transaction.points_balance, 5);

    let err = kid
        .api()
        .redeem_reward(&reward.id, &RedeemRewardRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.user_message(), "Not enough points");

    let me = kid.reload().await.unwrap();
    assert_eq!(me.points_balance, 5);
    assert_eq!(me.money_balance, 1.5);
}

#[tokio::test]
async fn test_error_messages_come_from_the_server() {
    let base_url = spawn_server().await;
    let api = client(&base_url);
    api.register(&registration()).await.unwrap();

    let err = api
        .login(&LoginRequest { email: "robin@example.com".to_string(), password: "nope-nope".to_string() })
        .await
        .unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid email or password");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let err = api.get_chore("chore::missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_ne!(err.user_message(), FALLBACK_MESSAGE);
}

#[tokio::test]
async fn test_expired_access_token_is_refreshed_once() {
    let base_url = spawn_server().await;
    let store = Arc::new(MemoryTokenStore::new());
    let api = ApiClient::with_base_url(&base_url, store.clone()).unwrap();
    let registered = api.register(&registration()).await.unwrap();

    // Break the access token but keep the refresh token
    let mut tokens = store.load().unwrap().unwrap();
    tokens.access_token = "stale".to_string();
    store.save(&tokens).unwrap();

    let me = api.me().await.unwrap();
    assert_eq!(me.id, registered.user.id);

    let rotated = store.load().unwrap().unwrap();
    assert_ne!(rotated.access_token, "stale");
    assert_ne!(rotated.refresh_token, registered.tokens.refresh_token);
}

#[tokio::test]
async fn test_refused_refresh_clears_session() {
    let base_url = spawn_server().await;
    let store = Arc::new(MemoryTokenStore::new());
    let api = ApiClient::with_base_url(&base_url, store.clone()).unwrap();
    api.register(&registration()).await.unwrap();

    store
        .save(&AuthTokens {
            access_token: "stale".to_string(),
            refresh_token: "also-stale".to_string(),
            access_expires_at: "2000-01-01T00:00:00.000Z".to_string(),
            refresh_expires_at: "2000-01-01T00:00:00.000Z".to_string(),
        })
        .unwrap();

    let err = api.list_chores(&ChoreListRequest::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(store.load().unwrap().is_none());

    let err = api.me().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
}

#[tokio::test]
async fn test_session_restores_from_file_and_logs_out() {
    let base_url = spawn_server().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tokens.json");

    let first = AuthContext::new(
        ApiClient::with_base_url(&base_url, Arc::new(FileTokenStore::new(&path))).unwrap(),
    );
    let user = first.register(&registration()).await.unwrap();
    assert!(path.exists());

    let second = AuthContext::new(
        ApiClient::with_base_url(&base_url, Arc::new(FileTokenStore::new(&path))).unwrap(),
    );
    assert!(second.current_user().is_none());
    let restored = second.restore().await.unwrap().unwrap();
    assert_eq!(restored.id, user.id);

    second.logout().await;
    assert!(second.current_user().is_none());
    assert!(!path.exists());

    // The server session is gone too
    let err = first.api().me().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(first.restore().await.unwrap().is_none());
}

#[tokio::test]
async fn test_query_cache_refetches_after_mutation() {
    let base_url = spawn_server().await;
    let parent = client(&base_url);
    parent.register(&registration()).await.unwrap();
    let kid = add_child(&parent, &base_url).await;
    let kid_id = kid.current_user().unwrap().id;

    let queries = QueryClient::new(parent.clone());
    let before = queries.summary(&kid_id).await.unwrap();
    assert_eq!(before.points_balance, 0);

    let chore = queries
        .create_chore(&CreateChoreRequest {
            title: "Tidy room".to_string(),
            description: String::new(),
            points: 15,
            money_reward: 0.0,
            due_date: None,
            assignee_id: None,
        })
        .await
        .unwrap();
    let open = queries.chores(&ChoreListRequest::default()).await.unwrap();
    assert_eq!(open.chores.len(), 1);

    kid.api().complete_chore(&chore.id).await.unwrap();
    queries.approve_chore(&chore.id).await.unwrap();

    let after = queries.summary(&kid_id).await.unwrap();
    assert_eq!(after.points_balance, 15);
    let chores = queries.chores(&ChoreListRequest::default()).await.unwrap();
    assert_eq!(chores.chores[0].status, ChoreStatus::Approved);

    assert!(queries.rewards(false).await.unwrap().rewards.is_empty());
    let reward = queries
        .create_reward(&CreateRewardRequest {
            title: "Ice cream".to_string(),
            description: String::new(),
            cost_points: 10,
            cost_money: 0.0,
        })
        .await
        .unwrap();
    let rewards = queries.rewards(false).await.unwrap();
    assert_eq!(rewards.rewards.len(), 1);
    assert_eq!(rewards.rewards[0].id, reward.id);

    queries.delete_chore(&chore.id).await.unwrap();
    assert!(queries.chores(&ChoreListRequest::default()).await.unwrap().chores.is_empty());

    assert_eq!(queries.users().await.unwrap().users.len(), 2);
    let history = queries.transactions(&TransactionListRequest::default()).await.unwrap();
    assert_eq!(history.transactions.len(), 1);
    queries.delete_user(&kid_id).await.unwrap();
    assert_eq!(queries.users().await.unwrap().users.len(), 1);
    let history = queries.transactions(&TransactionListRequest::default()).await.unwrap();
    assert!(history.transactions.is_empty());
}

#[tokio::test]
async fn test_switching_user_drops_cached_reads() {
    let base_url = spawn_server().await;
    let session = AuthContext::new(client(&base_url));
    session.register(&registration()).await.unwrap();

    let robins = session.queries().users().await.unwrap();
    assert_eq!(robins.users.len(), 1);
    assert_eq!(robins.users[0].name, "Robin");

    session.logout().await;
    session
        .register(&RegisterRequest {
            household_name: "The Lees".to_string(),
            name: "Lee".to_string(),
            email: "lee@example.com".to_string(),
            password: "password123".to_string(),
        })
        .await
        .unwrap();

    let lees = session.queries().users().await.unwrap();
    assert_eq!(lees.users.len(), 1);
    assert_eq!(lees.users[0].name, "Lee");

    // Logging in over a live session switches the cache too
    session.login("robin@example.com", "password123").await.unwrap();
    assert_eq!(session.queries().users().await.unwrap().users[0].name, "Robin");
}

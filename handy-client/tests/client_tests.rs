//! Client against a live in-process API server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use handy_api::auth::FixedClock;
use handy_api::{
    generate_jwt_token, ApiConfig, AuthConfig, ErrorCode, IdentityGateway, JwtIdentityGateway,
    SecureRouterBuilder,
};
use handy_client::{
    spawn_realtime, ApiClientError, BackoffConfig, ClientConfig, HandyClient,
};
use handy_core::{TaskQuery, TaskStatus, UserRole};
use handy_events::{MarketEvent, ServerFrame, Topic};
use handy_market::{NewApplication, NewMessage};
use handy_test_utils::fixtures;
use tokio::sync::mpsc;

const SECRET: &str = "client-test-secret-0123456789abcdefgh";

struct Server {
    addr: SocketAddr,
    auth: AuthConfig,
}

impl Server {
    async fn start() -> Result<Self, String> {
        let marketplace = fixtures::seeded_marketplace();
        let auth = AuthConfig::with_secret(SECRET, Arc::new(FixedClock(1_760_000_000)))
            .map_err(|e| e.to_string())?;
        let mut api_config = ApiConfig::default();
        api_config.rate_limit_enabled = false;
        let gateway: Arc<dyn IdentityGateway> = Arc::new(JwtIdentityGateway::new(auth.clone()));
        let router = SecureRouterBuilder::new(marketplace, api_config, gateway).build();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| e.to_string())?;
        let addr = listener.local_addr().map_err(|e| e.to_string())?;
        tokio::spawn(async move {
            let _ = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await;
        });
        Ok(Self { addr, auth })
    }

    fn client(&self, role: UserRole, name: &str) -> Result<HandyClient, String> {
        let ctx = fixtures::caller(role, name);
        let token = generate_jwt_token(&self.auth, ctx.user_id, &ctx.email, ctx.role)
            .map_err(|e| e.to_string())?;
        let backoff = BackoffConfig {
            initial_ms: 10,
            max_ms: 100,
            multiplier: 2.0,
            jitter_ms: 0,
        };
        let config = ClientConfig {
            api_base_url: format!("http://{}", self.addr),
            ws_endpoint: format!("ws://{}/api/v1/ws", self.addr),
            token: Some(token),
            request_timeout_ms: 5_000,
            max_retries: 2,
            retry: backoff.clone(),
            reconnect: backoff,
        };
        HandyClient::new(&config).map_err(|e| e.to_string())
    }
}

#[tokio::test]
async fn test_post_apply_accept_through_client() -> Result<(), String> {
    let server = Server::start().await?;
    let poster = server.client(UserRole::Poster, "pat")?;
    let helper = server.client(UserRole::Helper, "hana")?;

    poster.rest().whoami().await.map_err(|e| e.to_string())?;
    let helper_id = helper
        .rest()
        .whoami()
        .await
        .map_err(|e| e.to_string())?
        .profile
        .user_id;
    assert_eq!(
        helper.session().current().and_then(|s| s.user_id),
        Some(helper_id)
    );

    let task = poster
        .rest()
        .create_task(&fixtures::ac_check_draft())
        .await
        .map_err(|e| e.to_string())?;

    let page = helper
        .rest()
        .search_tasks(&TaskQuery {
            zip_code: Some("78701".to_string()),
            ..Default::default()
        })
        .await
        .map_err(|e| e.to_string())?;
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.next_offset, None);

    let application = helper
        .rest()
        .apply(
            task.id,
            &NewApplication {
                message: None,
                bid_amount: 48.0,
            },
        )
        .await
        .map_err(|e| e.to_string())?;

    let accepted = poster
        .rest()
        .accept_application(application.id)
        .await
        .map_err(|e| e.to_string())?;
    assert_eq!(accepted.task.status, TaskStatus::InProgress);
    assert_eq!(accepted.task.helper_id, Some(helper_id));

    // A second accept surfaces the server's error code.
    let err = poster
        .rest()
        .accept_application(application.id)
        .await
        .err()
        .ok_or("second accept must fail")?;
    assert_eq!(err.api_error().map(|e| e.code), Some(ErrorCode::StateConflict));

    let mine = helper
        .rest()
        .my_applications(None)
        .await
        .map_err(|e| e.to_string())?;
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].task.id, task.id);
    Ok(())
}

#[tokio::test]
async fn test_cleared_session_stops_requests() -> Result<(), String> {
    let server = Server::start().await?;
    let client = server.client(UserRole::Helper, "hana")?;
    client.rest().categories().await.map_err(|e| e.to_string())?;

    client.session().clear();
    let err = client.rest().categories().await.err().ok_or("must fail")?;
    assert!(matches!(err, ApiClientError::NotLoggedIn));

    // A refreshed token with a bad signature is rejected by the server.
    client.session().refresh("not-a-token");
    let err = client.rest().categories().await.err().ok_or("must fail")?;
    assert_eq!(err.api_error().map(|e| e.code), Some(ErrorCode::InvalidToken));
    Ok(())
}

#[tokio::test]
async fn test_unreachable_server_fails_after_retries() -> Result<(), String> {
    let backoff = BackoffConfig {
        initial_ms: 1,
        max_ms: 2,
        multiplier: 2.0,
        jitter_ms: 0,
    };
    let config = ClientConfig {
        api_base_url: "http://127.0.0.1:9".to_string(),
        ws_endpoint: "ws://127.0.0.1:9/api/v1/ws".to_string(),
        token: None,
        request_timeout_ms: 500,
        max_retries: 2,
        retry: backoff.clone(),
        reconnect: backoff,
    };
    let client = HandyClient::new(&config).map_err(|e| e.to_string())?;
    client.session().refresh("token");
    let err = client.rest().categories().await.err().ok_or("must fail")?;
    assert!(matches!(err, ApiClientError::Http(_)));
    Ok(())
}

#[tokio::test]
async fn test_realtime_inbox_receives_messages() -> Result<(), String> {
    let server = Server::start().await?;
    let poster = server.client(UserRole::Poster, "pat")?;
    let helper = server.client(UserRole::Helper, "hana")?;
    poster.rest().whoami().await.map_err(|e| e.to_string())?;
    let helper_id = helper
        .rest()
        .whoami()
        .await
        .map_err(|e| e.to_string())?
        .profile
        .user_id;

    let (tx, mut rx) = mpsc::channel(16);
    let worker = spawn_realtime(helper.realtime().clone(), vec![Topic::Inbox(helper_id)], tx);

    // Wait until the subscription is live before sending.
    loop {
        match tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .map_err(|_| "timed out waiting for subscription")?
        {
            Some(ServerFrame::Subscribed { .. }) => break,
            Some(_) => continue,
            None => return Err("realtime worker stopped".to_string()),
        }
    }

    poster
        .rest()
        .send_message(&NewMessage {
            recipient_id: helper_id,
            content: "Can you come at 9?".to_string(),
            task_id: None,
            attachments: Vec::new(),
        })
        .await
        .map_err(|e| e.to_string())?;

    let received = loop {
        match tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .map_err(|_| "timed out waiting for the message")?
        {
            Some(ServerFrame::Event {
                event: MarketEvent::MessageCreated { message },
                ..
            }) => break message,
            Some(_) => continue,
            None => return Err("realtime worker stopped".to_string()),
        }
    };
    assert_eq!(received.content, "Can you come at 9?");
    assert_eq!(received.recipient_id, helper_id);

    worker.abort();
    Ok(())
}

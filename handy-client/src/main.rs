//! Handy client entry point.
//!
//! Loads the TOML config, confirms the session, prints an inbox summary and
//! then follows the caller's inbox until Ctrl-C.

use handy_client::{spawn_realtime, ClientConfig, HandyClient};
use handy_events::{ServerFrame, Topic};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] handy_client::ConfigError),
    #[error(transparent)]
    Api(#[from] handy_client::ApiClientError),
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ClientConfig::load()?;
    let client = HandyClient::new(&config)?;

    let me = client.rest().whoami().await?;
    let unread = client.rest().unread_count().await?;
    let notifications = client.rest().notifications(true).await?;
    tracing::info!(
        user_id = %me.profile.user_id,
        name = %me.profile.name,
        unread_messages = unread,
        unread_notifications = notifications.len(),
        "Logged in"
    );

    let (tx, mut rx) = mpsc::channel::<ServerFrame>(64);
    let worker = spawn_realtime(
        client.realtime().clone(),
        vec![Topic::Inbox(me.profile.user_id)],
        tx,
    );

    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Some(ServerFrame::Event { event, .. }) => {
                    tracing::info!(event_type = event.event_type(), "Inbox event");
                }
                Some(ServerFrame::Error { message }) => tracing::warn!(%message, "Server rejected a frame"),
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    worker.abort();
    client.session().clear();
    Ok(())
}

//! Event intake: the AMI client
//!
//! Holds one authenticated manager session to the switch and forwards every
//! `Event:` block, in arrival order, to the event loop. On connect failure,
//! login rejection or a dropped connection it reconnects with exponential
//! backoff; it only stops on shutdown or when the event loop goes away.
//!
//! Delivery is at-least-once from the switch's point of view; nothing here
//! deduplicates.

use futures::{SinkExt, StreamExt};
use queuewatch_core::ami::{AmiCodec, AmiEvent, AmiFrame, AmiMessage};
use queuewatch_core::config::{AmiConfig, ServiceConfig};
use queuewatch_core::QueuewatchError;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Duration, Instant};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_util::codec::Framed;

const LOGIN_ACTION_ID: &str = "queuewatch-login";

/// A session that lasted this long counts as healthy and resets the backoff.
const STABLE_SESSION: Duration = Duration::from_secs(60);

pub type AmiConnection<T = TcpStream> = Framed<T, AmiCodec>;

/// Backoff between reconnect attempts: `base, 2×base, 4×base, ...` capped at
/// `reconnect_max_ms`. Each delay is jittered within its upper half, so no
/// wait is shorter than half the nominal step. Never runs out.
pub fn reconnect_strategy(service: &ServiceConfig) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(2)
        .factor((service.reconnect_base_ms / 2).max(1))
        .max_delay(Duration::from_millis(service.reconnect_max_ms.max(1)))
        .map(|delay| delay / 2 + jitter(delay / 2))
}

/// Run the intake until shutdown. Spawned from `main.rs`.
///
/// Every reconnect, whether after a failed connect, a rejected login or a
/// closed session, waits for the next backoff step. The backoff starts over
/// only after a session that delivered events or stayed up for
/// [`STABLE_SESSION`].
pub async fn run_intake(
    ami: AmiConfig,
    service: ServiceConfig,
    events: mpsc::Sender<AmiEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!(address = %ami.address(), "AMI intake started");
    let mut backoff = reconnect_strategy(&service);

    loop {
        let connected = tokio::select! {
            res = connect(&ami) => res,
            _ = shutdown.recv() => {
                tracing::info!("AMI intake shutting down");
                return;
            }
        };

        if let Ok(mut connection) = connected {
            let started = Instant::now();
            let mut delivered = 0;

            tokio::select! {
                res = forward_events(&mut connection, &events, &mut delivered) => match res {
                    Ok(()) => tracing::warn!(delivered, "AMI connection closed by peer"),
                    Err(e) => tracing::warn!(delivered, error = %e, "AMI connection lost"),
                },
                _ = shutdown.recv() => {
                    tracing::info!("AMI intake shutting down");
                    return;
                }
            }

            if events.is_closed() {
                tracing::info!("Event loop gone, stopping AMI intake");
                return;
            }
            if delivered > 0 || started.elapsed() >= STABLE_SESSION {
                backoff = reconnect_strategy(&service);
            }
        }

        let delay = backoff.next().unwrap_or(Duration::from_millis(service.reconnect_max_ms));
        tracing::info!(delay_ms = delay.as_millis() as u64, "Reconnecting to AMI");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.recv() => {
                tracing::info!("AMI intake shutting down");
                return;
            }
        }
    }
}

/// Open a TCP connection and authenticate.
pub async fn connect(ami: &AmiConfig) -> Result<AmiConnection, QueuewatchError> {
    let address = ami.address();
    let stream = match TcpStream::connect(&address).await {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(address = %address, error = %e, "AMI connect attempt failed");
            return Err(e.into());
        }
    };

    let mut connection = Framed::new(stream, AmiCodec::new());
    if let Err(e) = login(&mut connection, ami).await {
        tracing::warn!(address = %address, error = %e, "AMI login failed");
        return Err(e);
    }

    tracing::info!(address = %address, user = %ami.username, "Connected to AMI");
    Ok(connection)
}

/// Send `Action: Login` and wait for its response.
pub async fn login<T>(connection: &mut AmiConnection<T>, ami: &AmiConfig) -> Result<(), QueuewatchError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let action = AmiMessage::action("Login")
        .with("ActionID", LOGIN_ACTION_ID)
        .with("Username", &ami.username)
        .with("Secret", &ami.password)
        .with("Events", "on");
    connection.send(action).await?;

    while let Some(frame) = connection.next().await {
        let message = match frame? {
            AmiFrame::Banner(banner) => {
                tracing::debug!(banner = %banner, "AMI banner");
                continue;
            }
            AmiFrame::Message(message) => message,
        };

        let Some(response) = message.get("Response") else {
            continue;
        };
        if message.get("ActionID").is_some_and(|id| id != LOGIN_ACTION_ID) {
            continue;
        }

        return if response.eq_ignore_ascii_case("Success") {
            Ok(())
        } else {
            Err(QueuewatchError::Ami(format!(
                "login rejected: {}",
                message.get("Message").unwrap_or(response)
            )))
        };
    }

    Err(QueuewatchError::Ami("connection closed during login".to_string()))
}

/// Forward events until the peer closes the stream. Returns an error on a
/// transport failure or when the event loop has stopped listening.
pub async fn forward_events<T>(
    connection: &mut AmiConnection<T>,
    events: &mpsc::Sender<AmiEvent>,
    delivered: &mut usize,
) -> Result<(), QueuewatchError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(frame) = connection.next().await {
        let message = match frame? {
            AmiFrame::Message(message) => message,
            AmiFrame::Banner(_) => continue,
        };

        match message.into_event() {
            Some(event) => {
                events
                    .send(event)
                    .await
                    .map_err(|_| QueuewatchError::Other("event loop stopped".to_string()))?;
                *delivered += 1;
            }
            None => tracing::trace!("Ignoring AMI response"),
        }
    }
    Ok(())
}

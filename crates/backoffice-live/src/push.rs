//! WebSocket push channel delivering order notifications
//!
//! A [`PushChannel`] describes where to connect and how to reconnect. Each
//! call to [`PushChannel::subscribe`] spawns one connection task and hands
//! back a [`PushSubscription`]; dropping or unsubscribing it closes the
//! socket and stops the task.

use backoffice_core::PushMessage;
use backoffice_core::config::{PushConfig, ReconnectConfig, ReconnectMode};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What to do after the push connection drops or fails to open
#[derive(Debug, Clone, PartialEq)]
pub enum ReconnectPolicy {
    /// Stay disconnected
    None,
    /// Wait the same delay before every attempt
    FixedDelay {
        /// Delay between attempts
        delay: Duration,
        /// Consecutive attempts before giving up
        max_attempts: Option<u32>,
    },
    /// Multiply the delay after each failed attempt, up to `max`
    ExponentialBackoff {
        /// Delay before the first attempt
        initial: Duration,
        /// Delay ceiling
        max: Duration,
        /// Growth factor
        multiplier: f64,
        /// Consecutive attempts before giving up
        max_attempts: Option<u32>,
    },
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt`, counted from 1
    ///
    /// `None` means give up.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match *self {
            Self::None => None,
            Self::FixedDelay {
                delay,
                max_attempts,
            } => within_limit(attempt, max_attempts).then_some(delay),
            Self::ExponentialBackoff {
                initial,
                max,
                multiplier,
                max_attempts,
            } => {
                if !within_limit(attempt, max_attempts) {
                    return None;
                }
                let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
                let scaled = initial.as_secs_f64() * multiplier.powi(exponent);
                let delay = Duration::try_from_secs_f64(scaled).unwrap_or(max);
                Some(delay.min(max))
            }
        }
    }
}

fn within_limit(attempt: u32, max_attempts: Option<u32>) -> bool {
    max_attempts.is_none_or(|max| attempt <= max)
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        match config.mode {
            ReconnectMode::None => Self::None,
            ReconnectMode::Fixed => Self::FixedDelay {
                delay: Duration::from_millis(config.delay_ms),
                max_attempts: config.max_attempts,
            },
            ReconnectMode::Backoff => Self::ExponentialBackoff {
                initial: Duration::from_millis(config.initial_delay_ms),
                max: Duration::from_millis(config.max_delay_ms),
                multiplier: config.multiplier,
                max_attempts: config.max_attempts,
            },
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

/// Push channel endpoint and reconnection behaviour
#[derive(Debug, Clone)]
pub struct PushChannel {
    url: String,
    policy: ReconnectPolicy,
    buffer: usize,
}

impl PushChannel {
    /// Create a channel for `url` with the default reconnect policy
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            policy: ReconnectPolicy::default(),
            buffer: PushConfig::default().buffer,
        }
    }

    /// Create a channel from configuration
    #[must_use]
    pub fn from_config(config: &PushConfig) -> Self {
        Self {
            url: config.url.clone(),
            policy: ReconnectPolicy::from(&config.reconnect),
            buffer: config.buffer.max(1),
        }
    }

    /// Replace the reconnect policy
    #[must_use]
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Push channel URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Reconnect policy
    #[must_use]
    pub const fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Open the connection in a background task
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn subscribe(&self) -> PushSubscription {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_connection(
            self.url.clone(),
            self.policy.clone(),
            sender,
            cancel.clone(),
        ));

        PushSubscription {
            receiver,
            cancel,
            task: Some(task),
        }
    }
}

/// Live subscription to the push channel
///
/// The connection stays open for as long as this value exists.
#[derive(Debug)]
pub struct PushSubscription {
    receiver: mpsc::Receiver<PushMessage>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PushSubscription {
    /// Subscription fed through the returned sender instead of a socket
    #[must_use]
    pub fn channel(buffer: usize) -> (mpsc::Sender<PushMessage>, Self) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let subscription = Self {
            receiver,
            cancel: CancellationToken::new(),
            task: None,
        };
        (sender, subscription)
    }

    /// Next message, or `None` once the channel has stopped for good
    pub async fn recv(&mut self) -> Option<PushMessage> {
        self.receiver.recv().await
    }

    /// Close the connection and wait for the connection task to finish
    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        self.receiver.close();

        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "Push connection task ended abnormally");
        }
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum PumpOutcome {
    Cancelled,
    ReceiverGone,
    Disconnected,
}

async fn run_connection(
    url: String,
    policy: ReconnectPolicy,
    sender: mpsc::Sender<PushMessage>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let connected = tokio::select! {
            () = cancel.cancelled() => return,
            result = connect_async(url.as_str()) => result,
        };

        match connected {
            Ok((socket, _response)) => {
                info!(url = %url, "Push channel connected");
                attempt = 0;

                match pump(socket, &sender, &cancel).await {
                    PumpOutcome::Cancelled => {
                        debug!(url = %url, "Push channel released");
                        return;
                    }
                    PumpOutcome::ReceiverGone => {
                        debug!(url = %url, "Push subscriber gone, closing channel");
                        return;
                    }
                    PumpOutcome::Disconnected => {
                        warn!(url = %url, "Push channel disconnected");
                    }
                }
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Push channel connection failed");
            }
        }

        attempt = attempt.saturating_add(1);
        let Some(delay) = policy.delay_for_attempt(attempt) else {
            info!(url = %url, attempt, "Push channel stopped reconnecting");
            return;
        };

        debug!(url = %url, attempt, delay_ms = delay.as_millis(), "Reconnecting push channel");
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(delay) => {}
        }
    }
}

async fn pump(
    mut socket: Socket,
    sender: &mpsc::Sender<PushMessage>,
    cancel: &CancellationToken,
) -> PumpOutcome {
    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => {
                let _ = socket.close(None).await;
                return PumpOutcome::Cancelled;
            }
            frame = socket.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                let message = match PushMessage::parse(&text) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(error = %e, "Ignoring malformed push message");
                        continue;
                    }
                };

                debug!(kind = message.type_name(), "Push message received");
                let delivered = tokio::select! {
                    () = cancel.cancelled() => {
                        let _ = socket.close(None).await;
                        return PumpOutcome::Cancelled;
                    }
                    result = sender.send(message) => result.is_ok(),
                };

                if !delivered {
                    let _ = socket.close(None).await;
                    return PumpOutcome::ReceiverGone;
                }
            }
            Some(Ok(Message::Close(frame))) => {
                debug!(?frame, "Push channel closed by server");
                return PumpOutcome::Disconnected;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(error = %e, "Push channel read error");
                return PumpOutcome::Disconnected;
            }
            None => return PumpOutcome::Disconnected,
        }
    }
}

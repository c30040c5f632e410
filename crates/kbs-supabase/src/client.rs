use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::change::{ChangeFilter, RowChange};
use crate::protocol::{self, PhoenixMessage};
use crate::{EventSource, SupabaseError};

/// Interval between heartbeats on the `phoenix` topic.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for the socket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of each subscription's event channel.
const SUBSCRIPTION_BUFFER: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Where and how to open the realtime socket.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Base URL of the project, e.g. `https://xyz.supabase.co`.
    pub project_url: Url,
    /// Public API key, sent both as query parameter and access token.
    pub api_key: String,
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
}

impl RealtimeConfig {
    pub fn new(project_url: &str, api_key: impl Into<String>) -> Result<Self, SupabaseError> {
        Ok(Self {
            project_url: Url::parse(project_url)?,
            api_key: api_key.into(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    /// Derives the websocket endpoint from the project URL, switching
    /// `https` to `wss` and `http` to `ws`.
    pub fn socket_url(&self) -> Result<Url, SupabaseError> {
        let scheme = match self.project_url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => return Err(SupabaseError::UnsupportedScheme(other.to_string())),
        };

        let mut url = self.project_url.join("realtime/v1/websocket")?;
        url.set_scheme(scheme)
            .map_err(|_| SupabaseError::UnsupportedScheme(scheme.to_string()))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.api_key)
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }
}

enum SocketCommand {
    Join {
        topic: String,
        filter: ChangeFilter,
        events: mpsc::Sender<RowChange>,
    },
    Leave {
        topic: String,
    },
    Close,
}

/// Leaves a channel. Called at most once per subscription by its owner.
type LeaveFn = dyn Fn(&str) + Send + Sync;

/// Cheap, cloneable handle used to stop a subscription.
#[derive(Clone)]
pub struct SubscriptionHandle {
    topic: String,
    leave: Arc<LeaveFn>,
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SubscriptionHandle")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

impl SubscriptionHandle {
    /// Creates a handle that runs `leave` with the topic on unsubscribe.
    pub fn new(topic: impl Into<String>, leave: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            topic: topic.into(),
            leave: Arc::new(leave),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Stops delivery of further events for this subscription.
    pub fn unsubscribe(&self) {
        (self.leave)(&self.topic);
    }
}

/// A live subscription: the stream of changes plus the handle to stop it.
#[derive(Debug)]
pub struct ChangeSubscription {
    handle: SubscriptionHandle,
    events: mpsc::Receiver<RowChange>,
}

impl ChangeSubscription {
    pub fn new(handle: SubscriptionHandle, events: mpsc::Receiver<RowChange>) -> Self {
        Self { handle, events }
    }

    pub fn handle(&self) -> &SubscriptionHandle {
        &self.handle
    }

    /// Waits for the next change. Returns `None` once the subscription or
    /// the socket is closed.
    pub async fn recv(&mut self) -> Option<RowChange> {
        self.events.recv().await
    }

    pub fn split(self) -> (SubscriptionHandle, mpsc::Receiver<RowChange>) {
        (self.handle, self.events)
    }
}

/// Connection to the realtime socket. A background task owns the socket;
/// this client only sends it commands.
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    commands: mpsc::UnboundedSender<SocketCommand>,
    task: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl RealtimeClient {
    /// Opens the socket and spawns the task serving it on the current
    /// runtime.
    pub async fn connect(config: RealtimeConfig) -> Result<Self, SupabaseError> {
        let socket_url = config.socket_url()?;
        log::info!("Connecting to realtime socket at {}", config.project_url);
        let (ws, _) = timeout(config.connect_timeout, connect_async(socket_url.as_str()))
            .await
            .map_err(|_| SupabaseError::ConnectTimeout(config.connect_timeout))??;

        let (commands, commands_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_socket(
            ws,
            commands_rx,
            config.api_key,
            config.heartbeat_interval,
        ));

        Ok(Self {
            commands,
            task: Arc::new(tokio::sync::Mutex::new(Some(task))),
        })
    }

    /// Closes the socket after the commands sent so far, such as pending
    /// leaves, have gone out. Every open subscription ends.
    pub async fn close(&self) {
        if self.commands.send(SocketCommand::Close).is_err() {
            log::debug!("Realtime socket was already closed");
        }

        let task = self.task.lock().await.take();
        if let Some(task) = task
            && let Err(error) = task.await
        {
            log::error!("Realtime socket task failed: {error}");
        }
    }
}

#[async_trait::async_trait]
impl EventSource for RealtimeClient {
    async fn subscribe(
        &self,
        channel: &str,
        filter: ChangeFilter,
    ) -> Result<ChangeSubscription, SupabaseError> {
        let topic = protocol::channel_topic(channel);
        let (events_tx, events_rx) = mpsc::channel(SUBSCRIPTION_BUFFER);

        self.commands
            .send(SocketCommand::Join {
                topic: topic.clone(),
                filter,
                events: events_tx,
            })
            .map_err(|_| SupabaseError::SocketClosed)?;

        let commands = self.commands.clone();
        let handle = SubscriptionHandle::new(topic, move |topic| {
            let leave = SocketCommand::Leave {
                topic: topic.to_string(),
            };
            if commands.send(leave).is_err() {
                log::debug!("Realtime socket closed before leaving {topic}");
            }
        });

        Ok(ChangeSubscription::new(handle, events_rx))
    }
}

async fn send_frame(sink: &mut WsSink, message: &PhoenixMessage) -> Result<(), SupabaseError> {
    let text = serde_json::to_string(message)?;
    sink.send(Message::Text(text.into())).await?;
    Ok(())
}

/// Serves the socket until it closes or the client asks it to.
async fn run_socket(
    ws: WsStream,
    mut commands: mpsc::UnboundedReceiver<SocketCommand>,
    api_key: String,
    heartbeat_interval: Duration,
) {
    let (mut sink, mut stream) = ws.split();
    let mut routes: HashMap<String, mpsc::Sender<RowChange>> = HashMap::new();
    let mut next_ref: u64 = 0;
    let mut heartbeat = tokio::time::interval(heartbeat_interval);
    // the first tick completes immediately
    heartbeat.tick().await;

    loop {
        let outgoing = tokio::select! {
            command = commands.recv() => match command {
                Some(SocketCommand::Join { topic, filter, events }) => {
                    next_ref += 1;
                    log::debug!("Joining {topic} for {} on {}.{}", filter.event, filter.schema, filter.table);
                    routes.insert(topic.clone(), events);
                    Some(protocol::join_message(&topic, &filter, &api_key, &next_ref.to_string()))
                }
                Some(SocketCommand::Leave { topic }) => {
                    next_ref += 1;
                    routes
                        .remove(&topic)
                        .map(|_| protocol::leave_message(&topic, &next_ref.to_string()))
                }
                Some(SocketCommand::Close) | None => break,
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    route_frame(text.as_str(), &mut routes).await;
                    None
                }
                Some(Ok(Message::Close(reason))) => {
                    log::warn!("Realtime socket closed by server: {reason:?}");
                    break;
                }
                Some(Ok(_)) => None,
                Some(Err(error)) => {
                    log::error!("Realtime socket failed: {error}");
                    break;
                }
                None => break,
            },
            _ = heartbeat.tick() => {
                next_ref += 1;
                Some(protocol::heartbeat_message(&next_ref.to_string()))
            }
        };

        if let Some(message) = outgoing
            && let Err(error) = send_frame(&mut sink, &message).await
        {
            log::error!("Failed to send {} on {}: {error}", message.event, message.topic);
            break;
        }
    }

    if let Err(error) = sink.close().await {
        log::debug!("Error while closing realtime socket: {error}");
    }
    log::info!("Realtime socket closed, dropping {} subscription(-s)", routes.len());
}

/// Dispatches one incoming frame to the subscription owning its topic.
async fn route_frame(text: &str, routes: &mut HashMap<String, mpsc::Sender<RowChange>>) {
    let frame: PhoenixMessage = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(error) => {
            log::warn!("Dropping malformed realtime frame: {error}");
            return;
        }
    };

    match frame.event.as_str() {
        protocol::EVENT_POSTGRES_CHANGES => {
            let change = match protocol::decode_change(&frame.payload) {
                Ok(change) => change,
                Err(error) => {
                    log::warn!("Dropping undecodable change on {}: {error}", frame.topic);
                    return;
                }
            };
            let Some(events) = routes.get(&frame.topic) else {
                log::debug!("Change on {} without subscriber", frame.topic);
                return;
            };
            if events.send(change).await.is_err() {
                log::debug!("Subscriber of {} went away", frame.topic);
                routes.remove(&frame.topic);
            }
        }
        protocol::EVENT_REPLY if frame.topic != protocol::PHOENIX_TOPIC => {
            let status = protocol::reply_status(&frame.payload).unwrap_or("unknown");
            if status == "ok" {
                log::info!("Subscription status for {}: {status}", frame.topic);
            } else {
                log::warn!(
                    "Subscription status for {}: {status} ({})",
                    frame.topic,
                    frame.payload
                );
            }
        }
        protocol::EVENT_ERROR | protocol::EVENT_CLOSE => {
            log::warn!("Channel {} closed by server ({})", frame.topic, frame.event);
            routes.remove(&frame.topic);
        }
        _ => log::debug!("Ignoring {} on {}", frame.event, frame.topic),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn socket_url_switches_to_websocket_scheme() {
        let config = RealtimeConfig::new("https://project.supabase.co", "anon-key").unwrap();
        let url = config.socket_url().unwrap();

        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/realtime/v1/websocket");
        assert_eq!(url.query(), Some("apikey=anon-key&vsn=1.0.0"));
    }

    #[test]
    fn socket_url_rejects_other_schemes() {
        let config = RealtimeConfig::new("ftp://project.supabase.co", "anon-key").unwrap();
        assert!(matches!(
            config.socket_url(),
            Err(SupabaseError::UnsupportedScheme(_))
        ));
    }

    #[tokio::test]
    async fn connect_gives_up_on_a_silent_host() {
        // the handshake is accepted by the kernel but never answered
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut config =
            RealtimeConfig::new(&format!("http://127.0.0.1:{port}"), "anon-key").unwrap();
        config.connect_timeout = Duration::from_millis(200);

        let started = std::time::Instant::now();
        let result = RealtimeClient::connect(config).await;

        assert!(matches!(result, Err(SupabaseError::ConnectTimeout(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
        drop(listener);
    }

    #[tokio::test]
    async fn routes_changes_by_topic() {
        let (events_tx, mut events_rx) = mpsc::channel(4);
        let mut routes = HashMap::from([("realtime:work_entries_insert".to_string(), events_tx)]);

        let frame = r#"{
            "topic": "realtime:work_entries_insert",
            "event": "postgres_changes",
            "payload": {"data": {"type": "INSERT", "table": "work_entries", "record": {"driver_name": "Mohan"}}},
            "ref": null
        }"#;
        route_frame(frame, &mut routes).await;

        let change = events_rx.recv().await.unwrap();
        assert_eq!(change.new["driver_name"], "Mohan");
    }

    #[tokio::test]
    async fn channel_error_drops_route() {
        let (events_tx, _events_rx) = mpsc::channel(4);
        let mut routes = HashMap::from([("realtime:work_entries_delete".to_string(), events_tx)]);

        let frame = r#"{"topic": "realtime:work_entries_delete", "event": "phx_error", "payload": {}, "ref": "4"}"#;
        route_frame(frame, &mut routes).await;

        assert!(routes.is_empty());
    }

    #[test]
    fn handle_runs_leave_with_topic() {
        let left = Arc::new(Mutex::new(Vec::new()));
        let recorded = left.clone();
        let handle = SubscriptionHandle::new("realtime:work_entries_update", move |topic| {
            recorded.lock().unwrap().push(topic.to_string());
        });

        handle.clone().unsubscribe();
        assert_eq!(*left.lock().unwrap(), vec!["realtime:work_entries_update"]);
    }
}

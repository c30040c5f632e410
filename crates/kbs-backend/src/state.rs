use kbs_supabase::{RealtimeClient, RestClient};
use tokio::task::JoinHandle;

use crate::feeds::ChangeFeeds;

/// The core application state that holds configuration, backend clients and
/// the background work tied to them.
///
/// It is designed to be wrapped in thread-safe, async-friendly concurrency
/// primitives (see [`SharedState`]) to allow safe concurrent reads and
/// occasional writes from multiple tasks.
#[derive(Debug)]
pub struct State {
    /// The loaded application configuration.
    pub config: kbs_bridge::config::Config,
    /// Table API client, absent without backend credentials.
    pub rest: Option<RestClient>,
    /// Realtime socket, absent without backend credentials or when the
    /// connection failed.
    pub realtime: Option<RealtimeClient>,
    pub feeds: Option<ChangeFeeds>,
    /// Tasks to stop on shutdown.
    pub background: Vec<JoinHandle<()>>,
}

impl State {
    pub fn new(config: kbs_bridge::config::Config) -> Self {
        Self {
            config,
            rest: None,
            realtime: None,
            feeds: None,
            background: Vec::new(),
        }
    }
}

/// Thread-safe, async-friendly shared reference to the application [`State`].
pub type SharedState = std::sync::Arc<tokio::sync::RwLock<State>>;

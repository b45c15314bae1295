//! Async driving layer for an elected master: the heartbeat emitter,
//! the command feed/consumer, and snapshot publication.
//!
//! The kernel stays synchronous; this module owns the timers and
//! subscription callbacks. Heartbeat and command handling run as
//! independent tasks that re-check the session state at the top of
//! every pass, so a demotion observed by one is honored by the other.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{MissedTickBehavior, interval, sleep, timeout};

use crate::client::VenueClient;
use crate::config::CoordinatorConfig;
use crate::mirror::{LocalMirror, WAS_MASTER_KEY};
use crate::session::{DeviceSession, SessionState};
use crate::types::{
    Command, CommandKind, DenyReason, DeviceIdentity, MasterDecision, NowPlaying,
    PlayerStateSnapshot, TrackRef,
};

/// One client shared by the tasks of a process, behind an async mutex —
/// the same shape the HTTP server uses for its app state.
pub type SharedClient = Arc<Mutex<VenueClient>>;

/// Boundary to the externally owned track queues. The runtime only ever
/// needs the upcoming track and an advance signal.
pub trait TrackSource: Send {
    /// Upcoming track for the venue, without consuming it
    fn next_track(&mut self, venue_id: &str) -> Option<TrackRef>;
    /// Consume the current head of the queue
    fn advance(&mut self, venue_id: &str);
}

/// Vec-backed track source for tests and demos.
pub struct StaticTrackSource {
    tracks: Vec<TrackRef>,
}

impl StaticTrackSource {
    pub fn new(tracks: Vec<TrackRef>) -> Self {
        Self { tracks }
    }
}

impl TrackSource for StaticTrackSource {
    fn next_track(&mut self, _venue_id: &str) -> Option<TrackRef> {
        self.tracks.first().cloned()
    }

    fn advance(&mut self, _venue_id: &str) {
        if !self.tracks.is_empty() {
            self.tracks.remove(0);
        }
    }
}

/// Local playback state the master applies commands against.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub now_playing: Option<NowPlaying>,
    pub is_playing: bool,
    pub volume: u8,
}

impl PlayerState {
    pub fn new() -> Self {
        Self {
            now_playing: None,
            is_playing: false,
            volume: 50,
        }
    }

    /// Apply one validated command. Re-applying the same command yields
    /// the same state for everything except Skip, which is inherently a
    /// queue step.
    pub fn apply(&mut self, kind: &CommandKind, tracks: &mut dyn TrackSource, venue_id: &str) {
        match kind {
            CommandKind::Play => {
                if self.now_playing.is_none() {
                    self.now_playing = tracks.next_track(venue_id).map(|track| NowPlaying {
                        track,
                        position_ms: 0,
                    });
                }
                self.is_playing = self.now_playing.is_some();
            }
            CommandKind::Pause => {
                self.is_playing = false;
            }
            CommandKind::Skip => {
                tracks.advance(venue_id);
                self.now_playing = tracks.next_track(venue_id).map(|track| NowPlaying {
                    track,
                    position_ms: 0,
                });
                if self.now_playing.is_none() {
                    self.is_playing = false;
                }
            }
            CommandKind::Volume { level } => {
                self.volume = *level;
            }
            CommandKind::Seek { position_ms } => {
                if let Some(now_playing) = &mut self.now_playing {
                    now_playing.position_ms = (*position_ms).min(now_playing.track.duration_ms);
                }
            }
        }
    }

    /// Snapshot for publication; the client stamps `last_updated`.
    pub fn snapshot(&self, venue_id: &str, device_id: &str) -> PlayerStateSnapshot {
        PlayerStateSnapshot {
            venue_id: venue_id.to_string(),
            now_playing: self.now_playing.clone(),
            is_playing: self.is_playing,
            volume: self.volume,
            last_updated: 0,
            updated_by: device_id.to_string(),
        }
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Delivery strategy for the master's command stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStrategy {
    /// Push subscription, with an interval re-scan as the safety net
    Push,
    /// Interval polling only (degraded transports)
    Poll,
}

/// Unified command subscription: yields unexecuted commands for one
/// venue whether they arrive by push or by the polling fallback.
pub struct CommandFeed {
    client: SharedClient,
    venue_id: String,
    rx: Option<broadcast::Receiver<Command>>,
    poll_interval: Duration,
}

impl CommandFeed {
    pub async fn open(client: SharedClient, venue_id: &str, strategy: FeedStrategy) -> Self {
        let (rx, poll_interval) = {
            let mut guard = client.lock().await;
            let rx = match strategy {
                FeedStrategy::Push => Some(guard.subscribe_commands(venue_id)),
                FeedStrategy::Poll => None,
            };
            (rx, Duration::from_millis(guard.config().poll_interval_ms))
        };
        Self {
            client,
            venue_id: venue_id.to_string(),
            rx,
            poll_interval,
        }
    }

    /// Next command, or None after one quiet poll cycle. Bounded so the
    /// caller can re-check its session state between waits.
    pub async fn next(&mut self) -> Option<Command> {
        if let Some(rx) = &mut self.rx {
            let received = timeout(self.poll_interval, rx.recv()).await;
            match received {
                Ok(Ok(command)) => return Some(command),
                Ok(Err(RecvError::Lagged(skipped))) => {
                    tracing::debug!(skipped, "command feed lagged, re-scanning store");
                }
                Ok(Err(RecvError::Closed)) => {
                    self.rx = None;
                }
                // Quiet interval: fall through to the store re-scan
                Err(_) => {}
            }
            return self.poll_once().await;
        }
        sleep(self.poll_interval).await;
        self.poll_once().await
    }

    async fn poll_once(&mut self) -> Option<Command> {
        let client = self.client.lock().await;
        match client.pending_commands(&self.venue_id) {
            Ok(pending) => pending.into_iter().next(),
            Err(err) => {
                tracing::debug!(error = %err, "command poll failed, will retry");
                None
            }
        }
    }
}

/// Whether a reconnecting device should retry acquisition immediately
pub fn should_resume(mirror: &dyn LocalMirror) -> bool {
    mirror.read(WAS_MASTER_KEY).is_some()
}

/// Drives one device's mastery of one venue: bounded acquisition, the
/// heartbeat emitter, and the command consumer.
pub struct MasterRuntime {
    client: SharedClient,
    session: Arc<Mutex<DeviceSession>>,
    venue_id: String,
    device_id: String,
    config: CoordinatorConfig,
}

impl MasterRuntime {
    pub fn new(
        client: SharedClient,
        venue_id: impl Into<String>,
        identity: DeviceIdentity,
        config: CoordinatorConfig,
    ) -> Result<Self, String> {
        config.validate()?;
        let venue_id = venue_id.into();
        let device_id = identity.device_id.clone();
        let session = Arc::new(Mutex::new(DeviceSession::new(
            venue_id.clone(),
            identity,
            config.clone(),
        )));
        Ok(Self {
            client,
            session,
            venue_id,
            device_id,
            config,
        })
    }

    /// Shared handle to the session state machine, for UI status views.
    pub fn session(&self) -> Arc<Mutex<DeviceSession>> {
        Arc::clone(&self.session)
    }

    /// One bounded acquisition attempt. Times out into a NETWORK_ERROR
    /// denial rather than hanging; the session stays in Acquiring after
    /// transport failure so a retry is always possible.
    pub async fn acquire(&self, mirror: &mut dyn LocalMirror) -> MasterDecision {
        self.session.lock().await.begin_acquire();

        let client = Arc::clone(&self.client);
        let venue_id = self.venue_id.clone();
        let device_id = self.device_id.clone();
        let attempt = async move { client.lock().await.request_master(&venue_id, &device_id) };

        let decision = match timeout(
            Duration::from_millis(self.config.acquire_timeout_ms),
            attempt,
        )
        .await
        {
            Ok(decision) => decision,
            Err(_) => MasterDecision::denied(DenyReason::NetworkError {
                detail: "acquisition timed out".to_string(),
            }),
        };

        self.session.lock().await.on_decision(&decision);

        if decision.granted {
            mirror.write(WAS_MASTER_KEY, "true");
        } else if matches!(decision.reason, Some(DenyReason::MasterActive { .. })) {
            mirror.clear(WAS_MASTER_KEY);
        }

        decision
    }

    /// Run the heartbeat emitter and the command consumer until mastery
    /// ends. Resolves once both tasks have observed the demotion.
    pub async fn run(&self, player: PlayerState, tracks: Box<dyn TrackSource>, strategy: FeedStrategy) {
        let feed = CommandFeed::open(Arc::clone(&self.client), &self.venue_id, strategy).await;

        let heartbeat = tokio::spawn(heartbeat_loop(
            Arc::clone(&self.client),
            Arc::clone(&self.session),
            self.config.heartbeat_interval_ms,
        ));
        let consumer = tokio::spawn(command_loop(
            Arc::clone(&self.client),
            Arc::clone(&self.session),
            feed,
            player,
            tracks,
        ));

        let _ = heartbeat.await;
        let _ = consumer.await;
    }

    /// Graceful release on shutdown. Best-effort: a failed write is fine,
    /// the lease will expire on its own.
    pub async fn release(&self, mirror: &mut dyn LocalMirror) -> bool {
        let released = self
            .client
            .lock()
            .await
            .release_master(&self.venue_id, &self.device_id)
            .unwrap_or(false);
        self.session.lock().await.on_released();
        mirror.clear(WAS_MASTER_KEY);
        released
    }
}

async fn heartbeat_loop(
    client: SharedClient,
    session: Arc<Mutex<DeviceSession>>,
    interval_ms: u64,
) {
    let mut ticker = interval(Duration::from_millis(interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval() fires immediately; the acquisition write just happened,
    // so swallow the first tick
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let (venue_id, device_id) = {
            let session = session.lock().await;
            if session.state() != SessionState::Master {
                break;
            }
            (
                session.venue_id().to_string(),
                session.identity().device_id.clone(),
            )
        };

        let outcome = client.lock().await.heartbeat(&venue_id, &device_id);

        let state = {
            let mut session = session.lock().await;
            match outcome {
                Ok(outcome) => session.on_renew_outcome(&outcome),
                Err(err) => {
                    tracing::debug!(venue = %venue_id, error = %err, "renewal write failed, will retry");
                    session.on_renew_error()
                }
            }
        };
        if state != SessionState::Master {
            break;
        }
    }
}

async fn command_loop(
    client: SharedClient,
    session: Arc<Mutex<DeviceSession>>,
    mut feed: CommandFeed,
    mut player: PlayerState,
    mut tracks: Box<dyn TrackSource>,
) {
    let (venue_id, device_id) = {
        let session = session.lock().await;
        (
            session.venue_id().to_string(),
            session.identity().device_id.clone(),
        )
    };

    // Announce current state so observers have something to mirror
    {
        let snapshot = player.snapshot(&venue_id, &device_id);
        let _ = client.lock().await.publish_state(snapshot);
    }

    // Notifications already applied locally; the channel is
    // at-least-once, so the same command can arrive twice
    let mut handled: HashSet<String> = HashSet::new();

    loop {
        if session.lock().await.state() != SessionState::Master {
            break;
        }

        let Some(command) = feed.next().await else {
            continue;
        };

        if command.is_executed() {
            continue;
        }
        if !handled.insert(command.id.clone()) {
            // Applied already; only the executed stamp may have failed
            let _ = client.lock().await.mark_executed(&command.id, &device_id);
            continue;
        }

        match command.kind.validate() {
            Err(reason) => {
                // Still marked executed below so it cannot block the queue
                tracing::warn!(command = %command.id, %reason, "dropping malformed command");
            }
            Ok(()) => {
                player.apply(&command.kind, tracks.as_mut(), &venue_id);
            }
        }

        let published = {
            let mut client = client.lock().await;
            if let Err(err) = client.mark_executed(&command.id, &device_id) {
                tracing::warn!(command = %command.id, error = %err, "failed to mark command executed");
            }
            client.publish_state(player.snapshot(&venue_id, &device_id))
        };

        match published {
            Ok(true) => {}
            Ok(false) => {
                // Snapshot rejected as stale: the lease moved on under us
                session.lock().await.on_authority_lost();
            }
            Err(err) => {
                tracing::warn!(venue = %venue_id, error = %err, "failed to publish snapshot");
            }
        }
    }
}

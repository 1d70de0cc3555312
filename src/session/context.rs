use std::collections::HashMap;
use std::time::Instant;

use serde_json::{Value, json};

use crate::error::{Result, SessionError};
use crate::identity::{TileIdentity, identity_of};
use crate::layout::{Orientation, TileLayout, partition};
use crate::logging::{LogLevel, event_with_fields, json_kv, json_str};
use crate::metrics::{MetricSnapshot, SessionMetrics};
use crate::notifications::{NotificationEntry, NotificationKind, NotificationQueue};
use crate::peer::{Capability, Peer, PeerId, Permission, TrackRef, TrackSource};
use crate::pip::PipSelector;
use crate::registry::{Tile, TileChange, TileRegistry};
use crate::spotlight::{SPOTLIGHT_KEY, SpotlightSelector};

use super::audit::{SessionAuditEventBuilder, SessionAuditStage};
use super::config::SessionConfig;
use super::events::{CallTicket, PreviewSettings, SessionEffect, SessionEvent, SessionFailure};
use super::lifecycle::{Lifecycle, PendingCall, PhaseChange, SessionPhase};
use super::shared_state::SharedStore;

const SESSION_TARGET: &str = "room_session::session";
const LIFECYCLE_TARGET: &str = "room_session::session.lifecycle";
const REGISTRY_TARGET: &str = "room_session::registry";
const NOTIFICATIONS_TARGET: &str = "room_session::notifications";

pub const RECONNECTING_NOTIFICATION: &str = "reconnecting";
pub const LOCAL_SCREENSHARE_NOTIFICATION: &str = "local-screenshare";
pub const TERMINAL_ERROR_NOTIFICATION: &str = "terminal-error";
pub const STREAMING_FAILED_NOTIFICATION: &str = "streaming-start-failed";

fn hand_raise_notification(peer_id: &PeerId) -> String {
    format!("hand-raise:{peer_id}")
}

/// One room session: the tile registry, lifecycle phase, spotlight key and
/// notification queue behind a single owner.
///
/// SDK callbacks enter through [`SessionContext::apply`]; UI actions through
/// the command methods. Everything the UI renders is pulled through the
/// query methods after each batch, and requested side effects are drained
/// with [`SessionContext::take_effects`].
pub struct SessionContext {
    config: SessionConfig,
    lifecycle: Lifecycle,
    registry: TileRegistry,
    roster: HashMap<PeerId, Peer>,
    local_peer: Option<Peer>,
    spotlight: SpotlightSelector,
    pip: PipSelector,
    notifications: NotificationQueue,
    shared: SharedStore,
    effects: Vec<SessionEffect>,
    staged_preview: Option<PreviewSettings>,
    orientation: Orientation,
    auto_streaming_attempted: bool,
    started_at: Instant,
}

impl SessionContext {
    pub fn new(config: SessionConfig) -> Self {
        let settings = &config.settings;
        let lifecycle = Lifecycle::new(settings.session_id.clone(), settings.skip_preview);
        let notifications =
            NotificationQueue::new(settings.auto_dismiss(), settings.max_queued_notifications);

        let context = Self {
            lifecycle,
            registry: TileRegistry::new(),
            roster: HashMap::new(),
            local_peer: None,
            spotlight: SpotlightSelector::new(),
            pip: PipSelector::new(),
            notifications,
            shared: SharedStore::new(),
            effects: Vec::new(),
            staged_preview: None,
            orientation: Orientation::default(),
            auto_streaming_attempted: false,
            started_at: Instant::now(),
            config,
        };

        context.audit(
            SessionAuditEventBuilder::new(SessionAuditStage::SessionConstructed)
                .detail("session_id", json!(context.lifecycle.session_id())),
        );
        context.log(
            LogLevel::Info,
            SESSION_TARGET,
            "session_constructed",
            [
                json_str("session_id", context.lifecycle.session_id()),
                json_kv("skip_preview", json!(context.config.settings.skip_preview)),
            ],
        );
        context
    }

    /// Apply one inbound SDK event. Never fails; stale events are dropped.
    pub fn apply(&mut self, event: SessionEvent) {
        self.record_metric(SessionMetrics::record_event);

        if self.lifecycle.is_ended() {
            self.drop_after_teardown(event);
            return;
        }

        match event {
            SessionEvent::PreviewReady { local_peer } => {
                if self.phase() == SessionPhase::Previewing {
                    self.accept_local_peer(local_peer);
                } else {
                    self.drop_stale("preview_ready", "not_previewing");
                }
            }
            SessionEvent::JoinSucceeded { .. } if self.lifecycle.blocking_error().is_some() => {
                self.drop_stale("join_succeeded", "blocking_error");
            }
            SessionEvent::JoinSucceeded { local_peer } => match self.lifecycle.join_confirmed() {
                Some(change) => {
                    self.on_phase_change(change);
                    self.accept_local_peer(local_peer);
                    self.enter_meeting();
                }
                None => self.accept_local_peer(local_peer),
            },
            SessionEvent::LocalPeerUpdated(peer) => self.accept_local_peer(peer),
            SessionEvent::PeerJoined(peer) => {
                if peer.is_local || self.is_local_id(&peer.id) {
                    self.accept_local_peer(peer);
                } else {
                    self.accept_remote_peer(peer);
                }
            }
            SessionEvent::PeerLeft(peer_id) => self.remove_remote_peer(&peer_id),
            SessionEvent::PeerUpdated(peer) => {
                if peer.is_local || self.is_local_id(&peer.id) {
                    self.accept_local_peer(peer);
                } else if self.roster.contains_key(&peer.id) {
                    self.accept_remote_peer(peer);
                } else {
                    self.drop_stale("peer_updated", "unknown_peer");
                }
            }
            SessionEvent::TrackAdded { peer_id, track } => self.add_track(&peer_id, track),
            SessionEvent::TrackRemoved { peer_id, track_id } => {
                self.remove_track(&peer_id, &track_id)
            }
            SessionEvent::TrackUpdated { peer_id, track } => self.update_track(&peer_id, track),
            SessionEvent::TrackDegraded { peer_id, track_id } => {
                self.set_degraded(&peer_id, &track_id, true)
            }
            SessionEvent::TrackRestored { peer_id, track_id } => {
                self.set_degraded(&peer_id, &track_id, false)
            }
            SessionEvent::ActiveSpeakerChanged(speaker) => {
                self.pip.observe_active_speaker(speaker)
            }
            SessionEvent::Error {
                code,
                message,
                terminal,
            } => self.surface_error(code, message, terminal),
            SessionEvent::Reconnecting => {
                if self.lifecycle.set_reconnecting(true) {
                    self.log(
                        LogLevel::Warn,
                        LIFECYCLE_TARGET,
                        "reconnecting",
                        [json_str("phase", self.phase().as_str())],
                    );
                    self.enqueue_notification(NotificationEntry::new(
                        RECONNECTING_NOTIFICATION,
                        NotificationKind::Reconnecting,
                        Value::Null,
                    ));
                }
            }
            SessionEvent::Reconnected => {
                if self.lifecycle.set_reconnecting(false) {
                    self.log(
                        LogLevel::Info,
                        LIFECYCLE_TARGET,
                        "reconnected",
                        [json_str("phase", self.phase().as_str())],
                    );
                    self.notifications.dismiss(RECONNECTING_NOTIFICATION);
                }
            }
            SessionEvent::RoleChangeDeclined { peer_id } => {
                let name = self.snapshot_of(&peer_id).map(|peer| peer.name);
                self.enqueue_notification(NotificationEntry::new(
                    format!("role-change-declined:{peer_id}"),
                    NotificationKind::RoleChangeDeclined,
                    json!({ "peer_id": peer_id, "name": name }),
                ));
            }
            SessionEvent::PollStarted { poll_id, title } => {
                self.enqueue_notification(NotificationEntry::new(
                    format!("poll:{poll_id}"),
                    NotificationKind::PollStarted,
                    json!({ "poll_id": poll_id, "title": title }),
                ));
            }
            SessionEvent::StreamingStateChanged { running } => {
                self.lifecycle.set_streaming_running(running);
            }
            SessionEvent::StreamingStartFinished { ticket, result } => {
                self.finish_streaming_start(&ticket, result)
            }
            SessionEvent::SharedValueChanged { key, value } => {
                self.shared.set(key.clone(), value.clone());
                if key == SPOTLIGHT_KEY {
                    self.spotlight.set_spotlight(value);
                }
            }
            SessionEvent::Tick { elapsed } => {
                for expired in self.notifications.advance(elapsed) {
                    self.log(
                        LogLevel::Debug,
                        NOTIFICATIONS_TARGET,
                        "notification_expired",
                        [json_str("id", expired.id)],
                    );
                }
            }
        }
    }

    /// Apply a batch of events in order.
    pub fn apply_all<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = SessionEvent>,
    {
        for event in events {
            self.apply(event);
        }
    }

    pub fn start_preview(&mut self) -> Result<()> {
        let change = self.lifecycle.start_preview()?;
        self.on_phase_change(change);
        self.effects.push(SessionEffect::RequestPreview);
        Ok(())
    }

    /// Ask the adapter to join. From `NotJoined` this requires `skip_preview`.
    pub fn start_join(&mut self) -> Result<()> {
        self.lifecycle.request_join()?;
        self.effects.push(SessionEffect::RequestJoin);
        self.log(
            LogLevel::Info,
            LIFECYCLE_TARGET,
            "join_requested",
            [json_str("phase", self.phase().as_str())],
        );
        Ok(())
    }

    /// Explicit leave or end from any live phase.
    pub fn leave(&mut self) -> Result<()> {
        if self.end_session("leave") {
            Ok(())
        } else {
            Err(SessionError::SessionEnded)
        }
    }

    /// Dismiss the blocking pre-meeting failure; this ends the session.
    pub fn acknowledge_error(&mut self) -> Result<()> {
        if self.lifecycle.is_ended() {
            return Err(SessionError::SessionEnded);
        }
        if self.lifecycle.take_blocking_error().is_some() {
            self.end_session("error_acknowledged");
        }
        Ok(())
    }

    /// Stage preview choices; they are handed to the adapter once on joining.
    pub fn stage_preview_settings(&mut self, settings: PreviewSettings) -> Result<()> {
        match self.phase() {
            SessionPhase::NotJoined | SessionPhase::Previewing => {
                self.staged_preview = Some(settings);
                Ok(())
            }
            SessionPhase::Ended => Err(SessionError::SessionEnded),
            from => Err(SessionError::InvalidTransition {
                from,
                action: "stage preview settings",
            }),
        }
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    /// Set the spotlight locally, mirroring it into the shared store.
    pub fn set_spotlight(&mut self, track_id: Option<String>) -> bool {
        self.shared.set(SPOTLIGHT_KEY, track_id.clone());
        self.spotlight.set_spotlight(track_id)
    }

    /// Queue a notification. Ignored once the session has ended.
    pub fn enqueue_notification(&mut self, entry: NotificationEntry) -> bool {
        if self.lifecycle.is_ended() {
            return false;
        }
        let id = entry.id.clone();
        let evicted = self.notifications.enqueue(entry);
        self.record_metric(SessionMetrics::record_notification);
        self.log(
            LogLevel::Debug,
            NOTIFICATIONS_TARGET,
            "notification_enqueued",
            [
                json_str("id", id),
                json_kv("evicted", json!(evicted.len())),
            ],
        );
        true
    }

    pub fn dismiss_notification(&mut self, id: &str) -> bool {
        self.notifications.dismiss(id)
    }

    pub fn phase(&self) -> SessionPhase {
        self.lifecycle.phase()
    }

    pub fn session_id(&self) -> &str {
        self.lifecycle.session_id()
    }

    pub fn layout(&self) -> TileLayout {
        partition(
            self.registry.tiles(),
            self.spotlight.current(),
            self.page_size(),
        )
    }

    pub fn page_size(&self) -> usize {
        self.config.settings.page_sizes().get(self.orientation)
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn pip_tile(&self) -> Option<Tile> {
        self.pip.select(self.registry.tiles()).cloned()
    }

    pub fn visible_notifications(&self) -> Vec<NotificationEntry> {
        self.notifications.visible().into_iter().cloned().collect()
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn tiles(&self) -> &[Tile] {
        self.registry.tiles()
    }

    pub fn registry(&self) -> &TileRegistry {
        &self.registry
    }

    pub fn take_tile_changes(&mut self) -> Vec<TileChange> {
        self.registry.take_changed()
    }

    pub fn take_effects(&mut self) -> Vec<SessionEffect> {
        std::mem::take(&mut self.effects)
    }

    pub fn is_reconnecting(&self) -> bool {
        self.lifecycle.is_reconnecting()
    }

    pub fn blocking_error(&self) -> Option<&SessionFailure> {
        self.lifecycle.blocking_error()
    }

    pub fn is_streaming(&self) -> bool {
        self.lifecycle.streaming_running()
    }

    pub fn is_streaming_starting(&self) -> bool {
        self.lifecycle.streaming_starting()
    }

    pub fn local_peer(&self) -> Option<&Peer> {
        self.local_peer.as_ref()
    }

    pub fn peer(&self, peer_id: &PeerId) -> Option<&Peer> {
        match &self.local_peer {
            Some(local) if &local.id == peer_id => Some(local),
            _ => self.roster.get(peer_id),
        }
    }

    /// Local permission check. `Unknown` until a local peer with a role exists.
    pub fn capability(&self, permission: &Permission) -> Capability {
        self.local_peer
            .as_ref()
            .map_or(Capability::Unknown, |peer| peer.capability(permission))
    }

    pub fn spotlight_key(&self) -> Option<&str> {
        self.spotlight.current()
    }

    pub fn shared_value(&self, key: &str) -> Option<&str> {
        self.shared.get(key)
    }

    pub fn metrics_snapshot(&self) -> Option<MetricSnapshot> {
        let metrics = self.config.metrics.as_ref()?;
        let guard = metrics.lock().ok()?;
        Some(guard.snapshot(self.started_at.elapsed()))
    }

    /// Write the current metrics snapshot through the logger, if both are configured.
    pub fn emit_metrics(&self) {
        if let (Some(logger), Some(snapshot)) =
            (self.config.logger.as_ref(), self.metrics_snapshot())
        {
            let _ = logger.log_event(snapshot.to_log_event(&self.config.metrics_target));
        }
    }

    fn is_local_id(&self, peer_id: &PeerId) -> bool {
        self.local_peer
            .as_ref()
            .is_some_and(|local| &local.id == peer_id)
    }

    fn snapshot_of(&self, peer_id: &PeerId) -> Option<Peer> {
        self.peer(peer_id).cloned()
    }

    fn accept_snapshot(&mut self, peer: Peer) {
        if peer.is_local {
            self.accept_local_peer(peer);
        } else {
            self.accept_remote_peer(peer);
        }
    }

    fn accept_local_peer(&mut self, mut peer: Peer) {
        peer.is_local = true;
        let role_changed = self
            .local_peer
            .as_ref()
            .is_none_or(|previous| previous.role != peer.role);
        self.local_peer = Some(peer.clone());
        self.reconcile_tiles(&peer);
        if role_changed && self.phase() == SessionPhase::InMeeting {
            self.maybe_start_streaming();
        }
    }

    fn accept_remote_peer(&mut self, peer: Peer) {
        let was_raised = self
            .roster
            .insert(peer.id.clone(), peer.clone())
            .is_some_and(|previous| previous.hand_raised);
        self.reconcile_tiles(&peer);

        match (was_raised, peer.hand_raised) {
            (false, true) => {
                self.enqueue_notification(NotificationEntry::new(
                    hand_raise_notification(&peer.id),
                    NotificationKind::HandRaise,
                    json!({ "peer_id": peer.id, "name": peer.name }),
                ));
            }
            (true, false) => {
                self.notifications.dismiss(&hand_raise_notification(&peer.id));
            }
            _ => {}
        }
    }

    fn remove_remote_peer(&mut self, peer_id: &PeerId) {
        if self.roster.remove(peer_id).is_none() {
            self.drop_stale("peer_left", "unknown_peer");
            return;
        }
        let removed = self.registry.remove_peer(peer_id);
        self.record_metric(|metrics| metrics.record_removals(removed.len()));
        self.notifications.dismiss(&hand_raise_notification(peer_id));
        self.log(
            LogLevel::Debug,
            REGISTRY_TARGET,
            "peer_removed",
            [
                json_str("peer_id", peer_id.as_str()),
                json_kv("tiles", json!(removed.len())),
            ],
        );
    }

    /// Bring the registry in line with `peer`: one regular tile plus one tile
    /// per auxiliary video source, nothing else.
    fn reconcile_tiles(&mut self, peer: &Peer) {
        let desired: Vec<Option<TrackRef>> = std::iter::once(peer.video_track.clone())
            .chain(
                peer.auxiliary_tracks
                    .iter()
                    .filter(|track| track.is_video())
                    .cloned()
                    .map(Some),
            )
            .collect();

        let mut kept = Vec::with_capacity(desired.len());
        for track in desired {
            let id = if peer.is_local {
                self.registry.upsert_local(peer.clone(), track)
            } else {
                self.registry.upsert(peer.clone(), track)
            };
            self.record_metric(SessionMetrics::record_upsert);
            kept.push(id);
        }

        let stale: Vec<TileIdentity> = self
            .registry
            .tiles_of(&peer.id)
            .filter(|tile| !kept.contains(&tile.id))
            .map(|tile| tile.id.clone())
            .collect();
        let removed = stale
            .iter()
            .filter(|id| self.registry.remove(id))
            .count();
        self.record_metric(|metrics| metrics.record_removals(removed));
    }

    fn add_track(&mut self, peer_id: &PeerId, track: TrackRef) {
        let Some(snapshot) = self.snapshot_of(peer_id) else {
            self.drop_stale("track_added", "unknown_peer");
            return;
        };
        let local_screen = snapshot.is_local && is_screen_video(&track);
        self.accept_snapshot(snapshot.with_track(track));
        if local_screen {
            self.enqueue_notification(NotificationEntry::new(
                LOCAL_SCREENSHARE_NOTIFICATION,
                NotificationKind::LocalScreenshare,
                Value::Null,
            ));
        }
    }

    fn remove_track(&mut self, peer_id: &PeerId, track_id: &str) {
        let Some(snapshot) = self.snapshot_of(peer_id) else {
            self.drop_stale("track_removed", "unknown_peer");
            return;
        };
        let Some(track) = snapshot.track(track_id).cloned() else {
            self.drop_stale("track_removed", "unknown_track");
            return;
        };
        let local_screen = snapshot.is_local && is_screen_video(&track);
        self.accept_snapshot(snapshot.without_track(track_id));
        if local_screen {
            self.notifications.dismiss(LOCAL_SCREENSHARE_NOTIFICATION);
        }
    }

    fn update_track(&mut self, peer_id: &PeerId, track: TrackRef) {
        let Some(snapshot) = self.snapshot_of(peer_id) else {
            self.drop_stale("track_updated", "unknown_peer");
            return;
        };
        if snapshot.track(&track.id).is_none() {
            self.add_track(peer_id, track);
            return;
        }

        let updated = snapshot.with_track(track.clone());
        if updated.is_local {
            self.local_peer = Some(updated.clone());
        } else {
            self.roster.insert(updated.id.clone(), updated.clone());
        }
        if track.is_video() {
            let id = identity_of(&updated, Some(&track));
            self.registry.replace_track(&id, Some(track));
        }
        self.registry.refresh_peer(&updated);
    }

    fn set_degraded(&mut self, peer_id: &PeerId, track_id: &str, value: bool) {
        let identity = self.peer(peer_id).and_then(|peer| {
            peer.track(track_id)
                .filter(|track| track.is_video())
                .map(|track| identity_of(peer, Some(track)))
        });
        let applied = identity.is_some_and(|id| self.registry.set_degraded(&id, value));
        if !applied {
            self.drop_stale(
                if value { "track_degraded" } else { "track_restored" },
                "unknown_tile",
            );
        }
    }

    fn enter_meeting(&mut self) {
        self.maybe_start_streaming();
        if let Some(staged) = self.staged_preview.take() {
            self.effects.push(SessionEffect::ApplyPreviewSettings(staged));
        }
        self.log(
            LogLevel::Info,
            LIFECYCLE_TARGET,
            "meeting_entered",
            [json_kv("tiles", json!(self.registry.len()))],
        );
    }

    fn maybe_start_streaming(&mut self) {
        let settings = &self.config.settings;
        if !settings.auto_start_streaming
            || self.auto_streaming_attempted
            || self.phase() != SessionPhase::InMeeting
            || self.lifecycle.streaming_running()
            || self.lifecycle.streaming_starting()
        {
            return;
        }
        let Some(local) = self.local_peer.as_ref() else {
            return;
        };

        match local.capability(&Permission::HlsStreaming) {
            Capability::Granted => {}
            Capability::Unknown => {
                self.log(
                    LogLevel::Debug,
                    LIFECYCLE_TARGET,
                    "streaming_deferred",
                    [json_str("reason", "no_role")],
                );
                return;
            }
            Capability::Denied => return,
        }
        if !settings.streams_for_role(local.role_name()) {
            return;
        }

        self.auto_streaming_attempted = true;
        let ticket = self.lifecycle.begin_streaming_start();
        self.audit(
            SessionAuditEventBuilder::new(SessionAuditStage::StreamingRequested)
                .detail("call_id", json!(ticket.call_id)),
        );
        self.log(
            LogLevel::Info,
            LIFECYCLE_TARGET,
            "streaming_requested",
            [json_kv("call_id", json!(ticket.call_id))],
        );
        self.effects.push(SessionEffect::StartStreaming { ticket });
    }

    fn finish_streaming_start(&mut self, ticket: &CallTicket, result: std::result::Result<(), String>) {
        match self.lifecycle.complete(ticket) {
            None => self.drop_completion(ticket),
            Some(PendingCall::StartStreaming) => match result {
                Ok(()) => {
                    self.lifecycle.set_streaming_running(true);
                    self.log(
                        LogLevel::Info,
                        LIFECYCLE_TARGET,
                        "streaming_started",
                        [json_kv("call_id", json!(ticket.call_id))],
                    );
                }
                Err(message) => {
                    self.log(
                        LogLevel::Warn,
                        LIFECYCLE_TARGET,
                        "streaming_start_failed",
                        [json_str("message", message.clone())],
                    );
                    self.enqueue_notification(NotificationEntry::new(
                        STREAMING_FAILED_NOTIFICATION,
                        NotificationKind::Error,
                        json!({ "message": message }),
                    ));
                }
            },
        }
    }

    fn surface_error(&mut self, code: u32, message: String, terminal: bool) {
        let phase = self.phase();
        self.audit(
            SessionAuditEventBuilder::new(SessionAuditStage::ErrorSurfaced)
                .detail("code", json!(code))
                .detail("terminal", json!(terminal))
                .detail("phase", json!(phase.as_str())),
        );

        if terminal && phase.is_pre_meeting() {
            let failure = SessionFailure {
                code,
                message: message.clone(),
            };
            self.lifecycle.set_blocking_error(failure.clone());
            self.effects.push(SessionEffect::ShowBlockingError(failure));
            self.log(
                LogLevel::Error,
                LIFECYCLE_TARGET,
                "blocking_error",
                [json_kv("code", json!(code)), json_str("message", message)],
            );
        } else if terminal {
            self.log(
                LogLevel::Error,
                LIFECYCLE_TARGET,
                "terminal_error",
                [json_kv("code", json!(code)), json_str("message", message.clone())],
            );
            self.enqueue_notification(NotificationEntry::new(
                TERMINAL_ERROR_NOTIFICATION,
                NotificationKind::TerminalError,
                json!({ "code": code, "message": message, "action": "leave" }),
            ));
        } else {
            self.log(
                LogLevel::Warn,
                LIFECYCLE_TARGET,
                "recoverable_error",
                [json_kv("code", json!(code)), json_str("message", message.clone())],
            );
            self.enqueue_notification(NotificationEntry::new(
                format!("error:{code}"),
                NotificationKind::Error,
                json!({ "code": code, "message": message }),
            ));
        }
    }

    fn end_session(&mut self, reason: &str) -> bool {
        let Some(change) = self.lifecycle.end() else {
            return false;
        };
        self.on_phase_change(change);
        self.notifications.clear();
        self.registry.clear();
        self.roster.clear();
        self.staged_preview = None;
        self.effects.push(SessionEffect::Leave);
        self.audit(
            SessionAuditEventBuilder::new(SessionAuditStage::SessionEnded)
                .detail("reason", json!(reason)),
        );
        true
    }

    fn on_phase_change(&self, change: PhaseChange) {
        self.record_metric(SessionMetrics::record_phase_change);
        self.audit(
            SessionAuditEventBuilder::new(SessionAuditStage::PhaseChanged)
                .detail("from", json!(change.from.as_str()))
                .detail("to", json!(change.to.as_str())),
        );
        self.log(
            LogLevel::Info,
            LIFECYCLE_TARGET,
            "phase_changed",
            [
                json_str("from", change.from.as_str()),
                json_str("to", change.to.as_str()),
            ],
        );
    }

    fn drop_after_teardown(&self, event: SessionEvent) {
        match event {
            SessionEvent::StreamingStartFinished { ticket, .. } => self.drop_completion(&ticket),
            other => self.drop_stale(other.describe(), "session_ended"),
        }
    }

    fn drop_stale(&self, event: &str, reason: &str) {
        self.record_metric(SessionMetrics::record_stale_event);
        self.log(
            LogLevel::Debug,
            REGISTRY_TARGET,
            "stale_event_dropped",
            [json_str("event", event), json_str("reason", reason)],
        );
    }

    fn drop_completion(&self, ticket: &CallTicket) {
        self.record_metric(SessionMetrics::record_dropped_completion);
        self.audit(
            SessionAuditEventBuilder::new(SessionAuditStage::CompletionDropped)
                .detail("call_id", json!(ticket.call_id))
                .detail("session_id", json!(ticket.session_id)),
        );
        self.log(
            LogLevel::Debug,
            LIFECYCLE_TARGET,
            "completion_dropped",
            [json_kv("call_id", json!(ticket.call_id))],
        );
    }

    fn audit(&self, builder: SessionAuditEventBuilder) {
        self.config.audit.record(builder.finish());
    }

    fn log<I>(&self, level: LogLevel, target: &str, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            let event = event_with_fields(level, target, message, fields);
            let _ = logger.log_event(event);
        }
    }

    fn record_metric(&self, record: impl FnOnce(&mut SessionMetrics)) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut *guard);
            }
        }
    }
}

fn is_screen_video(track: &TrackRef) -> bool {
    track.is_video() && track.source == TrackSource::Screen
}

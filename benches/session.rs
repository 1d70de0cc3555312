use std::sync::Arc;
use std::time::Duration;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use room_session::logging::{LogEvent, LogSink};
use room_session::{
    Logger, LoggingResult, Peer, PeerId, SessionConfig, SessionContext, SessionEvent,
    SessionSettings, TrackRef, TrackSource, partition,
};

#[derive(Clone, Default)]
struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _event: &LogEvent) -> LoggingResult<()> {
        Ok(())
    }
}

const PEERS: usize = 48;

fn session_join_script(c: &mut Criterion) {
    let script = join_events();
    c.bench_function("session_join_script", |b| {
        b.iter(|| {
            let mut session = build_session();
            session.apply_all(black_box(script.clone()));
            black_box(session.layout());
        });
    });
}

fn session_churn_script(c: &mut Criterion) {
    let script = churn_events();
    c.bench_function("session_churn_script", |b| {
        b.iter(|| {
            let mut session = build_session();
            session.apply_all(black_box(script.clone()));
            black_box(session.take_tile_changes());
        });
    });
}

fn layout_partition(c: &mut Criterion) {
    let mut session = build_session();
    session.apply_all(join_events());
    let tiles = session.tiles().to_vec();
    c.bench_function("layout_partition", |b| {
        b.iter(|| partition(black_box(&tiles), Some("peer-7-cam"), 4));
    });
}

fn build_session() -> SessionContext {
    let mut config = SessionConfig::with_settings(SessionSettings {
        skip_preview: true,
        ..SessionSettings::default()
    });
    config.logger = Some(Logger::from_shared(Arc::new(NullSink)));
    config.enable_metrics();
    SessionContext::new(config)
}

fn remote_peer(index: usize) -> Peer {
    Peer::new(format!("peer-{index}"), format!("Peer {index}"))
        .with_track(TrackRef::video(format!("peer-{index}-cam"), TrackSource::Regular))
        .with_track(TrackRef::audio(format!("peer-{index}-mic"), TrackSource::Regular))
}

fn join_events() -> Vec<SessionEvent> {
    let mut events = vec![SessionEvent::JoinSucceeded {
        local_peer: Peer::local("me", "Me"),
    }];
    events.extend((0..PEERS).map(|index| SessionEvent::PeerJoined(remote_peer(index))));
    events.push(SessionEvent::TrackAdded {
        peer_id: PeerId::from("peer-3"),
        track: TrackRef::video("peer-3-screen", TrackSource::Screen),
    });
    events
}

fn churn_events() -> Vec<SessionEvent> {
    let mut events = join_events();
    for index in 0..PEERS {
        let peer_id = PeerId::new(format!("peer-{index}"));
        events.push(SessionEvent::TrackUpdated {
            peer_id: peer_id.clone(),
            track: TrackRef::video(format!("peer-{index}-cam"), TrackSource::Regular)
                .with_muted(true),
        });
        events.push(SessionEvent::ActiveSpeakerChanged(Some(peer_id.clone())));
        if index % 3 == 0 {
            events.push(SessionEvent::PeerLeft(peer_id));
        }
    }
    events.push(SessionEvent::Tick {
        elapsed: Duration::from_secs(1),
    });
    events
}

criterion_group!(
    benches,
    session_join_script,
    session_churn_script,
    layout_partition
);
criterion_main!(benches);

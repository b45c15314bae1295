#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::Mutex;

    use crate::client::VenueClient;
    use crate::config::CoordinatorConfig;
    use crate::infrastructure_in_memory::{FaultInjector, InMemoryVenueStore};
    use crate::mirror::InMemoryMirror;
    use crate::runtime::{
        FeedStrategy, MasterRuntime, PlayerState, SharedClient, StaticTrackSource, should_resume,
    };
    use crate::session::SessionState;
    use crate::types::{CommandKind, DeviceIdentity, TrackRef};

    fn track(id: &str, duration_ms: u64) -> TrackRef {
        TrackRef {
            id: id.to_string(),
            title: format!("track {}", id),
            duration_ms,
        }
    }

    fn shared_client() -> SharedClient {
        Arc::new(Mutex::new(VenueClient::new()))
    }

    fn runtime(client: &SharedClient) -> Arc<MasterRuntime> {
        Arc::new(
            MasterRuntime::new(
                Arc::clone(client),
                "v1",
                DeviceIdentity::new("d1"),
                CoordinatorConfig::default(),
            )
            .unwrap(),
        )
    }

    // ─── Local playback state ───────────────────────────────────────────────

    #[test]
    fn reapplying_a_volume_command_is_idempotent() {
        let mut player = PlayerState::new();
        let mut tracks = StaticTrackSource::new(vec![]);
        let volume = CommandKind::Volume { level: 40 };

        player.apply(&volume, &mut tracks, "v1");
        player.apply(&volume, &mut tracks, "v1");

        assert_eq!(player.volume, 40);
    }

    #[test]
    fn play_pulls_from_the_queue_and_skip_advances() {
        let mut player = PlayerState::new();
        let mut tracks = StaticTrackSource::new(vec![track("t1", 200_000), track("t2", 180_000)]);

        player.apply(&CommandKind::Play, &mut tracks, "v1");
        assert!(player.is_playing);
        assert_eq!(
            player.now_playing.as_ref().map(|n| n.track.id.as_str()),
            Some("t1")
        );

        player.apply(&CommandKind::Seek { position_ms: 500_000 }, &mut tracks, "v1");
        // Seek clamps to the track duration
        assert_eq!(
            player.now_playing.as_ref().map(|n| n.position_ms),
            Some(200_000)
        );

        player.apply(&CommandKind::Skip, &mut tracks, "v1");
        assert_eq!(
            player.now_playing.as_ref().map(|n| n.track.id.as_str()),
            Some("t2")
        );

        player.apply(&CommandKind::Skip, &mut tracks, "v1");
        // Queue exhausted
        assert!(player.now_playing.is_none());
        assert!(!player.is_playing);
    }

    // ─── Runtime loops ──────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn master_executes_commands_and_publishes_snapshots() {
        let client = shared_client();
        let runtime = runtime(&client);
        let mut mirror = InMemoryMirror::new();

        let decision = runtime.acquire(&mut mirror).await;
        assert!(decision.granted);
        assert!(should_resume(&mirror));

        let state_rx = client.lock().await.subscribe_state("v1");

        let handle = {
            let runtime = Arc::clone(&runtime);
            tokio::spawn(async move {
                runtime
                    .run(
                        PlayerState::new(),
                        Box::new(StaticTrackSource::new(vec![])),
                        FeedStrategy::Push,
                    )
                    .await;
            })
        };

        client
            .lock()
            .await
            .issue_command("v1", CommandKind::Volume { level: 40 }, "admin-1")
            .unwrap();

        let mut applied = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if let Some(snapshot) = client.lock().await.latest_state("v1").unwrap() {
                if snapshot.volume == 40 {
                    applied = true;
                    break;
                }
            }
        }
        assert!(applied, "volume command never reached the snapshot");

        assert!(client.lock().await.pending_commands("v1").unwrap().is_empty());
        assert!(
            state_rx
                .borrow()
                .as_ref()
                .is_some_and(|s| s.volume == 40 && s.updated_by == "d1")
        );

        runtime.release(&mut mirror).await;
        assert!(!should_resume(&mirror));
        handle.await.unwrap();
        assert_eq!(
            runtime.session().lock().await.state(),
            SessionState::Observer
        );
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_payloads_are_dropped_but_marked_executed() {
        let client = shared_client();
        let runtime = runtime(&client);
        let mut mirror = InMemoryMirror::new();
        assert!(runtime.acquire(&mut mirror).await.granted);

        let handle = {
            let runtime = Arc::clone(&runtime);
            tokio::spawn(async move {
                runtime
                    .run(
                        PlayerState::new(),
                        Box::new(StaticTrackSource::new(vec![])),
                        FeedStrategy::Push,
                    )
                    .await;
            })
        };

        client
            .lock()
            .await
            .issue_command("v1", CommandKind::Volume { level: 150 }, "admin-1")
            .unwrap();

        let mut cleared = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if client.lock().await.pending_commands("v1").unwrap().is_empty() {
                cleared = true;
                break;
            }
        }
        // Marked executed so it cannot block the queue...
        assert!(cleared, "malformed command was never marked executed");
        // ...but never applied
        let snapshot = client.lock().await.latest_state("v1").unwrap().unwrap();
        assert_eq!(snapshot.volume, 50);

        runtime.release(&mut mirror).await;
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn missed_renewals_past_the_budget_demote() {
        let store = FaultInjector::new(InMemoryVenueStore::new());
        let faults = store.handle();
        let client: SharedClient = Arc::new(Mutex::new(VenueClient::with_store(
            Box::new(store),
            CoordinatorConfig::default(),
        )));
        let runtime = runtime(&client);
        let mut mirror = InMemoryMirror::new();
        assert!(runtime.acquire(&mut mirror).await.granted);

        // Store goes dark: renewals fail from here on
        faults.fail_next(u32::MAX);

        runtime
            .run(
                PlayerState::new(),
                Box::new(StaticTrackSource::new(vec![])),
                FeedStrategy::Poll,
            )
            .await;

        assert_eq!(
            runtime.session().lock().await.state(),
            SessionState::Observer
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_store_reports_network_error_and_stays_acquiring() {
        let store = FaultInjector::new(InMemoryVenueStore::new());
        let faults = store.handle();
        let client: SharedClient = Arc::new(Mutex::new(VenueClient::with_store(
            Box::new(store),
            CoordinatorConfig::default(),
        )));
        let runtime = runtime(&client);
        let mut mirror = InMemoryMirror::new();

        faults.fail_next(1);
        let decision = runtime.acquire(&mut mirror).await;
        assert!(!decision.granted);
        assert_eq!(
            decision.reason.as_ref().map(|r| r.code()),
            Some("NETWORK_ERROR")
        );
        assert_eq!(
            runtime.session().lock().await.state(),
            SessionState::Acquiring
        );
        assert!(!should_resume(&mirror));

        // Retryable: the next attempt goes through
        assert!(runtime.acquire(&mut mirror).await.granted);
        assert!(should_resume(&mirror));
    }

    #[tokio::test(start_paused = true)]
    async fn acquisition_times_out_into_network_error() {
        let client = shared_client();
        let runtime = runtime(&client);
        let mut mirror = InMemoryMirror::new();

        // Hold the client lock so the attempt cannot complete in time
        let guard = client.lock().await;
        let decision = runtime.acquire(&mut mirror).await;
        drop(guard);

        assert!(!decision.granted);
        assert_eq!(
            decision.reason.as_ref().map(|r| r.code()),
            Some("NETWORK_ERROR")
        );
        assert_eq!(
            runtime.session().lock().await.state(),
            SessionState::Acquiring
        );
    }
}

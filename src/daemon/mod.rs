use std::path::PathBuf;

use anyhow::Result;
use commands::UiInput;
use sink::ViewSink;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracker::TrackerModule;
use tracing::{error, info};

use crate::{
    engine::{aggregate::CollapsedGroupSet, settings::Settings, Engine},
    storage::{json_store::JsonStore, Store},
    utils::clock::{Clock, DefaultClock},
    window_api::{GenericWindowManager, WindowManager},
};

pub mod args;
pub mod commands;
pub mod shutdown;
pub mod sink;
pub mod tracker;

/// How a tracker is presented to the user.
pub struct Presentation {
    pub sink: Box<dyn ViewSink>,
    pub inputs: Option<mpsc::Receiver<UiInput>>,
    pub collapsed: CollapsedGroupSet,
}

/// Represents the starting point for the tracker. Runs until the process is asked to stop.
pub async fn start_daemon(dir: PathBuf, presentation: Presentation) -> Result<()> {
    let store = JsonStore::new(dir)?;
    let manager = GenericWindowManager::new()?;

    let shutdown_token = CancellationToken::new();

    let tracker =
        create_tracker(store, manager, presentation, &shutdown_token, DefaultClock).await?;
    info!("Tracker started");

    let (_, tracker_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        async {
            let result = tracker.run().await;
            // Stops listening for signals if the loop ended on its own.
            shutdown_token.cancel();
            result
        },
    );

    tracker_result.inspect_err(|e| error!("Tracker got an error {e:?}"))
}

/// Restores the engine from whatever `store` holds.
pub async fn load_engine(store: &impl Store, clock: &dyn Clock) -> Result<Engine> {
    let snapshot = store.load(Settings::default(), clock.time()).await;
    let config = store.load_groups().await;
    info!(
        "Loaded {} entries and {} groups",
        snapshot.ledger.window_times.len(),
        config.groups.rules().len()
    );
    Engine::new(snapshot, config, clock.instant())
}

async fn create_tracker<S: Store>(
    store: S,
    manager: impl WindowManager + 'static,
    presentation: Presentation,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> Result<TrackerModule<S>> {
    let engine = load_engine(&store, &clock).await?;
    Ok(TrackerModule::new(
        engine,
        store,
        Box::new(manager),
        presentation.sink,
        presentation.inputs,
        presentation.collapsed,
        shutdown_token.clone(),
        Box::new(clock),
    ))
}

#[cfg(test)]
mod daemon_tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::tempdir;
    use tokio::{sync::mpsc, time::Instant};
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::{
            commands::UiCommand,
            create_tracker,
            sink::{MockViewSink, ViewSink},
            Presentation,
        },
        engine::{
            aggregate::{Highlight, ViewModel},
            settings::{Settings, SettingsUpdate},
        },
        storage::{json_store::JsonStore, Store},
        utils::{clock::Clock, logging::TEST_LOGGING},
        window_api::MockWindowManager,
    };

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    #[derive(Clone)]
    struct TestClock {
        start_time: DateTime<Utc>,
        reference: Instant,
    }

    impl TestClock {
        fn new() -> Self {
            Self {
                start_time: Utc.from_utc_datetime(&TEST_START_DATE),
                reference: Instant::now(),
            }
        }
    }

    #[async_trait]
    impl Clock for TestClock {
        fn time(&self) -> DateTime<Utc> {
            self.start_time + self.reference.elapsed()
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep_until(&self, instant: Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }

    /// Keeps everything shown so tests can look at it after the tracker is gone.
    #[derive(Clone, Default)]
    struct RecordingSink {
        views: Arc<Mutex<Vec<ViewModel>>>,
        messages: Arc<Mutex<Vec<String>>>,
    }

    impl ViewSink for RecordingSink {
        fn present(&mut self, view: &ViewModel, _settings: &Settings) {
            self.views.lock().unwrap().push(view.clone());
        }

        fn notify(&mut self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    fn cycling_manager(titles: &'static [&'static str]) -> MockWindowManager {
        let mut manager = MockWindowManager::new();
        manager
            .expect_get_idle_time()
            .returning(|| Ok(Duration::ZERO));
        let mut titles = titles.iter().cycle();
        manager
            .expect_get_active_window_title()
            .returning(move || Ok(titles.next().unwrap().to_string()));
        manager
    }

    fn headless(sink: impl ViewSink + 'static) -> Presentation {
        Presentation {
            sink: Box::new(sink),
            inputs: None,
            collapsed: Default::default(),
        }
    }

    /// Very simple smoke test to check if the application is working properly. Time is paused so
    /// the whole run takes no real time.
    #[tokio::test(start_paused = true)]
    async fn smoke_test_daemon() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let store = JsonStore::new(dir.path().to_path_buf())?;
        let shutdown_token = CancellationToken::new();
        let sink = RecordingSink::default();

        let tracker = create_tracker(
            store,
            cycling_manager(&["● report.docx - Word", "report.docx - Word"]),
            headless(sink.clone()),
            &shutdown_token,
            TestClock::new(),
        )
        .await?;

        let (_, result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(5500)).await;
                shutdown_token.cancel()
            },
            tracker.run(),
        );
        result?;

        let store = JsonStore::new(dir.path().to_path_buf())?;
        let snapshot = store.load(Settings::default(), Utc::now()).await;
        let tracked = snapshot
            .ledger
            .duration_of("report.docx - Word")
            .ok_or_else(|| anyhow!("Nothing was tracked"))?;
        assert!((tracked - 5.5).abs() < 1e-6, "tracked {tracked}");
        assert_eq!(snapshot.ledger.window_times.len(), 1);
        // Raw titles are only looked at when focus moves.
        assert_eq!(
            snapshot.ledger.original_titles["report.docx - Word"],
            "● report.docx - Word"
        );
        assert_eq!(
            snapshot.ledger.reset_date,
            Utc.from_utc_datetime(&TEST_START_DATE)
        );

        let views = sink.views.lock().unwrap();
        assert!(views.len() >= 10);
        // A few seconds are below the display threshold, so the entry is only in the global bucket.
        let last = views.last().ok_or_else(|| anyhow!("Nothing was rendered"))?;
        assert!(last.groups.is_empty());
        assert_eq!(last.insignificant.count, 1);
        assert_eq!(last.insignificant.highlight, Highlight::Current);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_errors_count_as_unknown() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::new(dir.path().to_path_buf())?;
        let shutdown_token = CancellationToken::new();
        let mut manager = MockWindowManager::new();
        manager
            .expect_get_active_window_title()
            .returning(|| Err(anyhow!("No display")));
        manager
            .expect_get_idle_time()
            .returning(|| Err(anyhow!("No display")));
        let mut sink = MockViewSink::new();
        sink.expect_present().returning(|_, _| ());

        let tracker = create_tracker(
            store,
            manager,
            headless(sink),
            &shutdown_token,
            TestClock::new(),
        )
        .await?;
        let (_, result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                shutdown_token.cancel()
            },
            tracker.run(),
        );
        result?;

        let snapshot = JsonStore::new(dir.path().to_path_buf())?
            .load(Settings::default(), Utc::now())
            .await;
        assert_eq!(snapshot.ledger.duration_of("Unknown"), Some(2.));
        assert_eq!(snapshot.ledger.afk_time, 0.);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_reach_the_engine() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::new(dir.path().to_path_buf())?;
        let shutdown_token = CancellationToken::new();
        let sink = RecordingSink::default();
        let (sender, receiver) = mpsc::channel(10);

        let tracker = create_tracker(
            store,
            cycling_manager(&["a"]),
            Presentation {
                sink: Box::new(sink.clone()),
                inputs: Some(receiver),
                collapsed: Default::default(),
            },
            &shutdown_token,
            TestClock::new(),
        )
        .await?;

        let (_, result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                sender
                    .send("set top_per_group 0".parse())
                    .await
                    .unwrap();
                sender
                    .send(Ok(UiCommand::UpdateSettings(SettingsUpdate {
                        top_per_group: Some(2),
                        ..Default::default()
                    })))
                    .await
                    .unwrap();
                sender.send(Ok(UiCommand::Purge { commit: false })).await.unwrap();
                sender.send("dance".parse()).await.unwrap();
                drop(sender);
                tokio::time::sleep(Duration::from_secs(1)).await;
                shutdown_token.cancel()
            },
            tracker.run(),
        );
        result?;

        let settings_file: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(
            dir.path().join("timekeeper_settings.json"),
        )?)?;
        assert_eq!(settings_file["TOP_PER_GROUP"], 2);

        let messages = sink.messages.lock().unwrap();
        assert_eq!(messages.len(), 4);
        assert!(messages[0].contains("top_per_group"));
        assert_eq!(messages[1], "Settings updated");
        assert!(messages[2].contains("1 entries below 10s would be purged"));
        assert!(messages[3].contains("dance"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_only_collapses_known_groups() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::new(dir.path().to_path_buf())?;
        let shutdown_token = CancellationToken::new();
        let sink = RecordingSink::default();
        let (sender, receiver) = mpsc::channel(10);

        let tracker = create_tracker(
            store,
            cycling_manager(&["Terminal"]),
            Presentation {
                sink: Box::new(sink.clone()),
                inputs: Some(receiver),
                collapsed: Default::default(),
            },
            &shutdown_token,
            TestClock::new(),
        )
        .await?;

        let (_, result) = tokio::join!(
            async {
                sender.send("toggle Uncategorized".parse()).await.unwrap();
                sender.send("toggle Ofice".parse()).await.unwrap();
                sender.send("toggle Ofice".parse()).await.unwrap();
                sender.send("toggle Uncategorized".parse()).await.unwrap();
                drop(sender);
                tokio::time::sleep(Duration::from_secs(1)).await;
                shutdown_token.cancel()
            },
            tracker.run(),
        );
        result?;

        let messages = sink.messages.lock().unwrap();
        assert_eq!(
            *messages,
            vec![
                "Collapsed Uncategorized",
                "\"Ofice\" isn't a known group",
                "\"Ofice\" isn't a known group",
                "Expanded Uncategorized",
            ]
        );
        Ok(())
    }
}

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::ThemeError;
use crate::schedule::{fractional_hour, Mode, Schedule, Transition};
use crate::services::broadcast::Broadcaster;
use crate::services::store::ThemeStore;
use crate::theme::applier::{ThemeApplier, ThemeRecord};
use crate::theme::browsers::Browser;

/// Snapshot of the engine for status displays.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    /// Mode the schedule computes for right now.
    pub schedule_mode: Mode,
    /// Last mode actually applied.
    pub stored_mode: Option<Mode>,
    pub override_active: bool,
    pub next_transition: Transition,
    pub auto_running: bool,
    pub browser: Browser,
}

struct EngineInner {
    store: ThemeStore,
    applier: ThemeApplier,
}

impl EngineInner {
    async fn apply(&mut self, mode: Mode) -> Result<ThemeRecord, ThemeError> {
        self.applier.apply(mode, &self.store).await
    }
}

/// Drives the schedule: a recurring tick re-evaluates the current mode, a
/// manual selection pins a mode for a bounded duration, and a one-shot timer
/// resumes automatic switching when the pin expires.
///
/// Owns its timer handles and storage handle; one engine per execution
/// context, torn down with [`shutdown`](Self::shutdown). Tearing one context
/// down has no effect on other contexts sharing the same state file.
pub struct ThemeEngine {
    schedule: Schedule,
    browser: Browser,
    tick_period: Duration,
    inner: Arc<Mutex<EngineInner>>,
    broadcaster: Broadcaster,
    tick_task: Option<JoinHandle<()>>,
    expiry_task: Option<JoinHandle<()>>,
}

impl ThemeEngine {
    pub fn new(
        schedule: Schedule,
        tick_period: Duration,
        store: ThemeStore,
        applier: ThemeApplier,
        broadcaster: Broadcaster,
    ) -> Self {
        let browser = applier.browser();
        Self {
            schedule,
            browser,
            tick_period,
            inner: Arc::new(Mutex::new(EngineInner { store, applier })),
            broadcaster,
            tick_task: None,
            expiry_task: None,
        }
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Applies the schedule-computed mode once and starts the tick loop.
    pub async fn initialize(&mut self) -> Result<Mode, ThemeError> {
        let mode = self.schedule.current_mode(Local::now());
        self.inner.lock().await.apply(mode).await?;
        self.start_auto();
        log::info!("engine initialized in {} mode ({})", mode, self.browser);
        Ok(mode)
    }

    /// Starts the recurring schedule check. Restarts it if already running.
    pub fn start_auto(&mut self) {
        self.stop_auto();
        let schedule = self.schedule;
        let period = self.tick_period;
        let inner = Arc::clone(&self.inner);
        self.tick_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first interval tick fires immediately; initialization
            // already applied, so skip it.
            interval.tick().await;
            loop {
                interval.tick().await;
                let hour = fractional_hour(Local::now());
                let now_ms = Utc::now().timestamp_millis();
                if let Err(e) = run_tick(schedule, &inner, hour, now_ms).await {
                    log::warn!("schedule tick failed: {}", e);
                }
            }
        }));
    }

    pub fn stop_auto(&mut self) {
        if let Some(task) = self.tick_task.take() {
            task.abort();
        }
    }

    pub fn is_auto_running(&self) -> bool {
        self.tick_task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// One schedule check, exactly what the recurring tick runs. Returns
    /// whether a theme was applied.
    pub async fn tick_once(&self) -> Result<bool, ThemeError> {
        let hour = fractional_hour(Local::now());
        let now_ms = Utc::now().timestamp_millis();
        self.tick_at(hour, now_ms).await
    }

    /// Schedule check against an explicit clock reading, which keeps the
    /// loop testable. An active override makes this a no-op regardless of
    /// any timer bookkeeping.
    pub async fn tick_at(&self, hour: f64, now_ms: i64) -> Result<bool, ThemeError> {
        run_tick(self.schedule, &self.inner, hour, now_ms).await
    }

    /// Pins `mode` for `duration`, bypassing the schedule. A one-shot timer
    /// clears the pin and re-evaluates; a newer manual selection replaces any
    /// pending one.
    pub async fn set_manually(
        &mut self,
        mode: Mode,
        duration: Duration,
    ) -> Result<ThemeRecord, ThemeError> {
        let record = {
            let inner = &mut *self.inner.lock().await;
            let record = inner.apply(mode).await?;
            let now_ms = Utc::now().timestamp_millis();
            inner
                .store
                .set_override(mode, duration.as_millis() as i64, now_ms)
                .await;
            record
        };
        log::info!("manual override: {} mode for {}s", mode, duration.as_secs());

        if let Some(task) = self.expiry_task.take() {
            task.abort();
        }
        let schedule = self.schedule;
        let inner = Arc::clone(&self.inner);
        let expiry = tokio::time::sleep(duration);
        self.expiry_task = Some(tokio::spawn(async move {
            expiry.await;
            let inner = &mut *inner.lock().await;
            inner.store.clear_override().await;
            let mode = schedule.current_mode(Local::now());
            match inner.apply(mode).await {
                Ok(_) => log::info!("manual override expired, resumed {} mode", mode),
                Err(e) => log::warn!("override expiry re-apply failed: {}", e),
            }
        }));

        Ok(record)
    }

    /// Clears a manual override and immediately re-applies the
    /// schedule-driven mode.
    pub async fn clear_override(&mut self) -> Result<Mode, ThemeError> {
        if let Some(task) = self.expiry_task.take() {
            task.abort();
        }
        let mode = self.schedule.current_mode(Local::now());
        let inner = &mut *self.inner.lock().await;
        inner.store.clear_override().await;
        inner.apply(mode).await?;
        log::info!("manual override cleared, resumed {} mode", mode);
        Ok(mode)
    }

    pub async fn status(&self) -> EngineStatus {
        let now = Local::now();
        let schedule_mode = self.schedule.current_mode(now);
        let inner = self.inner.lock().await;
        let stored_mode = inner.store.current_mode().await;
        let override_active = inner
            .store
            .is_override_active(Utc::now().timestamp_millis())
            .await;
        EngineStatus {
            schedule_mode,
            stored_mode,
            override_active,
            next_transition: self.schedule.next_transition(schedule_mode, now),
            auto_running: self.is_auto_running(),
            browser: self.browser,
        }
    }

    /// Tears the context down: stops both timers and removes the injected
    /// style.
    pub async fn shutdown(&mut self) {
        self.stop_auto();
        if let Some(task) = self.expiry_task.take() {
            task.abort();
        }
        self.inner.lock().await.applier.teardown();
        log::info!("engine shut down ({})", self.browser);
    }
}

async fn run_tick(
    schedule: Schedule,
    inner: &Mutex<EngineInner>,
    hour: f64,
    now_ms: i64,
) -> Result<bool, ThemeError> {
    let inner = &mut *inner.lock().await;

    // The override expiry timestamp is the authoritative guard, even when
    // the one-shot expiry timer is delayed or lost.
    if inner.store.is_override_active(now_ms).await {
        return Ok(false);
    }

    let mode = schedule.mode_at_hour(hour);
    if inner.store.current_mode().await == Some(mode) {
        return Ok(false);
    }

    inner.apply(mode).await?;
    log::info!("auto-switched to {} mode", mode);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::ThemeStore;
    use crate::theme::surface::SharedDocument;

    fn engine_with_doc() -> (ThemeEngine, SharedDocument) {
        let doc = SharedDocument::new();
        let applier = ThemeApplier::new(
            Browser::Generic,
            Box::new(doc.clone()),
            Broadcaster::new(),
        );
        let engine = ThemeEngine::new(
            Schedule::default(),
            Duration::from_secs(60),
            ThemeStore::in_memory(),
            applier,
            Broadcaster::new(),
        );
        (engine, doc)
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    #[tokio::test]
    async fn test_tick_applies_on_mode_change() {
        let (engine, doc) = engine_with_doc();

        assert!(engine.tick_at(8.0, now_ms()).await.unwrap());
        doc.with(|d| assert_eq!(d.root_attribute("data-theme-mode"), Some("day")));

        // Same bucket again: no re-application.
        assert!(!engine.tick_at(12.0, now_ms()).await.unwrap());

        // Crossing boundaries applies the new bucket.
        assert!(engine.tick_at(17.5, now_ms()).await.unwrap());
        doc.with(|d| assert_eq!(d.root_attribute("data-theme-mode"), Some("evening")));
        assert!(engine.tick_at(19.0, now_ms()).await.unwrap());
        doc.with(|d| assert_eq!(d.root_attribute("data-theme-mode"), Some("night")));
    }

    #[tokio::test]
    async fn test_tick_suppressed_by_active_override() {
        let (mut engine, doc) = engine_with_doc();

        engine
            .set_manually(Mode::Night, Duration::from_secs(3600))
            .await
            .unwrap();
        doc.with(|d| assert_eq!(d.root_attribute("data-theme-mode"), Some("night")));

        // 08:00 computes day and stored mode is night, but the tick must not
        // touch the document while the override is active.
        assert!(!engine.tick_at(8.0, now_ms()).await.unwrap());
        doc.with(|d| assert_eq!(d.root_attribute("data-theme-mode"), Some("night")));

        // Once the expiry timestamp passes, the same tick re-applies.
        let after_expiry = now_ms() + 3600 * 1000 + 1;
        assert!(engine.tick_at(8.0, after_expiry).await.unwrap());
        doc.with(|d| assert_eq!(d.root_attribute("data-theme-mode"), Some("day")));
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_manual_override_status_and_expiry() {
        tokio::time::pause();
        let (mut engine, _doc) = engine_with_doc();

        // Pin a mode guaranteed to differ from the schedule-computed one.
        let schedule_mode = engine.status().await.schedule_mode;
        let pinned = schedule_mode.next();
        engine
            .set_manually(pinned, Duration::from_secs(60))
            .await
            .unwrap();

        let status = engine.status().await;
        assert_eq!(status.schedule_mode, schedule_mode);
        assert_eq!(status.stored_mode, Some(pinned));
        assert!(status.override_active);

        // Let the one-shot expiry fire and hand control to its task.
        tokio::time::advance(Duration::from_secs(61)).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
            if engine.status().await.stored_mode == Some(schedule_mode) {
                break;
            }
        }
        assert_eq!(engine.status().await.stored_mode, Some(schedule_mode));
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_clear_override_reapplies_schedule_mode() {
        let (mut engine, doc) = engine_with_doc();

        let schedule_mode = engine.status().await.schedule_mode;
        let pinned = schedule_mode.next();
        engine
            .set_manually(pinned, Duration::from_secs(3600))
            .await
            .unwrap();

        let mode = engine.clear_override().await.unwrap();
        assert_eq!(mode, schedule_mode);
        doc.with(|d| {
            assert_eq!(
                d.root_attribute("data-theme-mode"),
                Some(schedule_mode.as_str())
            )
        });
        assert!(!engine.status().await.override_active);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_auto_and_removes_style() {
        let (mut engine, doc) = engine_with_doc();
        engine.initialize().await.unwrap();
        assert!(engine.is_auto_running());
        doc.with(|d| assert_eq!(d.style_count(), 1));

        engine.shutdown().await;
        assert!(!engine.is_auto_running());
        doc.with(|d| assert_eq!(d.style_count(), 0));
    }
}

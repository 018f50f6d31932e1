//! Per-agent download sessions
//!
//! Each agent card gets an independent session walking
//! `idle → downloading → {success, error} → idle`. While a transfer is in
//! flight a cosmetic ticker advances the progress indicator; the platform's
//! transfer mechanism exposes no granular byte progress, so the indicator is
//! driven by a timer and pinned to 100 only when the real operation
//! completes. Terminal states auto-reset after a cooldown.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;

use crate::agents::{AgentApi, DownloadReceipt};

/// Cosmetic ticker period.
pub const PROGRESS_TICK: Duration = Duration::from_millis(200);
/// Ceiling the cosmetic indicator saturates at until real completion.
pub const PROGRESS_CEILING: u8 = 95;
/// Delay before the authoritative refresh that reconciles the optimistic
/// download-count bump.
pub const RECONCILE_DELAY: Duration = Duration::from_millis(1000);
/// Delay after success or error before the session resets to idle.
pub const COOLDOWN: Duration = Duration::from_millis(2500);

const STEP_MIN: u8 = 5;
const STEP_MAX: u8 = 15;

/// Session phase for one agent card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadPhase {
    #[default]
    Idle,
    Downloading,
    Success,
    Error,
}

/// Ephemeral per-card download state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSession {
    phase: DownloadPhase,
    progress: u8,
    error: Option<String>,
}

impl DownloadSession {
    /// Start a download attempt. Returns false (and changes nothing) when one
    /// is already in flight: a second trigger is ignored, not queued.
    pub fn begin(&mut self) -> bool {
        if self.phase == DownloadPhase::Downloading {
            return false;
        }
        self.phase = DownloadPhase::Downloading;
        self.progress = 0;
        self.error = None;
        true
    }

    /// Advance the cosmetic indicator. Only moves while downloading, and
    /// saturates at [`PROGRESS_CEILING`] so the bar never reads complete
    /// before the transfer is.
    pub fn advance(&mut self, step: u8) {
        if self.phase != DownloadPhase::Downloading {
            return;
        }
        self.progress = self.progress.saturating_add(step).min(PROGRESS_CEILING);
    }

    pub fn finish_success(&mut self) {
        if self.phase != DownloadPhase::Downloading {
            return;
        }
        self.phase = DownloadPhase::Success;
        self.progress = 100;
    }

    pub fn finish_error(&mut self, message: String) {
        if self.phase != DownloadPhase::Downloading {
            return;
        }
        self.phase = DownloadPhase::Error;
        self.error = Some(message);
    }

    /// User dismissed the error text before the cooldown elapsed.
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn phase(&self) -> DownloadPhase {
        self.phase
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, DownloadPhase::Success | DownloadPhase::Error)
    }
}

/// Outcome of one driven download attempt.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// A download for this agent was already in flight; nothing happened.
    AlreadyDownloading,
    Completed(DownloadReceipt),
    Failed(String),
}

/// Drives download sessions for any number of agent cards.
///
/// Sessions for distinct agents are fully independent; concurrent downloads
/// of different agents are allowed.
#[derive(Debug, Clone, Default)]
pub struct DownloadManager {
    sessions: Arc<Mutex<HashMap<i64, DownloadSession>>>,
}

impl DownloadManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of an agent's session; absent sessions read as idle.
    pub fn session(&self, agent_id: i64) -> DownloadSession {
        self.sessions
            .lock()
            .unwrap()
            .get(&agent_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn dismiss_error(&self, agent_id: i64) {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(&agent_id) {
            session.dismiss_error();
        }
    }

    /// Run one download attempt end to end.
    ///
    /// `on_progress` receives cosmetic progress updates (0–100). A second
    /// call for the same agent while one is in flight is a no-op and issues
    /// no network request.
    pub async fn download<A, F>(
        &self,
        api: &A,
        agent_id: i64,
        dest: &Path,
        mut on_progress: F,
    ) -> DownloadOutcome
    where
        A: AgentApi,
        F: FnMut(u8),
    {
        {
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions.entry(agent_id).or_default();
            if !session.begin() {
                return DownloadOutcome::AlreadyDownloading;
            }
        }

        let mut ticker = tokio::time::interval(PROGRESS_TICK);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let transfer = api.download_agent(agent_id, dest);
        tokio::pin!(transfer);

        let result = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let step = rand::thread_rng().gen_range(STEP_MIN..=STEP_MAX);
                    let progress = {
                        let mut sessions = self.sessions.lock().unwrap();
                        let session = sessions.entry(agent_id).or_default();
                        session.advance(step);
                        session.progress()
                    };
                    on_progress(progress);
                }
                result = &mut transfer => break result,
            }
        };

        let outcome = match result {
            Ok(receipt) => {
                let mut sessions = self.sessions.lock().unwrap();
                if let Some(session) = sessions.get_mut(&agent_id) {
                    session.finish_success();
                }
                drop(sessions);
                on_progress(100);
                DownloadOutcome::Completed(receipt)
            }
            Err(e) => {
                let message = e.display_message();
                let mut sessions = self.sessions.lock().unwrap();
                if let Some(session) = sessions.get_mut(&agent_id) {
                    session.finish_error(message.clone());
                }
                DownloadOutcome::Failed(message)
            }
        };

        self.schedule_cooldown(agent_id);
        outcome
    }

    /// Auto-reset to idle after the cooldown, unless a new attempt started
    /// in the meantime.
    fn schedule_cooldown(&self, agent_id: i64) {
        let sessions = Arc::clone(&self.sessions);
        tokio::spawn(async move {
            tokio::time::sleep(COOLDOWN).await;
            let mut sessions = sessions.lock().unwrap();
            if let Some(session) = sessions.get_mut(&agent_id) {
                if session.is_terminal() {
                    session.reset();
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::MockAgentApi;
    use crate::tests::utils::test_helpers::*;

    mod unit {
        use super::*;

        #[test]
        fn test_begin_resets_prior_state() {
            let mut session = DownloadSession::default();
            assert!(session.begin());
            session.advance(40);
            session.finish_error("boom".to_string());

            assert!(session.begin());
            assert_eq!(session.phase(), DownloadPhase::Downloading);
            assert_eq!(session.progress(), 0);
            assert!(session.error().is_none());
        }

        #[test]
        fn test_begin_while_downloading_is_noop() {
            let mut session = DownloadSession::default();
            assert!(session.begin());
            session.advance(37);
            let before = session.clone();

            assert!(!session.begin());
            assert_eq!(session, before);
        }

        #[test]
        fn test_advance_saturates_below_hundred() {
            let mut session = DownloadSession::default();
            session.begin();
            for _ in 0..100 {
                session.advance(STEP_MAX);
            }
            assert_eq!(session.progress(), PROGRESS_CEILING);
        }

        #[test]
        fn test_advance_stops_after_terminal() {
            let mut session = DownloadSession::default();
            session.begin();
            session.finish_success();
            assert_eq!(session.progress(), 100);

            session.advance(10);
            assert_eq!(session.progress(), 100);
        }

        #[test]
        fn test_error_keeps_progress() {
            let mut session = DownloadSession::default();
            session.begin();
            session.advance(30);
            session.finish_error("server said no".to_string());

            assert_eq!(session.phase(), DownloadPhase::Error);
            assert_eq!(session.progress(), 30);
            assert_eq!(session.error(), Some("server said no"));
        }

        #[test]
        fn test_dismiss_error_before_cooldown() {
            let mut session = DownloadSession::default();
            session.begin();
            session.finish_error("boom".to_string());
            session.dismiss_error();

            assert_eq!(session.phase(), DownloadPhase::Error);
            assert!(session.error().is_none());
        }
    }

    mod driver {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_double_trigger_issues_one_network_call() {
            let api = MockAgentApi::new();
            api.set_download_delay(Duration::from_millis(500));
            let manager = DownloadManager::new();
            let dir = create_temp_dir();
            let dest = dir.path().join("pkg.tar.gz");

            let (first, second) = tokio::join!(
                manager.download(&api, 42, &dest, |_| {}),
                manager.download(&api, 42, &dest, |_| {}),
            );

            let outcomes = [&first, &second];
            assert!(outcomes
                .iter()
                .any(|o| matches!(o, DownloadOutcome::AlreadyDownloading)));
            assert!(outcomes
                .iter()
                .any(|o| matches!(o, DownloadOutcome::Completed(_))));
            assert_eq!(api.download_call_count(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_distinct_agents_download_independently() {
            let api = MockAgentApi::new();
            api.set_download_delay(Duration::from_millis(300));
            let manager = DownloadManager::new();
            let dir = create_temp_dir();

            let dest_a = dir.path().join("a");
            let dest_b = dir.path().join("b");
            let (a, b) = tokio::join!(
                manager.download(&api, 1, &dest_a, |_| {}),
                manager.download(&api, 2, &dest_b, |_| {}),
            );

            assert!(matches!(a, DownloadOutcome::Completed(_)));
            assert!(matches!(b, DownloadOutcome::Completed(_)));
            assert_eq!(api.download_call_count(), 2);
        }

        #[tokio::test(start_paused = true)]
        async fn test_success_pins_progress_to_hundred() {
            let api = MockAgentApi::new();
            api.set_download_delay(Duration::from_millis(800));
            let manager = DownloadManager::new();
            let dir = create_temp_dir();

            let mut seen = Vec::new();
            let outcome = manager
                .download(&api, 7, &dir.path().join("pkg"), |p| seen.push(p))
                .await;

            assert!(matches!(outcome, DownloadOutcome::Completed(_)));
            assert!(seen.iter().all(|&p| p <= 100));
            assert_eq!(*seen.last().unwrap(), 100);
            // Monotonic while in flight.
            assert!(seen.windows(2).all(|w| w[0] <= w[1]));
            assert_eq!(manager.session(7).phase(), DownloadPhase::Success);
        }

        #[tokio::test(start_paused = true)]
        async fn test_failed_download_surfaces_message_then_resets() {
            let api = MockAgentApi::new();
            api.fail_downloads("quota exceeded");
            let manager = DownloadManager::new();
            let dir = create_temp_dir();

            let outcome = manager
                .download(&api, 9, &dir.path().join("pkg"), |_| {})
                .await;

            match outcome {
                DownloadOutcome::Failed(msg) => assert_eq!(msg, "quota exceeded"),
                other => panic!("expected failure, got {:?}", other),
            }
            let session = manager.session(9);
            assert_eq!(session.phase(), DownloadPhase::Error);
            assert_eq!(session.error(), Some("quota exceeded"));

            // Dismissing clears the message without leaving the error phase.
            manager.dismiss_error(9);
            let session = manager.session(9);
            assert_eq!(session.phase(), DownloadPhase::Error);
            assert!(session.error().is_none());

            // After the cooldown the card is back to the idle Download state.
            tokio::time::sleep(COOLDOWN + Duration::from_millis(50)).await;
            let session = manager.session(9);
            assert_eq!(session.phase(), DownloadPhase::Idle);
            assert_eq!(session.progress(), 0);
            assert!(session.error().is_none());
        }

        #[tokio::test(start_paused = true)]
        async fn test_network_error_uses_generic_fallback() {
            let api = MockAgentApi::new();
            api.fail_downloads("");
            let manager = DownloadManager::new();
            let dir = create_temp_dir();

            let outcome = manager
                .download(&api, 9, &dir.path().join("pkg"), |_| {})
                .await;

            match outcome {
                DownloadOutcome::Failed(msg) => {
                    assert_eq!(msg, "Download failed. Please try again.")
                }
                other => panic!("expected failure, got {:?}", other),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_cooldown_skipped_when_new_attempt_started() {
            let api = MockAgentApi::new();
            let manager = DownloadManager::new();
            let dir = create_temp_dir();
            let dest = dir.path().join("pkg");

            let outcome = manager.download(&api, 5, &dest, |_| {}).await;
            assert!(matches!(outcome, DownloadOutcome::Completed(_)));

            // A new attempt begins before the first cooldown fires; the
            // stale reset must not clobber it.
            api.set_download_delay(COOLDOWN * 2);
            let manager2 = manager.clone();
            let handle = tokio::spawn(async move {
                manager2.download(&api, 5, &dest, |_| {}).await
            });

            tokio::time::sleep(COOLDOWN + Duration::from_millis(50)).await;
            assert_eq!(manager.session(5).phase(), DownloadPhase::Downloading);
            let outcome = handle.await.unwrap();
            assert!(matches!(outcome, DownloadOutcome::Completed(_)));
        }
    }
}

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::animator::{AnimatorOptions, PixelPoint, PositionAnimator};
use crate::constants::{get_tween_duration_ms, DEFAULT_MOVE_TIMEOUT_MS, DEFAULT_SWIPE_THRESHOLD_PX};
use crate::dispatch::{dispatch, Action};
use crate::gate::MoveGate;
use crate::gesture::resolve_direction;
use crate::service::{MazeService, ServiceError};
use crate::timer::TimerManager;
use crate::types::{Direction, GameSettings, Maze, MazeProgress, MoveOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockingModal {
    Knowledge,
    Challenge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Initializing,
    Playing,
    Paused,
    ModalBlocked(BlockingModal),
    Completed,
    Exited,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Exited)
    }
}

/// How an attempted move ended, for the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub enum MoveFeedback {
    /// The attempt was not allowed right now (gate closed, paused, modal
    /// open, or session over) and nothing happened.
    Ignored,
    /// The service judged the move illegal; progress is unchanged.
    Rejected { message: String },
    /// The move was confirmed; `action` tells the view what to present.
    Accepted { action: Action },
    /// The round trip failed; progress is unchanged and play can continue.
    Failed { message: String },
}

#[derive(Clone, Copy, Debug)]
pub struct SessionOptions {
    pub move_timeout_ms: u64,
    pub swipe_threshold_px: f32,
    pub animator: AnimatorOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            move_timeout_ms: DEFAULT_MOVE_TIMEOUT_MS,
            swipe_threshold_px: DEFAULT_SWIPE_THRESHOLD_PX,
            animator: AnimatorOptions::default(),
        }
    }
}

/// Avatar state for one rendered frame.
#[derive(Clone, Copy, Debug)]
pub struct RenderState {
    pub position: PixelPoint,
    pub rotation_degrees: f32,
    pub animating: bool,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("maze service call failed: {0}")]
    Service(#[from] ServiceError),
}

/// The session state machine, synchronous and independently testable.
///
/// Single writer: every `MazeProgress` mutation goes through
/// `apply_move_outcome`, and only with a confirmed server snapshot.
pub struct SessionCore {
    phase: SessionPhase,
    maze: Maze,
    progress: MazeProgress,
    settings: GameSettings,
    timer: TimerManager,
    animator: PositionAnimator,
}

impl SessionCore {
    pub fn new(
        maze: Maze,
        progress: MazeProgress,
        settings: GameSettings,
        animator_options: AnimatorOptions,
        resumed: bool,
        now_ms: u64,
    ) -> Self {
        let timer = if resumed {
            let started_at_ms = progress.started_at.timestamp_millis().max(0) as u64;
            TimerManager::seeded(now_ms.saturating_sub(started_at_ms))
        } else {
            TimerManager::new()
        };
        let animator = PositionAnimator::new(animator_options, progress.current_position);
        let mut core = Self {
            phase: SessionPhase::Initializing,
            maze,
            progress,
            settings,
            timer,
            animator,
        };
        core.phase = SessionPhase::Playing;
        core.timer.start(now_ms);
        core
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn progress(&self) -> &MazeProgress {
        &self.progress
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn animator(&self) -> &PositionAnimator {
        &self.animator
    }

    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn elapsed_seconds(&self, now_ms: u64) -> u64 {
        self.timer.elapsed_seconds(now_ms)
    }

    pub fn can_attempt_move(&self) -> bool {
        self.phase == SessionPhase::Playing
    }

    pub fn pause(&mut self, now_ms: u64) -> bool {
        if self.phase != SessionPhase::Playing {
            return false;
        }
        self.timer.stop(now_ms);
        self.animator.set_paused(true, now_ms);
        self.phase = SessionPhase::Paused;
        true
    }

    pub fn resume(&mut self, now_ms: u64) -> bool {
        if self.phase != SessionPhase::Paused {
            return false;
        }
        self.timer.start(now_ms);
        self.animator.set_paused(false, now_ms);
        self.phase = SessionPhase::Playing;
        true
    }

    pub fn close_modal(&mut self, now_ms: u64) -> bool {
        if !matches!(self.phase, SessionPhase::ModalBlocked(_)) {
            return false;
        }
        self.timer.start(now_ms);
        self.phase = SessionPhase::Playing;
        true
    }

    pub fn exit(&mut self, now_ms: u64) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.timer.stop(now_ms);
        self.phase = SessionPhase::Exited;
        true
    }

    pub fn apply_settings(&mut self, settings: GameSettings) {
        self.settings = settings;
    }

    /// Applies a confirmed move: replaces the progress snapshot, starts the
    /// avatar tween and runs the resulting action's phase transition.
    ///
    /// A snapshot with an out-of-bounds or on-wall position is discarded as a
    /// defensive no-op.
    pub fn apply_move_outcome(&mut self, outcome: &MoveOutcome, now_ms: u64) -> Action {
        let Some(snapshot) = outcome.progress.as_ref() else {
            warn!("accepted move carried no progress snapshot; ignoring");
            return Action::Continue;
        };
        if !self.maze.is_walkable(snapshot.current_position) {
            warn!(
                x = snapshot.current_position.x,
                y = snapshot.current_position.y,
                "server position is not walkable; ignoring snapshot"
            );
            return Action::Continue;
        }

        if snapshot.current_position != self.progress.current_position {
            let duration_ms = get_tween_duration_ms(self.settings.animation_speed);
            self.animator
                .animate_to(snapshot.current_position, duration_ms, now_ms);
        }
        self.progress = snapshot.clone();

        let action = dispatch(outcome, self.phase == SessionPhase::Completed);
        match &action {
            Action::OpenKnowledge(_) => {
                self.timer.stop(now_ms);
                self.phase = SessionPhase::ModalBlocked(BlockingModal::Knowledge);
            }
            Action::OpenChallenge(_) => {
                self.timer.stop(now_ms);
                self.phase = SessionPhase::ModalBlocked(BlockingModal::Challenge);
            }
            Action::Complete => {
                self.timer.stop(now_ms);
                self.phase = SessionPhase::Completed;
            }
            Action::Continue | Action::ShowReward(_) => {}
        }
        action
    }

    pub fn render_state(&self, now_ms: u64) -> RenderState {
        RenderState {
            position: self.animator.position_at(now_ms),
            rotation_degrees: self.animator.rotation_degrees_at(now_ms),
            animating: self.animator.is_animating(now_ms),
        }
    }
}

/// Async session facade: owns the remote round trip and the move gate.
///
/// The core lock is never held across the service await; serialization of
/// moves comes from the gate, not from lock contention.
pub struct MazeSession {
    core: Arc<Mutex<SessionCore>>,
    gate: MoveGate,
    service: Arc<dyn MazeService>,
    user_id: String,
    maze_id: String,
    options: SessionOptions,
}

impl MazeSession {
    pub async fn start(
        service: Arc<dyn MazeService>,
        user_id: &str,
        maze_id: &str,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let response = service.get_maze(maze_id, user_id).await?;
        let (progress, resumed) = match response.user_progress {
            Some(progress) if !progress.completed => (progress, true),
            _ => (service.start_maze(user_id, maze_id).await?, false),
        };
        let settings = match service.get_game_settings(user_id).await {
            Ok(settings) => settings,
            Err(err) => {
                warn!(error = %err, "game settings unavailable, falling back to defaults");
                GameSettings::default()
            }
        };

        debug!(
            maze_id,
            user_id,
            resumed,
            steps = progress.steps_count,
            "maze session ready"
        );
        let core = SessionCore::new(
            response.maze,
            progress,
            settings,
            options.animator,
            resumed,
            now_ms(),
        );
        Ok(Self {
            core: Arc::new(Mutex::new(core)),
            gate: MoveGate::new(),
            service,
            user_id: user_id.to_string(),
            maze_id: maze_id.to_string(),
            options,
        })
    }

    pub fn resolve_gesture(&self, dx: f32, dy: f32) -> Option<Direction> {
        resolve_direction(dx, dy, self.options.swipe_threshold_px)
    }

    /// Gesture entry point: resolve the drag, then attempt the move.
    pub async fn handle_swipe(&self, dx: f32, dy: f32) -> MoveFeedback {
        match self.resolve_gesture(dx, dy) {
            Some(direction) => self.attempt_move(direction).await,
            None => MoveFeedback::Ignored,
        }
    }

    pub async fn attempt_move(&self, direction: Direction) -> MoveFeedback {
        let permit = {
            let core = self.core.lock().await;
            if !core.can_attempt_move() {
                return MoveFeedback::Ignored;
            }
            match self.gate.try_enter() {
                Some(permit) => permit,
                None => return MoveFeedback::Ignored,
            }
        };
        // permit is held (not the lock) across the round trip; its drop at
        // the end of this function reopens the gate on every path.

        let timeout = Duration::from_millis(self.options.move_timeout_ms);
        let call = self
            .service
            .move_in_maze(&self.user_id, &self.maze_id, direction);
        let outcome = match tokio::time::timeout(timeout, call).await {
            Err(_) => {
                let err = ServiceError::Timeout(self.options.move_timeout_ms);
                warn!(direction = direction.as_str(), error = %err, "move failed");
                return MoveFeedback::Failed {
                    message: err.to_string(),
                };
            }
            Ok(Err(err)) => {
                warn!(direction = direction.as_str(), error = %err, "move failed");
                return MoveFeedback::Failed {
                    message: err.to_string(),
                };
            }
            Ok(Ok(outcome)) => outcome,
        };

        let feedback = {
            let mut core = self.core.lock().await;
            if outcome.success {
                let action = core.apply_move_outcome(&outcome, now_ms());
                if action.blocks_play() || action == Action::Complete {
                    self.gate.set_blocked(true);
                }
                MoveFeedback::Accepted { action }
            } else {
                debug!(
                    direction = direction.as_str(),
                    message = outcome.message.as_deref().unwrap_or(""),
                    "move rejected"
                );
                MoveFeedback::Rejected {
                    message: outcome
                        .message
                        .unwrap_or_else(|| "move rejected".to_string()),
                }
            }
        };
        drop(permit);
        feedback
    }

    pub async fn pause(&self) -> bool {
        let paused = self.core.lock().await.pause(now_ms());
        if paused {
            self.gate.set_blocked(true);
        }
        paused
    }

    pub async fn resume(&self) -> bool {
        let resumed = self.core.lock().await.resume(now_ms());
        if resumed {
            self.gate.set_blocked(false);
        }
        resumed
    }

    pub async fn close_modal(&self) -> bool {
        let closed = self.core.lock().await.close_modal(now_ms());
        if closed {
            self.gate.set_blocked(false);
        }
        closed
    }

    pub async fn exit(&self) -> bool {
        let exited = self.core.lock().await.exit(now_ms());
        if exited {
            self.gate.set_blocked(true);
        }
        exited
    }

    pub async fn apply_settings(&self, settings: GameSettings) {
        self.core.lock().await.apply_settings(settings);
    }

    pub async fn phase(&self) -> SessionPhase {
        self.core.lock().await.phase()
    }

    pub async fn progress(&self) -> MazeProgress {
        self.core.lock().await.progress().clone()
    }

    pub async fn maze(&self) -> Maze {
        self.core.lock().await.maze().clone()
    }

    pub async fn settings(&self) -> GameSettings {
        *self.core.lock().await.settings()
    }

    pub async fn elapsed_seconds(&self) -> u64 {
        self.core.lock().await.elapsed_seconds(now_ms())
    }

    pub fn is_move_in_flight(&self) -> bool {
        self.gate.is_locked()
    }

    pub async fn render_state(&self) -> RenderState {
        self.core.lock().await.render_state(now_ms())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

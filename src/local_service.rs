use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;

use crate::constants::{
    CHALLENGE_BONUS_SCORE, GOAL_BONUS_SCORE, KNOWLEDGE_BONUS_SCORE, MOVE_BASE_SCORE,
    REWARD_VALUE_MAX, REWARD_VALUE_MIN,
};
use crate::service::{MazeService, ServiceError};
use crate::types::{
    Challenge, Direction, EventKind, GameSettings, KnowledgeNode, Maze, MazeNode, MazeProgress,
    MazeResponse, MoveOutcome, NodeKind, ProgressResponse, Reward,
};

const HEALTH_TIPS: &[(&str, &str)] = &[
    ("Hydration", "Drink water regularly through the day, not just when thirsty."),
    ("Sleep rhythm", "Going to bed at the same time every night improves sleep quality."),
    ("Balanced plate", "Half vegetables, a quarter protein, a quarter whole grains."),
    ("Daily movement", "A brisk thirty-minute walk already counts as exercise."),
    ("Screen breaks", "Rest your eyes on something distant every twenty minutes."),
];

const CHALLENGE_BANK: &[(&str, &[&str], usize)] = &[
    (
        "How many hours of sleep do most adults need?",
        &["4-5 hours", "7-9 hours", "11-12 hours"],
        1,
    ),
    (
        "Which drink hydrates best?",
        &["Water", "Soda", "Energy drink"],
        0,
    ),
    (
        "How often should you take a screen break?",
        &["Every 20 minutes", "Once a day", "Never"],
        0,
    ),
];

const REWARD_NAMES: &[&str] = &["Golden corn", "Sunflower badge", "Scarecrow charm"];

#[derive(Clone, Copy, Debug)]
pub struct LocalMazeServiceOptions {
    /// Simulated round-trip latency range in ms, if any.
    pub latency_ms: Option<(u64, u64)>,
    pub seed: u64,
}

impl Default for LocalMazeServiceOptions {
    fn default() -> Self {
        Self {
            latency_ms: None,
            seed: 7,
        }
    }
}

struct LocalState {
    mazes: HashMap<String, Maze>,
    knowledge_nodes: HashMap<String, KnowledgeNode>,
    challenges: HashMap<String, Challenge>,
    sessions: HashMap<String, MazeProgress>,
    settings: HashMap<String, GameSettings>,
    rng: StdRng,
}

/// In-memory maze service: the authoritative side of the §6-shaped contract.
///
/// Holds fixture mazes, judges move legality, and applies event and scoring
/// rules. Used by the dev server binary, the simulator and tests.
pub struct LocalMazeService {
    options: LocalMazeServiceOptions,
    state: Mutex<LocalState>,
}

impl LocalMazeService {
    pub fn new(options: LocalMazeServiceOptions) -> Self {
        let mut state = LocalState {
            mazes: HashMap::new(),
            knowledge_nodes: HashMap::new(),
            challenges: HashMap::new(),
            sessions: HashMap::new(),
            settings: HashMap::new(),
            rng: StdRng::seed_from_u64(options.seed),
        };
        for (maze_id, rows) in builtin_fixtures() {
            register_fixture(&mut state, maze_id, rows);
        }
        Self {
            options,
            state: Mutex::new(state),
        }
    }

    pub fn maze_ids(&self) -> Vec<String> {
        vec!["meadow".to_string(), "orchard".to_string()]
    }

    pub async fn register_maze(&self, maze_id: &str, rows: &[&str]) {
        let mut state = self.state.lock().await;
        register_fixture(&mut state, maze_id, rows);
    }

    pub async fn put_settings(&self, user_id: &str, settings: GameSettings) {
        let mut state = self.state.lock().await;
        state.settings.insert(user_id.to_string(), settings);
    }

    async fn simulate_latency(&self) {
        let Some((min_ms, max_ms)) = self.options.latency_ms else {
            return;
        };
        let wait_ms = {
            let mut state = self.state.lock().await;
            state.rng.random_range(min_ms..=max_ms.max(min_ms))
        };
        tokio::time::sleep(std::time::Duration::from_millis(wait_ms)).await;
    }
}

fn session_key(user_id: &str, maze_id: &str) -> String {
    format!("{user_id}:{maze_id}")
}

fn reward_index(content_id: &str) -> usize {
    content_id
        .rsplit('r')
        .next()
        .and_then(|suffix| suffix.parse::<usize>().ok())
        .unwrap_or(1)
        .saturating_sub(1)
}

fn builtin_fixtures() -> Vec<(&'static str, &'static [&'static str])> {
    const MEADOW: &[&str] = &[
        "S..K.",
        ".##.#",
        ".R...",
        "#.#C#",
        "...E.",
    ];
    const ORCHARD: &[&str] = &[
        "S...#....",
        ".##.#.##.",
        "..K......",
        ".#.##.##.",
        "...R#....",
        ".#.##.##C",
        ".#.......",
        "..##.##..",
        "....R...E",
    ];
    vec![("meadow", MEADOW), ("orchard", ORCHARD)]
}

fn register_fixture(state: &mut LocalState, maze_id: &str, rows: &[&str]) {
    let size = rows.len() as i32;
    let mut nodes = Vec::with_capacity(rows.len());
    let mut knowledge_count = 0usize;
    let mut challenge_count = 0usize;
    let mut reward_count = 0usize;

    for row in rows {
        let mut line = Vec::with_capacity(row.len());
        for cell in row.chars() {
            let node = match cell {
                '#' => MazeNode {
                    kind: NodeKind::Wall,
                    content_id: None,
                },
                'S' => MazeNode {
                    kind: NodeKind::Start,
                    content_id: None,
                },
                'E' => MazeNode {
                    kind: NodeKind::End,
                    content_id: None,
                },
                'K' => {
                    knowledge_count += 1;
                    let id = format!("{maze_id}_k{knowledge_count}");
                    let (title, content) = HEALTH_TIPS[(knowledge_count - 1) % HEALTH_TIPS.len()];
                    state.knowledge_nodes.insert(
                        id.clone(),
                        KnowledgeNode {
                            id: id.clone(),
                            title: title.to_string(),
                            content: content.to_string(),
                        },
                    );
                    MazeNode {
                        kind: NodeKind::Knowledge,
                        content_id: Some(id),
                    }
                }
                'C' => {
                    challenge_count += 1;
                    let id = format!("{maze_id}_c{challenge_count}");
                    let (question, options, answer_index) =
                        CHALLENGE_BANK[(challenge_count - 1) % CHALLENGE_BANK.len()];
                    state.challenges.insert(
                        id.clone(),
                        Challenge {
                            id: id.clone(),
                            question: question.to_string(),
                            options: options.iter().map(|option| option.to_string()).collect(),
                            answer_index,
                        },
                    );
                    MazeNode {
                        kind: NodeKind::Challenge,
                        content_id: Some(id),
                    }
                }
                'R' => {
                    reward_count += 1;
                    MazeNode {
                        kind: NodeKind::Reward,
                        content_id: Some(format!("{maze_id}_r{reward_count}")),
                    }
                }
                _ => MazeNode {
                    kind: NodeKind::Path,
                    content_id: None,
                },
            };
            line.push(node);
        }
        nodes.push(line);
    }

    state.mazes.insert(
        maze_id.to_string(),
        Maze {
            maze_id: maze_id.to_string(),
            size,
            nodes,
        },
    );
}

fn apply_move(
    state: &mut LocalState,
    user_id: &str,
    maze_id: &str,
    direction: Direction,
) -> Result<MoveOutcome, ServiceError> {
    let maze = state
        .mazes
        .get(maze_id)
        .cloned()
        .ok_or_else(|| ServiceError::UnknownMaze(maze_id.to_string()))?;
    let key = session_key(user_id, maze_id);
    let Some(progress) = state.sessions.get_mut(&key) else {
        return Err(ServiceError::SessionNotFound);
    };

    if progress.completed {
        return Ok(MoveOutcome::rejected("maze already completed"));
    }

    let target = progress.current_position.stepped(direction);
    if !maze.in_bounds(target) {
        return Ok(MoveOutcome::rejected("out of bounds"));
    }
    if !maze.is_walkable(target) {
        return Ok(MoveOutcome::rejected("blocked by wall"));
    }

    let node = maze
        .node_at(target)
        .cloned()
        .ok_or_else(|| ServiceError::InvalidResponse("maze cell missing".to_string()))?;
    let first_visit = !progress.visited_nodes.contains(&target);

    progress.current_position = target;
    progress.visited_nodes.push(target);
    progress.steps_count += 1;
    progress.score += MOVE_BASE_SCORE;

    let mut outcome = MoveOutcome::accepted(EventKind::None, progress.clone());
    match node.kind {
        NodeKind::Knowledge => {
            if let Some(id) = node.content_id {
                if progress.acquired_knowledge.insert(id.clone()) {
                    progress.score += KNOWLEDGE_BONUS_SCORE;
                }
                outcome.event_type = Some(EventKind::Knowledge);
                outcome.knowledge_node = state.knowledge_nodes.get(&id).cloned();
            }
        }
        NodeKind::Challenge => {
            if let Some(id) = node.content_id {
                if progress.completed_challenges.insert(id.clone()) {
                    progress.score += CHALLENGE_BONUS_SCORE;
                }
                outcome.event_type = Some(EventKind::Challenge);
                outcome.challenge = state.challenges.get(&id).cloned();
            }
        }
        NodeKind::Reward => {
            if first_visit {
                if let Some(id) = node.content_id {
                    let value = state.rng.random_range(REWARD_VALUE_MIN..=REWARD_VALUE_MAX);
                    let index = reward_index(&id);
                    progress.score += value;
                    outcome.event_type = Some(EventKind::Reward);
                    outcome.reward = Some(Reward {
                        id,
                        name: REWARD_NAMES[index % REWARD_NAMES.len()].to_string(),
                        value,
                    });
                }
            }
        }
        NodeKind::End => {
            progress.completed = true;
            progress.score += GOAL_BONUS_SCORE;
            outcome.event_type = Some(EventKind::Goal);
        }
        NodeKind::Wall | NodeKind::Path | NodeKind::Start => {}
    }

    outcome.progress = Some(progress.clone());
    Ok(outcome)
}

#[async_trait]
impl MazeService for LocalMazeService {
    async fn start_maze(
        &self,
        user_id: &str,
        maze_id: &str,
    ) -> Result<MazeProgress, ServiceError> {
        self.simulate_latency().await;
        let mut state = self.state.lock().await;
        let maze = state
            .mazes
            .get(maze_id)
            .ok_or_else(|| ServiceError::UnknownMaze(maze_id.to_string()))?;
        let start = maze
            .start_position()
            .ok_or_else(|| ServiceError::InvalidResponse("maze has no start cell".to_string()))?;
        let progress = MazeProgress::new(user_id, maze_id, start, Utc::now());
        state
            .sessions
            .insert(session_key(user_id, maze_id), progress.clone());
        Ok(progress)
    }

    async fn get_maze(&self, maze_id: &str, user_id: &str) -> Result<MazeResponse, ServiceError> {
        self.simulate_latency().await;
        let state = self.state.lock().await;
        let maze = state
            .mazes
            .get(maze_id)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownMaze(maze_id.to_string()))?;
        let user_progress = state.sessions.get(&session_key(user_id, maze_id)).cloned();
        Ok(MazeResponse {
            maze,
            user_progress,
        })
    }

    async fn get_user_progress(
        &self,
        maze_id: &str,
        user_id: &str,
    ) -> Result<ProgressResponse, ServiceError> {
        self.simulate_latency().await;
        let state = self.state.lock().await;
        let progress = state
            .sessions
            .get(&session_key(user_id, maze_id))
            .cloned()
            .ok_or(ServiceError::SessionNotFound)?;
        Ok(ProgressResponse { progress })
    }

    async fn move_in_maze(
        &self,
        user_id: &str,
        maze_id: &str,
        direction: Direction,
    ) -> Result<MoveOutcome, ServiceError> {
        self.simulate_latency().await;
        let mut state = self.state.lock().await;
        apply_move(&mut state, user_id, maze_id, direction)
    }

    async fn get_game_settings(&self, user_id: &str) -> Result<GameSettings, ServiceError> {
        self.simulate_latency().await;
        let state = self.state.lock().await;
        Ok(state
            .settings
            .get(user_id)
            .copied()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> LocalMazeService {
        LocalMazeService::new(LocalMazeServiceOptions::default())
    }

    async fn start(service: &LocalMazeService) -> MazeProgress {
        service
            .start_maze("u1", "meadow")
            .await
            .expect("start should succeed")
    }

    #[test]
    fn reward_index_reads_the_numeric_suffix() {
        assert_eq!(reward_index("meadow_r1"), 0);
        assert_eq!(reward_index("orchard_r3"), 2);
        assert_eq!(reward_index("bogus"), 0);
    }

    #[tokio::test]
    async fn start_creates_a_session_at_the_start_cell() {
        let service = service();
        let progress = start(&service).await;
        assert_eq!(progress.current_position, Position { x: 0, y: 0 });
        assert_eq!(progress.steps_count, 0);
        assert_eq!(progress.score, 0);
        assert!(!progress.completed);
    }

    #[tokio::test]
    async fn unknown_maze_is_an_error() {
        let service = service();
        let result = service.start_maze("u1", "nowhere").await;
        assert!(matches!(result, Err(ServiceError::UnknownMaze(_))));
    }

    #[tokio::test]
    async fn moving_without_a_session_is_an_error() {
        let service = service();
        let result = service.move_in_maze("ghost", "meadow", Direction::East).await;
        assert!(matches!(result, Err(ServiceError::SessionNotFound)));
    }

    #[tokio::test]
    async fn accepted_move_advances_position_steps_and_score() {
        let service = service();
        start(&service).await;
        let outcome = service
            .move_in_maze("u1", "meadow", Direction::East)
            .await
            .expect("move should succeed");
        assert!(outcome.success);
        let progress = outcome.progress.expect("accepted move carries progress");
        assert_eq!(progress.current_position, Position { x: 1, y: 0 });
        assert_eq!(progress.steps_count, 1);
        assert_eq!(progress.score, MOVE_BASE_SCORE);
    }

    #[tokio::test]
    async fn wall_collision_is_rejected_without_mutation() {
        let service = service();
        start(&service).await;
        // (0,0) -> south is open, (1,1) is a wall
        service
            .move_in_maze("u1", "meadow", Direction::East)
            .await
            .expect("move should succeed");
        let outcome = service
            .move_in_maze("u1", "meadow", Direction::South)
            .await
            .expect("call should succeed");
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("blocked by wall"));
        let progress = service
            .get_user_progress("meadow", "u1")
            .await
            .expect("progress should exist")
            .progress;
        assert_eq!(progress.current_position, Position { x: 1, y: 0 });
        assert_eq!(progress.steps_count, 1);
    }

    #[tokio::test]
    async fn leaving_the_grid_is_rejected() {
        let service = service();
        start(&service).await;
        let outcome = service
            .move_in_maze("u1", "meadow", Direction::North)
            .await
            .expect("call should succeed");
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("out of bounds"));
    }

    #[tokio::test]
    async fn knowledge_cell_fires_event_and_acquires_id_once() {
        let service = service();
        start(&service).await;
        for direction in [Direction::East, Direction::East, Direction::East] {
            service
                .move_in_maze("u1", "meadow", direction)
                .await
                .expect("move should succeed");
        }
        let progress = service
            .get_user_progress("meadow", "u1")
            .await
            .expect("progress should exist")
            .progress;
        assert!(progress.acquired_knowledge.contains("meadow_k1"));
        let score_after_first = progress.score;

        // step off and back on: event fires again, id stays unique, no bonus
        service
            .move_in_maze("u1", "meadow", Direction::West)
            .await
            .expect("move should succeed");
        let outcome = service
            .move_in_maze("u1", "meadow", Direction::East)
            .await
            .expect("move should succeed");
        assert_eq!(outcome.event_type, Some(EventKind::Knowledge));
        assert_eq!(
            outcome.knowledge_node.as_ref().map(|node| node.id.as_str()),
            Some("meadow_k1")
        );
        let progress = outcome.progress.expect("accepted move carries progress");
        assert_eq!(progress.acquired_knowledge.len(), 1);
        assert_eq!(
            progress.score,
            score_after_first + 2 * MOVE_BASE_SCORE
        );
    }

    #[tokio::test]
    async fn reward_is_granted_on_first_visit_only() {
        let service = service();
        start(&service).await;
        // meadow: S(0,0) -> (0,1) -> (0,2) -> R(1,2)
        for direction in [Direction::South, Direction::South, Direction::East] {
            service
                .move_in_maze("u1", "meadow", direction)
                .await
                .expect("move should succeed");
        }
        let progress = service
            .get_user_progress("meadow", "u1")
            .await
            .expect("progress should exist")
            .progress;
        let reward_value = progress.score - 3 * MOVE_BASE_SCORE;
        assert!((REWARD_VALUE_MIN..=REWARD_VALUE_MAX).contains(&reward_value));

        service
            .move_in_maze("u1", "meadow", Direction::West)
            .await
            .expect("move should succeed");
        let outcome = service
            .move_in_maze("u1", "meadow", Direction::East)
            .await
            .expect("move should succeed");
        assert_eq!(outcome.event_type, Some(EventKind::None));
        let progress = outcome.progress.expect("accepted move carries progress");
        assert_eq!(progress.score, reward_value + 5 * MOVE_BASE_SCORE);
    }

    #[tokio::test]
    async fn reaching_the_end_completes_the_session() {
        let service = service();
        start(&service).await;
        // meadow: S(0,0) down to (0,2), R(1,2), (1,3), (1,4), (2,4), E(3,4)
        let path = [
            Direction::South,
            Direction::South,
            Direction::East,
            Direction::South,
            Direction::South,
            Direction::East,
            Direction::East,
        ];
        let mut last = None;
        for direction in path {
            last = Some(
                service
                    .move_in_maze("u1", "meadow", direction)
                    .await
                    .expect("move should succeed"),
            );
        }
        let outcome = last.expect("path is non-empty");
        assert_eq!(outcome.event_type, Some(EventKind::Goal));
        let progress = outcome.progress.expect("accepted move carries progress");
        assert!(progress.completed);

        let after = service
            .move_in_maze("u1", "meadow", Direction::West)
            .await
            .expect("call should succeed");
        assert!(!after.success);
        assert_eq!(after.message.as_deref(), Some("maze already completed"));
    }

    #[tokio::test]
    async fn settings_fall_back_to_defaults_and_honor_overrides() {
        let service = service();
        let defaults = service
            .get_game_settings("u1")
            .await
            .expect("settings should load");
        assert_eq!(defaults, GameSettings::default());

        let mut custom = GameSettings::default();
        custom.animation_speed = crate::types::AnimationSpeed::Fast;
        custom.vibration_enabled = false;
        service.put_settings("u1", custom).await;
        let loaded = service
            .get_game_settings("u1")
            .await
            .expect("settings should load");
        assert_eq!(loaded, custom);
    }

    #[tokio::test]
    async fn get_maze_returns_resumable_progress() {
        let service = service();
        start(&service).await;
        service
            .move_in_maze("u1", "meadow", Direction::East)
            .await
            .expect("move should succeed");
        let response = service
            .get_maze("meadow", "u1")
            .await
            .expect("maze should load");
        assert_eq!(response.maze.size, 5);
        let progress = response.user_progress.expect("session exists");
        assert_eq!(progress.steps_count, 1);

        let fresh = service
            .get_maze("meadow", "stranger")
            .await
            .expect("maze should load");
        assert!(fresh.user_progress.is_none());
    }
}

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "north" => Some(Self::North),
            "south" => Some(Self::South),
            "east" => Some(Self::East),
            "west" => Some(Self::West),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
        }
    }

    /// Grid delta in screen coordinates: y grows southward.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::South => (0, 1),
            Self::East => (1, 0),
            Self::West => (-1, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Wall,
    Path,
    Start,
    End,
    Knowledge,
    Challenge,
    Reward,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MazeNode {
    pub kind: NodeKind,
    #[serde(rename = "contentId", default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn stepped(&self, direction: Direction) -> Position {
        let (dx, dy) = direction.offset();
        Position {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Maze {
    #[serde(rename = "mazeId")]
    pub maze_id: String,
    pub size: i32,
    pub nodes: Vec<Vec<MazeNode>>,
}

impl Maze {
    pub fn in_bounds(&self, position: Position) -> bool {
        position.x >= 0 && position.y >= 0 && position.x < self.size && position.y < self.size
    }

    pub fn node_at(&self, position: Position) -> Option<&MazeNode> {
        if !self.in_bounds(position) {
            return None;
        }
        self.nodes
            .get(position.y as usize)
            .and_then(|row| row.get(position.x as usize))
    }

    pub fn is_walkable(&self, position: Position) -> bool {
        self.node_at(position)
            .map(|node| node.kind != NodeKind::Wall)
            .unwrap_or(false)
    }

    pub fn start_position(&self) -> Option<Position> {
        for (y, row) in self.nodes.iter().enumerate() {
            for (x, node) in row.iter().enumerate() {
                if node.kind == NodeKind::Start {
                    return Some(Position {
                        x: x as i32,
                        y: y as i32,
                    });
                }
            }
        }
        None
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MazeProgress {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "mazeId")]
    pub maze_id: String,
    #[serde(rename = "currentPosition")]
    pub current_position: Position,
    #[serde(rename = "visitedNodes")]
    pub visited_nodes: Vec<Position>,
    pub score: i32,
    #[serde(rename = "stepsCount")]
    pub steps_count: u32,
    #[serde(rename = "acquiredKnowledge")]
    pub acquired_knowledge: BTreeSet<String>,
    #[serde(rename = "completedChallenges")]
    pub completed_challenges: BTreeSet<String>,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
    pub completed: bool,
}

impl MazeProgress {
    pub fn new(user_id: &str, maze_id: &str, start: Position, started_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            maze_id: maze_id.to_string(),
            current_position: start,
            visited_nodes: vec![start],
            score: 0,
            steps_count: 0,
            acquired_knowledge: BTreeSet::new(),
            completed_challenges: BTreeSet::new(),
            started_at,
            completed: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnimationSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl AnimationSpeed {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "slow" => Some(Self::Slow),
            "normal" => Some(Self::Normal),
            "fast" => Some(Self::Fast),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    #[serde(rename = "animationSpeed")]
    pub animation_speed: AnimationSpeed,
    #[serde(rename = "vibrationEnabled")]
    pub vibration_enabled: bool,
    #[serde(rename = "soundEnabled")]
    pub sound_enabled: bool,
    #[serde(rename = "showHints")]
    pub show_hints: bool,
    pub difficulty: Difficulty,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            animation_speed: AnimationSpeed::Normal,
            vibration_enabled: true,
            sound_enabled: true,
            show_hints: true,
            difficulty: Difficulty::Medium,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    None,
    Knowledge,
    Challenge,
    Reward,
    Goal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeNode {
    pub id: String,
    pub title: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "answerIndex")]
    pub answer_index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub name: String,
    pub value: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub success: bool,
    #[serde(rename = "eventType", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventKind>,
    #[serde(rename = "knowledgeNode", default, skip_serializing_if = "Option::is_none")]
    pub knowledge_node: Option<KnowledgeNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<Challenge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<Reward>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<MazeProgress>,
}

impl MoveOutcome {
    pub fn rejected(message: &str) -> Self {
        Self {
            success: false,
            event_type: None,
            knowledge_node: None,
            challenge: None,
            reward: None,
            message: Some(message.to_string()),
            progress: None,
        }
    }

    pub fn accepted(event_type: EventKind, progress: MazeProgress) -> Self {
        Self {
            success: true,
            event_type: Some(event_type),
            knowledge_node: None,
            challenge: None,
            reward: None,
            message: None,
            progress: Some(progress),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MazeResponse {
    pub maze: Maze,
    #[serde(rename = "userProgress", default, skip_serializing_if = "Option::is_none")]
    pub user_progress: Option<MazeProgress>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub progress: MazeProgress,
}

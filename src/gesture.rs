use crate::types::Direction;

/// Maps a raw drag gesture to a cardinal direction.
///
/// The dominant axis wins; ties resolve vertically. Gestures where neither
/// axis reaches `threshold` are ignored.
pub fn resolve_direction(dx: f32, dy: f32, threshold: f32) -> Option<Direction> {
    if dx.abs() > dy.abs() {
        if dx.abs() < threshold {
            return None;
        }
        if dx > 0.0 {
            Some(Direction::East)
        } else {
            Some(Direction::West)
        }
    } else {
        if dy.abs() < threshold {
            return None;
        }
        if dy > 0.0 {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    }
}

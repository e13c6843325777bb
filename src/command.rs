/// Direction of a repeating window move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit vector in screen space (y grows upward).
    pub fn unit(self) -> (f32, f32) {
        match self {
            Direction::Up => (0.0, 1.0),
            Direction::Down => (0.0, -1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }
}

/// Logical commands produced by the hotkey layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEvent {
    ToggleAnalysis,
    ToggleAlwaysOnTop,
    SubmitQuery,
    Quit,
    MoveStart(Direction),
    MoveStop(Direction),
}

use strum_macros::{Display, EnumString};

/// Direction of a key event.
///
/// Values match the evdev `value` field for EV_KEY:
///   0 == released
///   1 == pressed
///   2 == autorepeat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[repr(i32)]
pub enum Edge {
    Up = 0,
    Down = 1,
    Repeat = 2,
}

impl Edge {
    /// Create an Edge from the raw evdev value
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Edge::Up),
            1 => Some(Edge::Down),
            2 => Some(Edge::Repeat),
            _ => None,
        }
    }

    /// Raw evdev value
    pub fn value(self) -> i32 {
        self as i32
    }
}

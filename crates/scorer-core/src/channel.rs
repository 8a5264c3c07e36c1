use std::fmt;

/// One of the two fixed sweep inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// The outer sweep file (first positional argument).
    Outer,
    /// The inner sweep file (second positional argument).
    Inner,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Outer => "outer",
            Channel::Inner => "inner",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

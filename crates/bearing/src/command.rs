//! Line protocol spoken on the compass control socket.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const SOCKET_PATH: &str = "/tmp/luopan.sock";

#[derive(Debug, Clone, PartialEq)]
pub enum ThemeSelector {
    Next,
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show,
    Hide,
    /// Raw device heading in degrees.
    Heading(f64),
    /// Manual rotation by a signed delta in degrees.
    Rotate(f64),
    Theme(ThemeSelector),
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid angle '{0}'")]
    InvalidAngle(String),
}

fn parse_angle(raw: Option<&str>, name: &'static str) -> Result<f64, CommandError> {
    let raw = raw.ok_or(CommandError::MissingArgument(name))?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CommandError::InvalidAngle(raw.to_string()))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or(CommandError::Empty)?;
        let arg = parts.next();

        match verb.to_ascii_lowercase().as_str() {
            "show" => Ok(Self::Show),
            "hide" => Ok(Self::Hide),
            "heading" => parse_angle(arg, "heading").map(Self::Heading),
            "rotate" => parse_angle(arg, "rotate").map(Self::Rotate),
            "theme" => match arg.ok_or(CommandError::MissingArgument("theme"))? {
                "next" => Ok(Self::Theme(ThemeSelector::Next)),
                name => Ok(Self::Theme(ThemeSelector::Named(name.to_string()))),
            },
            _ => Err(CommandError::Unknown(verb.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Show => write!(f, "show"),
            Self::Hide => write!(f, "hide"),
            Self::Heading(deg) => write!(f, "heading {}", deg),
            Self::Rotate(delta) => write!(f, "rotate {}", delta),
            Self::Theme(ThemeSelector::Next) => write!(f, "theme next"),
            Self::Theme(ThemeSelector::Named(name)) => write!(f, "theme {}", name),
        }
    }
}

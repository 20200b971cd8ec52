use bearing::{Command, ThemeSelector};

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Show,
    Hide,
    Heading(f64),
    Rotate(f64),
    Theme(ThemeSelector),
    ConfigReload,
}

impl From<Command> for AppEvent {
    fn from(command: Command) -> Self {
        match command {
            Command::Show => AppEvent::Show,
            Command::Hide => AppEvent::Hide,
            Command::Heading(h) => AppEvent::Heading(h),
            Command::Rotate(d) => AppEvent::Rotate(d),
            Command::Theme(t) => AppEvent::Theme(t),
        }
    }
}

//! Heading sources and compass geometry shared by the luopan compass.

pub mod command;
pub mod geom;
pub mod macros;
pub mod sensor;

pub use command::{Command, CommandError, SOCKET_PATH, ThemeSelector};
pub use geom::{Point, normalize, shortest_diff};
pub use sensor::{
    HeadingCallback, HeadingFeed, HeadingSensor, ManualOnly, PermissionFuture,
    PermissionResponse, ScriptedSensor, SensorSupport, Subscription,
};

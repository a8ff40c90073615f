//! The native driver: emulator-module loading, the frame loop, the in-game
//! menu, save states, and the platform abstraction they run against.

pub mod archive;
mod error;
pub mod fpstracker;
pub mod game;
pub mod hud;
pub mod libretro;
pub mod mainloop;
mod menu;
pub mod paths;
pub mod platform;
pub mod state;

pub use error::{ArchiveError, DriverError, DriverResult};
pub use mainloop::{LaunchOptions, Session};
pub use platform::{HeadlessPlatform, Platform, Surface};

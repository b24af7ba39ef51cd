//! Recording, playback and the controller that keeps them exclusive.
//!
//! - `Recorder`: one capture session bounded by a maximum duration, with a
//!   debounced stop
//! - `Player`: one playback at a time, stopping itself at 100%
//! - `MediaSessionController`: setup and cross-component stop-before-start

mod controller;
mod player;
mod recorder;

pub use controller::MediaSessionController;
pub use player::{play_progress, PlayState, Player};
pub use recorder::{record_progress, Recorder};

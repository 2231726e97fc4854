// CONTROLLER: Input, game logic, and update loop
pub mod input;
pub mod collidables;
pub mod camera_controller;
pub mod movement;
pub mod interaction;
pub mod scare;
pub mod session;
#[cfg(target_arch = "wasm32")]
pub mod frame_loop;

pub use input::{InputEvent, InputState, Key, KeyBindings};
pub use collidables::CollidableSet;
pub use camera_controller::{CameraController, PlayerState};
pub use movement::MovementSystem;
pub use interaction::{Door, InteractionSystem};
pub use scare::{Interval, ScareCue, ScarePhase, ScareSequencer};
pub use session::{clamp_frame_dt, GameSession, SessionStatus, MAX_FRAME_DT};
#[cfg(target_arch = "wasm32")]
pub use frame_loop::FrameLoopContext;

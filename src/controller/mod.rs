// src/controller/mod.rs
mod scheduler;
mod state;

pub use scheduler::{Command, Controller, ControllerError, SweepTrigger};
pub use state::{ControllerPhase, ControllerState};

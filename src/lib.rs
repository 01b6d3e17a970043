//! Thread-safe, bounded record of a gamepad's input state for a frame-polled
//! consumer such as an emulation loop.

pub mod config;
pub mod controller;

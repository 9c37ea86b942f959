//! A CHIP-8 interpreter core.
//!
//! [`Machine`] owns the whole architectural state and runs one
//! fetch-decode-execute cycle per [`Machine::step`]. Rendering, input and
//! sound are left to the caller, which reads the frame buffer and the sound
//! flag and writes the key state between steps.

pub mod instruction;
pub mod machine;

pub use instruction::Instruction;
pub use machine::{
    Error, FrameBuffer, Machine, TimerMode, DISPLAY_HEIGHT, DISPLAY_WIDTH, MAX_ROM_SIZE,
};

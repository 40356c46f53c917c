//! ABAP Git software component lifecycle orchestration.

pub mod logs;
pub mod poll;
pub mod ports;

#[cfg(not(target_endian = "little"))]
compile_error!("only little-endian targets are supported");

pub mod config;
pub mod protocol;
pub mod session;

#[cfg(not(target_endian = "little"))]
compile_error!("tap-core requires a little-endian platform");

pub mod dict;
pub mod settings;
pub mod suggest;
pub mod unicode;

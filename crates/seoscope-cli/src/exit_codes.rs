//! Process exit codes. Stable for scripting.

pub const OK: i32 = 0;
/// Bad arguments or unusable configuration.
pub const CONFIG_ERROR: i32 = 2;

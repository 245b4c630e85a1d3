mod kv;
pub use kv::{KvPair, KvSnapshot};

mod env;
pub use env::EnvMap;

mod constants;
pub use constants::{INTERNAL_FAILURE_EXIT_CODE, METADATA_SEGMENT, SIGNAL_EXIT_BASE};

#[cfg(feature = "timezone-sync")]
mod timezone_sync;
#[cfg(feature = "timezone-sync")]
pub use timezone_sync::timezone_sync;

pub mod clock;
pub mod log_helpers;
pub mod transcript;

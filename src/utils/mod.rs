pub mod logging;

pub use logging::format_remaining;

pub mod camera_session;
pub mod countdown;
pub mod integrity_monitor;
pub mod notifier;

pub use camera_session::CameraSession;
pub use countdown::{CountdownTimer, TimerEvent};
pub use integrity_monitor::{classify, Detection, IntegrityMonitor};
pub use notifier::{Notice, NoticeSink, RecordingSink, TracingSink, WarningBanner};

pub mod controller;
pub mod session_ctx;

pub use controller::{
    ExamSessionController, SessionDeps, SessionHandle, SessionOptions, SessionReport,
    SessionSnapshot, SubmitTrigger,
};
pub use session_ctx::SessionCtx;

pub mod question;
pub mod session;
pub mod violation;

pub use question::{OptionLabel, Question, QuestionId};
pub use session::{AnswerEntry, AnswerStore, Session, SessionPhase};
pub use violation::{LedgerDecision, ViolationKind, ViolationRecord};

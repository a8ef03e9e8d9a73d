pub mod log_entry;
pub mod message;
pub mod problem;
pub mod session;

pub use log_entry::{LogEntry, LogLevel, LogRing, LOG_CAPACITY};
pub use message::{CoordinatorEvent, CoordinatorRequest, InjectResponse, PageCommand, Status, TabId};
pub use problem::{pad_frontend_id, Candidate, CandidateSource, PageKind, ProblemRef};
pub use session::{Credentials, LoopState, SessionState};

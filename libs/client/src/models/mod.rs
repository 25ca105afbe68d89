//! Client domain models

pub mod session;
pub mod task;
pub mod user;

// Re-export for convenience
pub use session::{AuthContext, Session, SessionState};
pub use task::{NewTask, Task, TaskUpdate};
pub use user::{AuthPayload, LoginRequest, SignupRequest, User};

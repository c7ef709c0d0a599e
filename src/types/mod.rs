//! Type definitions module
//!
//! Request-level types shared by the workflow, the backends and the CLI.

pub mod messages;
pub mod routing;
pub mod citations;
pub mod execution;

// Re-export commonly used types
pub use messages::{format_chat_history, ConversationTurn, Role};
pub use routing::{GradeAction, Intent, ModelChoice};
pub use citations::Citations;
pub use execution::WorkflowOutput;

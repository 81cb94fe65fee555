pub mod identity;
pub mod utils;

pub use identity::{caller_from_context, CallerIdentity};
pub use utils::{require_class_member, require_class_teacher};

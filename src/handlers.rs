pub mod category_handlers;
pub mod common;
pub mod security_handlers;

pub use common::{ErrorResponse, SessionUser};

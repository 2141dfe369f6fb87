pub mod retry;
pub mod template;

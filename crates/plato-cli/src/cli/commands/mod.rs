//! CLI command handlers.

mod completions;
mod fetch;

pub use completions::print_completions;
pub use fetch::run_fetch;

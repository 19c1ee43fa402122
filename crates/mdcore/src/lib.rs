pub mod fence;
pub mod transcript;

pub use fence::{code_blocks, first_language, CodeBlock, FenceLine, FenceTracker};
pub use transcript::{format_response, split_question, Exchange, Role, Turn};

#[cfg(test)]
mod tests;

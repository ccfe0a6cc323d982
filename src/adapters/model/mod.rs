//! Model-inference adapters.

pub mod anthropic;
pub mod mock;

pub use anthropic::AnthropicAdapter;
pub use mock::MockModelAdapter;

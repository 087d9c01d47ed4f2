// Adapters layer: concrete implementations of the domain ports
// (in-process token cache, wall clock, generative-AI insight).

pub mod gemini;
pub mod memory;

pub use gemini::GeminiInsight;
pub use memory::{InMemoryTokenStore, SystemClock};

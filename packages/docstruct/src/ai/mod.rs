//! Reference inference implementations.

mod openai;

pub use openai::OpenAIInference;

//! LLM provider implementations for Ferrobot.
//!
//! The wire protocol is treated as an opaque request/response contract:
//! one OpenAI-compatible implementation covers OpenAI, OpenRouter, Groq,
//! Ollama, vLLM, and anything else speaking `/v1/chat/completions`.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

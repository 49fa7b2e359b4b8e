pub mod answerer;
pub mod service;

pub use answerer::{AnswerResult, Citation, RagAnswerer};
pub use service::{RetrievalService, RetrievedChunk};

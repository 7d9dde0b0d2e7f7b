//! Mock retrievers
//!
//! Scripted stand-ins for yt-dlp and plain HTTP, so sessions run without
//! network or external binaries.

#![allow(dead_code)]

pub mod mock_retriever;

pub use mock_retriever::{MockRetriever, RetrieverBehavior};

// src/lib.rs

//! torivahti library

pub mod consumer;
pub mod error;
pub mod models;
pub mod notify;
pub mod parser;
pub mod pipeline;
pub mod storage;
pub mod utils;

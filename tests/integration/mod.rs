//! Integration tests for the scene-card generation pipeline

mod retry_dispatch;
mod test_utils;

//! Engagement Platform Utility Functions
//!
//! ## Current API
//!
//! - Score a quiz submission
//! - Normalize phone numbers to canonical national form
//!
pub mod error;
pub mod phone;
pub mod scoring;

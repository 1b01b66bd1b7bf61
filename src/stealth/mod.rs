//! Stealth and anti-detection module
//!
//! Adds variance to where the captcha answer is tapped.

pub mod humanize;

pub use humanize::Humanizer;

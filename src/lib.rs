//! Onboarding - phone verification and company registration wizard
//!
//! The library holds the wizard steps and their service providers; the
//! `onboarding` binary drives them from the command line.

pub mod api;
pub mod config;
pub mod env_vars;
pub mod logging;
pub mod types;
pub mod wizard;

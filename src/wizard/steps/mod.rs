//! The two data-entry steps of the wizard

pub mod company;
pub mod phone;

//! Command handlers

pub mod configure;
pub mod containers;
pub mod run;
pub mod text;

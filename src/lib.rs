//! Legal Navigator — guided conversation that fills out the Indiana
//! Appearance form and renders it as a PDF.

pub mod chat;
pub mod config;
pub mod error;
pub mod form;
pub mod pdf;
pub mod session;
pub mod store;

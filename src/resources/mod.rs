//! Contact form and plot listing endpoints.

pub mod handlers;

//! Client for a job-application tracking API: keeps the logged-in user's
//! applications in sync with the server and derives filtered views of them.

pub mod api;
pub mod config;
pub mod controller;
pub mod models;
pub mod notify;
pub mod session;
pub mod tui;

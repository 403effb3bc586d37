//! On-screen split keyboard and pointer overlay that turns touches into
//! synthetic keyboard and mouse input.

pub mod app;
pub mod capture;
pub mod config;
pub mod cursor;
pub mod desktop;
pub mod dimensions;
pub mod discovery;
pub mod focus;
pub mod inject;
pub mod keys;
pub mod layout;
pub mod logging;
pub mod modifiers;
pub mod motion;
pub mod orchestrator;
pub mod render;
pub mod timer;

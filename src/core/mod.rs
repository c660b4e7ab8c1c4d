//! # Core Navigation Logic
//!
//! This module contains Paneldeck's business logic: the page model and
//! the navigation engine. It knows nothing about serial ports; everything
//! it says to the panel goes through the `panel` module's driver.
//!
//! ```text
//!              render path                     event path
//!
//!   App ──▶ Page ──▶ PanelLink ──▶ line    line ──▶ PanelLink ──▶ App
//!   (walk buttons,   (one command,          (integer = button press,
//!    emit commands)   one reply)             routed to the top page)
//! ```
//!
//! ## Modules
//!
//! - [`app`]: the `App` struct, the page stack, and the run loop
//! - [`page`]: `Page`, `Button`, and the `Screen` populate capability
//! - [`config`]: TOML config with the defaults → file → env → CLI hierarchy

pub mod app;
pub mod config;
pub mod page;

//! tuitter library crate.
//!
//! The terminal client is split into pure state (screens, navigation, key
//! dispatch), the media-to-text conversion pipeline, and the async loop and
//! renderer that tie them to a terminal. Everything is public so integration
//! tests can drive it headless.

pub mod app;
pub mod ascii;
pub mod avatar;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod input;
pub mod media;
pub mod render;
pub mod screen;
pub mod terminal;

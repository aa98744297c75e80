//! pipgestr - gesture handling for a floating picture-in-picture surface.
//!
//! The [`controller::InteractionController`] turns raw pointer events into
//! drags, flings, stashes, menu requests, double-tap expansion and magnetic
//! dismissal, and keeps the surface clear of the IME and shelf. It talks to
//! the outside world through the traits in [`host`].

pub mod bounds;
pub mod config;
pub mod controller;
pub mod dismiss;
pub mod error;
pub mod event;
pub mod geometry;
pub mod host;
pub mod manager;
pub mod resolver;
pub mod scheduler;
pub mod sim;
pub mod touch;
pub mod trace;
pub mod velocity;

//! Terminal globe and tile map sharing one location marker.
//!
//! The [`coordinator::ViewCoordinator`] owns a ray-traced [`globe`] and a Web
//! Mercator [`map`], keeps their markers on the current
//! [`location::Location`] and runs the search-rotate-reveal hand-off between
//! them. Network collaborators live in [`collab`] and [`assets`].

pub mod app;
pub mod assets;
pub mod canvas;
pub mod collab;
pub mod config;
pub mod coordinator;
pub mod data;
pub mod error;
pub mod geo;
pub mod globe;
pub mod location;
pub mod map;
pub mod render;
pub mod style;
pub mod ui;

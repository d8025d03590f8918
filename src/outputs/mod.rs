//! Output generation for the rendered map.
//!
//! This module contains submodules responsible for turning geocoded places
//! into something a user can look at:
//!
//! # Submodules
//!
//! - [`map`]: Builds the [`MapView`](crate::models::MapView) (viewport + markers)
//! - [`html`]: Renders a `MapView` into a standalone Leaflet page
//! - [`json`]: Writes a `MapView` to a JSON file for other tools

pub mod html;
pub mod json;
pub mod map;

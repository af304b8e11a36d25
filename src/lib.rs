// Geometry codec (GeoJSON polygons and multi-polygons)
pub mod geometry;

// Plot model and feature-collection wire shapes
pub mod plot;

// Configuration loading
pub mod config;

// Persistent plot storage (SQLite, PostGIS)
pub mod store;

// Plot query and upsert service
pub mod catalog;

// Viewer sessions and change fan-out
pub mod sync;

// HTTP and WebSocket APIs
pub mod api;

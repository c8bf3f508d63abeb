//! HTTP handlers for the admin backend.
//!
//! Page rendering lives in the frontend; the handlers here are the thin JSON
//! endpoints the route gate sits in front of.

pub mod data;
pub mod health;
pub mod pages;

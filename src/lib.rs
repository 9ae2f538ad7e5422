//! NIBOG payment transaction integrity service
//!
//! Stages unconfirmed event bookings, constructs and signs PhonePe payment
//! requests, verifies gateway callbacks, and promotes staged bookings into
//! confirmed bookings exactly once.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod services;
pub mod staging;

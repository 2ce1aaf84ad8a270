//! # User Interface Module
//!
//! This module encapsulates all functionalities related to the web-based user
//! interface for the inference demo. It primarily serves as a container for the
//! `routes` submodule, which defines the web server endpoints and handlers.

pub mod routes;

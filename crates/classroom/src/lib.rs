//! Classkit Classroom: Google Classroom REST client and roster sync.
//!
//! This crate wraps the Classroom API (courses, students, invitations,
//! announcements, topics, materials) and enrols whole roster files into a
//! course with per-record outcomes.

pub mod api;
pub mod auth;
pub mod client;
pub mod models;
pub mod report;
pub mod sync;
pub mod topics;

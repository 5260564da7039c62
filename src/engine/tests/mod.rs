//! Unit tests for the campaign engine, organized by concern.

mod lifecycle;

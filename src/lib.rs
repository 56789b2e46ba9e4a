//! Terminal dashboard for the Skyfell page analyzer.

pub mod app;

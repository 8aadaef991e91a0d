// src/ui/widgets/mod.rs

pub mod analysis_view; // Probe list plus catalogue details for the selected probe.
pub mod disclaimer_popup;
pub mod footer;
pub mod history; // Every stored record, newest first.
pub mod input;
pub mod log_view;
pub mod summary; // The five aggregate scores.

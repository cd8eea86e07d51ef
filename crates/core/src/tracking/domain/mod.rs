pub mod assignment;
pub mod kalman_filter;
pub mod track;
pub mod track_manager;
pub mod tracker_config;

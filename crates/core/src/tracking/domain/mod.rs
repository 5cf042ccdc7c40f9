pub mod face_tracker;
pub mod landmark_recovery;
pub mod motion_model;
pub mod track_state;

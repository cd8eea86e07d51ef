pub mod detection;
pub mod detection_assembler;
pub mod face_detector;

pub mod frame_annotator;
pub mod unique_face_registry;

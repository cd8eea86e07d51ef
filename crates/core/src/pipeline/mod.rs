pub mod count_faces_use_case;
pub mod count_report;
pub mod frame_processor;
pub mod frame_sampler;
pub mod infrastructure;
pub mod pipeline_executor;
pub mod pipeline_logger;
pub mod settings;

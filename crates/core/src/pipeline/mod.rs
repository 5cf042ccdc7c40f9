pub mod analyze_video_use_case;
pub mod frame_sampler;
pub mod pipeline_error;
pub mod pipeline_logger;
pub mod search_face_use_case;

pub mod embedding_face_detector;
pub mod execution_provider;
pub mod face_alignment;
pub mod onnx_yolo_detector;

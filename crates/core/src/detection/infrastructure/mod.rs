pub mod annotator_factory;
pub mod label_font;
pub mod model_resolver;
pub mod onnx_yolo_detector;

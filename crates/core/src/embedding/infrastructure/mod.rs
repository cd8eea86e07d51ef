pub mod onnx_arcface_embedder;

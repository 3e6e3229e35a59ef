pub mod threaded_inference_pipeline;
pub mod workflow_client;

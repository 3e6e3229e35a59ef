pub mod dataset_info;
pub mod lerobot_dataset;

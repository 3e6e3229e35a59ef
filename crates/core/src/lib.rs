pub mod dataset {
    pub mod domain {
        pub mod dataset_error;
        pub mod frame_dataset;
    }
    pub mod infrastructure;
}

pub mod encoding {
    pub mod encoder_session;
    pub mod mask_video_sink;
}

pub mod inference {
    pub mod domain {
        pub mod inference_pipeline;
        pub mod prediction;
        pub mod segmentation_model;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod pipeline_logger;
    pub mod segment_batch_use_case;
    pub mod segment_video_use_case;
    pub mod validate_frames_use_case;
    pub mod validation_report;
}

pub mod shared {
    pub mod constants;
    pub mod encoding_profile;
    pub mod frame;
    pub mod video_metadata;
}

pub mod video {
    pub mod domain {
        pub mod image_writer;
        pub mod video_reader;
        pub mod video_writer;
    }
    pub mod infrastructure;
}

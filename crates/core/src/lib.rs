//! Object detection for still images and videos, with playback of the
//! annotated result.
//!
//! The crate is split the same way on every axis: `domain` modules hold
//! the traits and pure logic, `infrastructure` modules bind them to ffmpeg,
//! the `image` crate and ONNX Runtime. The [`session`] layer is the single
//! owner of mutable state and is what front-ends talk to.

pub mod shared {
    pub mod constants;
    pub mod display_image;
    pub mod frame;
    pub mod media_handle;
    pub mod processing_progress;
    pub mod video_metadata;
}

pub mod video {
    pub mod domain {
        pub mod frame_source;
        pub mod image_writer;
        pub mod media_io;
        pub mod video_reader;
        pub mod video_writer;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod box_renderer;
        pub mod detection;
        pub mod frame_annotator;
        pub mod object_detector;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod annotate_image_use_case;
    pub mod annotate_video_use_case;
    pub mod display_surface;
    pub mod pipeline_error;
    pub mod pipeline_logger;
}

pub mod playback {
    pub mod playback_engine;
    pub mod tick_scheduler;
}

pub mod session {
    pub mod session_config;
    pub mod session_controller;
    pub mod session_state;
}

#[cfg(test)]
pub(crate) mod test_support;

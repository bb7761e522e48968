use crate::detection::domain::frame_annotator::FrameAnnotator;
use crate::pipeline::pipeline_error::PipelineError;
use crate::shared::display_image::DisplayImage;
use crate::shared::media_handle::MediaHandle;
use crate::video::domain::frame_source::FrameSource;
use crate::video::domain::video_reader::VideoReader;

/// Single-image pipeline: read → annotate → resize for display.
///
/// Single-use: `execute` consumes the reader.
pub struct AnnotateImageUseCase {
    reader: Option<Box<dyn VideoReader>>,
    display_size: (u32, u32),
}

impl AnnotateImageUseCase {
    pub fn new(reader: Box<dyn VideoReader>, display_size: (u32, u32)) -> Self {
        Self {
            reader: Some(reader),
            display_size,
        }
    }

    pub fn execute(
        &mut self,
        handle: &MediaHandle,
        annotator: &mut dyn FrameAnnotator,
    ) -> Result<DisplayImage, PipelineError> {
        let reader = self.reader.take().ok_or_else(|| PipelineError::SourceOpen {
            path: handle.path().to_path_buf(),
            reason: "pipeline already executed".to_string(),
        })?;

        let frame = {
            let mut source = FrameSource::open(reader, handle)?;
            let source_err = |reason: String| PipelineError::SourceOpen {
                path: handle.path().to_path_buf(),
                reason,
            };
            let frame = source
                .next_frame()
                .map_err(|e| source_err(e.to_string()))?
                .ok_or_else(|| source_err("no image data".to_string()))?;
            source.close();
            frame
        };

        let annotated = annotator
            .infer(frame)
            .map_err(|e| PipelineError::Inference {
                frame: 0,
                reason: e.to_string(),
            })?;

        let (width, height) = self.display_size;
        DisplayImage::from_frame(&annotated, width, height).map_err(|e| PipelineError::Inference {
            frame: 0,
            reason: e.to_string(),
        })
    }
}

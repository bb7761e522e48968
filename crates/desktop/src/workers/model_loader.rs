use std::thread;

use crossbeam_channel::Receiver;

use detectview_core::detection::domain::frame_annotator::FrameAnnotator;
use detectview_core::detection::infrastructure::annotator_factory::{
    build_annotator, DetectorConfig,
};
use detectview_core::detection::infrastructure::model_resolver::ProgressFn;

/// Messages sent from the loader thread to the UI.
pub enum LoaderMessage {
    DownloadProgress(u64, u64),
    Ready(Box<dyn FrameAnnotator>),
    Failed(String),
}

/// Resolves (and if needed downloads) the model and builds the annotator
/// on a background thread. The last message is always `Ready` or `Failed`.
pub fn spawn(config: DetectorConfig) -> Receiver<LoaderMessage> {
    let (tx, rx) = crossbeam_channel::unbounded::<LoaderMessage>();

    thread::spawn(move || {
        let tx_dl = tx.clone();
        let progress: ProgressFn = Box::new(move |downloaded, total| {
            let _ = tx_dl.send(LoaderMessage::DownloadProgress(downloaded, total));
        });
        let message = match build_annotator(&config, Some(progress)) {
            Ok(annotator) => LoaderMessage::Ready(annotator),
            Err(e) => LoaderMessage::Failed(e.to_string()),
        };
        let _ = tx.send(message);
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_missing_model_reports_failure() {
        let config = DetectorConfig {
            model_path: Some(PathBuf::from("/nonexistent/model.onnx")),
            ..DetectorConfig::default()
        };
        let rx = spawn(config);
        match rx.recv_timeout(Duration::from_secs(10)) {
            Ok(LoaderMessage::Failed(msg)) => assert!(msg.contains("model file not found")),
            Ok(_) => panic!("expected a failure"),
            Err(e) => panic!("loader did not answer: {e}"),
        }
    }
}

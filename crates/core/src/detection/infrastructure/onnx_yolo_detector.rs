use std::path::Path;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::frame::Frame;

/// Input resolution used when the model's input shape is dynamic.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.25;
pub const DEFAULT_IOU: f64 = 0.45;

/// Upper bound on boxes kept per frame after NMS.
const MAX_DETECTIONS: usize = 300;

/// Letterbox gray, the YOLO training convention.
const PAD_VALUE: f32 = 114.0 / 255.0;

/// Multi-class YOLO detector on ONNX Runtime.
///
/// Accepts both export layouts: `[1, N, 5 + C]` (box, objectness, class
/// scores) and the transposed `[1, 4 + C, N]` without objectness.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    iou_threshold: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Loads a model and reads its square input size from the NCHW input
    /// shape, falling back to 640 when the shape is dynamic.
    pub fn new(
        model_path: &Path,
        confidence: f64,
        iou_threshold: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_execution_providers(execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 4 && shape[2] > 0 =>
                {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded {} (input {input_size}x{input_size}, conf {confidence}, iou {iou_threshold})",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence,
            iou_threshold,
            input_size,
        })
    }
}

fn execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }
        if frame.channels() != 3 || !frame.is_well_formed() {
            return Err(format!("frame {} is not an RGB24 buffer", frame.index()).into());
        }

        let (input, lb) = letterbox(frame, self.input_size);
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut candidates = parse_predictions(data, &shape, self.confidence, &lb)?;
        let mut kept = nms(&mut candidates, self.iou_threshold);
        kept.truncate(MAX_DETECTIONS);
        for det in &mut kept {
            clip_to_frame(det, frame.width(), frame.height());
        }
        Ok(kept)
    }
}

/// Mapping from letterboxed model coordinates back to the source frame.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn to_frame(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Scales the frame to fit `target_size` square, pads the rest with gray
/// and returns a normalized NCHW tensor.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let side = target_size as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, side, side), PAD_VALUE);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // nearest neighbor
    for y in 0..new_h as usize {
        let sy = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let sx = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[sy, sx, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

/// Decodes raw model output into frame-space candidates above `confidence`.
fn parse_predictions(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
    lb: &Letterbox,
) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_preds, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    // box + at least one score
    if num_feats < 5 {
        return Err(format!("YOLO output has too few features: {shape:?}").into());
    }
    if data.len() < num_preds * num_feats {
        return Err("YOLO output is shorter than its shape".into());
    }

    let feature = |i: usize, f: usize| -> f64 {
        if transposed {
            data[f * num_preds + i] as f64
        } else {
            data[i * num_feats + f] as f64
        }
    };

    let mut dets = Vec::new();
    for i in 0..num_preds {
        let (score, class_id) = if transposed {
            best_class((4..num_feats).map(|f| feature(i, f)))
        } else {
            let objectness = feature(i, 4);
            if num_feats == 5 {
                (objectness, 0)
            } else {
                let (cls, id) = best_class((5..num_feats).map(|f| feature(i, f)));
                (objectness * cls, id)
            }
        };
        if score.is_nan() || score < confidence {
            continue;
        }

        let cx = feature(i, 0);
        let cy = feature(i, 1);
        let w = feature(i, 2);
        let h = feature(i, 3);
        let (x1, y1) = lb.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = lb.to_frame(cx + w / 2.0, cy + h / 2.0);

        dets.push(Detection {
            x1,
            y1,
            x2,
            y2,
            confidence: score,
            class_id,
        });
    }
    Ok(dets)
}

fn best_class(scores: impl Iterator<Item = f64>) -> (f64, usize) {
    scores
        .enumerate()
        .fold((f64::NEG_INFINITY, 0), |(best, best_id), (id, s)| {
            if s > best {
                (s, id)
            } else {
                (best, best_id)
            }
        })
}

/// Greedy per-class NMS, highest confidence first.
fn nms(dets: &mut [Detection], iou_thresh: f64) -> Vec<Detection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if !suppressed[j]
                && dets[j].class_id == dets[i].class_id
                && dets[i].iou(&dets[j]) > iou_thresh
            {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn clip_to_frame(det: &mut Detection, width: u32, height: u32) {
    let w = width as f64;
    let h = height as f64;
    det.x1 = det.x1.clamp(0.0, w);
    det.y1 = det.y1.clamp(0.0, h);
    det.x2 = det.x2.clamp(0.0, w);
    det.y2 = det.y2.clamp(0.0, h);
}

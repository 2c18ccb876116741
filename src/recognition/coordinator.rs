use image::RgbImage;
use log::{debug, info, warn};

use crate::core::error::RecognitionError;
use crate::core::model::{FormulaCandidate, Region, RegionKind};
use crate::recognition::crop::{crop_region, CropStore};
use crate::recognition::gate::RecognitionGate;
use crate::recognition::{FormulaRecognizer, Recognition};

/// Turns the formula regions of one page into candidates.
///
/// Shared by all page workers; the gate is what keeps their recognizer calls
/// under the global cap.
pub struct RecognitionCoordinator<'a> {
    recognizer: &'a dyn FormulaRecognizer,
    gate: &'a RecognitionGate,
    batch_size: usize,
    confidence_threshold: f32,
    crops: Option<CropStore>,
}

struct PendingCrop<'r> {
    slot: usize,
    region: &'r Region,
    image: RgbImage,
    crop_ref: Option<String>,
}

impl<'a> RecognitionCoordinator<'a> {
    pub fn new(
        recognizer: &'a dyn FormulaRecognizer,
        gate: &'a RecognitionGate,
        batch_size: usize,
        confidence_threshold: f32,
    ) -> Self {
        Self {
            recognizer,
            gate,
            batch_size: batch_size.max(1),
            confidence_threshold,
            crops: None,
        }
    }

    pub fn with_crop_store(mut self, crops: CropStore) -> Self {
        self.crops = Some(crops);
        self
    }

    /// One candidate per formula region, in region order.
    pub fn recognize_page(&self, regions: &[Region], page_image: &RgbImage) -> Vec<FormulaCandidate> {
        let formulas: Vec<&Region> = regions
            .iter()
            .filter(|region| region.kind == RegionKind::Formula)
            .collect();
        if formulas.is_empty() {
            return Vec::new();
        }

        let mut slots: Vec<Option<FormulaCandidate>> = vec![None; formulas.len()];
        let mut pending = Vec::new();

        for (slot, region) in formulas.iter().enumerate() {
            match crop_region(page_image, &region.bbox) {
                Some(image) => {
                    let crop_ref = self.save_crop(&image, region);
                    pending.push(PendingCrop {
                        slot,
                        region,
                        image,
                        crop_ref,
                    });
                }
                None => {
                    debug!(
                        "page {} region {}: empty crop, not sent to recognizer",
                        region.page_index, region.region_id
                    );
                    slots[slot] = Some(FormulaCandidate::failed(region, "empty crop"));
                }
            }
        }

        for batch in pending.chunks(self.batch_size) {
            for (item, candidate) in batch.iter().zip(self.recognize_batch(batch)) {
                slots[item.slot] = Some(candidate.with_crop_ref(item.crop_ref.clone()));
            }
        }

        slots
            .into_iter()
            .zip(formulas)
            .map(|(slot, region)| {
                slot.unwrap_or_else(|| FormulaCandidate::failed(region, "not recognized"))
            })
            .collect()
    }

    fn save_crop(&self, image: &RgbImage, region: &Region) -> Option<String> {
        let store = self.crops.as_ref()?;
        match store.save(image, region.page_index, region.region_id) {
            Ok(crop_ref) => Some(crop_ref),
            Err(err) => {
                warn!("{err:#}");
                None
            }
        }
    }

    fn recognize_batch(&self, batch: &[PendingCrop<'_>]) -> Vec<FormulaCandidate> {
        let images: Vec<RgbImage> = batch.iter().map(|item| item.image.clone()).collect();
        match self.call(&images) {
            Ok(results) => self.candidates(batch, results),
            Err(err) if err.is_transient() && batch.len() > 1 => {
                info!("{err}; retrying {} crops one at a time", batch.len());
                batch.iter().map(|item| self.retry_single(item)).collect()
            }
            Err(err) if err.is_transient() => {
                info!("{err}; retrying once");
                vec![self.retry_single(&batch[0])]
            }
            Err(err) => {
                warn!("{err}; {} formulas left unrecognized", batch.len());
                batch
                    .iter()
                    .map(|item| FormulaCandidate::failed(item.region, err.to_string()))
                    .collect()
            }
        }
    }

    fn retry_single(&self, item: &PendingCrop<'_>) -> FormulaCandidate {
        match self.call(std::slice::from_ref(&item.image)) {
            Ok(mut results) => match results.pop() {
                Some(result) => self.candidate(item.region, result),
                None => FormulaCandidate::failed(item.region, "recognizer returned no result"),
            },
            Err(err) => {
                warn!(
                    "page {} region {}: {err}",
                    item.region.page_index, item.region.region_id
                );
                FormulaCandidate::failed(item.region, err.to_string())
            }
        }
    }

    /// One gated recognizer call. A result count that does not match the input
    /// is reported as transient.
    fn call(&self, images: &[RgbImage]) -> Result<Vec<Recognition>, RecognitionError> {
        let results = {
            let _permit = self.gate.acquire();
            self.recognizer.recognize(images)?
        };
        if results.len() != images.len() {
            return Err(RecognitionError::Transient(format!(
                "expected {} results, got {}",
                images.len(),
                results.len()
            )));
        }
        Ok(results)
    }

    fn candidates(&self, batch: &[PendingCrop<'_>], results: Vec<Recognition>) -> Vec<FormulaCandidate> {
        batch
            .iter()
            .zip(results)
            .map(|(item, result)| self.candidate(item.region, result))
            .collect()
    }

    fn candidate(&self, region: &Region, result: Recognition) -> FormulaCandidate {
        FormulaCandidate::recognized(
            region,
            result.latex,
            result.confidence,
            self.confidence_threshold,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BBox;
    use crate::core::model::RecognitionStatus;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted answers and records the batch sizes it saw.
    struct Scripted {
        answers: Mutex<Vec<Result<Vec<Recognition>, RecognitionError>>>,
        batch_sizes: Mutex<Vec<usize>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(mut answers: Vec<Result<Vec<Recognition>, RecognitionError>>) -> Self {
            answers.reverse();
            Self {
                answers: Mutex::new(answers),
                batch_sizes: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl FormulaRecognizer for Scripted {
        fn recognize(&self, crops: &[RgbImage]) -> Result<Vec<Recognition>, RecognitionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.batch_sizes.lock().unwrap().push(crops.len());
            self.answers
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(RecognitionError::Fatal("script exhausted".into())))
        }
    }

    fn formula(id: u32, x0: f32) -> Region {
        Region {
            page_index: 0,
            region_id: id,
            bbox: BBox::new(x0, 0.1, x0 + 0.1, 0.2),
            kind: RegionKind::Formula,
            order_hint: id as usize,
            raw_content: String::new(),
            display: false,
        }
    }

    fn page() -> RgbImage {
        RgbImage::new(100, 100)
    }

    fn ok(latex: &str, conf: f32) -> Recognition {
        Recognition::new(latex, Some(conf))
    }

    #[test]
    fn batches_and_keeps_region_order() {
        let regions = vec![formula(1, 0.0), formula(2, 0.2), formula(3, 0.4)];
        let recognizer = Scripted::new(vec![
            Ok(vec![ok("a", 0.9), ok("b", 0.3)]),
            Ok(vec![ok("c", 0.8)]),
        ]);
        let gate = RecognitionGate::new(1);
        let coordinator = RecognitionCoordinator::new(&recognizer, &gate, 2, 0.5);

        let out = coordinator.recognize_page(&regions, &page());

        assert_eq!(*recognizer.batch_sizes.lock().unwrap(), vec![2, 1]);
        let latex: Vec<_> = out.iter().map(|c| c.recognized_latex.as_deref()).collect();
        assert_eq!(latex, vec![Some("a"), Some("b"), Some("c")]);
        assert_eq!(out[1].recognition_status, RecognitionStatus::LowConfidence);
    }

    #[test]
    fn transient_failure_retries_one_by_one() {
        let regions = vec![formula(1, 0.0), formula(2, 0.2)];
        let recognizer = Scripted::new(vec![
            Err(RecognitionError::Transient("timeout".into())),
            Ok(vec![ok("x", 0.9)]),
            Err(RecognitionError::Transient("timeout".into())),
        ]);
        let gate = RecognitionGate::new(2);
        let coordinator = RecognitionCoordinator::new(&recognizer, &gate, 4, 0.5);

        let out = coordinator.recognize_page(&regions, &page());

        assert_eq!(*recognizer.batch_sizes.lock().unwrap(), vec![2, 1, 1]);
        assert_eq!(out[0].recognized_latex.as_deref(), Some("x"));
        assert!(out[1].is_failed());
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn fatal_failure_is_not_retried() {
        let regions = vec![formula(1, 0.0), formula(2, 0.2)];
        let recognizer = Scripted::new(vec![Err(RecognitionError::Fatal("bad model".into()))]);
        let gate = RecognitionGate::new(2);
        let coordinator = RecognitionCoordinator::new(&recognizer, &gate, 4, 0.5);

        let out = coordinator.recognize_page(&regions, &page());

        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);
        assert!(out.iter().all(FormulaCandidate::is_failed));
    }

    #[test]
    fn wrong_result_count_counts_as_transient() {
        let regions = vec![formula(1, 0.0), formula(2, 0.2)];
        let recognizer = Scripted::new(vec![
            Ok(vec![ok("only one", 0.9)]),
            Ok(vec![ok("a", 0.9)]),
            Ok(vec![ok("b", 0.9)]),
        ]);
        let gate = RecognitionGate::new(2);
        let coordinator = RecognitionCoordinator::new(&recognizer, &gate, 4, 0.5);

        let out = coordinator.recognize_page(&regions, &page());

        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 3);
        assert_eq!(out[1].recognized_latex.as_deref(), Some("b"));
    }

    #[test]
    fn empty_crop_skips_the_service() {
        let mut off_page = formula(1, 0.0);
        off_page.bbox = BBox::new(1.0, 1.0, 1.0, 1.0);
        let recognizer = Scripted::new(vec![]);
        let gate = RecognitionGate::new(2);
        let coordinator = RecognitionCoordinator::new(&recognizer, &gate, 4, 0.5);

        let out = coordinator.recognize_page(&[off_page], &page());

        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
        assert!(out[0].is_failed());
    }

    #[test]
    fn saves_crops_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let recognizer = Scripted::new(vec![Ok(vec![ok("y", 0.9)])]);
        let gate = RecognitionGate::new(2);
        let coordinator = RecognitionCoordinator::new(&recognizer, &gate, 4, 0.5)
            .with_crop_store(CropStore::new(dir.path().to_path_buf()));

        let out = coordinator.recognize_page(&[formula(5, 0.3)], &page());

        assert_eq!(
            out[0].crop_ref.as_deref(),
            Some("formula_images/page_001_formula_005.png")
        );
        assert!(dir.path().join("formula_images/page_001_formula_005.png").exists());
    }

    #[test]
    fn non_formula_regions_are_ignored() {
        let mut text = formula(1, 0.0);
        text.kind = RegionKind::Text;
        let recognizer = Scripted::new(vec![]);
        let gate = RecognitionGate::new(2);
        let coordinator = RecognitionCoordinator::new(&recognizer, &gate, 4, 0.5);
        assert!(coordinator.recognize_page(&[text], &page()).is_empty());
    }
}

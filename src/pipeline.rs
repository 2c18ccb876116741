use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use image::RgbImage;
use log::{info, warn};
use rayon::prelude::*;

use crate::assemble::{ConversionOutput, RunReport, StageTiming};
use crate::core::config::ConversionConfig;
use crate::core::error::{AssemblyError, PageError};
use crate::core::model::{
    DocumentModel, FormulaCandidate, MergedBlock, PageFailure, PageModel, RegionKind,
};
use crate::equation::Translator;
use crate::export::{CrossRefExporter, Exporter, JsonExporter, MarkdownExporter, WordExporter};
use crate::layout::regions::page_regions;
use crate::layout::{LayoutDocument, LayoutPage};
use crate::reconcile::{Reconciler, SimpleReconciler};
use crate::recognition::crop::CropStore;
use crate::recognition::{FormulaRecognizer, RecognitionCoordinator, RecognitionGate};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub layout: PathBuf,
    pub images: PathBuf,
    pub output: PathBuf,
    pub conversion: ConversionConfig,
    /// Keep the formula crops under `formula_images/` in the output directory.
    pub save_crops: bool,
}

impl PipelineConfig {
    pub fn new(layout: PathBuf, images: PathBuf, output: PathBuf) -> Self {
        Self {
            layout,
            images,
            output,
            conversion: ConversionConfig::default(),
            save_crops: true,
        }
    }

    pub fn with_conversion(mut self, conversion: ConversionConfig) -> Self {
        self.conversion = conversion;
        self
    }
}

/// Shared stop flag. Workers check it between stages; a page that sees it set is
/// dropped whole and reported as cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), PageError> {
        if self.is_cancelled() {
            Err(PageError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Wall time spent per stage, in first-seen order.
#[derive(Debug, Default)]
struct StageTimer {
    stages: Vec<(&'static str, Duration)>,
}

impl StageTimer {
    fn time<T>(&mut self, stage: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(stage, start.elapsed());
        out
    }

    fn record(&mut self, stage: &'static str, elapsed: Duration) {
        match self.stages.iter_mut().find(|(name, _)| *name == stage) {
            Some((_, total)) => *total += elapsed,
            None => self.stages.push((stage, elapsed)),
        }
    }

    fn absorb(&mut self, other: StageTimer) {
        for (stage, elapsed) in other.stages {
            self.record(stage, elapsed);
        }
    }

    fn timings(&self) -> Vec<StageTiming> {
        self.stages
            .iter()
            .map(|(stage, elapsed)| StageTiming::new(*stage, *elapsed))
            .collect()
    }
}

/// What each page worker needs; nothing in here is mutated by the workers.
struct PageContext<'a> {
    coordinator: RecognitionCoordinator<'a>,
    reconciler: SimpleReconciler,
    translator: Translator,
    images: &'a Path,
    cancel: &'a CancelToken,
}

pub fn build_document(
    config: &PipelineConfig,
    recognizer: &dyn FormulaRecognizer,
    cancel: &CancelToken,
) -> Result<(DocumentModel, Vec<StageTiming>)> {
    config.conversion.validate()?;
    let mut timer = StageTimer::default();

    let layout = timer.time("load_layout", || LayoutDocument::load(&config.layout))?;
    info!(
        "loaded {} pages, {} regions from {}",
        layout.pages.len(),
        layout.region_count(),
        config.layout.display()
    );

    let (model, page_timer) = process_pages(config, &layout.pages, recognizer, cancel)?;
    timer.absorb(page_timer);
    Ok((model, timer.timings()))
}

/// Runs every page on the page pool and assembles the model in page order.
fn process_pages(
    config: &PipelineConfig,
    pages: &[LayoutPage],
    recognizer: &dyn FormulaRecognizer,
    cancel: &CancelToken,
) -> Result<(DocumentModel, StageTimer)> {
    let conversion = &config.conversion;
    let gate = RecognitionGate::new(conversion.recognition_concurrency);
    let mut coordinator = RecognitionCoordinator::new(
        recognizer,
        &gate,
        conversion.batch_size,
        conversion.confidence_threshold,
    );
    if config.save_crops {
        coordinator = coordinator.with_crop_store(CropStore::new(config.output.clone()));
    }
    let ctx = PageContext {
        coordinator,
        reconciler: SimpleReconciler::new(conversion),
        translator: Translator::new(conversion.max_parse_depth),
        images: &config.images,
        cancel,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(conversion.page_concurrency)
        .build()
        .context("failed to build page worker pool")?;

    let results: Vec<(usize, Result<PageModel, PageError>, StageTimer)> = pool.install(|| {
        pages
            .par_iter()
            .map(|page| {
                let mut timer = StageTimer::default();
                let result = process_page(&ctx, page, &mut timer);
                (page.page_index, result, timer)
            })
            .collect()
    });

    let mut model = DocumentModel::default();
    let mut totals = StageTimer::default();
    for (page_index, result, timer) in results {
        totals.absorb(timer);
        match result {
            Ok(page) => {
                let r = &page.report;
                info!(
                    "page {}: {} blocks, {} fallback, {} low confidence, {} unsupported fragments",
                    page_index + 1,
                    r.blocks,
                    r.fallback_formulas,
                    r.low_confidence,
                    r.unsupported_fragments
                );
                model.pages.push(page);
            }
            Err(error) => {
                warn!("page {} skipped: {error}", page_index + 1);
                model.failures.push(PageFailure { page_index, error });
            }
        }
    }
    Ok((model, totals))
}

fn process_page(
    ctx: &PageContext<'_>,
    page: &LayoutPage,
    timer: &mut StageTimer,
) -> Result<PageModel, PageError> {
    ctx.cancel.check()?;
    let regions = timer.time("layout", || page_regions(page))?;

    ctx.cancel.check()?;
    let image_path = page.image_path(ctx.images);
    let has_formulas = regions.iter().any(|r| r.kind == RegionKind::Formula);
    let candidates = timer.time("recognize", || {
        if !has_formulas {
            return Vec::new();
        }
        match load_page_image(&image_path) {
            Ok(image) => ctx.coordinator.recognize_page(&regions, &image),
            Err(err) => {
                warn!("page {}: {err:#}", page.page_index + 1);
                let reason = format!("page image unavailable: {err}");
                regions
                    .iter()
                    .filter(|r| r.kind == RegionKind::Formula)
                    .map(|r| FormulaCandidate::failed(r, reason.clone()))
                    .collect()
            }
        }
    });

    ctx.cancel.check()?;
    let mut model = timer.time("reconcile", || {
        ctx.reconciler
            .reconcile(page.page_index, &regions, &candidates)
    });

    timer.time("translate", || translate_page(&mut model, &ctx.translator));
    model.source_image_ref = Some(image_path.to_string_lossy().into_owned());

    ctx.cancel.check()?;
    Ok(model)
}

fn load_page_image(path: &Path) -> Result<RgbImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to open page image {}", path.display()))?;
    Ok(image.to_rgb8())
}

/// Parses every recognized formula on the page and counts what stayed unsupported.
pub fn translate_page(page: &mut PageModel, translator: &Translator) {
    let mut unsupported = 0;
    for block in &mut page.blocks {
        if let MergedBlock::Formula {
            candidate,
            equation,
            ..
        } = block
        {
            if let Some(latex) = &candidate.recognized_latex {
                let tree = translator.parse(latex);
                unsupported += tree.unsupported_count();
                *equation = Some(tree);
            }
        }
    }
    page.report.unsupported_fragments = unsupported;
}

pub fn export_document(output: &ConversionOutput, dir: &Path) -> Result<(), AssemblyError> {
    let exporters: [&dyn Exporter; 4] = [
        &JsonExporter::new(dir.to_path_buf()),
        &CrossRefExporter::new(dir.to_path_buf()),
        &WordExporter::new(dir.to_path_buf()),
        &MarkdownExporter::new(dir.to_path_buf()),
    ];
    for exporter in exporters {
        exporter.export(output)?;
    }
    Ok(())
}

/// Full run: layout and images in, every output file written.
pub fn convert(
    config: &PipelineConfig,
    recognizer: &dyn FormulaRecognizer,
    cancel: &CancelToken,
) -> Result<RunReport> {
    let (model, mut stages) = build_document(config, recognizer, cancel)?;

    let start = Instant::now();
    let mut output = ConversionOutput::assemble(&model, Vec::new());
    stages.push(StageTiming::new("assemble", start.elapsed()));
    output.report.stages = stages;

    let start = Instant::now();
    export_document(&output, &config.output)
        .with_context(|| format!("failed to write outputs to {}", config.output.display()))?;
    info!("outputs written in {} ms", start.elapsed().as_millis());
    for stage in &output.report.stages {
        info!("stage {}: {} ms", stage.stage, stage.millis);
    }

    Ok(output.report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RecognitionError;
    use crate::core::geometry::BBox;
    use crate::core::model::{FormulaCandidate, Region, RegionKind};
    use crate::recognition::Recognition;
    use pretty_assertions::assert_eq;

    struct Echo;

    impl FormulaRecognizer for Echo {
        fn recognize(&self, crops: &[RgbImage]) -> Result<Vec<Recognition>, RecognitionError> {
            Ok(crops
                .iter()
                .map(|_| Recognition::new(r"\frac{1}{2} \sqrt{2}", Some(0.9)))
                .collect())
        }
    }

    #[test]
    fn translation_counts_unsupported_fragments() {
        let bbox = BBox::new(0.1, 0.1, 0.3, 0.2);
        let region = Region {
            page_index: 0,
            region_id: 0,
            bbox,
            kind: RegionKind::Formula,
            order_hint: 0,
            raw_content: String::new(),
            display: true,
        };
        let candidate =
            FormulaCandidate::recognized(&region, r"\frac{1}{2} \sqrt{2}".into(), Some(0.9), 0.5);
        let mut page = SimpleReconciler::default().reconcile(0, &[region], &[candidate]);

        translate_page(&mut page, &Translator::default());

        assert_eq!(page.report.unsupported_fragments, 1);
        assert!(page.blocks[0].equation().is_some());
    }

    #[test]
    fn cancelled_run_reports_every_page() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = PipelineConfig::new(
            dir.path().join("layout.json"),
            dir.path().to_path_buf(),
            dir.path().join("out"),
        );
        let pages: Vec<LayoutPage> = (0..3)
            .map(|page_index| LayoutPage {
                page_index,
                width: None,
                height: None,
                image: None,
                regions: serde_json::Value::Null,
            })
            .collect();
        let cancel = CancelToken::new();
        cancel.cancel();

        let (model, _) = process_pages(&config, &pages, &Echo, &cancel)?;

        assert!(model.pages.is_empty());
        assert_eq!(model.failures.len(), 3);
        assert!(model.failures.iter().all(|f| f.error == PageError::Cancelled));
        Ok(())
    }

    #[test]
    fn timer_sums_stages_across_pages() {
        let mut total = StageTimer::default();
        let mut a = StageTimer::default();
        a.record("recognize", Duration::from_millis(5));
        let mut b = StageTimer::default();
        b.record("recognize", Duration::from_millis(7));
        b.record("reconcile", Duration::from_millis(1));
        total.absorb(a);
        total.absorb(b);
        let timings = total.timings();
        assert_eq!(timings[0], StageTiming::new("recognize", Duration::from_millis(12)));
        assert_eq!(timings[1].stage, "reconcile");
    }
}

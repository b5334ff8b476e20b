//! Depth-peeling layer extraction.
//!
//! The extractor surveys the three axis-aligned viewpoints of a bounding box,
//! counting how many depth layers each needs, commits to one axis, then peels
//! that view again writing every layer to disk.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use peelview_core::{layer_base_path, write_layer, Aabb, Axis, AxisSelection, LayerData, Options};

use super::axis::{AxisView, EVALUATION_ORDER};
use super::backend::PeelBackend;
use crate::debug_image;
use crate::error::RenderResult;

/// Shared flag for stopping a running generation between passes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears the flag.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Layer counts of the three candidate axes and the axis chosen for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSurvey {
    /// Counts in evaluation order (Z, X, Y).
    pub counts: [(Axis, u32); 3],
    /// Axis used for extraction.
    pub selected: Axis,
}

impl AxisSurvey {
    /// Applies `policy` to counts given in evaluation order.
    #[must_use]
    pub fn new(counts: [(Axis, u32); 3], policy: AxisSelection) -> Self {
        let selected = match policy {
            AxisSelection::Minimum => minimum_axis(&counts),
            AxisSelection::LastEvaluated => counts[2].0,
        };
        Self { counts, selected }
    }

    /// Layer count recorded for `axis`.
    #[must_use]
    pub fn count(&self, axis: Axis) -> u32 {
        self.counts
            .iter()
            .find(|(a, _)| *a == axis)
            .map_or(0, |(_, n)| *n)
    }

    /// Layer count of the selected axis.
    #[must_use]
    pub fn selected_count(&self) -> u32 {
        self.count(self.selected)
    }

    /// Axis the [`AxisSelection::Minimum`] policy picks.
    #[must_use]
    pub fn minimum_axis(&self) -> Axis {
        minimum_axis(&self.counts)
    }
}

fn minimum_axis(counts: &[(Axis, u32); 3]) -> Axis {
    let mut best = counts[0];
    for candidate in &counts[1..] {
        if candidate.1 < best.1 {
            best = *candidate;
        }
    }
    best.0
}

/// Result of one run of the peel loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeelSummary {
    /// Passes executed, including the final empty one.
    pub iterations: u32,
    /// Passes that produced samples.
    pub layers: u32,
    /// Base paths of the layers written (extraction only).
    pub written: Vec<PathBuf>,
    /// Whether the loop stopped on the cancel token.
    pub cancelled: bool,
}

/// Outcome of [`LayerExtractor::generate_layers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// All layers of the selected axis were written.
    Completed {
        /// Survey that picked the axis.
        survey: AxisSurvey,
        /// Base paths of the written layers, front to back.
        layers: Vec<PathBuf>,
    },
    /// Stopped by the cancel token. Layers written so far are kept.
    Cancelled {
        /// Base paths of the layers written before cancellation.
        layers: Vec<PathBuf>,
    },
}

impl GenerationOutcome {
    /// Base paths of the layers written.
    #[must_use]
    pub fn layers(&self) -> &[PathBuf] {
        match self {
            Self::Completed { layers, .. } | Self::Cancelled { layers } => layers,
        }
    }
}

enum PeelMode<'a> {
    Count,
    Extract { output_dir: &'a Path, limit: u32 },
}

/// Drives a [`PeelBackend`] through axis discovery and layer extraction.
pub struct LayerExtractor<B: PeelBackend> {
    backend: B,
    options: Options,
    cancel: CancelToken,
}

impl<B: PeelBackend> LayerExtractor<B> {
    /// Creates an extractor owning `backend`.
    pub fn new(backend: B, options: Options) -> Self {
        Self {
            backend,
            options,
            cancel: CancelToken::new(),
        }
    }

    /// Uses `token` for cancellation.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// The cancellation token checked before every pass.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Options in use.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Consumes the extractor, returning the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Counts the layers visible from `view`.
    pub fn count_layers(&mut self, view: &AxisView) -> RenderResult<PeelSummary> {
        let summary = self.run(view, &PeelMode::Count)?;
        log::info!(
            "[layers] {} layer(s) along {} ({} pass(es))",
            summary.layers,
            view.axis.name(),
            summary.iterations
        );
        Ok(summary)
    }

    /// Surveys all three axes. Returns `None` when cancelled.
    pub fn discover(&mut self, bbox: &Aabb) -> RenderResult<Option<AxisSurvey>> {
        let mut counts = EVALUATION_ORDER.map(|axis| (axis, 0));
        for (slot, view) in counts.iter_mut().zip(AxisView::candidates(bbox)) {
            let summary = self.count_layers(&view)?;
            if summary.cancelled {
                log::info!("[layers] survey cancelled");
                return Ok(None);
            }
            slot.1 = summary.layers;
        }

        let survey = AxisSurvey::new(counts, self.options.axis_selection);
        let minimum = survey.minimum_axis();
        if survey.selected != minimum {
            log::warn!(
                "[layers] selected axis {} ({} layers) although {} needs only {}",
                survey.selected.name(),
                survey.selected_count(),
                minimum.name(),
                survey.count(minimum)
            );
        }
        log::info!(
            "[layers] survey z={} x={} y={}, using {}",
            survey.count(Axis::Z),
            survey.count(Axis::X),
            survey.count(Axis::Y),
            survey.selected.name()
        );
        Ok(Some(survey))
    }

    /// Writes the layers seen from `view` into `output_dir`, at most `limit`.
    pub fn extract(
        &mut self,
        view: &AxisView,
        output_dir: &Path,
        limit: u32,
    ) -> RenderResult<PeelSummary> {
        std::fs::create_dir_all(output_dir)?;
        self.run(view, &PeelMode::Extract { output_dir, limit })
    }

    /// Surveys `bbox`, then extracts the layers of the selected axis into
    /// [`Options::output_dir`].
    ///
    /// The cancel token is cleared on entry.
    pub fn generate_layers(&mut self, bbox: &Aabb) -> RenderResult<GenerationOutcome> {
        self.cancel.reset();

        let Some(survey) = self.discover(bbox)? else {
            return Ok(GenerationOutcome::Cancelled { layers: Vec::new() });
        };

        let output_dir = self.options.output_dir.clone();
        let view = AxisView::new(survey.selected, bbox);
        let summary = self.extract(&view, &output_dir, survey.selected_count())?;

        log::info!(
            "[layers] wrote {} layer(s) to {}",
            summary.written.len(),
            output_dir.display()
        );
        if summary.cancelled {
            return Ok(GenerationOutcome::Cancelled {
                layers: summary.written,
            });
        }
        Ok(GenerationOutcome::Completed {
            survey,
            layers: summary.written,
        })
    }

    fn run(&mut self, view: &AxisView, mode: &PeelMode<'_>) -> RenderResult<PeelSummary> {
        self.backend.begin_generation(self.options.reference_sentinel)?;
        let result = self.peel_until_empty(view, mode);
        self.backend.end_generation();
        result
    }

    fn peel_until_empty(&mut self, view: &AxisView, mode: &PeelMode<'_>) -> RenderResult<PeelSummary> {
        self.backend
            .set_view(view.view_matrix(), view.projection_matrix())?;

        let limit = match mode {
            PeelMode::Count => self.options.max_iterations,
            PeelMode::Extract { limit, .. } => (*limit).min(self.options.max_iterations),
        };

        let mut summary = PeelSummary::default();
        while summary.iterations < limit {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            summary.iterations += 1;

            let samples = self.backend.peel()?;
            log::debug!(
                "[layers] {} pass {}: {samples} samples",
                view.axis.name(),
                summary.iterations
            );
            if samples == 0 {
                break;
            }
            summary.layers += 1;

            if let PeelMode::Extract { output_dir, .. } = mode {
                let base = self.save_layer(output_dir, summary.layers)?;
                summary.written.push(base);
            }

            self.backend.swap_targets();
        }

        if summary.iterations == self.options.max_iterations && !summary.cancelled {
            log::warn!(
                "[layers] {} stopped at the {} pass limit",
                view.axis.name(),
                self.options.max_iterations
            );
        }
        Ok(summary)
    }

    fn save_layer(&mut self, output_dir: &Path, id: u32) -> RenderResult<PathBuf> {
        let (width, height) = self.backend.viewport();
        let rgba = self.backend.read_render_target()?;
        let layer = LayerData::from_rgba(width, height, &rgba)?;

        let base = layer_base_path(output_dir, id);
        write_layer(&base, &layer)?;
        if self.options.write_debug_images {
            debug_image::write_previews(&base, &layer)?;
        }
        log::info!("[layers] saved {}", base.display());
        Ok(base)
    }
}

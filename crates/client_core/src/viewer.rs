//! Pan/zoom/fit state for the stitched-image viewer.
//!
//! One `ViewerState` tracks a single displayed image reference. It starts in
//! `Loading`, settles into `Loaded` or `Errored`, and is rebuilt from
//! scratch whenever the reference changes. Rendering widgets sit behind
//! [`TransformHandle`] so none of this depends on a particular one.

use shared::protocol::PLACEHOLDER_IMAGE_URL;

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 5.0;
/// Fit-to-view leaves a small margin around the image.
pub const FIT_MARGIN: f32 = 0.9;
/// Discrete zoom step applied by the zoom buttons.
pub const ZOOM_STEP_FACTOR: f32 = 1.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSize {
    pub width: f32,
    pub height: f32,
}

impl PixelSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePhase {
    Loading,
    Loaded,
    Errored,
}

/// Scale needed to fit the image inside the container with a margin, never
/// exceeding 100% magnification.
pub fn fit_scale(image: PixelSize, container: PixelSize) -> f32 {
    let scale_x = container.width / image.width * FIT_MARGIN;
    let scale_y = container.height / image.height * FIT_MARGIN;
    scale_x.min(scale_y).min(1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    image_url: String,
    phase: ImagePhase,
    scale: f32,
    offset_x: f32,
    offset_y: f32,
    show_grid: bool,
    show_crosshair: bool,
}

impl ViewerState {
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            phase: ImagePhase::Loading,
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            show_grid: false,
            show_crosshair: false,
        }
    }

    /// A different upstream reference restarts the machine from scratch;
    /// nothing carries over between results.
    pub fn set_image_url(&mut self, image_url: impl Into<String>) {
        let image_url = image_url.into();
        if image_url != self.image_url {
            *self = Self::new(image_url);
        }
    }

    /// Loading → Loaded, with the one-time fit-to-view computation.
    pub fn mark_loaded(&mut self, image: PixelSize, container: PixelSize) {
        if self.phase != ImagePhase::Loading {
            return;
        }
        self.phase = ImagePhase::Loaded;
        self.scale = fit_scale(image, container).clamp(MIN_SCALE, MAX_SCALE);
        self.offset_x = 0.0;
        self.offset_y = 0.0;
    }

    /// Loading → Errored. Terminal for this reference.
    pub fn mark_errored(&mut self) {
        if self.phase == ImagePhase::Loading {
            self.phase = ImagePhase::Errored;
        }
    }

    /// What should actually be rendered: the placeholder once loading the
    /// real reference has failed.
    pub fn display_url(&self) -> &str {
        match self.phase {
            ImagePhase::Errored => PLACEHOLDER_IMAGE_URL,
            _ => &self.image_url,
        }
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn phase(&self) -> ImagePhase {
        self.phase
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> (f32, f32) {
        (self.offset_x, self.offset_y)
    }

    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    pub fn show_crosshair(&self) -> bool {
        self.show_crosshair
    }

    /// All manipulation is gated on a successfully loaded image.
    pub fn controls_enabled(&self) -> bool {
        self.phase == ImagePhase::Loaded
    }

    pub fn can_download(&self) -> bool {
        self.phase == ImagePhase::Loaded
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.scale * ZOOM_STEP_FACTOR);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.scale / ZOOM_STEP_FACTOR);
    }

    pub fn set_zoom(&mut self, value: f32) {
        if !self.controls_enabled() {
            return;
        }
        self.scale = value.clamp(MIN_SCALE, MAX_SCALE);
    }

    pub fn set_offset(&mut self, x: f32, y: f32) {
        if !self.controls_enabled() {
            return;
        }
        self.offset_x = x;
        self.offset_y = y;
    }

    /// Re-runs the fit computation on demand (the "fit to view" button).
    pub fn fit_to_view(&mut self, image: PixelSize, container: PixelSize) {
        if !self.controls_enabled() {
            return;
        }
        self.scale = fit_scale(image, container).clamp(MIN_SCALE, MAX_SCALE);
        self.offset_x = 0.0;
        self.offset_y = 0.0;
    }

    pub fn reset_transform(&mut self) {
        if !self.controls_enabled() {
            return;
        }
        self.scale = 1.0;
        self.offset_x = 0.0;
        self.offset_y = 0.0;
    }

    pub fn toggle_grid(&mut self) {
        if !self.controls_enabled() {
            return;
        }
        self.show_grid = !self.show_grid;
    }

    pub fn toggle_crosshair(&mut self) {
        if !self.controls_enabled() {
            return;
        }
        self.show_crosshair = !self.show_crosshair;
    }
}

/// Seam between the transform controller and whatever widget renders the
/// image. Keeps the controller logic widget-agnostic.
pub trait TransformHandle {
    fn zoom_in(&mut self);
    fn zoom_out(&mut self);
    fn set_transform(&mut self, x: f32, y: f32, scale: f32);
    fn reset(&mut self);
}

/// Handle for rendering-free use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransformHandle;

impl TransformHandle for NullTransformHandle {
    fn zoom_in(&mut self) {}
    fn zoom_out(&mut self) {}
    fn set_transform(&mut self, _x: f32, _y: f32, _scale: f32) {}
    fn reset(&mut self) {}
}

/// Drives a `ViewerState` and its rendering widget together.
pub struct ViewerController<H: TransformHandle> {
    state: ViewerState,
    handle: H,
}

impl<H: TransformHandle> ViewerController<H> {
    pub fn new(image_url: impl Into<String>, handle: H) -> Self {
        Self {
            state: ViewerState::new(image_url),
            handle,
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn set_image_url(&mut self, image_url: impl Into<String>) {
        let image_url = image_url.into();
        if image_url != self.state.image_url {
            self.state.set_image_url(image_url);
            self.handle.reset();
        }
    }

    pub fn image_loaded(&mut self, image: PixelSize, container: PixelSize) {
        self.state.mark_loaded(image, container);
        if self.state.phase() == ImagePhase::Loaded {
            self.handle.set_transform(0.0, 0.0, self.state.scale());
        }
    }

    pub fn image_errored(&mut self) {
        self.state.mark_errored();
    }

    pub fn zoom_in(&mut self) {
        if !self.state.controls_enabled() {
            return;
        }
        self.state.zoom_in();
        self.handle.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        if !self.state.controls_enabled() {
            return;
        }
        self.state.zoom_out();
        self.handle.zoom_out();
    }

    /// Slider zoom: scale changes, pan position stays.
    pub fn set_zoom(&mut self, value: f32) {
        if !self.state.controls_enabled() {
            return;
        }
        self.state.set_zoom(value);
        let (x, y) = self.state.offset();
        self.handle.set_transform(x, y, self.state.scale());
    }

    pub fn fit_to_view(&mut self, image: PixelSize, container: PixelSize) {
        if !self.state.controls_enabled() {
            return;
        }
        self.state.fit_to_view(image, container);
        self.handle.set_transform(0.0, 0.0, self.state.scale());
    }

    pub fn reset_transform(&mut self) {
        if !self.state.controls_enabled() {
            return;
        }
        self.state.reset_transform();
        self.handle.reset();
    }

    pub fn toggle_grid(&mut self) {
        self.state.toggle_grid();
    }

    pub fn toggle_crosshair(&mut self) {
        self.state.toggle_crosshair();
    }

    /// Returns the reference to save, or `None` while there is nothing
    /// downloadable.
    pub fn download(&self) -> Option<&str> {
        self.state.can_download().then(|| self.state.display_url())
    }
}

#[cfg(test)]
#[path = "tests/viewer_tests.rs"]
mod tests;

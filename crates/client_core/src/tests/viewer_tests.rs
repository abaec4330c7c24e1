use super::*;

fn loaded_state() -> ViewerState {
    let mut state = ViewerState::new("/output/panorama-1.jpg");
    state.mark_loaded(PixelSize::new(800.0, 600.0), PixelSize::new(800.0, 600.0));
    state
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn fit_scale_shrinks_large_images_with_margin() {
    let scale = fit_scale(PixelSize::new(4000.0, 2000.0), PixelSize::new(1000.0, 500.0));
    assert_close(scale, 0.225);
}

#[test]
fn fit_scale_never_magnifies_past_one() {
    let scale = fit_scale(PixelSize::new(100.0, 100.0), PixelSize::new(1000.0, 1000.0));
    assert_close(scale, 1.0);
}

#[test]
fn fit_scale_uses_the_tighter_axis() {
    // Wide image in a square container: width is the limiting axis.
    let scale = fit_scale(PixelSize::new(3000.0, 1000.0), PixelSize::new(900.0, 900.0));
    assert_close(scale, 900.0 / 3000.0 * 0.9);
}

#[test]
fn loading_an_image_applies_fit_and_clears_offsets() {
    let mut state = ViewerState::new("/output/panorama-1.jpg");
    state.mark_loaded(PixelSize::new(4000.0, 2000.0), PixelSize::new(1000.0, 500.0));

    assert_eq!(state.phase(), ImagePhase::Loaded);
    assert_close(state.scale(), 0.225);
    assert_eq!(state.offset(), (0.0, 0.0));
}

#[test]
fn extreme_fit_results_stay_inside_the_scale_bounds() {
    let mut state = ViewerState::new("/output/panorama-1.jpg");
    state.mark_loaded(
        PixelSize::new(100_000.0, 100_000.0),
        PixelSize::new(100.0, 100.0),
    );
    assert_close(state.scale(), MIN_SCALE);
}

#[test]
fn zoom_never_leaves_the_scale_bounds() {
    let mut state = loaded_state();

    state.set_zoom(99.0);
    assert_close(state.scale(), MAX_SCALE);

    state.set_zoom(0.0001);
    assert_close(state.scale(), MIN_SCALE);

    for _ in 0..100 {
        state.zoom_out();
    }
    assert_close(state.scale(), MIN_SCALE);

    for _ in 0..100 {
        state.zoom_in();
    }
    assert_close(state.scale(), MAX_SCALE);
}

#[test]
fn zoom_buttons_step_multiplicatively() {
    let mut state = loaded_state();
    state.set_zoom(1.0);
    state.zoom_in();
    assert_close(state.scale(), ZOOM_STEP_FACTOR);
    state.zoom_out();
    assert_close(state.scale(), 1.0);
}

#[test]
fn controls_are_inert_until_the_image_loads() {
    let mut state = ViewerState::new("/output/panorama-1.jpg");
    assert!(!state.controls_enabled());

    state.set_zoom(3.0);
    state.toggle_grid();
    state.set_offset(10.0, 10.0);
    state.reset_transform();

    assert_close(state.scale(), 1.0);
    assert!(!state.show_grid());
    assert_eq!(state.offset(), (0.0, 0.0));
}

#[test]
fn errored_images_fall_back_to_the_placeholder() {
    let mut state = ViewerState::new("/output/panorama-1.jpg");
    state.mark_errored();

    assert_eq!(state.phase(), ImagePhase::Errored);
    assert_eq!(state.display_url(), PLACEHOLDER_IMAGE_URL);
    assert_eq!(state.image_url(), "/output/panorama-1.jpg");
    assert!(!state.can_download());

    state.set_zoom(3.0);
    assert_close(state.scale(), 1.0);
}

#[test]
fn error_is_terminal_for_one_reference() {
    let mut state = ViewerState::new("/output/panorama-1.jpg");
    state.mark_errored();
    state.mark_loaded(PixelSize::new(10.0, 10.0), PixelSize::new(10.0, 10.0));
    assert_eq!(state.phase(), ImagePhase::Errored);
}

#[test]
fn changing_the_reference_resets_everything() {
    let mut state = loaded_state();
    state.set_zoom(3.0);
    state.set_offset(40.0, -20.0);
    state.toggle_grid();
    state.toggle_crosshair();

    state.set_image_url("/output/panorama-2.jpg");

    assert_eq!(state.phase(), ImagePhase::Loading);
    assert_close(state.scale(), 1.0);
    assert_eq!(state.offset(), (0.0, 0.0));
    assert!(!state.show_grid());
    assert!(!state.show_crosshair());
    assert_eq!(state.image_url(), "/output/panorama-2.jpg");
}

#[test]
fn reoffering_the_same_reference_changes_nothing() {
    let mut state = loaded_state();
    state.set_zoom(3.0);
    let before = state.clone();

    state.set_image_url("/output/panorama-1.jpg");
    assert_eq!(state, before);
}

#[derive(Default)]
struct RecordingHandle {
    calls: Vec<String>,
}

impl TransformHandle for RecordingHandle {
    fn zoom_in(&mut self) {
        self.calls.push("zoom_in".to_string());
    }

    fn zoom_out(&mut self) {
        self.calls.push("zoom_out".to_string());
    }

    fn set_transform(&mut self, x: f32, y: f32, scale: f32) {
        self.calls.push(format!("set_transform({x},{y},{scale})"));
    }

    fn reset(&mut self) {
        self.calls.push("reset".to_string());
    }
}

#[test]
fn controller_fits_the_widget_when_the_image_loads() {
    let mut controller =
        ViewerController::new("/output/panorama-1.jpg", RecordingHandle::default());
    controller.image_loaded(PixelSize::new(4000.0, 2000.0), PixelSize::new(1000.0, 500.0));

    assert_eq!(controller.handle().calls, ["set_transform(0,0,0.225)"]);
    assert_close(controller.state().scale(), 0.225);
}

#[test]
fn controller_ignores_manipulation_before_load() {
    let mut controller =
        ViewerController::new("/output/panorama-1.jpg", RecordingHandle::default());
    controller.zoom_in();
    controller.set_zoom(2.0);
    controller.reset_transform();

    assert!(controller.handle().calls.is_empty());
    assert!(controller.download().is_none());
}

#[test]
fn controller_forwards_zoom_and_reset_once_loaded() {
    let mut controller =
        ViewerController::new("/output/panorama-1.jpg", RecordingHandle::default());
    controller.image_loaded(PixelSize::new(100.0, 100.0), PixelSize::new(1000.0, 1000.0));
    controller.zoom_in();
    controller.zoom_out();
    controller.reset_transform();

    assert_eq!(
        controller.handle().calls,
        [
            "set_transform(0,0,1)",
            "zoom_in",
            "zoom_out",
            "reset",
        ]
    );
    assert_close(controller.state().scale(), 1.0);
}

#[test]
fn controller_resets_the_widget_on_a_new_reference() {
    let mut controller =
        ViewerController::new("/output/panorama-1.jpg", RecordingHandle::default());
    controller.image_loaded(PixelSize::new(100.0, 100.0), PixelSize::new(1000.0, 1000.0));
    controller.set_image_url("/output/panorama-2.jpg");

    assert_eq!(controller.state().phase(), ImagePhase::Loading);
    assert_eq!(
        controller.handle().calls.last().map(String::as_str),
        Some("reset")
    );
}

#[test]
fn controller_download_requires_a_loaded_image() {
    let mut controller =
        ViewerController::new("/output/panorama-1.jpg", RecordingHandle::default());
    assert!(controller.download().is_none());

    controller.image_loaded(PixelSize::new(100.0, 100.0), PixelSize::new(1000.0, 1000.0));
    assert_eq!(controller.download(), Some("/output/panorama-1.jpg"));
}

#[test]
fn controller_toggles_track_state() {
    let mut controller =
        ViewerController::new("/output/panorama-1.jpg", RecordingHandle::default());
    controller.toggle_grid();
    assert!(!controller.state().show_grid(), "inert until loaded");

    controller.image_loaded(PixelSize::new(100.0, 100.0), PixelSize::new(1000.0, 1000.0));
    controller.toggle_grid();
    controller.toggle_crosshair();
    assert!(controller.state().show_grid());
    assert!(controller.state().show_crosshair());
}

use image::{Rgba, RgbaImage};
use ndarray::ArrayView2;

use crate::config::DisplaySettings;
use crate::processing::color_ramp::ColorRamp;
use crate::processing::colorizer::color_for_score;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Position of `value` inside the display window, clamped to [0, 1].
pub fn window_position(value: f64, display: &DisplaySettings) -> f64 {
    let span = display.window_max - display.window_min;
    if span <= 0.0 {
        return if value >= display.window_max { 1.0 } else { 0.0 };
    }
    ((value - display.window_min) / span).clamp(0.0, 1.0)
}

/// Color of one score voxel; below-threshold voxels are fully transparent.
pub fn overlay_pixel(value: f64, ramp: &ColorRamp, display: &DisplaySettings) -> Rgba<u8> {
    if value.is_nan() || value < display.lower_threshold {
        return TRANSPARENT;
    }
    let [r, g, b] = color_for_score(window_position(value, display), ramp).to_u8();
    let alpha = (display.foreground_opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([r, g, b, alpha])
}

/// Renders a 2D slice, first row at the bottom of the image.
pub fn render_slice(slice: ArrayView2<'_, f64>, ramp: &ColorRamp, display: &DisplaySettings) -> RgbaImage {
    let (rows, cols) = slice.dim();
    let mut img = RgbaImage::new(cols as u32, rows as u32);
    for ((row, col), &value) in slice.indexed_iter() {
        let y = (rows - 1 - row) as u32;
        img.put_pixel(col as u32, y, overlay_pixel(value, ramp, display));
    }
    img
}

#[cfg(test)]
mod texture_tests {
    use super::*;
    use crate::processing::color_ramp::Rgb;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    fn red_blue_ramp() -> ColorRamp {
        ColorRamp::new(vec![Rgb::new(0.0, 0.0, 1.0), Rgb::new(1.0, 0.0, 0.0)]).unwrap()
    }

    #[test]
    fn test_window_position() {
        let display = DisplaySettings::default();
        assert_relative_eq!(window_position(50.0, &display), 0.5);
        assert_relative_eq!(window_position(-10.0, &display), 0.0);
        assert_relative_eq!(window_position(250.0, &display), 1.0);

        let degenerate = DisplaySettings {
            window_min: 5.0,
            window_max: 5.0,
            ..DisplaySettings::default()
        };
        assert_relative_eq!(window_position(4.0, &degenerate), 0.0);
        assert_relative_eq!(window_position(5.0, &degenerate), 1.0);
    }

    #[test]
    fn test_threshold_hides_low_scores() {
        let display = DisplaySettings::default();
        let ramp = red_blue_ramp();

        assert_eq!(overlay_pixel(0.0, &ramp, &display), TRANSPARENT);
        assert_eq!(overlay_pixel(0.99, &ramp, &display), TRANSPARENT);
        assert_eq!(overlay_pixel(f64::NAN, &ramp, &display), TRANSPARENT);
        assert_eq!(overlay_pixel(1.0, &ramp, &display), Rgba([0, 0, 255, 255]));
        assert_eq!(overlay_pixel(100.0, &ramp, &display), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_foreground_opacity() {
        let display = DisplaySettings {
            foreground_opacity: 0.5,
            ..DisplaySettings::default()
        };
        let pixel = overlay_pixel(100.0, &red_blue_ramp(), &display);
        assert_eq!(pixel.0[3], 128);
    }

    #[test]
    fn test_render_slice_flips_rows() {
        let slice = arr2(&[[100.0, 0.0, 0.0], [0.0, 0.0, 100.0]]);
        let img = render_slice(slice.view(), &red_blue_ramp(), &DisplaySettings::default());

        assert_eq!(img.dimensions(), (3, 2));
        // array row 0 is the bottom image row
        assert_eq!(*img.get_pixel(0, 1), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(2, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(0, 0), TRANSPARENT);
    }
}

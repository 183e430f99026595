//! Viewport module for pan/zoom transforms between screen and image space.

use crate::config::{DEFAULT_MAX_SCALE, DEFAULT_MIN_SCALE, DEFAULT_ZOOM_FACTOR, EngineConfig};
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Viewport manages the affine map from image space to screen space.
///
/// `screen = image * scale + origin`. Panning moves the origin, zooming
/// changes the scale while keeping the origin fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Screen position of the image's top-left corner.
    pub origin: Vec2,
    /// Current scale factor.
    pub scale: f64,
    /// Minimum allowed scale.
    pub min_scale: f64,
    /// Maximum allowed scale.
    pub max_scale: f64,
    /// Scale multiplier per zoom step.
    pub zoom_factor: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            origin: Vec2::ZERO,
            scale: 1.0,
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            zoom_factor: DEFAULT_ZOOM_FACTOR,
        }
    }
}

impl Viewport {
    /// Create a viewport at scale 1.0 with its origin at the screen origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a viewport using the zoom settings of a config.
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            zoom_factor: config.zoom_factor,
            ..Self::default()
        }
    }

    /// Reset to scale 1.0 with the bitmap centred in the drawing surface.
    pub fn center_image(&mut self, image: Size, surface: Size) {
        self.scale = 1.0;
        self.origin = Vec2::new(
            (surface.width - image.width) / 2.0,
            (surface.height - image.height) / 2.0,
        );
    }

    /// Get the affine transform for rendering (image to screen).
    pub fn transform(&self) -> Affine {
        Affine::translate(self.origin) * Affine::scale(self.scale)
    }

    /// Get the inverse transform for input handling (screen to image).
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.origin)
    }

    /// Convert a screen point to image coordinates.
    pub fn screen_to_image(&self, screen_point: Point) -> Point {
        Point::new(
            (screen_point.x - self.origin.x) / self.scale,
            (screen_point.y - self.origin.y) / self.scale,
        )
    }

    /// Convert an image point to screen coordinates.
    pub fn image_to_screen(&self, image_point: Point) -> Point {
        Point::new(
            image_point.x * self.scale + self.origin.x,
            image_point.y * self.scale + self.origin.y,
        )
    }

    /// Map an image-space rect onto the screen.
    pub fn rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_points(
            self.image_to_screen(Point::new(rect.x0, rect.y0)),
            self.image_to_screen(Point::new(rect.x1, rect.y1)),
        )
    }

    /// Map a screen-space rect back into image space.
    pub fn rect_to_image(&self, rect: Rect) -> Rect {
        Rect::from_points(
            self.screen_to_image(Point::new(rect.x0, rect.y0)),
            self.screen_to_image(Point::new(rect.x1, rect.y1)),
        )
    }

    /// Pan by a delta in screen coordinates. Unbounded.
    pub fn pan(&mut self, delta: Vec2) {
        self.origin += delta;
    }

    /// Zoom one step: a negative sign zooms in, anything else zooms out.
    ///
    /// The origin stays put, so the apparent focal point drifts when the
    /// image is off-centre.
    pub fn zoom(&mut self, delta_sign: f64) {
        let new_scale = if delta_sign < 0.0 {
            self.scale * self.zoom_factor
        } else {
            self.scale / self.zoom_factor
        };
        self.scale = new_scale.clamp(self.min_scale, self.max_scale);
    }
}

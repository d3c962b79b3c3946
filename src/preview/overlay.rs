use image::{Rgb, RgbImage};

/// Framing guide drawn over live preview frames.
///
/// A rounded outline covering the middle half of the frame. Only preview
/// frames carry it; grabbed stills never do.
#[derive(Debug, Clone, Copy)]
pub struct GuideOverlay {
    /// Offset of the guide from the top-left corner, as a fraction of the frame
    inset: f32,
    /// Size of the guide, as a fraction of the frame
    extent: f32,
    thickness: f32,
    radius: f32,
    color: Rgb<u8>,
    opacity: f32,
}

impl Default for GuideOverlay {
    fn default() -> Self {
        Self {
            inset: 0.25,
            extent: 0.5,
            thickness: 4.0,
            radius: 15.0,
            color: Rgb([255, 0, 0]),
            opacity: 0.8,
        }
    }
}

impl GuideOverlay {
    /// Blend the guide outline into `frame` in place
    pub fn apply(&self, frame: &mut RgbImage) {
        let (width, height) = frame.dimensions();
        let x0 = width as f32 * self.inset;
        let y0 = height as f32 * self.inset;
        let x1 = x0 + width as f32 * self.extent;
        let y1 = y0 + height as f32 * self.extent;

        let outer = RoundedRect::new(x0, y0, x1, y1, self.radius);
        let inner = RoundedRect::new(
            x0 + self.thickness,
            y0 + self.thickness,
            x1 - self.thickness,
            y1 - self.thickness,
            (self.radius - self.thickness).max(0.0),
        );

        let (col_start, col_end) = (x0.floor() as u32, (x1.ceil() as u32).min(width));
        let (row_start, row_end) = (y0.floor() as u32, (y1.ceil() as u32).min(height));

        for y in row_start..row_end {
            for x in col_start..col_end {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                if outer.contains(px, py) && !inner.contains(px, py) {
                    let pixel = frame.get_pixel_mut(x, y);
                    *pixel = self.blend(*pixel);
                }
            }
        }
    }

    fn blend(&self, under: Rgb<u8>) -> Rgb<u8> {
        let mix = |base: u8, top: u8| {
            (base as f32 * (1.0 - self.opacity) + top as f32 * self.opacity)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgb([
            mix(under[0], self.color[0]),
            mix(under[1], self.color[1]),
            mix(under[2], self.color[2]),
        ])
    }
}

struct RoundedRect {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    radius: f32,
}

impl RoundedRect {
    fn new(x0: f32, y0: f32, x1: f32, y1: f32, radius: f32) -> Self {
        // Corners cannot be rounder than half the shorter side
        let radius = radius.min((x1 - x0) / 2.0).min((y1 - y0) / 2.0).max(0.0);
        Self {
            x0,
            y0,
            x1,
            y1,
            radius,
        }
    }

    fn contains(&self, px: f32, py: f32) -> bool {
        if px < self.x0 || px > self.x1 || py < self.y0 || py > self.y1 {
            return false;
        }
        let cx = px.clamp(self.x0 + self.radius, self.x1 - self.radius);
        let cy = py.clamp(self.y0 + self.radius, self.y1 - self.radius);
        let (dx, dy) = (px - cx, py - cy);
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

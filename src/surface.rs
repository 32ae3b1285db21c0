// src/surface.rs
//
// Overlay surfaces: BGR Mats where black is the transparent colorkey,
// composited with per-surface alpha onto a display Mat. This mirrors the
// colorkey/alpha surface pair of the original host toolkit using
// add_weighted plus a masked copy.

use anyhow::Result;
use opencv::{
    core::{self, Mat, Vector},
    imgproc,
    prelude::*,
};

use crate::projection::ProjectedPoint;
use crate::world::{CameraFrame, Color};

#[derive(Debug)]
pub struct OverlaySurface {
    mat: Mat,
    alpha: f64,
}

impl OverlaySurface {
    /// Fully transparent (black) surface of the given size.
    pub fn new(width: i32, height: i32, alpha: f64) -> Result<Self> {
        let mat = Mat::new_rows_cols_with_default(
            height,
            width,
            core::CV_8UC3,
            core::Scalar::all(0.0),
        )?;
        Ok(Self { mat, alpha })
    }

    /// Opaque surface from a raw BGRA camera frame.
    pub fn from_bgra(frame: &CameraFrame) -> Result<Self> {
        let flat = Mat::from_slice(&frame.data)?;
        let bgra = flat.reshape(4, frame.height)?;
        let mut mat = Mat::default();
        imgproc::cvt_color(&bgra, &mut mat, imgproc::COLOR_BGRA2BGR, 0)?;
        Ok(Self { mat, alpha: 1.0 })
    }

    pub fn width(&self) -> i32 {
        self.mat.cols()
    }

    pub fn height(&self) -> i32 {
        self.mat.rows()
    }

    pub fn mat(&self) -> &Mat {
        &self.mat
    }

    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            mat: self.mat.try_clone()?,
            alpha: self.alpha,
        })
    }

    /// Draw a closed polyline. Points behind the camera must already be
    /// filtered out by the caller.
    pub fn draw_closed_polyline(
        &mut self,
        points: &[ProjectedPoint],
        color: Color,
        thickness: i32,
    ) -> Result<()> {
        if points.len() < 2 {
            return Ok(());
        }

        let mut polylines = Vector::<Vector<core::Point>>::new();
        polylines.push(Vector::from_iter(
            points.iter().map(|p| core::Point::new(p.x, p.y)),
        ));
        imgproc::polylines(
            &mut self.mat,
            &polylines,
            true,
            color.to_scalar(),
            thickness,
            imgproc::LINE_8,
            0,
        )?;
        Ok(())
    }

    /// Draw a filled polygon.
    pub fn fill_polygon(&mut self, points: &[ProjectedPoint], color: Color) -> Result<()> {
        if points.len() < 3 {
            return Ok(());
        }

        let mut polygons = Vector::<Vector<core::Point>>::new();
        polygons.push(Vector::from_iter(
            points.iter().map(|p| core::Point::new(p.x, p.y)),
        ));
        imgproc::fill_poly(
            &mut self.mat,
            &polygons,
            color.to_scalar(),
            imgproc::LINE_8,
            0,
            core::Point::new(0, 0),
        )?;
        Ok(())
    }

    /// Fill a pixel-space polygon given as raw (x, y) pairs, for panel
    /// glyphs that never pass through the projection pipeline.
    pub fn fill_pixel_polygon(&mut self, points: &[(i32, i32)], color: Color) -> Result<()> {
        let mut polygons = Vector::<Vector<core::Point>>::new();
        polygons.push(Vector::from_iter(
            points.iter().map(|&(x, y)| core::Point::new(x, y)),
        ));
        imgproc::fill_poly(
            &mut self.mat,
            &polygons,
            color.to_scalar(),
            imgproc::LINE_8,
            0,
            core::Point::new(0, 0),
        )?;
        Ok(())
    }

    pub fn draw_circle(&mut self, x: i32, y: i32, radius: i32, color: Color) -> Result<()> {
        imgproc::circle(
            &mut self.mat,
            core::Point::new(x, y),
            radius,
            color.to_scalar(),
            -1,
            imgproc::LINE_8,
            0,
        )?;
        Ok(())
    }

    pub fn draw_text(&mut self, text: &str, x: i32, y: i32, scale: f64, color: Color) -> Result<()> {
        imgproc::put_text(
            &mut self.mat,
            text,
            core::Point::new(x, y),
            imgproc::FONT_HERSHEY_SIMPLEX,
            scale,
            color.to_scalar(),
            1,
            imgproc::LINE_AA,
            false,
        )?;
        Ok(())
    }

    /// Black 2px border around the surface edges.
    pub fn draw_frame_border(&mut self) -> Result<()> {
        let (w, h) = (self.width(), self.height());
        let black = core::Scalar::all(0.0);
        for rect in [
            core::Rect::new(0, 0, 2, h),
            core::Rect::new(0, 0, w, 2),
            core::Rect::new(0, h - 2, w, 2),
            core::Rect::new(w - 2, 0, 2, h),
        ] {
            imgproc::rectangle(&mut self.mat, rect, black, -1, imgproc::LINE_8, 0)?;
        }
        Ok(())
    }

    /// Composite another surface onto this one, honoring its colorkey and
    /// alpha.
    pub fn blit(&mut self, other: &OverlaySurface, x: i32, y: i32) -> Result<()> {
        other.composite_onto(&mut self.mat, x, y)
    }

    /// Composite this surface onto a display Mat at (x, y): non-black
    /// pixels are alpha-blended over the destination.
    pub fn composite_onto(&self, display: &mut Mat, x: i32, y: i32) -> Result<()> {
        let rect = clamp_rect(x, y, self.width(), self.height(), display.cols(), display.rows());
        let Some(rect) = rect else {
            return Ok(());
        };

        let source = if rect.width == self.width() && rect.height == self.height() {
            self.mat.try_clone()?
        } else {
            // Partially off-screen: crop the matching source region.
            let src_rect = core::Rect::new(rect.x - x, rect.y - y, rect.width, rect.height);
            Mat::roi(&self.mat, src_rect)?.try_clone()?
        };

        // Colorkey mask: any non-black pixel of the overlay.
        let mut gray = Mat::default();
        imgproc::cvt_color(&source, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;
        let mut mask = Mat::default();
        imgproc::threshold(&gray, &mut mask, 0.0, 255.0, imgproc::THRESH_BINARY)?;

        let mut roi = Mat::roi(display, rect)?;
        let mut blended = Mat::default();
        core::add_weighted(&source, self.alpha, &roi, 1.0 - self.alpha, 0.0, &mut blended, -1)?;
        blended.copy_to_masked(&mut roi, &mask)?;
        Ok(())
    }

    /// Opaque copy onto a display Mat, ignoring colorkey and alpha.
    pub fn copy_onto(&self, display: &mut Mat, x: i32, y: i32) -> Result<()> {
        let rect = clamp_rect(x, y, self.width(), self.height(), display.cols(), display.rows());
        let Some(rect) = rect else {
            return Ok(());
        };

        let mut roi = Mat::roi(display, rect)?;
        if rect.width == self.width() && rect.height == self.height() {
            self.mat.copy_to(&mut roi)?;
        } else {
            let src_rect = core::Rect::new(rect.x - x, rect.y - y, rect.width, rect.height);
            Mat::roi(&self.mat, src_rect)?.copy_to(&mut roi)?;
        }
        Ok(())
    }
}

/// Intersect a placement rect with the display bounds. Returns None when
/// nothing remains visible.
fn clamp_rect(
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    display_width: i32,
    display_height: i32,
) -> Option<core::Rect> {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + width).min(display_width);
    let y1 = (y + height).min(display_height);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(core::Rect::new(x0, y0, x1 - x0, y1 - y0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_rect_inside_display() {
        let rect = clamp_rect(10, 20, 100, 50, 640, 480).unwrap();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (10, 20, 100, 50));
    }

    #[test]
    fn test_clamp_rect_partially_off_screen() {
        let rect = clamp_rect(-10, 0, 100, 50, 640, 480).unwrap();
        assert_eq!((rect.x, rect.width), (0, 90));
    }

    #[test]
    fn test_clamp_rect_fully_off_screen() {
        assert!(clamp_rect(700, 0, 100, 50, 640, 480).is_none());
    }
}

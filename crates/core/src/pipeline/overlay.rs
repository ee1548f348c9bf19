//! Frame annotation and comparison canvases.

use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Outline color for detected regions (frames are RGB).
pub const REGION_COLOR: [u8; 3] = [0, 0, 255];

/// Outline thickness in pixels.
pub const REGION_THICKNESS: i32 = 2;

/// Draws a rectangle outline for every region, clipped to the frame.
pub fn draw_regions(frame: &mut Frame, regions: &[Region]) {
    for region in regions {
        if let Some(r) = region.clamp_to(frame.width(), frame.height()) {
            draw_outline(frame, &r);
        }
    }
}

fn draw_outline(frame: &mut Frame, r: &Region) {
    let t = REGION_THICKNESS.min(r.width).min(r.height);
    let (x0, y0) = (r.x, r.y);
    let (x1, y1) = (r.x + r.width, r.y + r.height);

    fill(frame, x0, y0, x1, y0 + t);
    fill(frame, x0, y1 - t, x1, y1);
    fill(frame, x0, y0, x0 + t, y1);
    fill(frame, x1 - t, y0, x1, y1);
}

/// Fills `[x0, x1) x [y0, y1)`; the caller keeps it inside the frame.
fn fill(frame: &mut Frame, x0: i32, y0: i32, x1: i32, y1: i32) {
    let width = frame.width() as usize;
    let channels = frame.channels() as usize;
    let data = frame.data_mut();
    for y in y0.max(0) as usize..y1.max(0) as usize {
        for x in x0.max(0) as usize..x1.max(0) as usize {
            let offset = (y * width + x) * channels;
            data[offset..offset + 3].copy_from_slice(&REGION_COLOR);
        }
    }
}

/// Places `left` and `right` next to each other on a black canvas as tall
/// as the taller of the two, both top-aligned.
pub fn side_by_side(left: &Frame, right: &Frame) -> Frame {
    let width = left.width() + right.width();
    let height = left.height().max(right.height());
    let mut canvas = Frame::filled(width, height, [0, 0, 0], 0);

    blit(&mut canvas, left, 0);
    blit(&mut canvas, right, left.width() as usize);
    canvas
}

fn blit(canvas: &mut Frame, src: &Frame, x_offset: usize) {
    let canvas_row = canvas.width() as usize * 3;
    let src_row = src.width() as usize * 3;
    let data = canvas.data_mut();
    for (y, row) in src.data().chunks_exact(src_row.max(1)).enumerate() {
        let start = y * canvas_row + x_offset * 3;
        data[start..start + src_row].copy_from_slice(row);
    }
}

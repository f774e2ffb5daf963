mod canvas;
mod history;

pub use canvas::{Canvas, CanvasError, Rgba, INK_BLACK, INK_WHITE, SNAPSHOT_MIME};
pub use history::HistoryBuffer;

use crate::config::{DrawingOptions, ThemeName};
use crate::model::Template;

/// Freehand surface with pen tracking and linear undo/redo.
#[derive(Debug)]
pub struct DrawingPad {
    canvas: Canvas,
    history: HistoryBuffer,
    pen: Option<(i32, i32)>,
}

impl DrawingPad {
    pub fn new(options: &DrawingOptions) -> Self {
        let canvas = Canvas::new(options.width, options.height);
        let mut pad = Self {
            canvas,
            history: HistoryBuffer::new(options.history_capacity),
            pen: None,
        };
        pad.restart_history();
        pad
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn is_drawing(&self) -> bool {
        self.pen.is_some()
    }

    /// (Re)activates the surface at a new size. Undo history starts over from
    /// whatever the canvas shows after the resize.
    pub fn activate(&mut self, width: u32, height: u32) {
        self.resize(width, height);
        self.restart_history();
        tracing::debug!(width, height, "drawing surface activated");
    }

    /// Resizes and repaints the snapshot under the cursor; history is kept.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if width == self.canvas.width() && height == self.canvas.height() {
            return;
        }
        self.canvas.resize(width, height);
        self.pen = None;
        self.redraw();
    }

    pub fn pen_down(&mut self, x: i32, y: i32, ink: Rgba) {
        self.pen = Some((x, y));
        self.canvas.stroke((x, y), (x, y), ink);
    }

    pub fn pen_move(&mut self, x: i32, y: i32, ink: Rgba) {
        let Some(last) = self.pen else {
            return;
        };
        self.canvas.stroke(last, (x, y), ink);
        self.pen = Some((x, y));
    }

    /// Ends the stroke and records it as one undoable step.
    pub fn pen_up(&mut self) {
        if self.pen.take().is_none() {
            return;
        }
        self.snapshot();
    }

    /// Draws a full polyline as a single stroke.
    pub fn draw_polyline(&mut self, points: &[(i32, i32)], ink: Rgba) {
        let Some((&(x, y), rest)) = points.split_first() else {
            return;
        };
        self.pen_down(x, y, ink);
        for &(x, y) in rest {
            self.pen_move(x, y, ink);
        }
        self.pen_up();
    }

    pub fn snapshot(&mut self) {
        match self.canvas.to_data_uri() {
            Ok(snapshot) => self.history.push(snapshot),
            Err(err) => tracing::warn!(?err, "failed to snapshot canvas"),
        }
    }

    pub fn undo(&mut self) -> bool {
        if self.history.undo().is_none() {
            return false;
        }
        self.redraw();
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.history.redo().is_none() {
            return false;
        }
        self.redraw();
        true
    }

    /// Wipes the canvas. When `committing`, the wipe is not recorded as an
    /// undoable step.
    pub fn clear(&mut self, committing: bool) {
        self.canvas.clear();
        self.pen = None;
        if !committing {
            self.snapshot();
        }
    }

    /// Hands back the finished drawing and wipes the surface.
    pub fn commit(&mut self) -> Result<String, CanvasError> {
        let content = self.canvas.to_data_uri()?;
        self.clear(true);
        Ok(content)
    }

    fn restart_history(&mut self) {
        match self.canvas.to_data_uri() {
            Ok(snapshot) => self.history.initialize(snapshot),
            Err(err) => tracing::warn!(?err, "failed to snapshot canvas"),
        }
    }

    fn redraw(&mut self) {
        let Some(snapshot) = self.history.current() else {
            return;
        };
        self.canvas.clear();
        if let Err(err) = self.canvas.draw_data_uri(snapshot) {
            tracing::warn!(?err, "failed to redraw canvas snapshot");
        }
    }
}

/// White on the chalkboard template or a dark theme, black otherwise.
pub fn ink_for(template: Template, theme: ThemeName) -> Rgba {
    if matches!(template, Template::Chalkboard) || theme.is_dark() {
        INK_WHITE
    } else {
        INK_BLACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad() -> DrawingPad {
        DrawingPad::new(&DrawingOptions {
            history_capacity: 10,
            width: 16,
            height: 16,
        })
    }

    /// One short horizontal stroke per row, top to bottom.
    fn pad_with_strokes(count: i32) -> DrawingPad {
        let mut pad = pad();
        for row in 0..count {
            pad.draw_polyline(&[(1, row), (3, row)], INK_BLACK);
        }
        pad
    }

    #[test]
    fn undo_redo_moves_between_strokes() {
        let mut pad = pad();
        pad.draw_polyline(&[(1, 1), (5, 1)], INK_BLACK);
        pad.draw_polyline(&[(1, 10), (5, 10)], INK_BLACK);
        assert_eq!(pad.history().len(), 3);

        assert!(pad.undo());
        assert_eq!(pad.canvas().pixel(3, 10), Some([0, 0, 0, 0]));
        assert_eq!(pad.canvas().pixel(3, 1), Some(INK_BLACK));
        assert!(pad.undo());
        assert!(pad.canvas().is_blank());
        assert!(!pad.undo());

        assert!(pad.redo());
        assert!(pad.redo());
        assert_eq!(pad.canvas().pixel(3, 10), Some(INK_BLACK));
        assert!(!pad.redo());
    }

    #[test]
    fn full_undo_reaches_blank_only_within_capacity() {
        // Capacity 10 holds the blank snapshot plus nine strokes.
        let mut pad = pad_with_strokes(9);
        while pad.undo() {}
        assert!(pad.canvas().is_blank());

        let mut pad = pad_with_strokes(12);
        while pad.undo() {}
        assert!(!pad.canvas().is_blank());
        assert_eq!(pad.canvas().pixel(2, 2), Some(INK_BLACK));
        // The oldest kept snapshot is the one after the third stroke.
        assert_eq!(pad.canvas().pixel(2, 4), Some([0, 0, 0, 0]));
    }

    #[test]
    fn clear_is_undoable_unless_committing() -> anyhow::Result<()> {
        let mut pad = pad();
        pad.draw_polyline(&[(2, 2), (8, 8)], INK_BLACK);
        pad.clear(false);
        assert!(pad.canvas().is_blank());
        assert!(pad.undo());
        assert!(!pad.canvas().is_blank());

        let before = pad.history().len();
        let content = pad.commit()?;
        assert!(content.starts_with("data:image/png;base64,"));
        assert!(pad.canvas().is_blank());
        assert_eq!(pad.history().len(), before);
        Ok(())
    }

    #[test]
    fn activate_resets_history_but_resize_keeps_it() {
        let mut pad = pad();
        pad.draw_polyline(&[(2, 2), (4, 4)], INK_BLACK);
        pad.resize(20, 20);
        assert_eq!(pad.history().len(), 2);
        assert_eq!(pad.canvas().pixel(3, 3), Some(INK_BLACK));

        pad.activate(30, 30);
        assert_eq!(pad.history().len(), 1);
        assert_eq!(pad.canvas().width(), 30);
        assert_eq!(pad.canvas().pixel(3, 3), Some(INK_BLACK));
        assert!(!pad.undo());
    }

    #[test]
    fn pen_move_without_pen_down_is_ignored() {
        let mut pad = pad();
        pad.pen_move(3, 3, INK_BLACK);
        pad.pen_up();
        assert!(pad.canvas().is_blank());
        assert_eq!(pad.history().len(), 1);
    }

    #[test]
    fn ink_follows_template_and_theme() {
        assert_eq!(ink_for(Template::Basic, ThemeName::Light), INK_BLACK);
        assert_eq!(ink_for(Template::Chalkboard, ThemeName::Light), INK_WHITE);
        assert_eq!(ink_for(Template::Grid, ThemeName::Dark), INK_WHITE);
    }
}

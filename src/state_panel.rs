// src/state_panel.rs
//
// Left-edge panel listing one row per RSS state: calculation mode tag,
// distance, object name, a colored safety indicator, and compact glyphs
// for the unsafe directions.

use anyhow::Result;
use opencv::core::Mat;
use tracing::debug;

use crate::rss::{
    IndividualRssState, RssCalculationMode, OBJECT_ID_BORDER_LEFT, OBJECT_ID_BORDER_RIGHT,
};
use crate::surface::OverlaySurface;
use crate::world::{display_name, ActorRegistry, Color};

const PANEL_WIDTH: i32 = 220;
const ROW_HEIGHT: i32 = 14;
const HEADER_HEIGHT: i32 = 26;
const GLYPH_X_START: i32 = 184;
const GLYPH_ADVANCE: i32 = 14;

const WHITE: Color = Color::new(255, 255, 255);
const SAFE_GREEN: Color = Color::new(0, 255, 0);
const DANGER_RED: Color = Color::new(255, 0, 0);
const IRRELEVANT_GREY: Color = Color::new(128, 128, 128);

// Fixed glyph polygons, offsets relative to (x, row_top + 1).
const GLYPH_AHEAD: [(i32, i32); 7] =
    [(1, 4), (6, 0), (11, 4), (7, 4), (7, 12), (5, 12), (5, 4)];
const GLYPH_ONCOMING: [(i32, i32); 7] =
    [(2, 8), (6, 12), (10, 8), (7, 8), (7, 0), (5, 0), (5, 8)];
const GLYPH_RIGHT: [(i32, i32); 7] =
    [(0, 4), (8, 4), (8, 1), (12, 6), (8, 10), (8, 8), (0, 8)];
const GLYPH_LEFT: [(i32, i32); 7] =
    [(0, 6), (4, 1), (4, 4), (12, 4), (12, 8), (4, 8), (4, 10)];

pub struct StatePanel {
    display_height: i32,
    surface: Option<OverlaySurface>,
}

impl StatePanel {
    pub fn new(display_height: i32) -> Self {
        Self {
            display_height,
            surface: None,
        }
    }

    /// Rebuild the panel surface from the current snapshot.
    pub fn tick(&mut self, states: &[IndividualRssState], registry: &ActorRegistry) -> Result<()> {
        let mut surface = OverlaySurface::new(PANEL_WIDTH, self.display_height, 1.0)?;
        let mut v_offset = 0;

        if !states.is_empty() {
            surface.draw_text("RSS States:", 8, v_offset + 12, 0.45, WHITE)?;
            v_offset += HEADER_HEIGHT;
        }

        let mut shown = 0;
        for state in states {
            self.draw_row(&mut surface, state, registry, v_offset)?;
            shown += 1;
            v_offset += ROW_HEIGHT;
            if v_offset + ROW_HEIGHT > self.display_height {
                break;
            }
        }
        if shown < states.len() {
            debug!("state panel full, {} states not shown", states.len() - shown);
        }

        self.surface = Some(surface);
        Ok(())
    }

    fn draw_row(
        &self,
        surface: &mut OverlaySurface,
        state: &IndividualRssState,
        registry: &ActorRegistry,
        v_offset: i32,
    ) -> Result<()> {
        let object_name = object_name(state, registry);

        let item = format!(
            "{:>4} {:>3.0}m {:>8}",
            state.calculation_mode.panel_char(),
            state.distance,
            object_name
        );
        surface.draw_text(&item, 5, v_offset + 11, 0.35, WHITE)?;

        let indicator = if !state.calculation_mode.is_relevant() {
            IRRELEVANT_GREY
        } else if state.is_dangerous {
            DANGER_RED
        } else {
            SAFE_GREEN
        };
        surface.draw_circle(12, v_offset + 7, 5, indicator)?;

        let mut x = GLYPH_X_START;
        match state.calculation_mode {
            RssCalculationMode::Structured => {
                if !state.longitudinal.is_safe && state.longitudinal.evaluator.other_in_front() {
                    draw_glyph(surface, &GLYPH_AHEAD, x, v_offset)?;
                    x += GLYPH_ADVANCE;
                }
                if !state.longitudinal.is_safe && state.longitudinal.evaluator.opposite_direction()
                {
                    draw_glyph(surface, &GLYPH_ONCOMING, x, v_offset)?;
                    x += GLYPH_ADVANCE;
                }
                if !state.lateral_right.is_safe && state.lateral_right.evaluated {
                    draw_glyph(surface, &GLYPH_RIGHT, x, v_offset)?;
                    x += GLYPH_ADVANCE;
                }
                if !state.lateral_left.is_safe && state.lateral_left.evaluated {
                    draw_glyph(surface, &GLYPH_LEFT, x, v_offset)?;
                }
            }
            RssCalculationMode::Unstructured => {
                if let Some(tag) = state.unstructured.response.panel_char() {
                    surface.draw_text(tag, x + 8, v_offset + 11, 0.35, WHITE)?;
                }
            }
            RssCalculationMode::NotRelevant => {}
        }

        Ok(())
    }

    /// Composite the panel at the left edge, below `v_offset`.
    pub fn render(&self, display: &mut Mat, v_offset: i32) -> Result<()> {
        if let Some(surface) = &self.surface {
            surface.composite_onto(display, 0, v_offset)?;
        }
        Ok(())
    }
}

fn object_name(state: &IndividualRssState, registry: &ActorRegistry) -> String {
    match state.object_id {
        OBJECT_ID_BORDER_LEFT => "Border Left".to_string(),
        OBJECT_ID_BORDER_RIGHT => "Border Right".to_string(),
        id => registry
            .get(id)
            .map(|actor| display_name(&actor.type_id))
            .unwrap_or_else(|| "Obj".to_string()),
    }
}

fn draw_glyph(
    surface: &mut OverlaySurface,
    glyph: &[(i32, i32)],
    x: i32,
    row_top: i32,
) -> Result<()> {
    let points: Vec<(i32, i32)> = glyph
        .iter()
        .map(|&(dx, dy)| (x + dx, row_top + 1 + dy))
        .collect();
    surface.fill_pixel_polygon(&points, WHITE)
}

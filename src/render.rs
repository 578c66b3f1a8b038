// 🖌️ Render Coordinator - Cursor + selection → per-feature paint + info panel
//
// The only place where TimeCursor/SelectionState values turn into visual
// output. `render_frame` is a pure function of (atlas, year, selection); the
// coordinator just re-runs it on every change and hands the result to the
// render target. Same inputs, same frame.

use crate::atlas::AnomalyAtlas;
use crate::color::Color;
use crate::cursor::TimeCursor;
use crate::observable::SubscriptionId;
use crate::selection::SelectionState;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

pub const STROKE_WIDTH: f64 = 0.5;
pub const STROKE_WIDTH_DIMMED: f64 = 0.25;
pub const STROKE_WIDTH_SELECTED: f64 = 2.0;
pub const OPACITY_DIMMED: f64 = 0.3;

// ============================================================================
// RENDER OUTPUT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStyle {
    pub id: String,
    pub canonical: String,
    pub delta: Option<f64>,
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f64,
    pub opacity: f64,
}

/// Info-panel payload for the selected entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoPanel {
    pub name: String,
    pub year: i32,
    pub delta: Option<f64>,
    pub delta_text: String,
}

impl InfoPanel {
    pub fn has_data(&self) -> bool {
        self.delta.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub year: i32,
    pub selected: Option<String>,
    pub features: Vec<FeatureStyle>,
    pub info: Option<InfoPanel>,
}

impl Frame {
    pub fn feature(&self, id: &str) -> Option<&FeatureStyle> {
        self.features.iter().find(|f| f.id == id)
    }
}

/// Receiver of render commands
///
/// Implementations must not write the cursor or the selection from inside
/// `paint`/`show_info`.
pub trait RenderTarget {
    fn paint(&mut self, frame: &Frame);

    fn show_info(&mut self, info: Option<&InfoPanel>);
}

/// "+1.50°C", "-0.30°C", or "No data"
pub fn format_delta(delta: Option<f64>) -> String {
    match delta {
        Some(d) if d >= 0.0 => format!("+{:.2}°C", d.abs()),
        Some(d) => format!("{:.2}°C", d),
        None => "No data".to_string(),
    }
}

/// Compute the full frame for one (year, selection) pair
pub fn render_frame(atlas: &AnomalyAtlas, year: i32, selection: Option<&str>) -> Frame {
    let scale = atlas.scale();

    let features = atlas
        .features()
        .iter()
        .map(|resolved| {
            let delta = atlas.delta(&resolved.canonical, year);
            let fill = scale.color_or_no_data(delta);

            let (stroke, stroke_width, opacity) = match selection {
                None => (Color::STROKE, STROKE_WIDTH, 1.0),
                Some(selected) if selected == resolved.canonical => {
                    (Color::STROKE_SELECTED, STROKE_WIDTH_SELECTED, 1.0)
                }
                Some(_) => (Color::STROKE, STROKE_WIDTH_DIMMED, OPACITY_DIMMED),
            };

            FeatureStyle {
                id: resolved.feature.id.clone(),
                canonical: resolved.canonical.clone(),
                delta,
                fill,
                stroke,
                stroke_width,
                opacity,
            }
        })
        .collect();

    let info = selection.map(|name| {
        let delta = atlas.delta(name, year);
        InfoPanel {
            name: name.to_string(),
            year,
            delta,
            delta_text: format_delta(delta),
        }
    });

    Frame {
        year,
        selected: selection.map(str::to_string),
        features,
        info,
    }
}

// ============================================================================
// RENDER COORDINATOR
// ============================================================================

struct CoordinatorInner {
    atlas: Rc<AnomalyAtlas>,
    cursor: TimeCursor,
    selection: SelectionState,
    target: Rc<RefCell<dyn RenderTarget>>,
    last_frame: RefCell<Option<Frame>>,
    render_count: Cell<usize>,
}

impl CoordinatorInner {
    fn render(&self) -> Frame {
        let selected = self.selection.get();
        let frame = render_frame(&self.atlas, self.cursor.get(), selected.as_deref());

        {
            let mut target = self.target.borrow_mut();
            target.paint(&frame);
            target.show_info(frame.info.as_ref());
        }

        self.render_count.set(self.render_count.get() + 1);
        *self.last_frame.borrow_mut() = Some(frame.clone());
        frame
    }
}

pub struct RenderCoordinator {
    inner: Rc<CoordinatorInner>,
    cursor_subscription: SubscriptionId,
    selection_subscription: SubscriptionId,
}

impl RenderCoordinator {
    /// Subscribe to both states and paint the initial frame
    pub fn new(
        atlas: Rc<AnomalyAtlas>,
        cursor: TimeCursor,
        selection: SelectionState,
        target: Rc<RefCell<dyn RenderTarget>>,
    ) -> Self {
        let inner = Rc::new(CoordinatorInner {
            atlas,
            cursor: cursor.clone(),
            selection: selection.clone(),
            target,
            last_frame: RefCell::new(None),
            render_count: Cell::new(0),
        });

        let weak: Weak<CoordinatorInner> = Rc::downgrade(&inner);
        let cursor_subscription = cursor.subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.render();
            }
        });

        let weak: Weak<CoordinatorInner> = Rc::downgrade(&inner);
        let selection_subscription = selection.subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.render();
            }
        });

        inner.render();

        RenderCoordinator {
            inner,
            cursor_subscription,
            selection_subscription,
        }
    }

    /// Re-render with the current state
    pub fn render(&self) -> Frame {
        self.inner.render()
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.inner.last_frame.borrow().clone()
    }

    pub fn render_count(&self) -> usize {
        self.inner.render_count.get()
    }

    pub fn atlas(&self) -> &Rc<AnomalyAtlas> {
        &self.inner.atlas
    }
}

impl Drop for RenderCoordinator {
    fn drop(&mut self) {
        self.inner.cursor.unsubscribe(self.cursor_subscription);
        self.inner.selection.unsubscribe(self.selection_subscription);
    }
}

// ============================================================================
// TESTS
// ============================================================================

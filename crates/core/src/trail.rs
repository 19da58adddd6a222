//! Procedural trail geometry for one unit at a time.
//!
//! Layouts are a pure function of the unit, its position on the path and the
//! progression tags: the same inputs always produce the same coordinates and
//! path string, so renders are reproducible and snapshot-testable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::layout_math::{PathCommand, Point, catmull_rom_to_bezier, path_data, seeded_unit};
use crate::model::{NodeRef, PathSnapshot, Unit};
use crate::progression::{Emphasis, NodeState, NodeView, ProgressionReport};
use crate::settings::TrailSettings;

/// How far ahead of the completed progress the traveling highlight runs.
pub const PROGRESS_HEAD_LEAD: f64 = 0.08;

const SWING_FREQUENCY: f64 = 0.78;
const SWING_UNIT_PHASE: f64 = 0.24;
const TRACK_CENTER: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePosition {
    pub node: NodeRef,
    pub global_index: usize,
    /// Percent of the track width.
    pub x: f64,
    /// Track pixels from the top of the unit section.
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailLayout {
    pub unit_index: usize,
    pub start_offset: usize,
    pub positions: Vec<NodePosition>,
    pub path: Vec<PathCommand>,
    pub path_data: String,
    pub height: f64,
    pub unit_progress: f64,
    pub progress_head: f64,
    /// Whether the unit still holds an unlocked lesson to play.
    pub head_active: bool,
}

impl TrailLayout {
    fn empty(unit_index: usize, start_offset: usize) -> Self {
        Self {
            unit_index,
            start_offset,
            positions: Vec::new(),
            path: Vec::new(),
            path_data: String::new(),
            height: 0.0,
            unit_progress: 0.0,
            progress_head: 0.0,
            head_active: false,
        }
    }
}

/// Lays out one unit. `start_offset` is the number of nodes in the units
/// before it, so the serpentine continues across unit boundaries.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_layout(
    unit: &Unit,
    unit_index: usize,
    start_offset: usize,
    tags: &ProgressionReport,
    settings: &TrailSettings,
) -> TrailLayout {
    let nodes = unit.ordered_nodes();
    if nodes.is_empty() {
        return TrailLayout::empty(unit_index, start_offset);
    }

    let views: HashMap<&NodeRef, &NodeView> = tags
        .unit_views(unit_index)
        .map(|view| (&view.node, view))
        .collect();

    let mut positions = Vec::with_capacity(nodes.len());
    let mut y = settings.top_padding();
    for (i, node) in nodes.iter().enumerate() {
        let global_index = start_offset + i;
        let node_ref = node.node_ref();
        let view = views.get(&node_ref);

        if i > 0 {
            let jitter = seeded_unit(global_index, unit_index, settings.gap_salt());
            y += settings.base_step()
                + settings.gap_min()
                + (settings.gap_max() - settings.gap_min()) * jitter;
            if view.is_some_and(|v| v.emphasis == Emphasis::Milestone) {
                y += settings.milestone_extra_gap();
            }
        }

        let swing = ((global_index + 1) as f64 * SWING_FREQUENCY
            + unit_index as f64 * SWING_UNIT_PHASE)
            .sin()
            * settings.swing_amplitude();
        let jitter =
            (seeded_unit(global_index, unit_index, settings.x_salt()) * 2.0 - 1.0) * settings.x_jitter();
        let x = (TRACK_CENTER + swing + jitter).clamp(settings.x_min(), settings.x_max());

        positions.push(NodePosition {
            node: node_ref,
            global_index,
            x,
            y,
        });
    }

    let points: Vec<Point> = positions.iter().map(|p| Point::new(p.x, p.y)).collect();
    let path = catmull_rom_to_bezier(&points);
    let height = y + settings.bottom_padding();

    let states: Vec<NodeState> = positions
        .iter()
        .map(|p| views.get(&p.node).map_or(NodeState::Locked, |v| v.state))
        .collect();
    let sequential_index = states
        .iter()
        .take_while(|state| **state == NodeState::Completed)
        .count();
    let unit_progress = if states.len() <= 1 {
        0.0
    } else {
        (sequential_index as f64 / (states.len() - 1) as f64).min(1.0)
    };
    let head_active = positions.iter().zip(&states).any(|(p, state)| {
        matches!(p.node, NodeRef::Lesson(_))
            && matches!(state, NodeState::Current | NodeState::Available)
    });

    TrailLayout {
        unit_index,
        start_offset,
        path_data: path_data(&path),
        positions,
        path,
        height,
        unit_progress,
        progress_head: (unit_progress + PROGRESS_HEAD_LEAD).min(1.0),
        head_active,
    }
}

/// Lays out every unit of the path in traversal order.
#[must_use]
pub fn compute_path_layouts(
    snapshot: &PathSnapshot,
    tags: &ProgressionReport,
    settings: &TrailSettings,
) -> Vec<TrailLayout> {
    let mut offset = 0;
    snapshot
        .ordered_units()
        .into_iter()
        .enumerate()
        .map(|(unit_index, unit)| {
            let layout = compute_layout(unit, unit_index, offset, tags, settings);
            offset += unit.nodes.len();
            layout
        })
        .collect()
}

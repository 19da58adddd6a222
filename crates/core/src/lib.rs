#![forbid(unsafe_code)]

pub mod layout_math;
pub mod microcopy;
pub mod model;
pub mod overlay;
pub mod progression;
pub mod settings;
pub mod time;
pub mod tracker;
pub mod trail;

pub use microcopy::{Tone, compose_microcopy};
pub use overlay::CompletionOverlay;
pub use progression::{
    Emphasis, InvariantViolation, NodeState, NodeTags, NodeView, ProgressionReport,
    compute_node_states,
};
pub use settings::{RewardRules, SettingsError, TrailSettings};
pub use time::{Clock, CooldownGuard};
pub use tracker::{ActiveUnitTracker, LayoutClass, pick_active_unit};
pub use trail::{NodePosition, TrailLayout, compute_layout, compute_path_layouts};

//! Force-directed local link graph: layout simulation, interaction and SVG
//! rendering, plus the Leptos component that hosts it.

mod component;
mod controller;
mod convert;
mod dom;
mod highlight;
mod render;
/// Zoom limits, label opacity and the container view box.
pub mod scale;
mod simulation;
mod state;
mod ticker;
mod types;

pub use component::LocalGraph;
pub use controller::{
	Controller, DragEvent, Disposer, GraphOptions, Subscription, Surface, TickEvent, WeakController,
	build_and_run,
};
pub use convert::{PageLinks, convert, to_title_lc};
pub use dom::{AnimationFrameTicker, SvgSurface};
pub use highlight::{base_style, hover_style};
pub use render::{EdgePath, EdgeView, Frame, NodeView, Scene, clip_edge};
pub use simulation::{
	LINK_DISTANCE, Pin, Point, REPEL_FORCE, SimNode, Simulation, SimulationParameters, SimulationState,
};
pub use state::{PinchState, ViewTransform};
pub use ticker::{FrameCallback, ManualTicker, Ticker};
pub use types::{GraphData, GraphLink, GraphNode, LinkData};

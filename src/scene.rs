//! Scene-graph side of the embedding.
//!
//! A [`SceneItem`] is the node a host GUI places in its scene. It owns a
//! [`RenderWorker`](crate::worker::RenderWorker), forwards input to the engine
//! instance and receives frames through a [`TextureNode`].

mod dispatch;
mod host;
mod input;
mod item;
mod texture_node;

pub use dispatch::DispatchTimer;
pub use host::{HostWindow, RedrawSink, RenderableSurface};
pub use input::{InputTranslator, KeyEvent, Point, PointerButton, PointerEvent, WheelEvent};
pub use item::SceneItem;
pub use texture_node::TextureNode;

//! Ripple - reactive component runtime
//!
//! Components declare their state, derived values and a render function in
//! [`ComponentOptions`]. Every instance renders inside a watcher, so reading
//! state during render subscribes the instance to it and writes schedule a
//! re-render that is patched into the [`dom::Document`] on the next flush.
//!
//! ```ignore
//! let mut app = Ripple::new();
//! let counter = app.mount(
//!     ComponentOptions::new()
//!         .data(|| json!({ "count": 0 }))
//!         .render(|ctx| Ok(ctx.h("p", VNodeData::new(), vec![Child::text(&ctx.text_of("count"))]))),
//! )?;
//! counter.set("count", 1)?;
//! app.flush()?;
//! assert_eq!(app.html(), "<p>1</p>");
//! ```

pub mod component;
pub mod context;
pub mod error;
pub mod options;
pub mod runtime;

pub use component::{Component, WeakComponent};
pub use context::RenderContext;
pub use error::ComponentError;
pub use options::{ComponentOptions, ComputedDef, Lifecycle, WatchDef, WatchHandler};
pub use reactive::{delete, next_tick, set, watch};
pub use runtime::{Ripple, RippleBuilder, flush, observe, patch, watch_path};

/// Everything a component definition usually needs.
pub mod prelude {
    pub use crate::component::Component;
    pub use crate::context::RenderContext;
    pub use crate::options::{ComponentOptions, Lifecycle, WatchDef};
    pub use crate::runtime::Ripple;
    pub use reactive::{Getter, Value, WatchOptions};
    pub use vdom::{Child, DomEvent, NodeHandle, VNode, VNodeData};
}

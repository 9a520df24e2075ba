//! Mounting components into a document and driving their updates.
//!
//! [`Ripple`] owns the [`Document`], the [`Patcher`] writing into it and the
//! mounted root components. Hosts feed events in with
//! [`handle_event`](Ripple::handle_event) and call [`flush`](Ripple::flush)
//! (or await [`settle`](Ripple::settle)) to let queued re-renders run and ship
//! the resulting DOM updates to subscribed mirrors.

use crate::component::Component;
use crate::options::ComponentOptions;
use anyhow::Result;
use dom::{Document, DomUpdate};
use log::{debug, warn};
use reactive::{Config, Getter, Value, WatchHandle, WatchOptions, next_tick_future, run_until_idle, set_config, watch};
use std::rc::Rc;
use tokio::sync::broadcast;
use vdom::{DomEvent, Module, NodeHandle, NodeOps, PatchSource, Patcher, VNode, default_modules};

/// A document with the components mounted into it.
pub struct Ripple {
    document: Rc<Document>,
    patcher: Rc<Patcher>,
    updates: Option<broadcast::Sender<Vec<DomUpdate>>>,
    roots: Vec<Component>,
}

impl Default for Ripple {
    fn default() -> Self {
        Self::new()
    }
}

impl Ripple {
    /// Runtime over an empty document, without an update publisher.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        RippleBuilder::new().build()
    }

    #[inline]
    #[must_use]
    pub const fn builder() -> RippleBuilder {
        RippleBuilder::new()
    }

    #[inline]
    pub const fn document(&self) -> &Rc<Document> {
        &self.document
    }

    #[inline]
    pub const fn patcher(&self) -> &Rc<Patcher> {
        &self.patcher
    }

    /// Mounted root components, in mount order.
    #[inline]
    pub fn roots(&self) -> &[Component] {
        &self.roots
    }

    /// New receiver of the DOM update batches sent by [`flush`](Self::flush).
    ///
    /// `None` when the runtime was built without a publisher.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<Vec<DomUpdate>>> {
        self.updates.as_ref().map(broadcast::Sender::subscribe)
    }

    /// Instantiate `options` and mount it at the end of the document.
    ///
    /// # Errors
    /// Returns an error if the backend rejects the insertion or the first
    /// patch fails.
    pub fn mount(&mut self, options: ComponentOptions) -> Result<Component> {
        self.mount_component(Component::new(options))
    }

    /// Mount an already created root component at the end of the document.
    ///
    /// # Errors
    /// See [`mount`](Self::mount); also fails when `component` was mounted or
    /// destroyed before.
    pub fn mount_component(&mut self, component: Component) -> Result<Component> {
        let anchor = self.document.create_comment("");
        self.document.append_child(self.document.root(), anchor)?;
        let elm = component.mount(Rc::clone(&self.patcher), Some(anchor))?;
        debug!("Mounted {} at {elm:?}", component.name());
        self.roots.push(component.clone());
        Ok(component)
    }

    /// Destroy a mounted root and take its nodes out of the document.
    ///
    /// # Errors
    /// Returns an error if the backend fails to remove the root node.
    pub fn unmount(&mut self, component: &Component) -> Result<()> {
        self.roots.retain(|root| !root.ptr_eq(component));
        let elm = component.root_elm();
        component.destroy();
        if let Some(elm) = elm
            && let Some(parent) = self.document.parent_node(elm)
        {
            self.document.remove_child(parent, elm)?;
        }
        debug!("Unmounted {}", component.name());
        Ok(())
    }

    /// Dispatch an event named `name` at `node`, then flush.
    ///
    /// Returns how many listeners ran.
    ///
    /// # Errors
    /// See [`flush`](Self::flush).
    pub fn handle_event(&self, node: NodeHandle, name: &str) -> Result<usize> {
        self.dispatch(&DomEvent::new(name, node))
    }

    /// Dispatch `event` (bubbling to the document), then flush.
    ///
    /// # Errors
    /// See [`flush`](Self::flush).
    pub fn dispatch(&self, event: &DomEvent) -> Result<usize> {
        let handled = self.document.dispatch(event);
        self.flush()?;
        Ok(handled)
    }

    /// Run every pending tick and re-render, then publish the DOM updates.
    ///
    /// Returns the number of updates published.
    ///
    /// # Errors
    /// Fails when a document supplied with its own publisher has lost every
    /// receiver.
    pub fn flush(&self) -> Result<usize> {
        run_until_idle();
        self.publish()
    }

    /// Async form of [`flush`](Self::flush) resolving after the next tick.
    ///
    /// # Errors
    /// Fails when the tick was dropped without running or publishing fails.
    pub async fn settle(&self) -> Result<usize> {
        let ticked = next_tick_future();
        run_until_idle();
        ticked.await?;
        self.publish()
    }

    fn publish(&self) -> Result<usize> {
        match &self.updates {
            Some(sender) if sender.receiver_count() == 0 => Ok(self.document.take_updates().len()),
            Some(_) | None => self.document.publish(),
        }
    }

    /// Serialized HTML of everything mounted so far.
    pub fn html(&self) -> String {
        self.document.to_html(self.document.root())
    }
}

/// Builder for creating a [`Ripple`] runtime
pub struct RippleBuilder {
    document: Option<Document>,
    publisher_capacity: Option<usize>,
    modules: Option<Vec<Box<dyn Module>>>,
    config: Option<Config>,
}

impl Default for RippleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RippleBuilder {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            document: None,
            publisher_capacity: None,
            modules: None,
            config: None,
        }
    }

    /// Mount into `document` instead of a fresh one.
    ///
    /// A document built with its own publisher keeps it; see
    /// [`publisher`](Self::publisher) for the alternative.
    #[inline]
    #[must_use]
    pub fn document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    /// Broadcast DOM update batches on flush, buffering up to `capacity`
    /// batches per subscriber.
    #[inline]
    #[must_use]
    pub const fn publisher(mut self, capacity: usize) -> Self {
        self.publisher_capacity = Some(capacity);
        self
    }

    /// Patch with `modules` instead of the default set.
    #[inline]
    #[must_use]
    pub fn modules(mut self, modules: Vec<Box<dyn Module>>) -> Self {
        self.modules = Some(modules);
        self
    }

    /// Install `config` for this thread when the runtime is built.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the runtime
    #[must_use]
    pub fn build(self) -> Ripple {
        if let Some(config) = self.config {
            let _previous = set_config(config);
        }
        let updates = self
            .publisher_capacity
            .map(|capacity| broadcast::channel(capacity.max(1)).0);
        let document = match (&updates, self.document) {
            (Some(sender), document) => {
                if document.is_some() {
                    warn!("Replacing the supplied document to attach the update publisher");
                }
                Document::with_publisher(sender.clone())
            }
            (None, document) => document.unwrap_or_default(),
        };
        let document = Rc::new(document);
        let ops: Rc<dyn NodeOps> = Rc::clone(&document) as Rc<dyn NodeOps>;
        let patcher = Patcher::with_modules(ops, self.modules.unwrap_or_else(default_modules));
        Ripple {
            document,
            patcher: Rc::new(patcher),
            updates,
            roots: Vec::new(),
        }
    }
}

/// Make `json` reactive and return the observed value.
pub fn observe(json: &serde_json::Value) -> Value {
    reactive::reactive(json)
}

/// Watch the dot-separated `expression` below `root`.
///
/// The watcher lives as long as the returned handle.
pub fn watch_path(
    root: &Value,
    expression: &str,
    callback: impl Fn(&Value, &Value) -> Result<()> + 'static,
    options: WatchOptions,
) -> WatchHandle {
    watch(Getter::path(root, expression), callback, options)
}

/// Patch `vnode` against `old` with `patcher`.
///
/// # Errors
/// See [`Patcher::patch`].
pub fn patch(patcher: &Patcher, old: Option<PatchSource<'_>>, vnode: Option<&mut VNode>) -> Result<Option<NodeHandle>> {
    patcher.patch(old, vnode)
}

/// Run the tick queue, and every flush it triggers, until nothing is left.
pub fn flush() {
    run_until_idle();
}

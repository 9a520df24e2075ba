use super::Module;
use crate::node::{VNode, VNodeKind};
use crate::ops::{DomEvent, EventHandler, NodeOps};
use core::cell::RefCell;
use log::trace;
use reactive::{ErrorScope, handle_error};
use smallvec::SmallVec;
use std::rc::{Rc, Weak};

/// A user event listener.
pub type Listener = Rc<dyn Fn(&DomEvent) -> anyhow::Result<()>>;

/// The single backend listener installed per element and event name.
///
/// Patches swap the listeners it forwards to instead of re-registering with
/// the backend.
pub struct Invoker {
    listeners: RefCell<Vec<Listener>>,
    scope: RefCell<Option<Weak<dyn ErrorScope>>>,
}

impl Invoker {
    fn new(listeners: Vec<Listener>, scope: Option<Weak<dyn ErrorScope>>) -> Rc<Self> {
        Rc::new(Self {
            listeners: RefCell::new(listeners),
            scope: RefCell::new(scope),
        })
    }

    fn handler(invoker: &Rc<Self>) -> EventHandler {
        let invoker = Rc::clone(invoker);
        Rc::new(move |event: &DomEvent| invoker.invoke(event))
    }

    fn invoke(&self, event: &DomEvent) {
        let listeners = self.listeners.borrow().clone();
        for listener in listeners {
            if let Err(err) = listener(event) {
                let scope = self.scope.borrow().as_ref().and_then(Weak::upgrade);
                handle_error(&err, scope.as_ref(), &format!("v-on handler \"{}\"", event.name));
            }
        }
    }
}

/// Keeps the element's listeners in sync with `data.on`.
///
/// Component placeholders are skipped; their `on` entries belong to the
/// component.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventsModule;

impl Module for EventsModule {
    fn name(&self) -> &'static str {
        "events"
    }

    fn create(&self, ops: &dyn NodeOps, vnode: &mut VNode) -> anyhow::Result<()> {
        update_listeners(ops, None, vnode)
    }

    fn update(&self, ops: &dyn NodeOps, old: &VNode, vnode: &mut VNode) -> anyhow::Result<()> {
        update_listeners(ops, Some(old), vnode)
    }
}

fn grouped(vnode: &VNode) -> SmallVec<(Rc<str>, Vec<Listener>), 2> {
    let mut groups: SmallVec<(Rc<str>, Vec<Listener>), 2> = SmallVec::new();
    for (name, listener) in &vnode.data.on {
        match groups.iter_mut().find(|(group, _)| group == name) {
            Some((_, listeners)) => listeners.push(Rc::clone(listener)),
            None => groups.push((Rc::clone(name), vec![Rc::clone(listener)])),
        }
    }
    groups
}

fn update_listeners(ops: &dyn NodeOps, old: Option<&VNode>, vnode: &mut VNode) -> anyhow::Result<()> {
    if vnode.kind == VNodeKind::Component {
        return Ok(());
    }
    let old_invokers = old.map(|previous| previous.data.invokers.as_slice()).unwrap_or_default();
    if old_invokers.is_empty() && vnode.data.on.is_empty() {
        return Ok(());
    }
    let Some(elm) = vnode.elm else {
        return Ok(());
    };
    let scope = vnode
        .context()
        .and_then(|context| context.error_scope())
        .map(|scope| Rc::downgrade(&scope));

    let mut invokers = SmallVec::new();
    for (name, listeners) in grouped(vnode) {
        let known = old_invokers.iter().find(|(event, _)| *event == name);
        let invoker = if let Some((_, invoker)) = known {
            *invoker.listeners.borrow_mut() = listeners;
            *invoker.scope.borrow_mut() = scope.clone();
            Rc::clone(invoker)
        } else {
            trace!("Listening for {name} on {elm:?}");
            let invoker = Invoker::new(listeners, scope.clone());
            ops.set_event_listener(elm, &name, Some(Invoker::handler(&invoker)))?;
            invoker
        };
        invokers.push((name, invoker));
    }
    for (name, _) in old_invokers {
        if !invokers.iter().any(|(event, _): &(Rc<str>, Rc<Invoker>)| event == name) {
            trace!("Dropping {name} listener on {elm:?}");
            ops.set_event_listener(elm, name, None)?;
        }
    }
    vnode.data.invokers = invokers;
    Ok(())
}

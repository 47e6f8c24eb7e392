use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

/// Identifier of a handler subscribed to an [`EventSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

type Handler<A> = Rc<dyn Fn(&A)>;

struct EventInner<A> {
    handlers: RefCell<Vec<(HandlerId, Handler<A>)>>,
    next_id: Cell<u64>,
}

/// A single-threaded multicast event.
///
/// Clones share the same handler list. Handlers run synchronously in
/// subscription order. A handler may subscribe or unsubscribe handlers
/// (itself included) while the event is being delivered; handlers removed
/// during delivery are not called afterwards, handlers added during delivery
/// are called from the next invocation on.
pub struct EventSource<A> {
    inner: Rc<EventInner<A>>,
}

impl<A> EventSource<A> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(EventInner {
                handlers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    pub fn subscribe(&self, handler: impl Fn(&A) + 'static) -> HandlerId {
        let id = HandlerId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner
            .handlers
            .borrow_mut()
            .push((id, Rc::new(handler)));
        id
    }

    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        unsubscribe(&self.inner, id)
    }

    pub fn invoke(&self, args: &A) {
        let snapshot: Vec<(HandlerId, Handler<A>)> = self.inner.handlers.borrow().clone();
        for (id, handler) in snapshot {
            let subscribed = self
                .inner
                .handlers
                .borrow()
                .iter()
                .any(|(current, _)| *current == id);
            if subscribed {
                handler(args);
            }
        }
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers.borrow().len()
    }

    pub fn downgrade(&self) -> WeakEventSource<A> {
        WeakEventSource {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

fn unsubscribe<A>(inner: &EventInner<A>, id: HandlerId) -> bool {
    let mut handlers = inner.handlers.borrow_mut();
    let before = handlers.len();
    handlers.retain(|(current, _)| *current != id);
    handlers.len() != before
}

impl<A> Clone for EventSource<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A> Default for EventSource<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for EventSource<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

/// Non-owning handle to an [`EventSource`], used to unsubscribe without
/// keeping the source alive.
pub struct WeakEventSource<A> {
    inner: Weak<EventInner<A>>,
}

impl<A> WeakEventSource<A> {
    pub fn upgrade(&self) -> Option<EventSource<A>> {
        self.inner.upgrade().map(|inner| EventSource { inner })
    }

    /// Returns `false` when the source is gone or the handler was not
    /// subscribed.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| unsubscribe(&inner, id))
    }
}

impl<A> Clone for WeakEventSource<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A> fmt::Debug for WeakEventSource<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEventSource")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

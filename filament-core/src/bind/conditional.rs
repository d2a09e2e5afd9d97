//! Conditional Controller
//!
//! Mounts one of two branches after an anchor depending on a boolean source.
//!
//! # States
//!
//! ```text
//!   unmounted ──true──▶ then ──false──▶ else (or unmounted)
//!                        │                ▲
//!                        └─false + leave──┤   then stays live while leaving
//!                                         │
//!                          true while leaving: rescue
//! ```
//!
//! Emissions are de-duplicated. Every transition first cancels an in-flight
//! enter and leave, so at most one of each runs per controller. Going to `false` with a
//! leave animation keeps the "then" content (and its bindings) live until the
//! animation finishes; the "else" branch mounts immediately beside it. Going
//! back to `true` before the leave finishes rescues the same "then" content
//! instead of building it again.
//!
//! The controller's mutable state lives in one [`ControllerState`] owned by
//! the binding. Factories and hooks run with no borrow held, so user code may
//! push to the condition from inside them.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::animate::Animation;
use crate::dom::Node;
use crate::reactive::Source;
use crate::result::{detach, insert_after, Region, RenderResult, Teardown};
use crate::task::{self, CancelToken};

type Factory = Rc<dyn Fn() -> RenderResult>;

/// Descriptor for a conditional text slot, built with [`when`].
#[derive(Clone)]
pub struct Conditional {
    condition: Rc<dyn Source<bool>>,
    then: Factory,
    otherwise: Option<Factory>,
    enter: Option<Animation>,
    leave: Option<Animation>,
}

/// Show `then` while `condition` is true.
pub fn when<S, F>(condition: S, then: F) -> Conditional
where
    S: Source<bool> + 'static,
    F: Fn() -> RenderResult + 'static,
{
    Conditional {
        condition: Rc::new(condition),
        then: Rc::new(then),
        otherwise: None,
        enter: None,
        leave: None,
    }
}

impl Conditional {
    /// Show `otherwise` while the condition is false.
    pub fn otherwise<F>(mut self, otherwise: F) -> Self
    where
        F: Fn() -> RenderResult + 'static,
    {
        self.otherwise = Some(Rc::new(otherwise));
        self
    }

    /// Animate newly mounted content.
    pub fn enter(mut self, animation: Animation) -> Self {
        self.enter = Some(animation);
        self
    }

    /// Animate "then" content out before removing it.
    pub fn leave(mut self, animation: Animation) -> Self {
        self.leave = Some(animation);
        self
    }

    /// The branch for the condition's current value, for string rendering.
    pub(crate) fn render_current(&self) -> Option<RenderResult> {
        match self.condition.current() {
            Some(true) => Some((self.then)()),
            Some(false) => self.otherwise.as_ref().map(|f| f()),
            None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Then,
    Else,
}

struct Mounted {
    branch: Branch,
    result: RenderResult,
}

struct Leaving {
    result: RenderResult,
    token: CancelToken,
}

pub(crate) struct ControllerState {
    anchor: Node,
    region: Region,
    last: Option<bool>,
    mounted: Option<Mounted>,
    leaving: Option<Leaving>,
    enter_token: Option<CancelToken>,
    disposed: bool,
}

impl ControllerState {
    /// Mounted content first (it sits right after the anchor), then leaving.
    fn sync_region(&self) {
        let roots = self
            .mounted
            .iter()
            .map(|m| &m.result)
            .chain(self.leaving.iter().map(|l| &l.result))
            .filter_map(RenderResult::as_root)
            .collect();
        self.region.replace(roots);
    }
}

fn remove(result: &RenderResult) {
    result.teardown().run();
    detach(&result.nodes());
}

fn first_element(result: &RenderResult) -> Option<Node> {
    result.nodes().into_iter().find(Node::is_element)
}

/// Attach `conditional` after `anchor`; returns the region it manages.
pub(crate) fn mount(anchor: &Node, conditional: &Conditional, teardown: &Teardown) -> Region {
    let region = Region::default();
    let state = Rc::new(RefCell::new(ControllerState {
        anchor: anchor.clone(),
        region: region.clone(),
        last: None,
        mounted: None,
        leaving: None,
        enter_token: None,
        disposed: false,
    }));

    // The observer owns the state: the binding stays live as long as its
    // subscription does, whether or not the teardown handle is kept.
    let observer = {
        let state = state.clone();
        let conditional = conditional.clone();
        move |&show: &bool| apply(&state, &conditional, show)
    };
    let subscription = conditional.condition.subscribe(Rc::new(observer));

    teardown.add(move || {
        subscription.unsubscribe();
        dispose(&state);
    });
    region
}

fn apply(state: &Rc<RefCell<ControllerState>>, conditional: &Conditional, show: bool) {
    let (previous, leaving) = {
        let mut s = state.borrow_mut();
        if s.disposed || s.last == Some(show) {
            return;
        }
        s.last = Some(show);
        if let Some(token) = s.enter_token.take() {
            token.cancel();
        }
        let leaving = s.leaving.take();
        if let Some(leaving) = &leaving {
            leaving.token.cancel();
        }
        (s.mounted.take(), leaving)
    };

    // Rescue: the leaving "then" content becomes the mounted branch again.
    if let (true, Some(rescued)) = (show, leaving.as_ref()) {
        tracing::debug!("conditional rescued mid-leave");
        if let Some(previous) = &previous {
            remove(&previous.result);
        }
        let result = rescued.result.clone();
        finish_mount(state, conditional, Branch::Then, result, false);
        return;
    }
    if let Some(leaving) = leaving {
        remove(&leaving.result);
    }

    let leave = match (&previous, &conditional.leave) {
        (Some(prev), Some(animation)) if !show && prev.branch == Branch::Then => {
            first_element(&prev.result).map(|element| (animation.clone(), element))
        }
        _ => None,
    };
    match (leave, previous) {
        (Some((animation, element)), Some(prev)) => start_leave(state, animation, element, prev.result),
        (_, Some(prev)) => remove(&prev.result),
        (_, None) => {}
    }

    let (branch, factory) = if show {
        (Branch::Then, Some(&conditional.then))
    } else {
        (Branch::Else, conditional.otherwise.as_ref())
    };
    match factory {
        Some(factory) => {
            let result = factory();
            finish_mount(state, conditional, branch, result, true);
        }
        None => state.borrow().sync_region(),
    }
}

/// Keep `result` live while `animation` runs, then remove it.
fn start_leave(
    state: &Rc<RefCell<ControllerState>>,
    animation: Animation,
    element: Node,
    result: RenderResult,
) {
    let weak: Weak<RefCell<ControllerState>> = Rc::downgrade(state);
    let token = task::spawn(move |id| async move {
        animation.run(&element).await;
        if let Some(state) = weak.upgrade() {
            finish_leave(&state, id);
        }
    });
    let mut s = state.borrow_mut();
    s.leaving = Some(Leaving { result, token });
    s.sync_region();
}

fn finish_leave(state: &Rc<RefCell<ControllerState>>, id: u64) {
    let finished = {
        let mut s = state.borrow_mut();
        let owned = s.leaving.as_ref().is_some_and(|l| l.token.id() == id);
        if owned {
            s.leaving.take()
        } else {
            None
        }
    };
    if let Some(leaving) = finished {
        remove(&leaving.result);
        state.borrow().sync_region();
    }
}

fn finish_mount(
    state: &Rc<RefCell<ControllerState>>,
    conditional: &Conditional,
    branch: Branch,
    result: RenderResult,
    insert: bool,
) {
    let anchor = {
        let mut s = state.borrow_mut();
        if let Some(token) = s.enter_token.take() {
            token.cancel();
        }
        s.mounted = Some(Mounted {
            branch,
            result: result.clone(),
        });
        s.sync_region();
        s.anchor.clone()
    };
    if insert {
        insert_after(&anchor, &result.nodes());
        result.flush_mount_hooks();
    }

    let Some(animation) = conditional.enter.clone() else {
        return;
    };
    let Some(element) = first_element(&result) else {
        return;
    };
    let token = task::spawn(move |_| async move { animation.run(&element).await });
    state.borrow_mut().enter_token = Some(token);
}

fn dispose(state: &Rc<RefCell<ControllerState>>) {
    let (mounted, leaving, enter) = {
        let mut s = state.borrow_mut();
        s.disposed = true;
        s.region.clear();
        (s.mounted.take(), s.leaving.take(), s.enter_token.take())
    };
    if let Some(token) = enter {
        token.cancel();
    }
    if let Some(leaving) = leaving {
        leaving.token.cancel();
        remove(&leaving.result);
    }
    if let Some(mounted) = mounted {
        remove(&mounted.result);
    }
}

// ---- Tests ----

//! Keyed List Reconciler
//!
//! Renders one view per item of a sequence source, keyed by a caller-supplied
//! key function. Every emission is the full sequence; the reconciler works
//! out what changed.
//!
//! # How Reconciliation Works
//!
//! For each item, in order:
//!
//! - key is **leaving**: cancel its leave animation and move it back to the
//!   active set (resurrection), then push the item into its live value
//! - key is **active**: push the item into its live value; the view and its
//!   nodes are reused
//! - key is **new**: call the factory with a fresh [`LiveValue`]
//!
//! Active keys missing from the sequence leave: with a leave animation they
//! stay in the document until it finishes, otherwise they are torn down and
//! detached at once. Finally every active view's nodes are placed after the
//! anchor in sequence order. Nodes already in place are not touched, and
//! leaving nodes are stepped over, so they animate where they stood. New
//! views then get their enter animation.
//!
//! Duplicate keys within one emission keep the first occurrence.
//!
//! The active and leaving maps live in one [`ListState`] per binding. Item
//! pushes and factory calls happen with no borrow held.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::animate::Animation;
use crate::dom::{Node, NodeId};
use crate::reactive::{LiveValue, Source};
use crate::result::{detach, Region, RenderResult, Teardown};
use crate::task::{self, CancelToken};

/// Type-erased list binding, so [`KeyedList`] needs no type parameters.
trait ListDriver {
    fn mount(&self, anchor: &Node, animations: &Animations, teardown: &Teardown) -> Region;
    fn render_current(&self) -> Option<Vec<RenderResult>>;
}

#[derive(Clone, Default)]
struct Animations {
    enter: Option<Animation>,
    leave: Option<Animation>,
}

/// Descriptor for a keyed list text slot, built with [`each`].
#[derive(Clone)]
pub struct KeyedList {
    driver: Rc<dyn ListDriver>,
    animations: Animations,
}

/// Render one view per item of `items`, keyed by `key`.
///
/// `render` receives a [`LiveValue`] holding the item; later emissions with
/// the same key push into it instead of calling `render` again.
pub fn each<T, K, S, KF, RF>(items: S, key: KF, render: RF) -> KeyedList
where
    T: Clone + 'static,
    K: Eq + Hash + Clone + Debug + 'static,
    S: Source<Vec<T>> + 'static,
    KF: Fn(&T) -> K + 'static,
    RF: Fn(LiveValue<T>) -> RenderResult + 'static,
{
    KeyedList {
        driver: Rc::new(Driver {
            items: Rc::new(items),
            key: Rc::new(key),
            render: Rc::new(render),
        }),
        animations: Animations::default(),
    }
}

impl KeyedList {
    /// Animate newly created views.
    pub fn enter(mut self, animation: Animation) -> Self {
        self.animations.enter = Some(animation);
        self
    }

    /// Animate removed views before detaching them.
    pub fn leave(mut self, animation: Animation) -> Self {
        self.animations.leave = Some(animation);
        self
    }

    pub(crate) fn mount(&self, anchor: &Node, teardown: &Teardown) -> Region {
        self.driver.mount(anchor, &self.animations, teardown)
    }

    /// One result per current item, for string rendering.
    pub(crate) fn render_current(&self) -> Option<Vec<RenderResult>> {
        self.driver.render_current()
    }
}

struct Driver<T: Clone + 'static, K> {
    items: Rc<dyn Source<Vec<T>>>,
    key: Rc<dyn Fn(&T) -> K>,
    render: Rc<dyn Fn(LiveValue<T>) -> RenderResult>,
}

struct View<T: Clone + 'static> {
    live: LiveValue<T>,
    result: RenderResult,
    enter: Option<CancelToken>,
}

impl<T: Clone + 'static> View<T> {
    /// Tear down, complete the live value, detach.
    fn destroy(self) {
        if let Some(token) = self.enter {
            token.cancel();
        }
        self.result.teardown().run();
        self.live.complete();
        detach(&self.result.nodes());
    }
}

struct Leaving<T: Clone + 'static> {
    view: View<T>,
    token: CancelToken,
}

/// Per-binding reconciler state.
pub(crate) struct ListState<T: Clone + 'static, K> {
    anchor: Node,
    region: Region,
    active: IndexMap<K, View<T>>,
    leaving: IndexMap<K, Leaving<T>>,
    disposed: bool,
}

impl<T, K> ListState<T, K>
where
    T: Clone + 'static,
    K: Eq + Hash + Clone + Debug + 'static,
{
    fn sync_region(&self) {
        let roots = self
            .active
            .values()
            .chain(self.leaving.values().map(|l| &l.view))
            .filter_map(|view| view.result.as_root())
            .collect();
        self.region.replace(roots);
    }
}

/// Where one key of a new emission comes from.
enum Next<T: Clone + 'static> {
    Kept(View<T>),
    Created,
}

impl<T, K> ListDriver for Driver<T, K>
where
    T: Clone + 'static,
    K: Eq + Hash + Clone + Debug + 'static,
{
    fn mount(&self, anchor: &Node, animations: &Animations, teardown: &Teardown) -> Region {
        let region = Region::default();
        let state = Rc::new(RefCell::new(ListState::<T, K> {
            anchor: anchor.clone(),
            region: region.clone(),
            active: IndexMap::new(),
            leaving: IndexMap::new(),
            disposed: false,
        }));

        let observer = {
            let state = state.clone();
            let key = self.key.clone();
            let render = self.render.clone();
            let animations = animations.clone();
            move |items: &Vec<T>| reconcile(&state, items, &*key, &*render, &animations)
        };
        let subscription = self.items.subscribe(Rc::new(observer));

        teardown.add(move || {
            subscription.unsubscribe();
            dispose(&state);
        });
        region
    }

    fn render_current(&self) -> Option<Vec<RenderResult>> {
        let items = self.items.current()?;
        let mut seen = HashSet::new();
        let results = items
            .into_iter()
            .filter(|item| seen.insert((self.key)(item)))
            .map(|item| (self.render)(LiveValue::new(item)))
            .collect();
        Some(results)
    }
}

fn reconcile<T, K>(
    state: &Rc<RefCell<ListState<T, K>>>,
    items: &[T],
    key_of: &dyn Fn(&T) -> K,
    render: &dyn Fn(LiveValue<T>) -> RenderResult,
    animations: &Animations,
) where
    T: Clone + 'static,
    K: Eq + Hash + Clone + Debug + 'static,
{
    // 1. Match keys against the current maps.
    let (order, removed) = {
        let mut s = state.borrow_mut();
        if s.disposed {
            return;
        }
        let mut order: IndexMap<K, Next<T>> = IndexMap::with_capacity(items.len());
        for item in items {
            let key = key_of(item);
            if order.contains_key(&key) {
                tracing::warn!(?key, "duplicate key in list emission; keeping the first");
                continue;
            }
            let next = if let Some(leaving) = s.leaving.shift_remove(&key) {
                tracing::debug!(?key, "resurrecting leaving view");
                leaving.token.cancel();
                Next::Kept(leaving.view)
            } else if let Some(view) = s.active.shift_remove(&key) {
                Next::Kept(view)
            } else {
                Next::Created
            };
            order.insert(key, next);
        }
        let removed: Vec<(K, View<T>)> = s.active.drain(..).collect();
        (order, removed)
    };

    // 2. Push values into kept views and build new ones.
    let mut active: IndexMap<K, View<T>> = IndexMap::with_capacity(order.len());
    let mut created = Vec::new();
    for (item, (key, next)) in dedup_items(items, key_of).zip(order) {
        let view = match next {
            Next::Kept(view) => {
                view.live.set(item.clone());
                view
            }
            Next::Created => {
                let live = LiveValue::new(item.clone());
                let result = render(live.clone());
                created.push(key.clone());
                View {
                    live,
                    result,
                    enter: None,
                }
            }
        };
        active.insert(key, view);
    }

    // 3. Retire views whose keys disappeared.
    let mut leaving = Vec::new();
    for (key, view) in removed {
        let element = animations
            .leave
            .as_ref()
            .and_then(|animation| Some((animation.clone(), first_element(&view.result)?)));
        match element {
            Some((animation, element)) => leaving.push((key, view, animation, element)),
            None => view.destroy(),
        }
    }

    let (anchor, skip) = {
        let mut s = state.borrow_mut();
        s.active = active;
        for (key, mut view, animation, element) in leaving {
            if let Some(token) = view.enter.take() {
                token.cancel();
            }
            let token = start_leave(state, key.clone(), animation, element);
            s.leaving.insert(key, Leaving { view, token });
        }
        s.sync_region();
        let skip: HashSet<NodeId> = s
            .leaving
            .values()
            .flat_map(|l| l.view.result.nodes())
            .map(|node| node.id())
            .collect();
        (s.anchor.clone(), skip)
    };

    // 4. Place active nodes after the anchor in order.
    let nodes: Vec<(K, Vec<Node>)> = state
        .borrow()
        .active
        .iter()
        .map(|(key, view)| (key.clone(), view.result.nodes()))
        .collect();
    place(&anchor, nodes.iter().flat_map(|(_, nodes)| nodes), &skip);

    // 5. Mount hooks and enter animations for new views.
    for key in created {
        let Some((result, enter)) = state.borrow().active.get(&key).map(|view| {
            let element = animations
                .enter
                .as_ref()
                .and_then(|animation| Some((animation.clone(), first_element(&view.result)?)));
            (view.result.clone(), element)
        }) else {
            continue;
        };
        result.flush_mount_hooks();
        if let Some((animation, element)) = enter {
            let token = task::spawn(move |_| async move { animation.run(&element).await });
            if let Some(view) = state.borrow_mut().active.get_mut(&key) {
                view.enter = Some(token);
            }
        }
    }
}

/// `items` with later duplicates of a key removed, matching the key order.
fn dedup_items<'a, T, K>(items: &'a [T], key_of: &'a dyn Fn(&T) -> K) -> impl Iterator<Item = &'a T>
where
    K: Eq + Hash,
{
    let mut seen = HashSet::new();
    items.iter().filter(move |item| seen.insert(key_of(item)))
}

/// Move `nodes` so they follow `anchor` in order, skipping over `skip`.
fn place<'a>(anchor: &Node, nodes: impl Iterator<Item = &'a Node>, skip: &HashSet<NodeId>) {
    let mut cursor = anchor.clone();
    for node in nodes {
        while let Some(next) = cursor.next_sibling() {
            if skip.contains(&next.id()) && !next.ptr_eq(node) {
                cursor = next;
            } else {
                break;
            }
        }
        let in_place = cursor.next_sibling().is_some_and(|next| next.ptr_eq(node));
        if !in_place && !cursor.insert_after(node) {
            tracing::debug!("list anchor is detached; nodes not placed");
            return;
        }
        cursor = node.clone();
    }
}

fn first_element(result: &RenderResult) -> Option<Node> {
    result.nodes().into_iter().find(Node::is_element)
}

fn start_leave<T, K>(
    state: &Rc<RefCell<ListState<T, K>>>,
    key: K,
    animation: Animation,
    element: Node,
) -> CancelToken
where
    T: Clone + 'static,
    K: Eq + Hash + Clone + Debug + 'static,
{
    let weak: Weak<RefCell<ListState<T, K>>> = Rc::downgrade(state);
    task::spawn(move |id| async move {
        animation.run(&element).await;
        if let Some(state) = weak.upgrade() {
            finish_leave(&state, &key, id);
        }
    })
}

/// Complete a leave, unless the key was resurrected or re-left since.
fn finish_leave<T, K>(state: &Rc<RefCell<ListState<T, K>>>, key: &K, id: u64)
where
    T: Clone + 'static,
    K: Eq + Hash + Clone + Debug + 'static,
{
    let finished = {
        let mut s = state.borrow_mut();
        let owned = s.leaving.get(key).is_some_and(|l| l.token.id() == id);
        if owned {
            let leaving = s.leaving.shift_remove(key);
            s.sync_region();
            leaving
        } else {
            None
        }
    };
    if let Some(leaving) = finished {
        leaving.view.destroy();
    }
}

fn dispose<T, K>(state: &Rc<RefCell<ListState<T, K>>>)
where
    T: Clone + 'static,
    K: Eq + Hash + Clone + Debug + 'static,
{
    let (active, leaving) = {
        let mut s = state.borrow_mut();
        s.disposed = true;
        s.region.clear();
        (
            std::mem::take(&mut s.active),
            std::mem::take(&mut s.leaving),
        )
    };
    for (_, view) in active {
        view.destroy();
    }
    for (_, leaving) in leaving {
        leaving.token.cancel();
        leaving.view.destroy();
    }
}

// ---- Tests ----

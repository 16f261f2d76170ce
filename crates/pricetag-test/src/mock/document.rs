//! In-memory page document.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::StreamExt;
use pricetag_core::page::{
    ElementSpec, FrameAccessError, FrameProbe, MutationBatch, MutationStream, NodeId,
    PageDocument,
};
use pricetag_core::{Error, Result};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use url::Url;

use super::selector::{SelectorList, SelectorTarget};

const ROOT: u64 = 0;
const HEAD: u64 = 1;
const BODY: u64 = 2;
const MUTATION_CAPACITY: usize = 1024;

/// How scripts inserted with [`PageDocument::insert_script`] behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptBehavior {
    /// Fire the load event after the delay.
    Load { delay: Duration },
    /// Fire the error event after the delay.
    Fail { delay: Duration },
    /// Never fire either event.
    Hang,
}

impl Default for ScriptBehavior {
    fn default() -> Self {
        Self::Load {
            delay: Duration::from_millis(100),
        }
    }
}

/// How a child frame attached to the document behaves.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBehavior {
    /// Delay before the load event; `None` for an already loaded frame.
    pub load_delay: Option<Duration>,
    /// Probe results in order; the last one repeats.
    pub probes: Vec<Result<FrameProbe, FrameAccessError>>,
}

impl FrameBehavior {
    /// A loaded frame whose container always measures `width` pixels.
    pub fn rendered(width: f64) -> Self {
        Self {
            load_delay: None,
            probes: vec![Ok(FrameProbe::Width(width))],
        }
    }

    /// A loaded frame from another origin.
    pub fn cross_origin() -> Self {
        Self {
            load_delay: None,
            probes: vec![Err(FrameAccessError::CrossOrigin)],
        }
    }

    /// Sets the probe sequence.
    pub fn with_probes(
        mut self,
        probes: impl IntoIterator<Item = Result<FrameProbe, FrameAccessError>>,
    ) -> Self {
        self.probes = probes.into_iter().collect();
        self
    }

    /// Delays the frame's load event.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }
}

type LoadHook = Arc<dyn Fn() + Send + Sync>;

struct FrameState {
    loaded: watch::Sender<bool>,
    probes: VecDeque<Result<FrameProbe, FrameAccessError>>,
    probe_calls: u32,
}

struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    style: Vec<(String, String)>,
    text: String,
    parent: Option<u64>,
    children: Vec<u64>,
    change_events: u32,
    read_only: bool,
    frame: Option<FrameState>,
}

impl Node {
    fn element(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attributes: Vec::new(),
            style: Vec::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
            change_events: 0,
            read_only: false,
            frame: None,
        }
    }
}

impl SelectorTarget for Node {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Default)]
struct Tree {
    nodes: HashMap<u64, Node>,
    next_id: u64,
    script_behavior: ScriptBehavior,
    scripts_inserted: u32,
    load_hooks: Vec<LoadHook>,
}

impl Tree {
    fn new() -> Self {
        let mut tree = Self {
            next_id: BODY + 1,
            ..Default::default()
        };

        tree.nodes.insert(ROOT, Node::element("html"));
        for (id, tag) in [(HEAD, "head"), (BODY, "body")] {
            let mut node = Node::element(tag);
            node.parent = Some(ROOT);
            tree.nodes.insert(id, node);
            if let Some(root) = tree.nodes.get_mut(&ROOT) {
                root.children.push(id);
            }
        }

        tree
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(&id.get())
            .ok_or_else(|| Error::node_detached().with_message(format!("unknown {id}")))
    }

    fn connected_node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        if !self.is_connected(id.get()) {
            return Err(Error::node_detached().with_message(format!("{id} is detached")));
        }
        self.nodes
            .get_mut(&id.get())
            .ok_or_else(|| Error::node_detached().with_message(format!("unknown {id}")))
    }

    fn is_connected(&self, mut id: u64) -> bool {
        loop {
            if id == ROOT {
                return true;
            }
            match self.nodes.get(&id).and_then(|node| node.parent) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    fn ancestors(&self, id: u64) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut current = self.nodes.get(&id).and_then(|node| node.parent);
        while let Some(parent) = current {
            let Some(node) = self.nodes.get(&parent) else {
                break;
            };
            out.push(node);
            current = node.parent;
        }
        out
    }

    fn document_order(&self) -> Vec<u64> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    fn select(&self, selector: &str) -> Vec<NodeId> {
        let Some(list) = SelectorList::parse(selector) else {
            return Vec::new();
        };

        self.document_order()
            .into_iter()
            .filter(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|node| list.matches(node, &self.ancestors(*id)))
            })
            .map(NodeId::new)
            .collect()
    }

    fn text_of(&self, id: u64) -> String {
        let Some(node) = self.nodes.get(&id) else {
            return String::new();
        };
        let mut text = node.text.clone();
        for child in &node.children {
            text.push_str(&self.text_of(*child));
        }
        text
    }

    fn build(&mut self, spec: &ElementSpec) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        let mut node = Node::element(&spec.tag);
        node.id = spec.id.clone();
        node.classes = spec.classes.clone();
        node.attributes = spec.attributes.clone();
        node.style = spec.style.as_deref().map(parse_style).unwrap_or_default();
        self.nodes.insert(id, node);

        for child in &spec.children {
            let child_id = self.build(child);
            self.link(id, child_id, None);
        }

        id
    }

    fn link(&mut self, parent: u64, child: u64, index: Option<usize>) {
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            match index {
                Some(index) if index <= node.children.len() => node.children.insert(index, child),
                _ => node.children.push(child),
            }
        }
    }

    fn detach(&mut self, id: u64) -> bool {
        let Some(parent) = self.nodes.get_mut(&id).and_then(|node| node.parent.take()) else {
            return false;
        };
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|child| *child != id);
        }
        true
    }
}

fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .map(|(name, value)| (name.trim().to_owned(), value.trim().to_owned()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

struct Shared {
    tree: Mutex<Tree>,
    mutations: broadcast::Sender<MutationBatch>,
}

/// In-memory [`PageDocument`] with an `html > (head, body)` skeleton.
///
/// Cloning yields another handle on the same document. Structural changes
/// and text replacement notify mutation subscribers; style changes do not.
#[derive(Clone)]
pub struct MemoryDocument {
    inner: Arc<Shared>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        let (mutations, _) = broadcast::channel(MUTATION_CAPACITY);
        Self {
            inner: Arc::new(Shared {
                tree: Mutex::new(Tree::new()),
                mutations,
            }),
        }
    }

    fn tree(&self) -> MutexGuard<'_, Tree> {
        self.inner.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        // No subscribers is fine.
        let _ = self.inner.mutations.send(MutationBatch::new(1));
    }

    /// Returns the body element.
    pub fn body(&self) -> NodeId {
        NodeId::new(BODY)
    }

    /// Returns the head element.
    pub fn head(&self) -> NodeId {
        NodeId::new(HEAD)
    }

    /// Appends `fragment` as the last child of `parent`.
    pub fn append(&self, parent: NodeId, fragment: &ElementSpec) -> Result<NodeId> {
        let id = {
            let mut tree = self.tree();
            tree.connected_node_mut(parent)?;
            let id = tree.build(fragment);
            tree.link(parent.get(), id, None);
            id
        };
        self.notify();
        Ok(NodeId::new(id))
    }

    /// Appends a fragment with text content to `parent`.
    pub fn append_text(
        &self,
        parent: NodeId,
        fragment: &ElementSpec,
        text: &str,
    ) -> Result<NodeId> {
        let id = self.append(parent, fragment)?;
        self.set_text_content(id, text)?;
        Ok(id)
    }

    /// Detaches the element from its parent.
    pub fn remove(&self, node: NodeId) -> bool {
        let removed = self.tree().detach(node.get());
        if removed {
            self.notify();
        }
        removed
    }

    /// Returns every connected element matching `selector`, in document order.
    pub fn query_all(&self, selector: &str) -> Vec<NodeId> {
        self.tree().select(selector)
    }

    /// Returns the number of connected elements matching `selector`.
    pub fn count(&self, selector: &str) -> usize {
        self.query_all(selector).len()
    }

    /// Returns the element's children.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree()
            .nodes
            .get(&node.get())
            .map(|node| node.children.iter().copied().map(NodeId::new).collect())
            .unwrap_or_default()
    }

    /// Returns the element's tag name.
    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.tree().node(node).ok().map(|node| node.tag.clone())
    }

    /// Returns the value of an attribute.
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let tree = self.tree();
        let node = tree.node(node).ok()?;
        SelectorTarget::attribute(node, name).map(str::to_owned)
    }

    /// Returns the value of an inline style property.
    pub fn style_property(&self, node: NodeId, name: &str) -> Option<String> {
        let tree = self.tree();
        tree.node(node)
            .ok()?
            .style
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    /// Returns how many change events were dispatched at the element.
    pub fn change_events(&self, node: NodeId) -> u32 {
        self.tree()
            .node(node)
            .map(|node| node.change_events)
            .unwrap_or_default()
    }

    /// Makes text writes to the element fail, as a frozen host node would.
    pub fn set_read_only(&self, node: NodeId, read_only: bool) {
        if let Some(node) = self.tree().nodes.get_mut(&node.get()) {
            node.read_only = read_only;
        }
    }

    /// Sets how scripts inserted from now on behave.
    pub fn set_script_behavior(&self, behavior: ScriptBehavior) {
        self.tree().script_behavior = behavior;
    }

    /// Registers a hook run when an inserted script loads.
    pub fn on_script_load(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.tree().load_hooks.push(Arc::new(hook));
    }

    /// Returns how many scripts were inserted through [`PageDocument::insert_script`].
    pub fn scripts_inserted(&self) -> u32 {
        self.tree().scripts_inserted
    }

    /// Adds a script element without loading it, as another page actor would.
    pub fn add_foreign_script(&self, src: &str) -> Result<NodeId> {
        let script = ElementSpec::new("script").with_attribute("src", src);
        self.append(self.head(), &script)
    }

    /// Appends a child frame to `parent`.
    pub fn attach_frame(&self, parent: NodeId, behavior: FrameBehavior) -> Result<NodeId> {
        let frame = self.append(parent, &ElementSpec::new("iframe"))?;
        let (loaded, _) = watch::channel(behavior.load_delay.is_none());

        if let Some(node) = self.tree().nodes.get_mut(&frame.get()) {
            node.frame = Some(FrameState {
                loaded,
                probes: behavior.probes.into(),
                probe_calls: 0,
            });
        }

        if let Some(delay) = behavior.load_delay {
            let document = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                document.complete_frame(frame);
            });
        }

        Ok(frame)
    }

    /// Fires the frame's load event.
    pub fn complete_frame(&self, frame: NodeId) {
        if let Some(state) = self
            .tree()
            .nodes
            .get_mut(&frame.get())
            .and_then(|node| node.frame.as_mut())
        {
            state.loaded.send_replace(true);
        }
    }

    /// Replaces the frame's remaining probe results.
    pub fn set_frame_probes(
        &self,
        frame: NodeId,
        probes: impl IntoIterator<Item = Result<FrameProbe, FrameAccessError>>,
    ) {
        if let Some(state) = self
            .tree()
            .nodes
            .get_mut(&frame.get())
            .and_then(|node| node.frame.as_mut())
        {
            state.probes = probes.into_iter().collect();
        }
    }

    /// Returns how many times the frame was probed.
    pub fn probe_calls(&self, frame: NodeId) -> u32 {
        self.tree()
            .nodes
            .get(&frame.get())
            .and_then(|node| node.frame.as_ref())
            .map(|state| state.probe_calls)
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl PageDocument for MemoryDocument {
    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        self.tree().select(selector).into_iter().next()
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.tree().is_connected(node.get())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        let tree = self.tree();
        tree.node(node).ok()?.parent.map(NodeId::new)
    }

    fn text_content(&self, node: NodeId) -> Option<String> {
        let tree = self.tree();
        tree.node(node).ok()?;
        Some(tree.text_of(node.get()))
    }

    fn set_text_content(&self, node: NodeId, text: &str) -> Result<()> {
        {
            let mut tree = self.tree();
            if tree.connected_node_mut(node)?.read_only {
                return Err(Error::internal().with_message("element is read-only"));
            }
            let children = std::mem::take(&mut tree.connected_node_mut(node)?.children);
            for child in children {
                if let Some(child) = tree.nodes.get_mut(&child) {
                    child.parent = None;
                }
            }
            tree.connected_node_mut(node)?.text = text.to_owned();
        }
        self.notify();
        Ok(())
    }

    fn dispatch_change(&self, node: NodeId) -> Result<()> {
        let mut tree = self.tree();
        let node = tree.connected_node_mut(node)?;
        node.change_events = node.change_events.saturating_add(1);
        Ok(())
    }

    fn set_style_property(&self, node: NodeId, name: &str, value: &str) -> Result<()> {
        let mut tree = self.tree();
        let node = tree.connected_node_mut(node)?;
        match node.style.iter_mut().find(|(key, _)| key == name) {
            Some((_, current)) => *current = value.to_owned(),
            None => node.style.push((name.to_owned(), value.to_owned())),
        }
        Ok(())
    }

    fn insert_after(&self, anchor: NodeId, fragment: &ElementSpec) -> Result<NodeId> {
        let id = {
            let mut tree = self.tree();
            tree.connected_node_mut(anchor)?;
            let parent = tree
                .node(anchor)?
                .parent
                .ok_or_else(|| Error::node_detached().with_message("anchor has no parent"))?;
            let index = tree
                .nodes
                .get(&parent)
                .and_then(|node| node.children.iter().position(|c| *c == anchor.get()))
                .map(|position| position + 1);
            let id = tree.build(fragment);
            tree.link(parent, id, index);
            id
        };
        self.notify();
        Ok(NodeId::new(id))
    }

    fn append_child(&self, parent: NodeId, fragment: &ElementSpec) -> Result<NodeId> {
        self.append(parent, fragment)
    }

    fn append_to_body(&self, fragment: &ElementSpec) -> Result<NodeId> {
        self.append(self.body(), fragment)
    }

    fn has_script(&self, src: &Url) -> bool {
        let tree = self.tree();
        tree.select("script").into_iter().any(|script| {
            tree.node(script)
                .ok()
                .and_then(|node| SelectorTarget::attribute(node, "src"))
                == Some(src.as_str())
        })
    }

    async fn insert_script(&self, src: &Url) -> Result<()> {
        let (behavior, hooks) = {
            let mut tree = self.tree();
            let script = ElementSpec::new("script")
                .with_attribute("src", src.as_str())
                .with_attribute("async", "");
            let id = tree.build(&script);

            let first = tree.select("script").into_iter().next();
            let placement = first.and_then(|first| {
                let parent = tree.node(first).ok()?.parent?;
                let index = tree
                    .nodes
                    .get(&parent)?
                    .children
                    .iter()
                    .position(|c| *c == first.get())?;
                Some((parent, index))
            });
            match placement {
                Some((parent, index)) => tree.link(parent, id, Some(index)),
                None => tree.link(HEAD, id, None),
            }

            tree.scripts_inserted = tree.scripts_inserted.saturating_add(1);
            (tree.script_behavior, tree.load_hooks.clone())
        };
        self.notify();

        match behavior {
            ScriptBehavior::Load { delay } => {
                tokio::time::sleep(delay).await;
                for hook in hooks {
                    hook();
                }
                Ok(())
            }
            ScriptBehavior::Fail { delay } => {
                tokio::time::sleep(delay).await;
                Err(Error::script_load().with_message(format!("failed to load {src}")))
            }
            ScriptBehavior::Hang => std::future::pending().await,
        }
    }

    fn frame_is_complete(&self, frame: NodeId) -> bool {
        self.tree()
            .nodes
            .get(&frame.get())
            .and_then(|node| node.frame.as_ref())
            .is_none_or(|state| *state.loaded.borrow())
    }

    async fn frame_loaded(&self, frame: NodeId) {
        let receiver = self
            .tree()
            .nodes
            .get(&frame.get())
            .and_then(|node| node.frame.as_ref())
            .map(|state| state.loaded.subscribe());

        if let Some(mut receiver) = receiver {
            let _ = receiver.wait_for(|loaded| *loaded).await;
        }
    }

    fn probe_frame(&self, frame: NodeId) -> Result<FrameProbe, FrameAccessError> {
        let mut tree = self.tree();
        if !tree.is_connected(frame.get()) {
            return Ok(FrameProbe::NoDocument);
        }

        let state = tree
            .nodes
            .get_mut(&frame.get())
            .and_then(|node| node.frame.as_mut())
            .ok_or_else(|| FrameAccessError::Transient("element is not a frame".into()))?;

        state.probe_calls = state.probe_calls.saturating_add(1);
        if state.probes.len() > 1 {
            state
                .probes
                .pop_front()
                .unwrap_or(Ok(FrameProbe::NoDocument))
        } else {
            state.probes.front().cloned().unwrap_or(Ok(FrameProbe::NoDocument))
        }
    }

    fn observe_mutations(&self) -> MutationStream {
        let receiver = self.inner.mutations.subscribe();
        Box::pin(BroadcastStream::new(receiver).map(|delivery| match delivery {
            Ok(batch) => batch,
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                MutationBatch::new(usize::try_from(missed).unwrap_or(usize::MAX))
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price_box(doc: &MemoryDocument) -> NodeId {
        doc.append(
            doc.body(),
            &ElementSpec::new("div").with_class("price-box"),
        )
        .unwrap()
    }

    #[test]
    fn test_insert_after_places_next_sibling() {
        let doc = MemoryDocument::new();
        let first = price_box(&doc);
        let last = doc.append(doc.body(), &ElementSpec::new("footer")).unwrap();

        let wrapper = doc
            .insert_after(first, &ElementSpec::new("div").with_id("wrap"))
            .unwrap();

        assert_eq!(doc.children(doc.body()), vec![first, wrapper, last]);
        assert_eq!(doc.query_selector("#wrap"), Some(wrapper));
        assert_eq!(doc.parent(wrapper), Some(doc.body()));
    }

    #[test]
    fn test_detached_nodes_are_not_queryable() {
        let doc = MemoryDocument::new();
        let anchor = price_box(&doc);
        let child = doc.append(anchor, &ElementSpec::new("span")).unwrap();

        assert!(doc.remove(anchor));
        assert!(!doc.is_connected(child));
        assert_eq!(doc.query_selector(".price-box span"), None);
        assert!(doc.set_text_content(child, "x").is_err());
        assert!(!doc.remove(anchor));
    }

    #[test]
    fn test_text_content_replaces_children() {
        let doc = MemoryDocument::new();
        let anchor = price_box(&doc);
        doc.append_text(anchor, &ElementSpec::new("span"), "1.234")
            .unwrap();
        doc.append_text(anchor, &ElementSpec::new("span"), ",56 kr.")
            .unwrap();

        assert_eq!(doc.text_content(anchor).as_deref(), Some("1.234,56 kr."));

        doc.set_text_content(anchor, "99").unwrap();
        assert_eq!(doc.text_content(anchor).as_deref(), Some("99"));
        assert!(doc.children(anchor).is_empty());
    }

    #[test]
    fn test_style_properties_merge() {
        let doc = MemoryDocument::new();
        let node = doc
            .append(
                doc.body(),
                &ElementSpec::new("div").with_style("display:flex; margin-top:5px;"),
            )
            .unwrap();

        doc.set_style_property(node, "width", "120px").unwrap();
        doc.set_style_property(node, "display", "block").unwrap();

        assert_eq!(doc.style_property(node, "display").as_deref(), Some("block"));
        assert_eq!(doc.style_property(node, "margin-top").as_deref(), Some("5px"));
        assert_eq!(doc.style_property(node, "width").as_deref(), Some("120px"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_inserted_before_first_script() {
        let doc = MemoryDocument::new();
        let existing = doc.add_foreign_script("https://cdn.example/app.js").unwrap();
        let src = Url::parse("https://pricetag.viabill.com/script/abc").unwrap();

        assert!(!doc.has_script(&src));
        doc.insert_script(&src).await.unwrap();

        assert!(doc.has_script(&src));
        assert_eq!(doc.scripts_inserted(), 1);
        let scripts = doc.query_all("script");
        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[1], existing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_failure_and_load_hooks() {
        let doc = MemoryDocument::new();
        let loaded = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = loaded.clone();
        doc.on_script_load(move || flag.store(true, std::sync::atomic::Ordering::SeqCst));

        let src = Url::parse("https://pricetag.viabill.com/script/abc").unwrap();
        doc.insert_script(&src).await.unwrap();
        assert!(loaded.load(std::sync::atomic::Ordering::SeqCst));

        doc.set_script_behavior(ScriptBehavior::Fail {
            delay: Duration::from_millis(10),
        });
        let error = doc.insert_script(&src).await.unwrap_err();
        assert_eq!(error.kind(), pricetag_core::ErrorKind::ScriptLoad);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_load_and_probe_sequence() {
        let doc = MemoryDocument::new();
        let marker = price_box(&doc);
        let frame = doc
            .attach_frame(
                marker,
                FrameBehavior::rendered(180.0)
                    .with_probes([Ok(FrameProbe::NoContainer), Ok(FrameProbe::Width(180.0))])
                    .with_load_delay(Duration::from_millis(500)),
            )
            .unwrap();

        assert!(!doc.frame_is_complete(frame));
        doc.frame_loaded(frame).await;
        assert!(doc.frame_is_complete(frame));

        assert_eq!(doc.probe_frame(frame), Ok(FrameProbe::NoContainer));
        assert_eq!(doc.probe_frame(frame), Ok(FrameProbe::Width(180.0)));
        assert_eq!(doc.probe_frame(frame), Ok(FrameProbe::Width(180.0)));
        assert_eq!(doc.probe_calls(frame), 3);
    }

    #[tokio::test]
    async fn test_mutations_are_broadcast() {
        let doc = MemoryDocument::new();
        let mut mutations = doc.observe_mutations();

        let anchor = price_box(&doc);
        doc.remove(anchor);

        assert_eq!(mutations.next().await, Some(MutationBatch::new(1)));
        assert_eq!(mutations.next().await, Some(MutationBatch::new(1)));
    }
}

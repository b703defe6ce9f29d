//! Compiled scenes.
//!
//! A [`Scene`] is an arena of nodes produced by [`compile`] from a parsed
//! `.lml` document. Nodes are addressed by [`NodeHandle`]s that carry the
//! scene's id, so a handle kept across a scene replacement is rejected
//! instead of silently pointing at an unrelated node.
//!
//! Painting walks the tree once per render pass, applies animations for the
//! pass timestamp, and records into a [`DrawList`].

mod animation;
mod compile;
mod props;

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use lumen_engine::coords::{PixelSize, Rect, Vec2};
use lumen_engine::scene::{Border, DrawCmd, DrawList, FrameCmd, QuadCmd, ZIndex};
use lumen_engine::time::ClockTime;
use lumen_markup::Value;

use crate::error::SceneError;

pub use animation::{AnimatedValue, Animation, Easing, Loops};
pub use compile::{compile, compile_source, ComponentRegistry};
pub use props::{value_to_color, NodeKind, NodeProps, Property};

// ── NodeHandle ────────────────────────────────────────────────────────────

/// Reference to a node of a specific compiled scene.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    scene: u64,
    index: u32,
}

impl NodeHandle {
    #[inline]
    pub fn scene_id(self) -> u64 {
        self.scene
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeHandle({}:{})", self.scene, self.index)
    }
}

// ── Scene ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub(crate) struct SceneNode {
    pub kind: NodeKind,
    pub children: Vec<usize>,
    pub props: NodeProps,
    pub animations: Vec<Animation>,
}

#[derive(Debug)]
pub struct Scene {
    id: u64,
    source: String,
    nodes: Vec<SceneNode>,
    root: Option<usize>,
}

impl Scene {
    pub(crate) fn new(nodes: Vec<SceneNode>, root: Option<usize>) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self { id: NEXT_ID.fetch_add(1, Ordering::Relaxed), source: String::new(), nodes, root }
    }

    pub(crate) fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Source text this scene was compiled from (empty for documents
    /// compiled directly).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> Option<NodeHandle> {
        self.root.map(|i| self.handle(i))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `true` when any node carries an animation.
    pub fn is_animated(&self) -> bool {
        self.nodes.iter().any(|n| !n.animations.is_empty())
    }

    /// First node whose `id` property equals `id`.
    pub fn find(&self, id: &str) -> Option<NodeHandle> {
        self.nodes
            .iter()
            .position(|n| n.props.id.as_deref() == Some(id))
            .map(|i| self.handle(i))
    }

    pub fn kind(&self, handle: NodeHandle) -> Result<NodeKind, SceneError> {
        Ok(self.node(handle)?.kind)
    }

    /// Base property values, before animation.
    pub fn props(&self, handle: NodeHandle) -> Result<&NodeProps, SceneError> {
        Ok(&self.node(handle)?.props)
    }

    pub fn children(&self, handle: NodeHandle) -> Result<Vec<NodeHandle>, SceneError> {
        Ok(self.node(handle)?.children.iter().map(|&i| self.handle(i)).collect())
    }

    /// Changes a node property at runtime. Validation matches compilation.
    pub fn set_property(
        &mut self,
        handle: NodeHandle,
        key: &str,
        value: &Value,
    ) -> Result<(), SceneError> {
        let index = self.index_of(handle)?;
        let node = &mut self.nodes[index];
        let prop = Property::from_key(key)
            .ok_or_else(|| SceneError::compile(format!("unknown property '{key}'")))?;
        if !node.kind.accepts(prop) {
            return Err(SceneError::compile(format!(
                "property '{key}' is not valid on {}",
                node.kind.element_name()
            )));
        }
        node.props.set(prop, value).map_err(SceneError::compile)?;
        log::debug!("scene {}: node {index} {key} = {value:?}", self.id);
        Ok(())
    }

    /// Records the scene at render time `t` for a `viewport`-sized target.
    pub fn paint(&self, t: ClockTime, viewport: PixelSize, list: &mut DrawList) {
        if let Some(root) = self.root {
            let bounds = Rect::from_origin_size(Vec2::ZERO, viewport.to_vec2());
            self.paint_node(root, t, bounds, 1.0, 0, true, list);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn paint_node(
        &self,
        index: usize,
        t: ClockTime,
        parent: Rect,
        parent_opacity: f32,
        parent_z: i32,
        is_root: bool,
        list: &mut DrawList,
    ) {
        let node = &self.nodes[index];
        let props: Cow<'_, NodeProps> = if node.animations.is_empty() {
            Cow::Borrowed(&node.props)
        } else {
            let mut animated = node.props.clone();
            for anim in &node.animations {
                anim.apply(t, &mut animated);
            }
            Cow::Owned(animated)
        };

        let opacity = parent_opacity * props.opacity;
        if !props.visible || opacity <= 0.0 {
            return;
        }

        let rect = if props.fill_parent {
            parent
        } else {
            // Only the root defaults to the parent's size.
            let fallback = |v: f32| if is_root { v } else { 0.0 };
            Rect::new(
                parent.origin.x + props.x,
                parent.origin.y + props.y,
                props.width.unwrap_or_else(|| fallback(parent.size.x)),
                props.height.unwrap_or_else(|| fallback(parent.size.y)),
            )
        };
        let z = ZIndex(parent_z.saturating_add(props.z));

        match node.kind {
            NodeKind::Item => {}
            NodeKind::Rectangle => list.push(z, shape(rect, props.radius, &props, opacity)),
            NodeKind::Circle => {
                let side = rect.size.min_component();
                let c = rect.center();
                let disc = Rect::new(c.x - side * 0.5, c.y - side * 0.5, side, side);
                list.push(z, shape(disc, side * 0.5, &props, opacity));
            }
            NodeKind::Video => list.push(z, DrawCmd::Frame(FrameCmd { rect, opacity })),
        }

        if node.children.is_empty() {
            return;
        }
        if props.clip {
            list.push_clip(rect);
        }
        for &child in &node.children {
            self.paint_node(child, t, rect, opacity, z.0, false, list);
        }
        if props.clip {
            list.pop_clip();
        }
    }

    fn handle(&self, index: usize) -> NodeHandle {
        NodeHandle { scene: self.id, index: index as u32 }
    }

    fn index_of(&self, handle: NodeHandle) -> Result<usize, SceneError> {
        let index = handle.index as usize;
        if handle.scene != self.id || index >= self.nodes.len() {
            return Err(SceneError::StaleHandle);
        }
        Ok(index)
    }

    fn node(&self, handle: NodeHandle) -> Result<&SceneNode, SceneError> {
        Ok(&self.nodes[self.index_of(handle)?])
    }
}

fn shape(rect: Rect, radius: f32, props: &NodeProps, opacity: f32) -> DrawCmd {
    let border = (props.border_width > 0.0).then(|| Border {
        width: props.border_width,
        color: props.border_color.scaled(opacity),
    });
    DrawCmd::Quad(QuadCmd { rect, color: props.color.scaled(opacity), radius, border })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_engine::paint::Color;

    fn scene(src: &str) -> Scene {
        compile_source(src, &ComponentRegistry::new()).unwrap()
    }

    fn paint(scene: &Scene, t: u64) -> DrawList {
        let mut list = DrawList::new();
        scene.paint(ClockTime::from_mseconds(t), PixelSize::new(100, 50), &mut list);
        list
    }

    #[test]
    fn root_fills_viewport() {
        let s = scene("Rectangle { color: 'red' }");
        let list = paint(&s, 0);
        assert_eq!(list.len(), 1);
        assert_eq!(list.items()[0].cmd.rect(), Rect::new(0.0, 0.0, 100.0, 50.0));
    }

    #[test]
    fn children_are_offset_by_parent() {
        let s = scene("Item { x: 10; y: 5  Rectangle { x: 2; y: 3; width: 4; height: 4 } }");
        let list = paint(&s, 0);
        assert_eq!(list.items()[0].cmd.rect(), Rect::new(12.0, 8.0, 4.0, 4.0));
    }

    #[test]
    fn fill_parent_and_video() {
        let s = scene("Item { Item { x: 10; width: 20; height: 20  VideoItem { fill: parent; opacity: 0.5 } } }");
        let list = paint(&s, 0);
        let DrawCmd::Frame(f) = &list.items()[0].cmd else { panic!("expected frame") };
        assert_eq!(f.rect, Rect::new(10.0, 0.0, 20.0, 20.0));
        assert_eq!(f.opacity, 0.5);
    }

    #[test]
    fn invisible_subtree_is_skipped() {
        let s = scene("Item { Rectangle { visible: false; width: 5; height: 5  Rectangle { width: 1; height: 1 } } }");
        assert!(paint(&s, 0).is_empty());
    }

    #[test]
    fn opacity_multiplies_down_the_tree() {
        let s = scene("Item { opacity: 0.5  Rectangle { width: 1; height: 1; color: 'white'; opacity: 0.5 } }");
        let list = paint(&s, 0);
        let DrawCmd::Quad(q) = &list.items()[0].cmd else { panic!("expected quad") };
        assert_eq!(q.color, Color::from_premul(0.25, 0.25, 0.25, 0.25));
    }

    #[test]
    fn circle_is_inscribed_square() {
        let s = scene("Item { Circle { width: 30; height: 10 } }");
        let list = paint(&s, 0);
        let DrawCmd::Quad(q) = &list.items()[0].cmd else { panic!("expected quad") };
        assert_eq!(q.rect, Rect::new(10.0, 0.0, 10.0, 10.0));
        assert_eq!(q.radius, 5.0);
    }

    #[test]
    fn clip_scopes_children() {
        let s = scene("Item { Item { clip: true; width: 10; height: 10  Rectangle { width: 50; height: 50 } } Rectangle { width: 1; height: 1 } }");
        let list = paint(&s, 0);
        assert_eq!(list.items()[0].clip_rect, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(list.items()[1].clip_rect, None);
    }

    #[test]
    fn z_orders_across_the_tree() {
        let s = scene("Item { Rectangle { id: top; z: 2; width: 1; height: 1 } Rectangle { id: bottom; width: 1; height: 1 } }");
        let mut list = paint(&s, 0);
        let keys: Vec<i32> = list.iter_in_paint_order().map(|i| i.key.z.0).collect();
        assert_eq!(keys, vec![0, 2]);
    }

    #[test]
    fn animation_follows_render_clock() {
        let s = scene(
            "Item { Rectangle { width: 10; height: 10 \
               NumberAnimation { property: 'x'; from: 0; to: 100; duration: 1000 } } }",
        );
        assert!(s.is_animated());
        assert_eq!(paint(&s, 250).items()[0].cmd.rect().origin.x, 25.0);
        assert_eq!(paint(&s, 250).items(), paint(&s, 250).items());
        assert_eq!(paint(&s, 4000).items()[0].cmd.rect().origin.x, 100.0);
    }

    #[test]
    fn set_property_updates_and_validates() {
        let mut s = scene("Item { Rectangle { id: badge; width: 1; height: 1 } }");
        let badge = s.find("badge").unwrap();
        s.set_property(badge, "width", &Value::Number(8.0)).unwrap();
        assert_eq!(s.props(badge).unwrap().width, Some(8.0));

        let err = s.set_property(badge, "width", &Value::Str("big".into())).unwrap_err();
        assert!(matches!(err, SceneError::CompileFailed { .. }));
        let root = s.root().unwrap();
        assert!(s.set_property(root, "color", &Value::Ident("red".into())).is_err());
    }

    #[test]
    fn handles_from_other_scenes_are_stale() {
        let a = scene("Item { }");
        let mut b = scene("Item { }");
        let old_root = a.root().unwrap();
        assert_eq!(b.kind(old_root), Err(SceneError::StaleHandle));
        assert_eq!(
            b.set_property(old_root, "x", &Value::Number(1.0)),
            Err(SceneError::StaleHandle)
        );
    }
}

use crate::coords::Rect;

use super::{DrawCmd, SortKey, ZIndex};

/// A single draw item: sort key + command + clip rect.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub key: SortKey,
    pub cmd: DrawCmd,
    /// Clip rect in pixels. `None` = no clipping.
    pub clip_rect: Option<Rect>,
}

/// Recorded draw stream for one render pass.
///
/// - `push()` is O(1)
/// - paint-order iteration reuses an internal index buffer
///
/// Use [`push_clip`](Self::push_clip) / [`pop_clip`](Self::pop_clip) to scope
/// commands to a clip rect; nested clips intersect with their parent.
#[derive(Debug, Default)]
pub struct DrawList {
    items: Vec<DrawItem>,
    next_order: u32,

    sorted_indices: Vec<usize>,
    sorted_dirty: bool,

    /// Top is the effective clip, already intersected with all parents.
    clip_stack: Vec<Rect>,
}

impl DrawList {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears items and the clip stack. Keeps capacity for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
        self.next_order = 0;
        self.sorted_dirty = true;
        self.sorted_indices.clear();
        self.clip_stack.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in insertion order.
    #[inline]
    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    /// Pushes a command; it inherits the current clip rect.
    #[inline]
    pub fn push(&mut self, z: ZIndex, cmd: DrawCmd) {
        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);

        self.items.push(DrawItem {
            key: SortKey::new(z, order),
            cmd,
            clip_rect: self.clip_stack.last().copied(),
        });
        self.sorted_dirty = true;
    }

    /// Begins a clip region. Must be balanced with [`pop_clip`](Self::pop_clip).
    #[inline]
    pub fn push_clip(&mut self, rect: Rect) {
        let effective = match self.clip_stack.last() {
            None => rect,
            // Disjoint clips collapse to zero area so backends skip the draws.
            Some(&parent) => parent.intersect(rect).unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0)),
        };
        self.clip_stack.push(effective);
    }

    #[inline]
    pub fn pop_clip(&mut self) {
        debug_assert!(!self.clip_stack.is_empty(), "pop_clip called without matching push_clip");
        self.clip_stack.pop();
    }

    /// Iterates items back-to-front without cloning commands.
    pub fn iter_in_paint_order(&mut self) -> impl Iterator<Item = &DrawItem> {
        if self.sorted_dirty {
            self.rebuild_sorted_indices();
        }
        self.sorted_indices.iter().map(|&i| &self.items[i])
    }

    fn rebuild_sorted_indices(&mut self) {
        self.sorted_indices.clear();
        self.sorted_indices.extend(0..self.items.len());
        // SortKey carries insertion order, so this is stable.
        self.sorted_indices.sort_by(|&a, &b| self.items[a].key.cmp(&self.items[b].key));
        self.sorted_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::Color;
    use crate::scene::{FrameCmd, QuadCmd};

    fn quad(x: f32) -> DrawCmd {
        DrawCmd::Quad(QuadCmd {
            rect: Rect::new(x, 0.0, 1.0, 1.0),
            color: Color::TRANSPARENT,
            radius: 0.0,
            border: None,
        })
    }

    #[test]
    fn paint_order_sorts_by_z_then_insertion() {
        let mut list = DrawList::new();
        list.push(ZIndex(1), quad(0.0));
        list.push(ZIndex(0), quad(1.0));
        list.push(ZIndex(1), quad(2.0));
        let xs: Vec<f32> = list.iter_in_paint_order().map(|i| i.cmd.rect().origin.x).collect();
        assert_eq!(xs, vec![1.0, 0.0, 2.0]);
    }

    #[test]
    fn nested_clips_intersect() {
        let mut list = DrawList::new();
        list.push_clip(Rect::new(0.0, 0.0, 10.0, 10.0));
        list.push_clip(Rect::new(5.0, 5.0, 10.0, 10.0));
        list.push(ZIndex(0), DrawCmd::Frame(FrameCmd { rect: Rect::new(0.0, 0.0, 20.0, 20.0), opacity: 1.0 }));
        list.pop_clip();
        list.push(ZIndex(0), quad(0.0));
        list.pop_clip();
        list.push(ZIndex(0), quad(0.0));

        let clips: Vec<Option<Rect>> = list.items().iter().map(|i| i.clip_rect).collect();
        assert_eq!(
            clips,
            vec![
                Some(Rect::new(5.0, 5.0, 5.0, 5.0)),
                Some(Rect::new(0.0, 0.0, 10.0, 10.0)),
                None,
            ]
        );
    }

    #[test]
    fn disjoint_clip_collapses() {
        let mut list = DrawList::new();
        list.push_clip(Rect::new(0.0, 0.0, 4.0, 4.0));
        list.push_clip(Rect::new(10.0, 10.0, 4.0, 4.0));
        list.push(ZIndex(0), quad(0.0));
        assert!(list.items()[0].clip_rect.is_some_and(|r| r.is_empty()));
    }
}

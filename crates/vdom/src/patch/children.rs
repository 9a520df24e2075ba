//! Child list reconciliation.
//!
//! Four cursors walk the old and new lists from both ends, matching the
//! common cases (append, prepend, removal, reversal) without a lookup. Only
//! when no end matches is a key map built over the unmatched old range.
//! Moved old nodes are flagged in `taken` instead of being removed from the
//! list, which keeps indices stable for the rest of the walk.

use super::{InsertQueue, Patcher};
use crate::node::{VNode, same_vnode};
use crate::ops::NodeHandle;
use core::ops::Range;
use reactive::warn;
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

impl Patcher {
    pub(super) fn update_children(
        &self,
        parent: NodeHandle,
        old_ch: &[VNode],
        new_ch: &mut [VNode],
        queue: &mut InsertQueue,
    ) -> anyhow::Result<()> {
        check_duplicate_keys(new_ch);

        let mut taken = vec![false; old_ch.len()];
        let mut old_start = 0;
        let mut old_end = old_ch.len();
        let mut new_start = 0;
        let mut new_end = new_ch.len();
        let mut key_map: Option<FxHashMap<Rc<str>, usize>> = None;

        while old_start < old_end && new_start < new_end {
            if taken.get(old_start).copied().unwrap_or(false) {
                old_start += 1;
                continue;
            }
            if taken.get(old_end - 1).copied().unwrap_or(false) {
                old_end -= 1;
                continue;
            }
            let (Some(old_first), Some(old_last)) = (old_ch.get(old_start), old_ch.get(old_end - 1)) else {
                break;
            };

            if let Some(new_first) = new_ch.get_mut(new_start)
                && same_vnode(old_first, new_first)
            {
                self.patch_vnode(old_first, new_first, queue)?;
                old_start += 1;
                new_start += 1;
                continue;
            }
            if let Some(new_last) = new_ch.get_mut(new_end - 1)
                && same_vnode(old_last, new_last)
            {
                self.patch_vnode(old_last, new_last, queue)?;
                old_end -= 1;
                new_end -= 1;
                continue;
            }
            if let Some(new_last) = new_ch.get_mut(new_end - 1)
                && same_vnode(old_first, new_last)
            {
                // Moved right.
                self.patch_vnode(old_first, new_last, queue)?;
                let reference = old_last.node_elm().and_then(|elm| self.ops.next_sibling(elm));
                if let Some(elm) = new_last.node_elm() {
                    self.move_before(parent, elm, reference)?;
                }
                old_start += 1;
                new_end -= 1;
                continue;
            }
            if let Some(new_first) = new_ch.get_mut(new_start)
                && same_vnode(old_last, new_first)
            {
                // Moved left.
                self.patch_vnode(old_last, new_first, queue)?;
                if let Some(elm) = new_first.node_elm() {
                    self.move_before(parent, elm, old_first.node_elm())?;
                }
                old_end -= 1;
                new_start += 1;
                continue;
            }

            let reference = old_first.node_elm();
            let Some(new_first) = new_ch.get_mut(new_start) else {
                break;
            };
            let found = match new_first.data.key.as_ref() {
                Some(key) => key_map
                    .get_or_insert_with(|| create_key_to_old_idx(old_ch, old_start..old_end))
                    .get(key)
                    .copied(),
                None => find_idx_in_old(new_first, old_ch, old_start..old_end, &taken),
            }
            .filter(|&index| (old_start..old_end).contains(&index) && !taken.get(index).copied().unwrap_or(true));

            match found.and_then(|index| old_ch.get(index).map(|old| (index, old))) {
                Some((index, to_move)) if same_vnode(to_move, new_first) => {
                    self.patch_vnode(to_move, new_first, queue)?;
                    if let Some(flag) = taken.get_mut(index) {
                        *flag = true;
                    }
                    if let Some(elm) = new_first.node_elm() {
                        self.move_before(parent, elm, reference)?;
                    }
                }
                // New element, or same key but a different element.
                Some(_) | None => {
                    self.create_elm(new_first, queue, Some(parent), reference, true)?;
                }
            }
            new_start += 1;
        }

        if old_start >= old_end {
            let reference = new_ch.get(new_end).and_then(VNode::node_elm);
            if let Some(remaining) = new_ch.get_mut(new_start..new_end) {
                for vnode in remaining {
                    self.create_elm(vnode, queue, Some(parent), reference, true)?;
                }
            }
        } else if new_start >= new_end {
            self.remove_vnodes(old_ch, old_start..old_end, &taken)?;
        }
        Ok(())
    }

    fn move_before(&self, parent: NodeHandle, elm: NodeHandle, reference: Option<NodeHandle>) -> anyhow::Result<()> {
        match reference {
            Some(reference) if reference != elm => self.ops.insert_before(parent, elm, reference),
            Some(_) => Ok(()),
            None => self.ops.append_child(parent, elm),
        }
    }
}

/// Positions of keyed nodes in `old_ch[range]`; later duplicates win.
fn create_key_to_old_idx(old_ch: &[VNode], range: Range<usize>) -> FxHashMap<Rc<str>, usize> {
    let mut map = FxHashMap::default();
    for index in range {
        if let Some(key) = old_ch.get(index).and_then(|vnode| vnode.data.key.clone()) {
            map.insert(key, index);
        }
    }
    map
}

fn find_idx_in_old(vnode: &VNode, old_ch: &[VNode], range: Range<usize>, taken: &[bool]) -> Option<usize> {
    range
        .filter(|&index| !taken.get(index).copied().unwrap_or(false))
        .find(|&index| old_ch.get(index).is_some_and(|old| same_vnode(vnode, old)))
}

fn check_duplicate_keys(children: &[VNode]) {
    let mut seen = FxHashSet::default();
    for key in children.iter().filter_map(VNode::key) {
        if !seen.insert(key) {
            warn(&format!("Duplicate keys detected: '{key}'. This may cause an update error."));
        }
    }
}

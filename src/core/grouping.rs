use crate::core::fragment::Fragment;
use crate::core::sku::Sku;
use std::collections::BTreeMap;

/// Composite key of a leaf group. The derived ordering compares color, then
/// format, then size, then hole type, each by plain string ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub color: String,
    pub format: String,
    pub size: String,
    pub hole_type: String,
}

impl From<&Sku> for GroupKey {
    fn from(sku: &Sku) -> Self {
        Self {
            color: sku.color.clone(),
            format: sku.format.clone(),
            size: sku.size.clone(),
            hole_type: sku.hole_type.clone(),
        }
    }
}

/// Item fragments classified by color → format → size → hole type.
#[derive(Debug, Clone)]
pub struct GroupingIndex<E> {
    groups: BTreeMap<GroupKey, Vec<Fragment<E>>>,
    len: usize,
}

/// One leaf group: every fragment sharing a full [`GroupKey`], ordered by source key.
#[derive(Debug)]
pub struct LeafGroup<'a, E> {
    pub key: &'a GroupKey,
    pub fragments: &'a [Fragment<E>],
}

/// All leaf groups of one color, in key order.
#[derive(Debug)]
pub struct ColorRow<'a, E> {
    pub color: &'a str,
    pub groups: Vec<LeafGroup<'a, E>>,
}

impl<'a, E> ColorRow<'a, E> {
    pub fn fragments(&self) -> impl Iterator<Item = &'a Fragment<E>> + '_ {
        self.groups.iter().flat_map(|g| g.fragments.iter())
    }
}

impl<E> Default for GroupingIndex<E> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
            len: 0,
        }
    }
}

impl<E> GroupingIndex<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files a fragment under its SKU's group. Duplicates are kept side by side.
    pub fn classify(&mut self, fragment: Fragment<E>, sku: &Sku) {
        let leaf = self.groups.entry(GroupKey::from(sku)).or_default();
        // upper-bound insertion keeps the leaf sorted and equal keys in arrival order
        let at = leaf.partition_point(|f| f.source_key <= fragment.source_key);
        leaf.insert(at, fragment);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Leaf groups in ascending key order.
    pub fn leaves(&self) -> impl Iterator<Item = LeafGroup<'_, E>> {
        self.groups.iter().map(|(key, fragments)| LeafGroup {
            key,
            fragments: fragments.as_slice(),
        })
    }

    /// Leaf groups bundled per color, colors ascending.
    pub fn rows(&self) -> Vec<ColorRow<'_, E>> {
        let mut rows: Vec<ColorRow<'_, E>> = Vec::new();
        for leaf in self.leaves() {
            match rows.last_mut() {
                Some(row) if row.color == leaf.key.color => row.groups.push(leaf),
                _ => rows.push(ColorRow {
                    color: leaf.key.color.as_str(),
                    groups: vec![leaf],
                }),
            }
        }
        rows
    }
}

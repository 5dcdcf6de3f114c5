use tracing::debug;
use tracing::warn;

use crate::config::UniverseConfig;
use crate::node::FIRST_ID;
use crate::node::Internal;
use crate::node::Memo;
use crate::node::Node;
use crate::node::NodeRef;

/// The epochs memoized futures are checked against.
///
/// `rule` moves whenever the rule changes. `config` moves whenever the rule or the step changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Epochs {
    pub rule: u32,
    pub config: u32,
}

enum Slot {
    Occupied(Node),
    Vacant,
}

/// Counters describing the store, mostly for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Live internal nodes
    pub nodes: usize,

    /// Number of buckets minus one
    pub table_size: usize,

    /// Index rebuilds triggered by load
    pub rehashes: u64,

    /// Garbage collections
    pub collections: u64,
}

/// Hash-consing arena for quadtree nodes.
///
/// Every internal node is built through [`Store::get_or_create`], which guarantees that a given
/// `(nw, ne, sw, se)` tuple maps to exactly one live node. Nodes live in `slots` and are chained
/// through their `next` field from the bucket heads in `buckets`.
pub struct Store {
    slots: Vec<Slot>,

    /// Vacant slots, ready for reuse
    free: Vec<NodeRef>,

    /// Heads of the bucket chains
    buckets: Vec<Option<NodeRef>>,

    /// Always `2^n - 1`, used as the hash mask
    table_size: usize,

    max_table_size: usize,

    load_factor: f64,

    /// Id handed to the next node, which doubles as the load of the table
    last_id: u32,

    /// `last_id` beyond which the index is rebuilt
    max_load: u32,

    /// Set when the table filled up while nodes were being built. Storage can only be reclaimed
    /// once the caller can name every root.
    collect_requested: bool,

    rehashes: u64,
    collections: u64,
}

impl Store {
    pub(crate) fn new(config: &UniverseConfig) -> Self {
        let table_size = (1usize << config.initial_table_log2) - 1;

        Self {
            slots: vec![
                Slot::Occupied(Node::Leaf { alive: false }),
                Slot::Occupied(Node::Leaf { alive: true }),
            ],
            free: Vec::new(),
            buckets: vec![None; table_size + 1],
            table_size,
            max_table_size: (1usize << config.max_table_log2) - 1,
            load_factor: config.load_factor,
            last_id: FIRST_ID,
            max_load: Self::load_limit(table_size, config.load_factor),
            collect_requested: false,
            rehashes: 0,
            collections: 0,
        }
    }

    fn load_limit(table_size: usize, load_factor: f64) -> u32 {
        (table_size as f64 * load_factor).min(u32::MAX as f64) as u32
    }

    /// The hash of a child tuple, computed from the children's ids.
    pub(crate) fn calc_hash(nw: u32, ne: u32, sw: u32, se: u32) -> u32 {
        let h = nw.wrapping_mul(23) ^ ne;
        let h = h.wrapping_mul(23) ^ sw;
        h.wrapping_mul(23) ^ se
    }

    pub fn node(&self, node: NodeRef) -> &Node {
        match &self.slots[node.index()] {
            Slot::Occupied(n) => n,
            Slot::Vacant => panic!("dangling node reference {node:?}"),
        }
    }

    fn internal(&self, node: NodeRef) -> &Internal {
        match self.node(node) {
            Node::Internal(n) => n,
            Node::Leaf { .. } => panic!("expected an internal node, got leaf {node:?}"),
        }
    }

    fn internal_mut(&mut self, node: NodeRef) -> &mut Internal {
        match &mut self.slots[node.index()] {
            Slot::Occupied(Node::Internal(n)) => n,
            Slot::Occupied(Node::Leaf { .. }) => {
                panic!("expected an internal node, got leaf {node:?}")
            }
            Slot::Vacant => panic!("dangling node reference {node:?}"),
        }
    }

    pub fn level(&self, node: NodeRef) -> u8 {
        self.node(node).level()
    }

    pub fn population(&self, node: NodeRef) -> u128 {
        self.node(node).population()
    }

    /// `nw`, `ne`, `sw`, `se` of an internal node.
    pub fn children(&self, node: NodeRef) -> [NodeRef; 4] {
        self.internal(node).children
    }

    fn bucket(&self, children: &[NodeRef; 4]) -> usize {
        let [nw, ne, sw, se] = children.map(|c| self.node(c).id());

        Self::calc_hash(nw, ne, sw, se) as usize & self.table_size
    }

    fn find(&self, bucket: usize, children: &[NodeRef; 4]) -> Option<NodeRef> {
        let mut cursor = self.buckets[bucket];

        while let Some(node) = cursor {
            let n = self.internal(node);
            if n.children == *children {
                return Some(node);
            }

            cursor = n.next;
        }

        None
    }

    /// Return the canonical node with the given quadrants, creating it if needed.
    ///
    /// All four children must share a level.
    pub(crate) fn get_or_create(
        &mut self,
        nw: NodeRef,
        ne: NodeRef,
        sw: NodeRef,
        se: NodeRef,
    ) -> NodeRef {
        let children = [nw, ne, sw, se];

        loop {
            let bucket = self.bucket(&children);

            if let Some(node) = self.find(bucket, &children) {
                return node;
            }

            if self.last_id <= self.max_load {
                return self.allocate(bucket, children);
            }

            self.overflow();
        }
    }

    fn allocate(&mut self, bucket: usize, children: [NodeRef; 4]) -> NodeRef {
        let level = self.level(children[0]);
        assert!(
            children.iter().all(|&c| self.level(c) == level),
            "children of a node must share a level"
        );

        let population = children.iter().map(|&c| self.population(c)).sum();

        let node = Internal {
            children,
            level: level + 1,
            population,
            id: self.last_id,
            next: self.buckets[bucket],
            cache: None,
            quick_cache: None,
        };
        self.last_id += 1;

        let slot = Slot::Occupied(Node::Internal(node));
        let node = match self.free.pop() {
            Some(node) => {
                self.slots[node.index()] = slot;
                node
            }
            None => {
                self.slots.push(slot);
                NodeRef::from_index(self.slots.len() - 1)
            }
        };

        self.buckets[bucket] = Some(node);

        node
    }

    /// Called when a node is about to be created past the load limit.
    ///
    /// Nodes under construction are only held by the call stack, so nothing can be freed here.
    /// The index is grown and rebuilt over every occupied slot, and a collection is requested
    /// for the next safe point.
    fn overflow(&mut self) {
        self.collect_requested = true;

        if self.table_size < self.max_table_size {
            self.table_size = self.table_size << 1 | 1;
            self.rehash();
        }

        if self.last_id > self.max_load {
            warn!(
                table_size = self.table_size,
                nodes = self.len(),
                "Hash table is at its size limit, chains will grow until the next collection"
            );

            self.max_load = u32::MAX;
        }
    }

    /// Rebuild the index over every occupied slot with fresh ids.
    fn rehash(&mut self) {
        self.rehashes += 1;
        self.reset_index();

        // Hashes depend on the children's ids, so ids are all assigned before anything is
        // inserted.
        for slot in self.slots.iter_mut() {
            if let Slot::Occupied(Node::Internal(n)) = slot {
                n.id = self.last_id;
                n.next = None;
                self.last_id += 1;
            }
        }

        for index in 0..self.slots.len() {
            if let Slot::Occupied(Node::Internal(_)) = self.slots[index] {
                self.insert(NodeRef::from_index(index));
            }
        }

        debug!(
            table_size = self.table_size,
            nodes = self.len(),
            "Rehashed node table"
        );
    }

    fn reset_index(&mut self) {
        self.buckets.clear();
        self.buckets.resize(self.table_size + 1, None);
        self.max_load = Self::load_limit(self.table_size, self.load_factor);
        self.last_id = FIRST_ID;
    }

    /// Link an already existing node into its bucket chain
    fn insert(&mut self, node: NodeRef) {
        let bucket = self.bucket(&self.children(node));
        let head = self.buckets[bucket];

        self.internal_mut(node).next = head;
        self.buckets[bucket] = Some(node);
    }

    /// Whether this exact node is registered in the hash table.
    pub fn contains(&self, node: NodeRef) -> bool {
        let Node::Internal(n) = self.node(node) else {
            return true;
        };

        let mut cursor = self.buckets[self.bucket(&n.children)];
        while let Some(candidate) = cursor {
            if candidate == node {
                return true;
            }

            cursor = self.internal(candidate).next;
        }

        false
    }

    /// Keep only what is reachable from `roots`, give the survivors fresh dense ids and free
    /// every other slot.
    ///
    /// Ids are handed out in pre-order: the node, its children, then its memoized futures.
    /// Memos from an outdated epoch are dropped on the way.
    pub(crate) fn collect(&mut self, roots: &[NodeRef], epochs: Epochs) {
        let before = self.len();

        self.collections += 1;
        self.reset_index();

        let mut reached = vec![false; self.slots.len()];
        reached[NodeRef::DEAD.index()] = true;
        reached[NodeRef::ALIVE.index()] = true;

        for &root in roots {
            self.rehash_from(root, epochs, &mut reached);
        }

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !reached[index] && matches!(slot, Slot::Occupied(_)) {
                *slot = Slot::Vacant;
                self.free.push(NodeRef::from_index(index));
            }
        }

        self.collect_requested = false;

        debug!(
            before,
            after = self.len(),
            table_size = self.table_size,
            "Collected garbage"
        );
    }

    fn rehash_from(&mut self, node: NodeRef, epochs: Epochs, reached: &mut [bool]) {
        if reached[node.index()] {
            return;
        }
        reached[node.index()] = true;

        let id = self.last_id;
        self.last_id += 1;

        let n = self.internal_mut(node);
        n.id = id;
        n.next = None;
        n.cache = n.cache.filter(|m| m.epoch == epochs.config);
        n.quick_cache = n.quick_cache.filter(|m| m.epoch == epochs.rule);

        let children = n.children;
        let memos = [n.cache, n.quick_cache];

        for child in children {
            self.rehash_from(child, epochs, reached);
        }

        for memo in memos.into_iter().flatten() {
            self.rehash_from(memo.result, epochs, reached);
        }

        self.insert(node);
    }

    pub(crate) fn collect_requested(&self) -> bool {
        self.collect_requested
    }

    pub(crate) fn cache(&self, node: NodeRef, epoch: u32) -> Option<NodeRef> {
        let memo = self.internal(node).cache?;

        (memo.epoch == epoch).then_some(memo.result)
    }

    pub(crate) fn set_cache(&mut self, node: NodeRef, result: NodeRef, epoch: u32) {
        self.internal_mut(node).cache = Some(Memo { result, epoch });
    }

    pub(crate) fn quick_cache(&self, node: NodeRef, epoch: u32) -> Option<NodeRef> {
        let memo = self.internal(node).quick_cache?;

        (memo.epoch == epoch).then_some(memo.result)
    }

    pub(crate) fn set_quick_cache(&mut self, node: NodeRef, result: NodeRef, epoch: u32) {
        self.internal_mut(node).quick_cache = Some(Memo { result, epoch });
    }

    /// Number of live internal nodes
    pub fn len(&self) -> usize {
        // the two leaves always occupy a slot
        self.slots.len() - self.free.len() - 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            nodes: self.len(),
            table_size: self.table_size,
            rehashes: self.rehashes,
            collections: self.collections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Epochs;
    use super::Store;
    use crate::config::UniverseConfig;
    use crate::node::FIRST_ID;
    use crate::node::NodeRef;

    const ALIVE: NodeRef = NodeRef::ALIVE;
    const DEAD: NodeRef = NodeRef::DEAD;

    fn small_store() -> Store {
        Store::new(&UniverseConfig {
            initial_table_log2: 2,
            max_table_log2: 6,
            ..Default::default()
        })
    }

    /// Build every level 1 node, in bitmask order
    fn all_level1(store: &mut Store) -> Vec<NodeRef> {
        (0..16u8)
            .map(|bits| {
                let leaf = |bit: u8| NodeRef::leaf(bits & bit != 0);
                store.get_or_create(leaf(1), leaf(2), leaf(4), leaf(8))
            })
            .collect()
    }

    #[test]
    fn canonical_identity() {
        let mut store = Store::new(&UniverseConfig::default());

        let a = store.get_or_create(ALIVE, DEAD, DEAD, ALIVE);
        let b = store.get_or_create(ALIVE, DEAD, DEAD, ALIVE);
        let c = store.get_or_create(DEAD, ALIVE, ALIVE, DEAD);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.len(), 2);
        assert!(store.contains(a));
    }

    #[test]
    fn derived_fields() {
        let mut store = Store::new(&UniverseConfig::default());

        let l1 = store.get_or_create(ALIVE, DEAD, ALIVE, ALIVE);
        let empty = store.get_or_create(DEAD, DEAD, DEAD, DEAD);
        let l2 = store.get_or_create(l1, empty, l1, l1);

        assert_eq!(store.level(l1), 1);
        assert_eq!(store.population(l1), 3);
        assert_eq!(store.level(l2), 2);
        assert_eq!(store.population(l2), 9);
        assert_eq!(store.children(l2), [l1, empty, l1, l1]);
        assert_eq!(store.node(l1).id(), FIRST_ID);
    }

    #[test]
    #[should_panic(expected = "share a level")]
    fn rejects_mixed_levels() {
        let mut store = Store::new(&UniverseConfig::default());

        let l1 = store.get_or_create(DEAD, DEAD, DEAD, DEAD);
        store.get_or_create(l1, DEAD, DEAD, DEAD);
    }

    #[test]
    fn overflow_grows_the_table_and_keeps_nodes_canonical() {
        let mut store = small_store();
        assert_eq!(store.table_size(), 3);

        let nodes = all_level1(&mut store);

        assert!(store.table_size() > 3);
        assert!(store.stats().rehashes > 0);
        assert!(store.collect_requested());

        // every node can still be found after the index was rebuilt
        assert_eq!(all_level1(&mut store), nodes);
        for &node in &nodes {
            assert!(store.contains(node));
        }
    }

    #[test]
    fn collect_frees_unreachable_nodes() {
        let mut store = small_store();

        let nodes = all_level1(&mut store);
        let keep = store.get_or_create(nodes[1], nodes[2], nodes[4], nodes[8]);
        let id_before = store.node(keep).id();

        store.collect(&[keep], Epochs::default());

        assert_eq!(store.len(), 5);
        assert!(!store.collect_requested());
        assert!(store.contains(keep));
        assert_eq!(store.node(keep).id(), FIRST_ID);
        assert_ne!(store.node(keep).id(), id_before);
        assert_eq!(store.children(keep), [nodes[1], nodes[2], nodes[4], nodes[8]]);

        // the surviving children are still canonical
        let again = store.get_or_create(ALIVE, DEAD, DEAD, DEAD);
        assert_eq!(again, nodes[1]);

        // freed slots get reused
        let slots_before = store.slots.len();
        store.get_or_create(ALIVE, ALIVE, ALIVE, ALIVE);
        assert_eq!(store.slots.len(), slots_before);
    }

    #[test]
    fn collect_follows_valid_memos_only() {
        let mut store = small_store();

        let nodes = all_level1(&mut store);
        let root = store.get_or_create(nodes[0], nodes[0], nodes[0], nodes[15]);
        store.set_quick_cache(root, nodes[3], 0);
        store.set_cache(root, nodes[5], 0);

        store.collect(&[root], Epochs { rule: 0, config: 1 });

        assert_eq!(store.quick_cache(root, 0), Some(nodes[3]));
        assert_eq!(store.cache(root, 0), None);
        assert!(store.contains(nodes[3]));
        assert_eq!(store.len(), 4);
    }
}

use tracing::debug;
use tracing::warn;

use crate::MAX_LEVEL;
use crate::WorldOffset;
use crate::config::UniverseConfig;
use crate::error::LifeError;
use crate::node::Node;
use crate::node::NodeRef;
use crate::rule_set::RuleSet;
use crate::store::Epochs;
use crate::store::Store;
use crate::tables::Tables;

/// Entries of the level 2 construction memo, one per 4x4 bitmask.
const LEVEL2_MEMO_LEN: usize = 1 << 16;

/// The smallest level the root may have.
pub const MIN_ROOT_LEVEL: u8 = 3;

/// An unbounded Life-like universe, evolved with HashLife.
///
/// The root is a square of side `2^level` centered on the origin: it covers
/// `-2^(level - 1)..2^(level - 1)` on both axes, with `y` growing southwards.
pub struct Universe {
    pub(crate) store: Store,
    pub(crate) tables: Tables,
    config: UniverseConfig,

    pub(crate) rules: RuleSet,

    /// Single steps advance `2^step` generations
    pub(crate) step: u8,

    pub(crate) epochs: Epochs,

    generation: u64,

    pub(crate) root: NodeRef,
    rewind: Option<NodeRef>,

    /// `empty_trees[level]` is the empty node of that level
    empty_trees: Vec<NodeRef>,

    /// Level 2 nodes, indexed by their 16 bit cell mask
    level2: Vec<Option<NodeRef>>,
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

impl Universe {
    /// An empty universe following [`crate::rule_set::B3S23`].
    pub fn new() -> Self {
        Self::build(UniverseConfig::default())
    }

    pub fn with_config(config: UniverseConfig) -> Result<Self, LifeError> {
        config.validate()?;

        Ok(Self::build(config))
    }

    fn build(config: UniverseConfig) -> Self {
        let mut universe = Self {
            store: Store::new(&config),
            tables: Tables::new(),
            config,
            rules: RuleSet::default(),
            step: 0,
            epochs: Epochs::default(),
            generation: 0,
            root: NodeRef::DEAD,
            rewind: None,
            empty_trees: vec![NodeRef::DEAD],
            level2: vec![None; LEVEL2_MEMO_LEN],
        };
        universe.root = universe.empty_tree(MIN_ROOT_LEVEL);

        universe
    }

    /// Drop the pattern and every cached result: an empty level 3 root at generation 0.
    pub fn clear_pattern(&mut self) {
        self.store = Store::new(&self.config);
        self.empty_trees = vec![NodeRef::DEAD];
        self.level2 = vec![None; LEVEL2_MEMO_LEN];
        self.rewind = None;
        self.generation = 0;
        self.root = self.empty_tree(MIN_ROOT_LEVEL);
    }

    pub fn root(&self) -> NodeRef {
        self.root
    }

    pub fn node(&self, node: NodeRef) -> &Node {
        self.store.node(node)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn level(&self) -> u8 {
        self.store.level(self.root)
    }

    pub fn population(&self) -> u128 {
        self.store.population(self.root)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn advance_generation(&mut self, by: u64) -> Result<(), LifeError> {
        self.generation = self
            .generation
            .checked_add(by)
            .ok_or(LifeError::GenerationOverflow)?;

        Ok(())
    }

    pub fn rules(&self) -> RuleSet {
        self.rules
    }

    /// Change the survival and birth masks. Results computed under the old rule are ignored from
    /// now on.
    pub fn set_rules(&mut self, survive: u16, birth: u16) -> Result<(), LifeError> {
        let rules = RuleSet::new(birth, survive)?;
        self.set_rule_set(rules);

        Ok(())
    }

    pub fn set_rule_set(&mut self, rules: RuleSet) {
        if rules == self.rules {
            return;
        }

        debug!(from = %self.rules, to = %rules, "Changing rules");

        self.rules = rules;
        self.epochs.rule += 1;
        self.epochs.config += 1;
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    /// The largest step exponent a universe can honour.
    pub const fn max_step() -> u8 {
        MAX_LEVEL - 3
    }

    /// Make single steps advance `2^step` generations.
    pub fn set_step(&mut self, step: u8) -> Result<(), LifeError> {
        if step > Self::max_step() {
            return Err(LifeError::InvalidStep {
                step,
                max: Self::max_step(),
            });
        }

        if step != self.step {
            debug!(from = self.step, to = step, "Changing step");

            self.step = step;
            self.epochs.config += 1;
        }

        Ok(())
    }

    pub fn save_rewind_state(&mut self) {
        self.rewind = Some(self.root);
    }

    /// Go back to the last saved root, at generation 0.
    pub fn restore_rewind_state(&mut self) {
        let Some(rewind) = self.rewind else {
            warn!("No rewind state saved");
            return;
        };

        self.generation = 0;
        self.root = rewind;

        self.collect_garbage();
    }

    /// Free every node that can no longer be reached from the root, the rewind state or the
    /// construction memos.
    pub fn collect_garbage(&mut self) {
        let roots: Vec<NodeRef> = std::iter::once(self.root)
            .chain(self.rewind)
            .chain(self.empty_trees.iter().copied())
            .chain(self.level2.iter().flatten().copied())
            .collect();

        self.store.collect(&roots, self.epochs);
    }

    /// Called between operations, once nothing outside the universe holds nodes.
    pub(crate) fn collect_if_requested(&mut self) {
        if self.store.collect_requested() {
            self.collect_garbage();
        }
    }

    pub(crate) fn join(&mut self, nw: NodeRef, ne: NodeRef, sw: NodeRef, se: NodeRef) -> NodeRef {
        self.store.get_or_create(nw, ne, sw, se)
    }

    /// The all dead node of `level`.
    pub(crate) fn empty_tree(&mut self, level: u8) -> NodeRef {
        while self.empty_trees.len() <= level as usize {
            let t = self.empty_trees[self.empty_trees.len() - 1];
            let next = self.join(t, t, t, t);
            self.empty_trees.push(next);
        }

        self.empty_trees[level as usize]
    }

    /// The level 1 node whose `nw`, `ne`, `sw`, `se` cells are bits 0 to 3 of `bits`.
    pub(crate) fn level1_create(&mut self, bits: u16) -> NodeRef {
        let leaf = |bit: u16| NodeRef::leaf(bits & bit != 0);

        self.join(leaf(1), leaf(2), leaf(4), leaf(8))
    }

    /// The level 2 node made of four level 1 nibbles: `nw` in bits 0 to 3, then `ne`, `sw`, `se`.
    pub(crate) fn level2_from_mask(&mut self, mask: u16) -> NodeRef {
        if let Some(node) = self.level2[mask as usize] {
            return node;
        }

        let nw = self.level1_create(mask);
        let ne = self.level1_create(mask >> 4);
        let sw = self.level1_create(mask >> 8);
        let se = self.level1_create(mask >> 12);
        let node = self.join(nw, ne, sw, se);

        self.level2[mask as usize] = Some(node);

        node
    }

    /// Wrap `node` in an empty border, one level up. The old quadrants end up touching the center.
    pub(crate) fn expand_universe(&mut self, node: NodeRef) -> Result<NodeRef, LifeError> {
        let level = self.store.level(node);
        if level >= MAX_LEVEL {
            return Err(LifeError::LevelOverflow {
                level: level as u32 + 1,
            });
        }

        let t = self.empty_tree(level - 1);
        let [nw, ne, sw, se] = self.store.children(node);

        let nw = self.join(t, t, t, nw);
        let ne = self.join(t, t, ne, t);
        let sw = self.join(t, sw, t, t);
        let se = self.join(se, t, t, t);

        Ok(self.join(nw, ne, sw, se))
    }

    /// Make sure the root is at least `level` deep.
    fn grow_to(&mut self, level: u8) -> Result<(), LifeError> {
        while self.level() < level {
            self.root = self.expand_universe(self.root)?;
        }

        Ok(())
    }

    pub fn set_bit(&mut self, x: WorldOffset, y: WorldOffset, living: bool) -> Result<(), LifeError> {
        let level = match level_for_coordinates([x, y]) {
            Ok(level) => level,
            // nothing to clear that far out
            Err(_) if !living => return Ok(()),
            Err(e) => return Err(e),
        };

        if level > self.level() {
            if !living {
                return Ok(());
            }

            self.grow_to(level)?;
        }

        self.root = self.node_set_bit(self.root, x, y, living);
        self.collect_if_requested();

        Ok(())
    }

    /// `x` and `y` are relative to the center of `node`.
    fn node_set_bit(&mut self, node: NodeRef, x: WorldOffset, y: WorldOffset, living: bool) -> NodeRef {
        let level = self.store.level(node);
        if level == 0 {
            return NodeRef::leaf(living);
        }

        let offset = self.tables.child_offset(level);
        let [mut nw, mut ne, mut sw, mut se] = self.store.children(node);

        match (x < 0, y < 0) {
            (true, true) => nw = self.node_set_bit(nw, x + offset, y + offset, living),
            (false, true) => ne = self.node_set_bit(ne, x - offset, y + offset, living),
            (true, false) => sw = self.node_set_bit(sw, x + offset, y - offset, living),
            (false, false) => se = self.node_set_bit(se, x - offset, y - offset, living),
        }

        self.join(nw, ne, sw, se)
    }

    /// Whether the cell is alive. Points outside the root are dead.
    pub fn get_bit(&self, x: WorldOffset, y: WorldOffset) -> bool {
        match level_for_coordinates([x, y]) {
            Ok(level) if level <= self.level() => self.node_get_bit(self.root, x, y),
            _ => false,
        }
    }

    fn node_get_bit(&self, node: NodeRef, x: WorldOffset, y: WorldOffset) -> bool {
        let n = self.store.node(node);
        if n.population() == 0 {
            return false;
        }

        let Some([nw, ne, sw, se]) = n.children() else {
            return true;
        };

        let offset = self.tables.child_offset(n.level());

        match (x < 0, y < 0) {
            (true, true) => self.node_get_bit(nw, x + offset, y + offset),
            (false, true) => self.node_get_bit(ne, x - offset, y + offset),
            (true, false) => self.node_get_bit(sw, x + offset, y - offset),
            (false, false) => self.node_get_bit(se, x - offset, y - offset),
        }
    }

    /// Every living cell of the root as `(x, y)`, sorted by row then column.
    pub fn live_cells(&self) -> Vec<(WorldOffset, WorldOffset)> {
        let mut cells = Vec::new();
        let offset = self.tables.half_side(self.level());

        self.node_live_cells(self.root, -offset, -offset, &mut cells);
        cells.sort_by_key(|&(x, y)| (y, x));

        cells
    }

    fn node_live_cells(
        &self,
        node: NodeRef,
        left: WorldOffset,
        top: WorldOffset,
        cells: &mut Vec<(WorldOffset, WorldOffset)>,
    ) {
        let n = self.store.node(node);
        if n.population() == 0 {
            return;
        }

        let Some([nw, ne, sw, se]) = n.children() else {
            cells.push((left, top));
            return;
        };

        let half = self.tables.half_side(n.level());

        self.node_live_cells(nw, left, top, cells);
        self.node_live_cells(ne, left + half, top, cells);
        self.node_live_cells(sw, left, top + half, cells);
        self.node_live_cells(se, left + half, top + half, cells);
    }
}

/// The smallest root level containing every coordinate: a level `L` root holds
/// `-2^(L - 1)..=2^(L - 1) - 1`. Never less than [`MIN_ROOT_LEVEL`].
pub fn level_for_coordinates<I>(coordinates: I) -> Result<u8, LifeError>
where
    I: IntoIterator<Item = WorldOffset>,
{
    let extent = coordinates
        .into_iter()
        .map(|c| if c >= 0 { c as u64 + 1 } else { c.unsigned_abs() })
        .fold(1u64 << (MIN_ROOT_LEVEL - 1), u64::max);

    // ceil(log2(extent)) + 1
    let level = u64::BITS - (extent - 1).leading_zeros() + 1;

    if level > MAX_LEVEL as u32 {
        return Err(LifeError::LevelOverflow { level });
    }

    Ok(level as u8)
}

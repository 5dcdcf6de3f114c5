//! Advancing macrocells through time.
//!
//! Both steppers split a node of level `n` into nine overlapping level `n - 1` squares:
//!
//! ```notrust
//!   n00 n01 n02
//!   n10 n11 n12
//!   n20 n21 n22
//! ```
//!
//! and recombine them into the four quadrants of a level `n - 1` result centered on the
//! original node.

use tracing::trace;

use crate::error::LifeError;
use crate::node::NodeRef;
use crate::universe::Universe;

/// The center cell of a neighbourhood mask
const CENTER_MASK: u16 = 0b0000_0000_0010_0000;

/// The eight neighbours of the center cell
const NBHD_MASK: u16 = 0b0000_0111_0101_0111;

impl Universe {
    /// Apply the rule to the cell at bit 5 of `bitmask`, whose neighbours sit at bits 0, 1, 2, 4,
    /// 6, 8, 9 and 10.
    fn eval_mask(&self, bitmask: u16) -> u16 {
        let rule = if bitmask & CENTER_MASK != 0 {
            self.rules.survivals()
        } else {
            self.rules.births()
        };

        rule >> self.tables.bitcount(bitmask & NBHD_MASK) & 1
    }

    /// One generation of the center 2x2 of a level 2 node.
    fn level2_next(&mut self, node: NodeRef) -> NodeRef {
        let store = &self.store;
        let [nw, ne, sw, se] = store.children(node).map(|c| store.children(c));
        let bit = |leaf: NodeRef| u16::from(leaf == NodeRef::ALIVE);

        // row major, top left cell in bit 15
        let bitmask = bit(nw[0]) << 15 | bit(nw[1]) << 14 | bit(ne[0]) << 13 | bit(ne[1]) << 12
            | bit(nw[2]) << 11 | bit(nw[3]) << 10 | bit(ne[2]) << 9 | bit(ne[3]) << 8
            | bit(sw[0]) << 7 | bit(sw[1]) << 6 | bit(se[0]) << 5 | bit(se[1]) << 4
            | bit(sw[2]) << 3 | bit(sw[3]) << 2 | bit(se[2]) << 1 | bit(se[3]);

        let bits = self.eval_mask(bitmask >> 5)
            | self.eval_mask(bitmask >> 4) << 1
            | self.eval_mask(bitmask >> 1) << 2
            | self.eval_mask(bitmask) << 3;

        self.level1_create(bits)
    }

    /// The node made of the innermost grandchildren of four adjacent nodes, i.e. the square
    /// centered where `nw`, `ne`, `sw` and `se` meet.
    fn centre(&mut self, nw: NodeRef, ne: NodeRef, sw: NodeRef, se: NodeRef) -> NodeRef {
        let nw = self.store.children(nw)[3];
        let ne = self.store.children(ne)[2];
        let sw = self.store.children(sw)[1];
        let se = self.store.children(se)[0];

        self.join(nw, ne, sw, se)
    }

    /// The center half of `node`, `2^(level - 2)` generations later.
    pub(crate) fn quick_next_generation(&mut self, node: NodeRef) -> NodeRef {
        if let Some(result) = self.store.quick_cache(node, self.epochs.rule) {
            return result;
        }

        let result = if self.store.level(node) == 2 {
            self.level2_next(node)
        } else {
            let [nw, ne, sw, se] = self.store.children(node);
            let [_, nw_ne, nw_sw, nw_se] = self.store.children(nw);
            let [ne_nw, _, ne_sw, ne_se] = self.store.children(ne);
            let [sw_nw, sw_ne, _, sw_se] = self.store.children(sw);
            let [se_nw, se_ne, se_sw, _] = self.store.children(se);

            let n01 = self.join(nw_ne, ne_nw, nw_se, ne_sw);
            let n10 = self.join(nw_sw, nw_se, sw_nw, sw_ne);
            let n11 = self.join(nw_se, ne_sw, sw_ne, se_nw);
            let n12 = self.join(ne_sw, ne_se, se_nw, se_ne);
            let n21 = self.join(sw_ne, se_nw, sw_se, se_sw);

            let n00 = self.quick_next_generation(nw);
            let n01 = self.quick_next_generation(n01);
            let n02 = self.quick_next_generation(ne);
            let n10 = self.quick_next_generation(n10);
            let n11 = self.quick_next_generation(n11);
            let n12 = self.quick_next_generation(n12);
            let n20 = self.quick_next_generation(sw);
            let n21 = self.quick_next_generation(n21);
            let n22 = self.quick_next_generation(se);

            let nw = self.join(n00, n01, n10, n11);
            let ne = self.join(n01, n02, n11, n12);
            let sw = self.join(n10, n11, n20, n21);
            let se = self.join(n11, n12, n21, n22);

            let nw = self.quick_next_generation(nw);
            let ne = self.quick_next_generation(ne);
            let sw = self.quick_next_generation(sw);
            let se = self.quick_next_generation(se);

            self.join(nw, ne, sw, se)
        };

        self.store.set_quick_cache(node, result, self.epochs.rule);

        result
    }

    /// The center half of `node`, `2^step` generations later. Needs `level > step + 1`.
    pub(crate) fn next_generation_node(&mut self, node: NodeRef) -> NodeRef {
        if let Some(result) = self.store.cache(node, self.epochs.config) {
            return result;
        }

        let level = self.store.level(node);
        debug_assert!(level >= self.step + 2, "level {level} too small for step {}", self.step);

        if self.step + 2 == level {
            return self.quick_next_generation(node);
        }

        if level == 2 {
            if let Some(result) = self.store.quick_cache(node, self.epochs.rule) {
                return result;
            }

            let result = self.level2_next(node);
            self.store.set_quick_cache(node, result, self.epochs.rule);

            return result;
        }

        let [nw, ne, sw, se] = self.store.children(node);
        let [nw_nw, nw_ne, nw_sw, nw_se] = self.store.children(nw);
        let [ne_nw, ne_ne, ne_sw, ne_se] = self.store.children(ne);
        let [sw_nw, sw_ne, sw_sw, sw_se] = self.store.children(sw);
        let [se_nw, se_ne, se_sw, se_se] = self.store.children(se);

        // Not stepped: each is the center of one of the nine squares
        let n00 = self.centre(nw_nw, nw_ne, nw_sw, nw_se);
        let n01 = self.centre(nw_ne, ne_nw, nw_se, ne_sw);
        let n02 = self.centre(ne_nw, ne_ne, ne_sw, ne_se);
        let n10 = self.centre(nw_sw, nw_se, sw_nw, sw_ne);
        let n11 = self.centre(nw_se, ne_sw, sw_ne, se_nw);
        let n12 = self.centre(ne_sw, ne_se, se_nw, se_ne);
        let n20 = self.centre(sw_nw, sw_ne, sw_sw, sw_se);
        let n21 = self.centre(sw_ne, se_nw, sw_se, se_sw);
        let n22 = self.centre(se_nw, se_ne, se_sw, se_se);

        let nw = self.join(n00, n01, n10, n11);
        let ne = self.join(n01, n02, n11, n12);
        let sw = self.join(n10, n11, n20, n21);
        let se = self.join(n11, n12, n21, n22);

        let nw = self.next_generation_node(nw);
        let ne = self.next_generation_node(ne);
        let sw = self.next_generation_node(sw);
        let se = self.next_generation_node(se);

        let result = self.join(nw, ne, sw, se);
        self.store.set_cache(node, result, self.epochs.config);

        result
    }

    /// Whether every live cell of `root` sits in its center quarter, so that a step cannot push
    /// anything past the border.
    fn is_padded(&self, root: NodeRef) -> bool {
        let store = &self.store;
        let innermost = |quadrant: NodeRef, i: usize| {
            let child = store.children(quadrant)[3 - i];
            store.children(child)[3 - i]
        };

        store
            .children(root)
            .into_iter()
            .enumerate()
            .all(|(i, q)| store.population(q) == store.population(innermost(q, i)))
    }

    /// Advance the universe by `2^step` generations if `is_single`, otherwise by as many as the
    /// root allows in one quick step: `2^(level - 2)` once the root has been padded.
    pub fn next_generation(&mut self, is_single: bool) -> Result<(), LifeError> {
        let mut root = self.root;

        // the result is one level smaller than the root, and must stay at least level 3
        while self.store.level(root) < 4
            || (is_single && self.store.level(root) <= self.step + 2)
            || !self.is_padded(root)
        {
            root = self.expand_universe(root)?;
        }

        let level = self.store.level(root);
        let generations = if is_single {
            self.tables.pow2(self.step as u32)?
        } else {
            self.tables.pow2(level as u32 - 2)?
        };
        self.advance_generation(generations)?;

        self.root = if is_single {
            self.next_generation_node(root)
        } else {
            self.quick_next_generation(root)
        };

        trace!(
            generation = self.generation(),
            level = self.level(),
            population = %self.population(),
            nodes = self.store.len(),
            "Stepped"
        );

        self.collect_if_requested();

        Ok(())
    }
}

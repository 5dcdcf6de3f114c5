use crate::WorldOffset;
use crate::error::LifeError;
use crate::node::NodeRef;
use crate::universe::Universe;
use crate::universe::level_for_coordinates;

const LEFT: u8 = 1;
const TOP: u8 = 2;
const RIGHT: u8 = 4;
const BOTTOM: u8 = 8;

/// An inclusive rectangle of cells, `y` growing southwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub top: WorldOffset,
    pub left: WorldOffset,
    pub bottom: WorldOffset,
    pub right: WorldOffset,
}

impl Bounds {
    /// The box around a single cell.
    pub fn point(x: WorldOffset, y: WorldOffset) -> Self {
        Self {
            top: y,
            left: x,
            bottom: y,
            right: x,
        }
    }

    /// Grow the box to include the cell at `(x, y)`.
    pub fn include(&mut self, x: WorldOffset, y: WorldOffset) {
        self.left = self.left.min(x);
        self.right = self.right.max(x);
        self.top = self.top.min(y);
        self.bottom = self.bottom.max(y);
    }

    pub fn width(&self) -> u64 {
        self.right.abs_diff(self.left) + 1
    }

    pub fn height(&self) -> u64 {
        self.bottom.abs_diff(self.top) + 1
    }

    pub fn translate(&mut self, dx: WorldOffset, dy: WorldOffset) {
        self.left += dx;
        self.right += dx;
        self.top += dy;
        self.bottom += dy;
    }

    /// Whether the `side` wide square with top left corner `(left, top)` lies inside the box.
    fn encloses(&self, left: WorldOffset, top: WorldOffset, side: WorldOffset) -> bool {
        left >= self.left && left + side <= self.right && top >= self.top && top + side <= self.bottom
    }

    /// A box no cell can be outside of, for searches to shrink.
    fn inverted() -> Self {
        Self {
            top: WorldOffset::MAX,
            left: WorldOffset::MAX,
            bottom: WorldOffset::MIN,
            right: WorldOffset::MIN,
        }
    }
}

/// The smallest root level containing the cell at `(x, y)`.
pub fn level_for_point(x: WorldOffset, y: WorldOffset) -> Result<u8, LifeError> {
    level_for_coordinates([x, y])
}

/// The smallest root level containing every cell of `bounds`.
pub fn level_for_bounds(bounds: &Bounds) -> Result<u8, LifeError> {
    level_for_coordinates([bounds.top, bounds.left, bounds.bottom, bounds.right])
}

impl Universe {
    /// The smallest box holding every living cell of the root, all zero when there are none.
    pub fn root_bounds(&self) -> Bounds {
        if self.population() == 0 {
            return Bounds::default();
        }

        let offset = self.tables.half_side(self.level());
        let mut bounds = Bounds::inverted();

        self.node_get_boundary(self.root, -offset, -offset, LEFT | TOP | RIGHT | BOTTOM, &mut bounds);

        bounds
    }

    /// Shrink `bounds` around the living cells of `node`, looking only for the edges in `find`.
    ///
    /// A quadrant can't hold an edge when the quadrant on the far side of it has living cells:
    /// a populated `nw` means neither `sw` nor `se` holds the top edge, and so on.
    fn node_get_boundary(
        &self,
        node: NodeRef,
        left: WorldOffset,
        top: WorldOffset,
        find: u8,
        bounds: &mut Bounds,
    ) {
        let n = self.store.node(node);
        if n.population() == 0 || find == 0 {
            return;
        }

        let Some(children) = n.children() else {
            bounds.include(left, top);
            return;
        };

        let half = self.tables.half_side(n.level());
        if bounds.encloses(left, top, 2 * half) {
            return;
        }

        let [nw, ne, sw, se] = children;
        let alive = |q: NodeRef| self.store.population(q) > 0;

        let (mut find_nw, mut find_ne, mut find_sw, mut find_se) = (find, find, find, find);

        if alive(nw) {
            find_sw &= !TOP;
            find_ne &= !LEFT;
            find_se &= !(TOP | LEFT);
        }
        if alive(sw) {
            find_se &= !LEFT;
            find_nw &= !BOTTOM;
            find_ne &= !(BOTTOM | LEFT);
        }
        if alive(ne) {
            find_nw &= !RIGHT;
            find_se &= !TOP;
            find_sw &= !(TOP | RIGHT);
        }
        if alive(se) {
            find_sw &= !RIGHT;
            find_ne &= !BOTTOM;
            find_nw &= !(BOTTOM | RIGHT);
        }

        self.node_get_boundary(nw, left, top, find_nw, bounds);
        self.node_get_boundary(sw, left, top + half, find_sw, bounds);
        self.node_get_boundary(ne, left + half, top, find_ne, bounds);
        self.node_get_boundary(se, left + half, top + half, find_se, bounds);
    }
}

//! Building a whole pattern at once from lists of living cells.

use tracing::debug;

use crate::WorldOffset;
use crate::bounds::Bounds;
use crate::bounds::level_for_bounds;
use crate::error::LifeError;
use crate::node::NodeRef;
use crate::partition::partition_in_place;
use crate::universe::Universe;

impl Universe {
    /// Replace the root with the living cells `(xs[i], ys[i])`.
    ///
    /// `bounds` must enclose every cell, and is computed when absent. The coordinates are shifted in
    /// place so that they all lie in `0..2^level` and are left that way.
    pub fn setup_field(
        &mut self,
        xs: &mut [WorldOffset],
        ys: &mut [WorldOffset],
        bounds: Option<Bounds>,
    ) -> Result<(), LifeError> {
        if xs.len() != ys.len() {
            return Err(LifeError::FieldLengthMismatch {
                xs: xs.len(),
                ys: ys.len(),
            });
        }

        let bounds = bounds.unwrap_or_else(|| field_bounds(xs, ys));
        let level = level_for_bounds(&bounds)?;
        let offset = self.tables.half_side(level);

        move_field(xs, ys, offset, offset);

        self.root = self.setup_field_recurse(xs, ys, level);

        debug!(cells = xs.len(), level, population = %self.population(), "Field loaded");

        self.collect_if_requested();

        Ok(())
    }

    fn setup_field_recurse(&mut self, xs: &mut [WorldOffset], ys: &mut [WorldOffset], level: u8) -> NodeRef {
        if xs.is_empty() {
            return self.empty_tree(level);
        }

        if level == 2 {
            return self.level2_setup(xs, ys);
        }

        let level = level - 1;
        let offset: WorldOffset = 1 << level;

        // north and south first, then each half into west and east
        let south = partition_in_place(ys, xs, |&y| y & offset == 0);
        let (north_xs, south_xs) = xs.split_at_mut(south);
        let (north_ys, south_ys) = ys.split_at_mut(south);

        let ne = partition_in_place(north_xs, north_ys, |&x| x & offset == 0);
        let se = partition_in_place(south_xs, south_ys, |&x| x & offset == 0);

        let (nw_xs, ne_xs) = north_xs.split_at_mut(ne);
        let (nw_ys, ne_ys) = north_ys.split_at_mut(ne);
        let (sw_xs, se_xs) = south_xs.split_at_mut(se);
        let (sw_ys, se_ys) = south_ys.split_at_mut(se);

        let nw = self.setup_field_recurse(nw_xs, nw_ys, level);
        let ne = self.setup_field_recurse(ne_xs, ne_ys, level);
        let sw = self.setup_field_recurse(sw_xs, sw_ys, level);
        let se = self.setup_field_recurse(se_xs, se_ys, level);

        self.join(nw, ne, sw, se)
    }

    /// Pack the cells of a 4x4 square into the level 2 memo.
    fn level2_setup(&mut self, xs: &[WorldOffset], ys: &[WorldOffset]) -> NodeRef {
        let mask = xs.iter().zip(ys).fold(0u16, |mask, (&x, &y)| {
            // interleave the two low bits of x and y: x0, y0, x1, y1
            let bit = x & 1 | (y & 1 | x & 2) << 1 | (y & 2) << 2;

            mask | 1 << bit
        });

        self.level2_from_mask(mask)
    }
}

/// The smallest box holding every cell of the field, all zero when it is empty.
pub fn field_bounds(xs: &[WorldOffset], ys: &[WorldOffset]) -> Bounds {
    let mut cells = xs.iter().copied().zip(ys.iter().copied());

    let Some((x, y)) = cells.next() else {
        return Bounds::default();
    };

    cells.fold(Bounds::point(x, y), |mut bounds, (x, y)| {
        bounds.include(x, y);
        bounds
    })
}

/// Translate every cell of the field.
pub fn move_field(xs: &mut [WorldOffset], ys: &mut [WorldOffset], dx: WorldOffset, dy: WorldOffset) {
    xs.iter_mut().for_each(|x| *x += dx);
    ys.iter_mut().for_each(|y| *y += dy);
}

/// Move the field, and its `bounds`, so that the origin sits in the middle of it.
pub fn make_center(xs: &mut [WorldOffset], ys: &mut [WorldOffset], bounds: &mut Bounds) {
    let dx = (bounds.left - bounds.right + 1).div_euclid(2) - bounds.left;
    let dy = (bounds.top - bounds.bottom + 1).div_euclid(2) - bounds.top;

    move_field(xs, ys, dx, dy);
    bounds.translate(dx, dy);
}

#[cfg(test)]
mod tests {
    use super::field_bounds;
    use super::make_center;
    use super::move_field;
    use crate::bounds::Bounds;
    use crate::error::LifeError;
    use crate::universe::Universe;

    #[test]
    fn setup_matches_set_bit() {
        let cells = [(0, 0), (1, 0), (2, 0), (-5, 3), (7, -8), (-8, 7), (20, 20)];

        let mut by_bit = Universe::new();
        for (x, y) in cells {
            by_bit.set_bit(x, y, true).unwrap();
        }

        let mut by_field = Universe::new();
        let (mut xs, mut ys): (Vec<i64>, Vec<i64>) = cells.into_iter().unzip();
        by_field.setup_field(&mut xs, &mut ys, None).unwrap();

        assert_eq!(by_field.population(), cells.len() as u128);
        assert_eq!(by_field.live_cells(), by_bit.live_cells());
        assert_eq!(by_field.level(), by_bit.level());
        assert_eq!(by_field.root_bounds(), by_bit.root_bounds());
    }

    #[test]
    fn setup_is_canonical() {
        let mut universe = Universe::new();
        universe.set_bit(1, 1, true).unwrap();
        universe.set_bit(-2, 3, true).unwrap();
        let root = universe.root();

        let (mut xs, mut ys) = (vec![-2, 1], vec![3, 1]);
        universe.setup_field(&mut xs, &mut ys, None).unwrap();

        assert_eq!(universe.root(), root);
    }

    #[test]
    fn setup_shifts_coordinates() {
        let mut universe = Universe::new();
        let (mut xs, mut ys) = (vec![-1, 2], vec![0, -3]);

        universe.setup_field(&mut xs, &mut ys, None).unwrap();

        assert_eq!(universe.level(), 3);

        // partitioning reorders the cells but never splits a pair
        let mut cells: Vec<_> = xs.into_iter().zip(ys).collect();
        assert!(cells.contains(&(3, 4)));
        cells.sort();
        assert_eq!(cells, vec![(3, 4), (6, 1)]);
    }

    #[test]
    fn empty_field() {
        let mut universe = Universe::new();
        universe.set_bit(3, 3, true).unwrap();

        universe.setup_field(&mut [], &mut [], None).unwrap();

        assert_eq!(universe.population(), 0);
        assert_eq!(universe.level(), 3);
    }

    #[test]
    fn mismatched_lengths() {
        let mut universe = Universe::new();

        assert_eq!(
            universe.setup_field(&mut [1, 2], &mut [1], None),
            Err(LifeError::FieldLengthMismatch { xs: 2, ys: 1 })
        );
    }

    #[test]
    fn centering() {
        let (mut xs, mut ys) = (vec![10, 13, 11], vec![-4, -4, 1]);
        let mut bounds = field_bounds(&xs, &ys);
        assert_eq!(
            bounds,
            Bounds {
                top: -4,
                left: 10,
                bottom: 1,
                right: 13
            }
        );

        make_center(&mut xs, &mut ys, &mut bounds);

        assert_eq!(
            bounds,
            Bounds {
                top: -2,
                left: -1,
                bottom: 3,
                right: 2
            }
        );
        assert_eq!((xs, ys), (vec![-1, 2, 0], vec![-2, -2, 3]));
    }

    #[test]
    fn moving_and_empty_bounds() {
        let (mut xs, mut ys) = (vec![1, 2], vec![3, 4]);
        move_field(&mut xs, &mut ys, -1, 10);

        assert_eq!((xs, ys), (vec![0, 1], vec![13, 14]));
        assert_eq!(field_bounds(&[], &[]), Bounds::default());
    }
}

use std::collections::HashMap;
use std::collections::HashSet;

use proptest::prelude::*;

use hashlife::NodeRef;
use hashlife::Universe;
use hashlife::WorldOffset;

type Cell = (WorldOffset, WorldOffset);

/// One generation of B3/S23 over a set of cells.
fn naive_step(cells: &HashSet<Cell>) -> HashSet<Cell> {
    let mut counts: HashMap<Cell, u8> = HashMap::new();

    for &(x, y) in cells {
        for dy in -1..=1 {
            for dx in -1..=1 {
                if (dx, dy) != (0, 0) {
                    *counts.entry((x + dx, y + dy)).or_default() += 1;
                }
            }
        }
    }

    counts
        .into_iter()
        .filter(|(cell, n)| *n == 3 || (*n == 2 && cells.contains(cell)))
        .map(|(cell, _)| cell)
        .collect()
}

fn naive_run(cells: &HashSet<Cell>, generations: u64) -> Vec<Cell> {
    let mut cells = cells.clone();
    for _ in 0..generations {
        cells = naive_step(&cells);
    }

    let mut cells: Vec<_> = cells.into_iter().collect();
    cells.sort_by_key(|&(x, y)| (y, x));
    cells
}

fn universe_with(cells: &HashSet<Cell>) -> Universe {
    let mut universe = Universe::new();
    for &(x, y) in cells {
        universe.set_bit(x, y, true).unwrap();
    }

    universe
}

/// Every node below `node` holds the sum of its children's populations.
fn check_population(universe: &Universe, node: NodeRef, seen: &mut HashSet<NodeRef>) -> u128 {
    let n = universe.node(node);

    if let Some(children) = n.children() {
        if seen.insert(node) {
            let sum = children
                .into_iter()
                .map(|c| check_population(universe, c, seen))
                .sum::<u128>();

            assert_eq!(n.population(), sum, "population of {node:?}");
            assert!(children.iter().all(|&c| universe.node(c).level() + 1 == n.level()));
        }
    }

    n.population()
}

fn soup() -> impl Strategy<Value = HashSet<Cell>> {
    prop::collection::hash_set((-6..6i64, -6..6i64), 0..40)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn set_then_get(x in -(1i64 << 40)..(1i64 << 40), y in -(1i64 << 40)..(1i64 << 40)) {
        let mut universe = Universe::new();

        universe.set_bit(x, y, true).unwrap();
        prop_assert!(universe.get_bit(x, y));
        prop_assert_eq!(universe.population(), 1);

        universe.set_bit(x, y, false).unwrap();
        prop_assert!(!universe.get_bit(x, y));
        prop_assert_eq!(universe.population(), 0);
    }

    #[test]
    fn populations_add_up(cells in soup(), generations in 0..6usize) {
        let mut universe = universe_with(&cells);
        for _ in 0..generations {
            universe.next_generation(true).unwrap();
        }

        let mut seen = HashSet::new();
        let total = check_population(&universe, universe.root(), &mut seen);

        prop_assert_eq!(total, universe.live_cells().len() as u128);
    }

    #[test]
    fn insertion_order_does_not_matter(cells in soup()) {
        let mut cells: Vec<_> = cells.into_iter().collect();
        let mut universe = Universe::new();

        for &(x, y) in &cells {
            universe.set_bit(x, y, true).unwrap();
        }
        let root = universe.root();

        for &(x, y) in &cells {
            universe.set_bit(x, y, false).unwrap();
        }
        prop_assert_eq!(universe.population(), 0);

        cells.reverse();
        for &(x, y) in &cells {
            universe.set_bit(x, y, true).unwrap();
        }
        prop_assert_eq!(universe.root(), root);

        let mut xs: Vec<_> = cells.iter().map(|c| c.0).collect();
        let mut ys: Vec<_> = cells.iter().map(|c| c.1).collect();
        universe.setup_field(&mut xs, &mut ys, None).unwrap();
        prop_assert_eq!(universe.root(), root);
    }

    #[test]
    fn single_steps_match_naive_life(cells in soup(), step in 0..4u8) {
        let mut universe = universe_with(&cells);
        universe.set_step(step).unwrap();

        universe.next_generation(true).unwrap();
        universe.next_generation(true).unwrap();

        prop_assert_eq!(universe.generation(), 2u64 << step);
        prop_assert_eq!(universe.live_cells(), naive_run(&cells, 2u64 << step));
    }

    #[test]
    fn quick_steps_match_naive_life(cells in soup()) {
        let mut universe = universe_with(&cells);

        universe.next_generation(false).unwrap();

        let generation = universe.generation();
        prop_assert!(generation >= 4);
        prop_assert_eq!(universe.live_cells(), naive_run(&cells, generation));
    }

    #[test]
    fn bounds_enclose_every_cell(cells in soup()) {
        let universe = universe_with(&cells);
        let bounds = universe.root_bounds();

        let live = universe.live_cells();
        if live.is_empty() {
            prop_assert_eq!(bounds, hashlife::Bounds::default());
        } else {
            prop_assert_eq!(bounds.left, live.iter().map(|c| c.0).min().unwrap());
            prop_assert_eq!(bounds.right, live.iter().map(|c| c.0).max().unwrap());
            prop_assert_eq!(bounds.top, live.iter().map(|c| c.1).min().unwrap());
            prop_assert_eq!(bounds.bottom, live.iter().map(|c| c.1).max().unwrap());
        }
    }
}

//! Screen-space tiling: the iteration order and in-block pixel enumeration the renderer's
//! worker threads pull tiles from.

use std::iter::FusedIterator;
use std::num::NonZeroU32;

use ordered_float::OrderedFloat;
use rand_distr::Distribution as _;

use crate::geometry::ScreenBlock;
use crate::geometry::ScreenPoint;

impl ScreenBlock {
    pub fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    pub fn area(&self) -> u32 {
        self.width() * self.height()
    }

    pub fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= self.min.x && point.x < self.max.x && point.y >= self.min.y && point.y < self.max.y
    }
}

pub trait ScreenBlockExt {
    fn internal_points(&self) -> InternalPoints;
    fn tile_ordering(&self, tile_size: NonZeroU32) -> Vec<ScreenBlock>;
}

impl ScreenBlockExt for ScreenBlock {
    /// Iterates coordinates inside the block in C order (x changes first, then y).
    fn internal_points(&self) -> InternalPoints {
        if self.is_empty() {
            InternalPoints::empty()
        } else {
            InternalPoints {
                min_x: self.min.x,
                max: self.max,
                cursor: self.min,
            }
        }
    }

    /// Sub-blocks of `tile_size * tile_size` (clipped at the bottom/right edge when it
    /// doesn't evenly divide the block), ordered outward from the block's center with a bit
    /// of random jitter so neighboring workers don't converge on the same screen region.
    fn tile_ordering(&self, tile_size: NonZeroU32) -> Vec<ScreenBlock> {
        if self.is_empty() {
            return Vec::new();
        }

        let center = (
            (self.min.x as f32 + self.max.x as f32) / 2.0,
            (self.min.y as f32 + self.max.y as f32) / 2.0,
        );

        let x_ranges: Vec<_> = divide_range(self.min.x, self.max.x, tile_size).collect();
        let y_ranges: Vec<_> = divide_range(self.min.y, self.max.y, tile_size).collect();

        let mut tiles = Vec::with_capacity(x_ranges.len() * y_ranges.len());

        let randomness_scale = (center.0 * center.0 + center.1 * center.1).sqrt() * 0.1;
        let distribution = rand_distr::Exp::new(1.0 / randomness_scale.max(1e-3)).unwrap();

        for &(tile_min_y, tile_max_y) in &y_ranges {
            for &(tile_min_x, tile_max_x) in &x_ranges {
                let tile = ScreenBlock::new(
                    ScreenPoint::new(tile_min_x, tile_min_y),
                    ScreenPoint::new(tile_max_x, tile_max_y),
                );

                let tile_center_x = (tile_min_x as f32 + tile_max_x as f32) / 2.0;
                let tile_center_y = (tile_min_y as f32 + tile_max_y as f32) / 2.0;
                let dx = center.0 - tile_center_x;
                let dy = center.1 - tile_center_y;
                let distance = (dx * dx + dy * dy).sqrt();

                tiles.push((
                    tile,
                    OrderedFloat(distance + distribution.sample(&mut rand::rng())),
                ));
            }
        }

        tiles.sort_unstable_by_key(|(_tile, key)| *key);
        tiles.into_iter().map(|(tile, _key)| tile).collect()
    }
}

#[derive(Copy, Clone, Debug)]
pub struct InternalPoints {
    min_x: u32,
    max: ScreenPoint,
    cursor: ScreenPoint,
}

impl InternalPoints {
    fn empty() -> Self {
        InternalPoints {
            min_x: 1,
            max: ScreenPoint::new(0, 0),
            cursor: ScreenPoint::new(0, 0),
        }
    }
}

impl Iterator for InternalPoints {
    type Item = ScreenPoint;

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.y >= self.max.y {
            return None;
        }

        let ret = self.cursor;

        self.cursor.x += 1;
        if self.cursor.x >= self.max.x {
            self.cursor.x = self.min_x;
            self.cursor.y += 1;
        }

        Some(ret)
    }
}

impl ExactSizeIterator for InternalPoints {
    fn len(&self) -> usize {
        if self.cursor.y >= self.max.y {
            0
        } else {
            let rows_below = self.max.y - self.cursor.y - 1;
            let whole_rows = rows_below * (self.max.x - self.min_x);
            let current_row = self.max.x - self.cursor.x;
            (whole_rows + current_row) as usize
        }
    }
}

impl FusedIterator for InternalPoints {}

fn divide_range(start: u32, end: u32, tile_size: NonZeroU32) -> impl Iterator<Item = (u32, u32)> {
    let tile_size = tile_size.get();
    let total = end - start;
    let full_tiles = total / tile_size;
    let n = full_tiles + if full_tiles * tile_size != total { 1 } else { 0 };

    (0..n).map(move |i| {
        let tile_start = start + i * tile_size;
        let tile_end = end.min(tile_start + tile_size);
        (tile_start, tile_end)
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;
    use proptest::prelude::*;
    use test_strategy::proptest;

    #[derive(Clone, Debug)]
    struct ScreenBlockWrapper(ScreenBlock);

    impl Arbitrary for ScreenBlockWrapper {
        type Parameters = ();
        type Strategy = BoxedStrategy<ScreenBlockWrapper>;

        fn arbitrary_with(_args: ()) -> Self::Strategy {
            (0u32..64, 0u32..64, 1u32..32, 1u32..32)
                .prop_map(|(min_x, min_y, w, h)| {
                    ScreenBlockWrapper(ScreenBlock::new(
                        ScreenPoint::new(min_x, min_y),
                        ScreenPoint::new(min_x + w, min_y + h),
                    ))
                })
                .boxed()
        }
    }

    fn check_pixel_iterator_covers_block<T: Iterator<Item = ScreenPoint>>(
        mut pixel_iterator: T,
        block: &ScreenBlock,
    ) {
        let area = block.area();
        let mut seen = vec![false; area as usize];
        while let Some(p) = pixel_iterator.next() {
            assert!(block.contains(p));
            let index = (p.x - block.min.x) + (p.y - block.min.y) * block.width();
            assert!(!seen[index as usize]);
            seen[index as usize] = true;
        }
        assert!(seen.into_iter().all(|v| v));
    }

    #[proptest]
    fn pixel_iterator_covers_all(block: ScreenBlockWrapper) {
        check_pixel_iterator_covers_block(block.0.internal_points(), &block.0);
    }

    #[proptest]
    fn pixel_iterator_exact_length(block: ScreenBlockWrapper) {
        let mut iterator = block.0.internal_points();
        let mut remaining = block.0.area() as usize;
        assert!(iterator.len() == remaining);
        while iterator.next().is_some() {
            remaining -= 1;
            assert!(iterator.len() == remaining);
        }
    }

    #[proptest]
    fn tile_ordering_covers_all(block: ScreenBlockWrapper, tile_size_minus_one: u8) {
        check_pixel_iterator_covers_block(
            block
                .0
                .tile_ordering(NonZeroU32::new(tile_size_minus_one as u32 + 1).unwrap())
                .iter()
                .flat_map(|tile| tile.internal_points()),
            &block.0,
        );
    }
}

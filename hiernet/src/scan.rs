//! Box scanners: spatial sweeps yielding all pairs of touching boxes.
//!
//! The 1-input scanner reports touching pairs among a single population; the
//! 2-input scanner reports touching pairs across two populations. Items are
//! stored with an opaque property and their boxes are derived through a
//! [`BoxConverter`] at processing time. Touching is inclusive: sharing an
//! edge or a corner counts.

use hiergeom::bbox::Bbox;

/// Derives the scan box for an item.
pub trait BoxConverter<T> {
    fn bbox(&self, item: &T) -> Bbox;
}

/// Wraps a closure as a [`BoxConverter`].
pub struct BcFn<F>(pub F);

impl<T, F> BoxConverter<T> for BcFn<F>
where
    F: Fn(&T) -> Bbox,
{
    fn bbox(&self, item: &T) -> Bbox {
        (self.0)(item)
    }
}

/// Receives events from a 1-input [`BoxScanner`].
pub trait ScanReceiver<T, P> {
    /// Called once for every touching pair.
    fn add(&mut self, s1: &T, p1: &P, s2: &T, p2: &P);

    /// Called once per element after all of its pairs have been reported.
    fn finish(&mut self, _s: &T, _p: &P) {}

    /// Checked after every pair; returning `true` aborts the scan.
    fn stop(&self) -> bool {
        false
    }
}

/// Receives events from a 2-input [`BoxScanner2`].
pub trait ScanReceiver2<T1, P1, T2, P2> {
    /// Called once for every touching pair across the two populations.
    fn add(&mut self, s1: &T1, p1: &P1, s2: &T2, p2: &P2);

    /// Checked after every pair; returning `true` aborts the scan.
    fn stop(&self) -> bool {
        false
    }
}

/// A 1-input box scanner.
#[derive(Debug)]
pub struct BoxScanner<T, P> {
    items: Vec<(T, P)>,
}

impl<T, P> Default for BoxScanner<T, P> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T, P> BoxScanner<T, P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: T, prop: P) {
        self.items.push((item, prop));
    }

    /// Sweeps the inserted items and reports every touching pair exactly
    /// once, then calls `finish` for every element in insertion order.
    ///
    /// Returns `false` if the receiver stopped the scan early.
    pub fn process<R, C>(&self, rec: &mut R, conv: &C) -> bool
    where
        R: ScanReceiver<T, P>,
        C: BoxConverter<T>,
    {
        let boxes: Vec<Bbox> = self.items.iter().map(|(t, _)| conv.bbox(t)).collect();

        let mut order: Vec<usize> = (0..boxes.len()).filter(|&i| !boxes[i].is_empty()).collect();
        order.sort_by_key(|&i| (boxes[i].p0.x, i));

        let mut active: Vec<usize> = Vec::new();
        for &i in &order {
            active.retain(|&a| boxes[a].p1.x >= boxes[i].p0.x);
            for &a in &active {
                if boxes[a].p0.y <= boxes[i].p1.y && boxes[i].p0.y <= boxes[a].p1.y {
                    let (s1, p1) = &self.items[a];
                    let (s2, p2) = &self.items[i];
                    rec.add(s1, p1, s2, p2);
                    if rec.stop() {
                        return false;
                    }
                }
            }
            active.push(i);
        }

        for (s, p) in &self.items {
            rec.finish(s, p);
        }
        true
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Side {
    First,
    Second,
}

/// A 2-input box scanner pairing items across two populations.
#[derive(Debug)]
pub struct BoxScanner2<T1, P1, T2, P2> {
    items1: Vec<(T1, P1)>,
    items2: Vec<(T2, P2)>,
}

impl<T1, P1, T2, P2> Default for BoxScanner2<T1, P1, T2, P2> {
    fn default() -> Self {
        Self {
            items1: Vec::new(),
            items2: Vec::new(),
        }
    }
}

impl<T1, P1, T2, P2> BoxScanner2<T1, P1, T2, P2> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert1(&mut self, item: T1, prop: P1) {
        self.items1.push((item, prop));
    }

    pub fn insert2(&mut self, item: T2, prop: P2) {
        self.items2.push((item, prop));
    }

    /// Sweeps both populations together and reports every touching
    /// cross-population pair exactly once, first-population item first.
    ///
    /// Returns `false` if the receiver stopped the scan early.
    pub fn process<R, C1, C2>(&self, rec: &mut R, conv1: &C1, conv2: &C2) -> bool
    where
        R: ScanReceiver2<T1, P1, T2, P2>,
        C1: BoxConverter<T1>,
        C2: BoxConverter<T2>,
    {
        let boxes1: Vec<Bbox> = self.items1.iter().map(|(t, _)| conv1.bbox(t)).collect();
        let boxes2: Vec<Bbox> = self.items2.iter().map(|(t, _)| conv2.bbox(t)).collect();

        let mut order: Vec<(Side, usize)> = Vec::with_capacity(boxes1.len() + boxes2.len());
        order.extend((0..boxes1.len()).filter(|&i| !boxes1[i].is_empty()).map(|i| (Side::First, i)));
        order.extend(
            (0..boxes2.len())
                .filter(|&i| !boxes2[i].is_empty())
                .map(|i| (Side::Second, i)),
        );
        order.sort_by_key(|&(side, i)| {
            let bx = match side {
                Side::First => &boxes1[i],
                Side::Second => &boxes2[i],
            };
            (bx.p0.x, side == Side::Second, i)
        });

        let mut active1: Vec<usize> = Vec::new();
        let mut active2: Vec<usize> = Vec::new();
        for &(side, i) in &order {
            let bx = match side {
                Side::First => &boxes1[i],
                Side::Second => &boxes2[i],
            };
            active1.retain(|&a| boxes1[a].p1.x >= bx.p0.x);
            active2.retain(|&a| boxes2[a].p1.x >= bx.p0.x);

            match side {
                Side::First => {
                    for &a in &active2 {
                        if boxes2[a].p0.y <= bx.p1.y && bx.p0.y <= boxes2[a].p1.y {
                            let (s1, p1) = &self.items1[i];
                            let (s2, p2) = &self.items2[a];
                            rec.add(s1, p1, s2, p2);
                            if rec.stop() {
                                return false;
                            }
                        }
                    }
                    active1.push(i);
                }
                Side::Second => {
                    for &a in &active1 {
                        if boxes1[a].p0.y <= bx.p1.y && bx.p0.y <= boxes1[a].p1.y {
                            let (s1, p1) = &self.items1[a];
                            let (s2, p2) = &self.items2[i];
                            rec.add(s1, p1, s2, p2);
                            if rec.stop() {
                                return false;
                            }
                        }
                    }
                    active2.push(i);
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use hiergeom::Point;

    use super::*;

    struct PairCollector {
        pairs: Vec<(u32, u32)>,
        finished: Vec<u32>,
    }

    impl ScanReceiver<Bbox, u32> for PairCollector {
        fn add(&mut self, _s1: &Bbox, p1: &u32, _s2: &Bbox, p2: &u32) {
            let (a, b) = if p1 < p2 { (*p1, *p2) } else { (*p2, *p1) };
            self.pairs.push((a, b));
        }
        fn finish(&mut self, _s: &Bbox, p: &u32) {
            self.finished.push(*p);
        }
    }

    fn bx(x0: i64, y0: i64, x1: i64, y1: i64) -> Bbox {
        Bbox::new(Point::new(x0, y0), Point::new(x1, y1))
    }

    #[test]
    fn reports_touching_pairs_once() {
        let mut bs = BoxScanner::new();
        bs.insert(bx(0, 0, 10, 10), 0);
        bs.insert(bx(10, 10, 20, 20), 1); // corner touch with 0
        bs.insert(bx(5, 5, 15, 15), 2); // overlaps both
        bs.insert(bx(100, 100, 110, 110), 3); // isolated

        let mut rec = PairCollector {
            pairs: Vec::new(),
            finished: Vec::new(),
        };
        assert!(bs.process(&mut rec, &BcFn(|b: &Bbox| *b)));

        rec.pairs.sort_unstable();
        assert_eq!(rec.pairs, vec![(0, 1), (0, 2), (1, 2)]);
        assert_eq!(rec.finished, vec![0, 1, 2, 3]);
    }

    #[test]
    fn disjoint_in_x_are_pruned() {
        let mut bs = BoxScanner::new();
        bs.insert(bx(0, 0, 10, 10), 0);
        bs.insert(bx(11, 0, 20, 10), 1);
        let mut rec = PairCollector {
            pairs: Vec::new(),
            finished: Vec::new(),
        };
        bs.process(&mut rec, &BcFn(|b: &Bbox| *b));
        assert!(rec.pairs.is_empty());
    }

    struct CrossCollector {
        pairs: Vec<(u32, u32)>,
        stop_after: Option<usize>,
    }

    impl ScanReceiver2<Bbox, u32, Bbox, u32> for CrossCollector {
        fn add(&mut self, _s1: &Bbox, p1: &u32, _s2: &Bbox, p2: &u32) {
            self.pairs.push((*p1, *p2));
        }
        fn stop(&self) -> bool {
            self.stop_after.is_some_and(|n| self.pairs.len() >= n)
        }
    }

    #[test]
    fn two_input_scan_pairs_across_sides_only() {
        let mut bs = BoxScanner2::new();
        bs.insert1(bx(0, 0, 10, 10), 0);
        bs.insert1(bx(5, 0, 15, 10), 1); // overlaps item 0, same side: no pair
        bs.insert2(bx(8, 8, 12, 12), 10);
        bs.insert2(bx(50, 50, 60, 60), 11);

        let mut rec = CrossCollector {
            pairs: Vec::new(),
            stop_after: None,
        };
        assert!(bs.process(&mut rec, &BcFn(|b: &Bbox| *b), &BcFn(|b: &Bbox| *b)));

        rec.pairs.sort_unstable();
        assert_eq!(rec.pairs, vec![(0, 10), (1, 10)]);
    }

    #[test]
    fn stop_aborts_the_scan() {
        let mut bs = BoxScanner2::new();
        bs.insert1(bx(0, 0, 10, 10), 0);
        bs.insert2(bx(0, 0, 5, 5), 10);
        bs.insert2(bx(6, 6, 9, 9), 11);

        let mut rec = CrossCollector {
            pairs: Vec::new(),
            stop_after: Some(1),
        };
        assert!(!bs.process(&mut rec, &BcFn(|b: &Bbox| *b), &BcFn(|b: &Bbox| *b)));
        assert_eq!(rec.pairs.len(), 1);
    }
}

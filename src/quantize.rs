//! Modified median-cut quantization (MMCQ).
//!
//! Colors are reduced to 5 significant bits per channel and counted in a 32x32x32
//! histogram. Boxes in that color space are split at the population median along
//! their widest axis: first by population until three quarters of the requested colors
//! exist, then by population times volume. The resulting palette is ordered by
//! population times volume, most dominant first.

use std::cmp::Reverse;

use crate::color::Rgb;

const SIGBITS: u32 = 5;
const RSHIFT: u32 = 8 - SIGBITS;
const SIDE: usize = 1 << SIGBITS;
const MAX_ITERATIONS: usize = 1000;
const FRACT_BY_POPULATION: f64 = 0.75;

fn cell(r: usize, g: usize, b: usize) -> usize {
    (r << (2 * SIGBITS)) + (g << SIGBITS) + b
}

struct Histogram(Vec<u64>);

impl Histogram {
    fn from_pixels(pixels: &[Rgb]) -> Self {
        let mut counts = vec![0u64; SIDE * SIDE * SIDE];
        for p in pixels {
            let (r, g, b) = reduce(*p);
            counts[cell(r, g, b)] += 1;
        }
        Self(counts)
    }

    fn get(&self, r: usize, g: usize, b: usize) -> u64 {
        self.0[cell(r, g, b)]
    }
}

fn reduce(p: Rgb) -> (usize, usize, usize) {
    (
        usize::from(p.r >> RSHIFT),
        usize::from(p.g >> RSHIFT),
        usize::from(p.b >> RSHIFT),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    R,
    G,
    B,
}

/// An axis-aligned box in the reduced color space, bounds inclusive.
#[derive(Debug, Clone, Copy)]
struct VBox {
    lo: [usize; 3],
    hi: [usize; 3],
    count: u64,
}

impl VBox {
    fn new(lo: [usize; 3], hi: [usize; 3], histo: &Histogram) -> Self {
        let mut vbox = Self { lo, hi, count: 0 };
        vbox.count = vbox.cells().map(|(r, g, b)| histo.get(r, g, b)).sum();
        vbox
    }

    fn from_pixels(pixels: &[Rgb], histo: &Histogram) -> Self {
        let mut lo = [usize::MAX; 3];
        let mut hi = [0usize; 3];
        for p in pixels {
            let (r, g, b) = reduce(*p);
            for (axis, v) in [r, g, b].into_iter().enumerate() {
                lo[axis] = lo[axis].min(v);
                hi[axis] = hi[axis].max(v);
            }
        }
        Self::new(lo, hi, histo)
    }

    fn width(&self, axis: Axis) -> usize {
        let i = axis as usize;
        self.hi[i] - self.lo[i] + 1
    }

    fn volume(&self) -> u64 {
        (self.width(Axis::R) * self.width(Axis::G) * self.width(Axis::B)) as u64
    }

    fn cells(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        (self.lo[0]..=self.hi[0]).flat_map(move |r| {
            (self.lo[1]..=self.hi[1])
                .flat_map(move |g| (self.lo[2]..=self.hi[2]).map(move |b| (r, g, b)))
        })
    }

    /// Population-weighted mean color, or the box center when empty.
    fn average(&self, histo: &Histogram) -> Rgb {
        let mult = f64::from(1u32 << RSHIFT);
        let mut total = 0u64;
        let mut sums = [0f64; 3];
        for (r, g, b) in self.cells() {
            let h = histo.get(r, g, b);
            if h == 0 {
                continue;
            }
            total += h;
            for (sum, v) in sums.iter_mut().zip([r, g, b]) {
                *sum += h as f64 * (v as f64 + 0.5) * mult;
            }
        }

        let channel = |axis: usize| -> u8 {
            let value = if total > 0 {
                sums[axis] / total as f64
            } else {
                mult * (self.lo[axis] + self.hi[axis] + 1) as f64 / 2.0
            };
            value.trunc().clamp(0.0, 255.0) as u8
        };
        Rgb::new(channel(0), channel(1), channel(2))
    }

    fn widest_axis(&self) -> Axis {
        let (rw, gw, bw) = (self.width(Axis::R), self.width(Axis::G), self.width(Axis::B));
        let max = rw.max(gw).max(bw);
        if max == rw {
            Axis::R
        } else if max == gw {
            Axis::G
        } else {
            Axis::B
        }
    }

    /// Population of the slab where `axis == value`.
    fn slab_count(&self, axis: Axis, value: usize, histo: &Histogram) -> u64 {
        let mut lo = self.lo;
        let mut hi = self.hi;
        lo[axis as usize] = value;
        hi[axis as usize] = value;
        VBox { lo, hi, count: 0 }
            .cells()
            .map(|(r, g, b)| histo.get(r, g, b))
            .sum()
    }
}

/// Split `vbox` at the population median of its widest axis.
///
/// Returns `None` when the box cannot be split into two populated halves.
fn median_cut(vbox: &VBox, histo: &Histogram) -> Option<(VBox, VBox)> {
    if vbox.count <= 1 {
        return None;
    }
    let axis = vbox.widest_axis();
    if vbox.width(axis) == 1 {
        return None;
    }
    let a = axis as usize;
    let (lo, hi) = (vbox.lo[a], vbox.hi[a]);

    // partial[i - lo]: population of slabs lo..=i
    let mut partial = Vec::with_capacity(hi - lo + 1);
    let mut total = 0u64;
    for value in lo..=hi {
        total += vbox.slab_count(axis, value, histo);
        partial.push(total);
    }
    let partial_at = |i: usize| partial[i - lo];
    let lookahead_at = |i: usize| total - partial[i - lo];

    let i = (lo..=hi).find(|&i| partial_at(i) as f64 > total as f64 / 2.0)?;
    let left = (i - lo) as i64;
    let right = (hi - i) as i64;
    let mut d2 = if left <= right {
        (hi as i64 - 1).min(i as i64 + right / 2)
    } else {
        (lo as i64).max(i as i64 - 1 - (left + 1) / 2)
    } as usize;

    while d2 < hi && partial_at(d2) == 0 {
        d2 += 1;
    }
    while lookahead_at(d2) == 0 && d2 > lo && partial_at(d2 - 1) != 0 {
        d2 -= 1;
    }
    if partial_at(d2) == 0 || lookahead_at(d2) == 0 {
        return None;
    }

    let mut first_hi = vbox.hi;
    first_hi[a] = d2;
    let mut second_lo = vbox.lo;
    second_lo[a] = d2 + 1;
    Some((
        VBox::new(vbox.lo, first_hi, histo),
        VBox::new(second_lo, vbox.hi, histo),
    ))
}

/// Keep splitting the highest-priority box until `target` boxes exist or no box splits.
fn split_until(boxes: &mut Vec<VBox>, histo: &Histogram, target: f64, priority: fn(&VBox) -> u64) {
    for _ in 0..MAX_ITERATIONS {
        if boxes.len() as f64 >= target {
            return;
        }
        let Some((index, _)) = boxes
            .iter()
            .enumerate()
            .max_by_key(|(_, vbox)| priority(vbox))
        else {
            return;
        };
        let Some((first, second)) = median_cut(&boxes[index], histo) else {
            return;
        };
        boxes[index] = first;
        boxes.push(second);
    }
}

fn by_population(vbox: &VBox) -> u64 {
    vbox.count
}

fn by_population_and_volume(vbox: &VBox) -> u64 {
    vbox.count * vbox.volume()
}

/// Reduce `pixels` to at most `max_colors` colors, most dominant first.
///
/// An empty pixel set yields an empty palette.
pub fn quantize(pixels: &[Rgb], max_colors: usize) -> Vec<Rgb> {
    if pixels.is_empty() || max_colors == 0 {
        return Vec::new();
    }
    let max_colors = max_colors.min(256);

    let histo = Histogram::from_pixels(pixels);
    let mut boxes = vec![VBox::from_pixels(pixels, &histo)];

    split_until(&mut boxes, &histo, FRACT_BY_POPULATION * max_colors as f64, by_population);
    split_until(&mut boxes, &histo, max_colors as f64, by_population_and_volume);

    boxes.sort_by_key(|vbox| Reverse(by_population_and_volume(vbox)));
    boxes.iter().map(|vbox| vbox.average(&histo)).collect()
}

/// The single most dominant color of `pixels`.
pub fn dominant_color(pixels: &[Rgb], max_colors: usize) -> Option<Rgb> {
    quantize(pixels, max_colors).into_iter().next()
}

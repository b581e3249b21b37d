//! Nearest-palette classification of rendered pixels by placeholder color.

use crate::color::Rgb;

/// Buckets arbitrary colors to the closest member of a small, fixed palette.
///
/// Distance is squared Euclidean RGB distance. The palette is deduplicated on
/// construction keeping first-insertion order, and ties go to the earlier entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearestColor {
    palette: Vec<Rgb>,
}

impl NearestColor {
    pub fn new(colors: impl IntoIterator<Item = Rgb>) -> Self {
        let mut palette: Vec<Rgb> = Vec::new();
        for color in colors {
            if !palette.contains(&color) {
                palette.push(color);
            }
        }
        Self { palette }
    }

    pub fn palette(&self) -> &[Rgb] {
        &self.palette
    }

    /// Index of the nearest palette entry, `None` for an empty palette.
    pub fn nearest_index(&self, color: Rgb) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (index, candidate) in self.palette.iter().enumerate() {
            let distance = candidate.distance_squared(color);
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((index, distance));
            }
        }
        best.map(|(index, _)| index)
    }

    pub fn classify(&self, color: Rgb) -> Option<Rgb> {
        self.nearest_index(color).map(|index| self.palette[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grays() -> NearestColor {
        NearestColor::new([
            Rgb::new(0, 0, 0),
            Rgb::new(128, 128, 128),
            Rgb::new(200, 200, 200),
        ])
    }

    mod unit {
        use super::*;

        #[test]
        fn picks_closest_entry() {
            assert_eq!(grays().classify(Rgb::new(120, 130, 125)), Some(Rgb::new(128, 128, 128)));
            assert_eq!(grays().classify(Rgb::WHITE), Some(Rgb::new(200, 200, 200)));
        }

        #[test]
        fn ties_go_to_first_inserted() {
            let classifier = NearestColor::new([Rgb::new(0, 0, 0), Rgb::new(2, 2, 2)]);
            assert_eq!(classifier.nearest_index(Rgb::new(1, 1, 1)), Some(0));
        }

        #[test]
        fn duplicates_are_dropped() {
            let classifier = NearestColor::new([Rgb::BLACK, Rgb::WHITE, Rgb::BLACK]);
            assert_eq!(classifier.palette(), &[Rgb::BLACK, Rgb::WHITE]);
        }

        #[test]
        fn empty_palette_classifies_to_none() {
            assert_eq!(NearestColor::new([]).classify(Rgb::WHITE), None);
        }
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn rgb() -> impl Strategy<Value = Rgb> {
            (any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(r, g, b)| Rgb::new(r, g, b))
        }

        proptest! {
            /// classifying a palette color returns that color
            #[test]
            fn palette_members_classify_to_themselves(colors in proptest::collection::vec(rgb(), 1..8)) {
                let classifier = NearestColor::new(colors.clone());
                for color in colors {
                    prop_assert_eq!(classifier.classify(color), Some(color));
                }
            }

            /// the result is a palette member and nothing in the palette is closer
            #[test]
            fn result_is_nearest(colors in proptest::collection::vec(rgb(), 1..8), probe in rgb()) {
                let classifier = NearestColor::new(colors.clone());
                let found = classifier.classify(probe).unwrap();
                prop_assert!(colors.contains(&found));
                let best = found.distance_squared(probe);
                prop_assert!(colors.iter().all(|c| c.distance_squared(probe) >= best));
            }
        }
    }
}

use proptest::prelude::*;
use scale_core::MedianFilter;
use scale_core::units::{avg2_round_nearest_i32, raw_to_grams};

fn reference_median(values: &[i32]) -> i32 {
    let mut v = values.to_vec();
    v.sort_unstable();
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2]
    } else {
        avg2_round_nearest_i32(v[n / 2 - 1], v[n / 2])
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

    // Before the window fills the median covers every push; afterwards only
    // the most recent `capacity` values.
    #[test]
    fn median_tracks_sliding_window(
        capacity in 1usize..16,
        values in prop::collection::vec(-1_000_000i32..1_000_000, 1..64),
    ) {
        let mut f = MedianFilter::new(capacity);
        for (i, &v) in values.iter().enumerate() {
            let got = f.push(v);
            let start = (i + 1).saturating_sub(capacity);
            prop_assert_eq!(got, reference_median(&values[start..=i]));
        }
        prop_assert_eq!(f.len(), values.len().min(capacity));
    }

    #[test]
    fn weight_is_zero_at_offset(offset in -8_000_000i32..8_000_000, slope in 0.01f32..500.0) {
        prop_assert_eq!(raw_to_grams(offset, offset, slope), Some(0));
        prop_assert_eq!(raw_to_grams(offset, offset, -slope), Some(0));
    }

    #[test]
    fn zero_slope_never_yields_a_weight(raw in any::<i32>(), offset in any::<i32>()) {
        prop_assert_eq!(raw_to_grams(raw, offset, 0.0), None);
    }
}

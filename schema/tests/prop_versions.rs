use proptest::prelude::*;
use schema::{Encoding, FieldDef, Layout, Threshold, VersionLadder};

const THRESHOLDS: &[Threshold] = &[
    Threshold::new(10, "a"),
    Threshold::new(20, "b"),
    Threshold::new(30, "c"),
    Threshold::new(40, "d"),
];

fn ladder() -> VersionLadder {
    VersionLadder::new("prop", THRESHOLDS).unwrap()
}

proptest! {
    #[test]
    fn prop_resolve_never_picks_higher(raw in 0u32..100) {
        match ladder().resolve(raw) {
            Ok(resolved) => {
                prop_assert!(resolved.layout_version() <= raw);
                prop_assert_eq!(resolved.raw, raw);
                let next = THRESHOLDS.iter().find(|t| t.raw > resolved.layout_version());
                if let Some(next) = next {
                    prop_assert!(raw < next.raw);
                }
            }
            Err(_) => prop_assert!(raw < 10),
        }
    }

    #[test]
    fn prop_resolve_is_monotonic(a in 10u32..100, b in 10u32..100) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let lo = ladder().resolve(lo).unwrap();
        let hi = ladder().resolve(hi).unwrap();
        prop_assert!(lo.layout_version() <= hi.layout_version());
    }

    #[test]
    fn prop_since_gated_layouts_are_additive(gates in proptest::collection::vec(0usize..5, 1..12)) {
        // Index 0 means always present; otherwise present from THRESHOLDS[i - 1].
        const NAMES: [&str; 12] = ["f0", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11"];
        let fields = gates
            .iter()
            .enumerate()
            .map(|(i, gate)| {
                let field = FieldDef::new(NAMES[i], Encoding::U32);
                if *gate == 0 { field } else { field.since(THRESHOLDS[gate - 1].raw) }
            })
            .collect();
        let layout = Layout::new("prop", fields).unwrap();
        prop_assert!(layout.check_additive(&ladder()).is_ok());

        let mut previous = 0;
        for threshold in THRESHOLDS {
            let count = layout.fields_at(threshold.raw).count();
            prop_assert!(count >= previous);
            previous = count;
        }
    }
}

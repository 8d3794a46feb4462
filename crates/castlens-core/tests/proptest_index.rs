use castlens_core::cache::{dataset_signature, traits_signature};
use castlens_core::index::{apply_one, prune_trait, rebuild_all};
use castlens_core::predicate::PredicateCompiler;
use castlens_core::stats::aggregate;
use proptest::prelude::*;

use generators::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn rebuild_is_idempotent(items in arb_items(), registry in arb_registry()) {
        let mut compiler = PredicateCompiler::default();
        let a = rebuild_all(&mut compiler, &items, &registry);
        let b = rebuild_all(&mut PredicateCompiler::default(), &items, &registry);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.len(), items.len());
        prop_assert!(a.covers(&items));
    }

    #[test]
    fn apply_one_matches_full_rebuild(
        items in arb_items(),
        registry in arb_registry(),
        pick in 0usize..CODE_POOL.len(),
        replacement in 0usize..CODE_POOL.len(),
    ) {
        let name = format!("t{pick}");
        let mut compiler = PredicateCompiler::default();
        let prior = rebuild_all(&mut compiler, &items, &registry);

        let mut edited = registry.clone();
        edited.edit(&name, None, CODE_POOL[replacement].to_string()).expect("trait exists");
        let incremental = apply_one(&mut compiler, &items, &name, CODE_POOL[replacement], &prior);
        let full = rebuild_all(&mut compiler, &items, &edited);
        prop_assert_eq!(incremental, full);
    }

    #[test]
    fn prune_matches_rebuild_without_trait(
        items in arb_items(),
        registry in arb_registry(),
        pick in 0usize..CODE_POOL.len(),
    ) {
        let name = format!("t{pick}");
        let mut compiler = PredicateCompiler::default();
        let index = rebuild_all(&mut compiler, &items, &registry);
        let mut smaller = registry.clone();
        smaller.remove(&name).expect("trait exists");
        prop_assert_eq!(prune_trait(&index, &name), rebuild_all(&mut compiler, &items, &smaller));
    }

    #[test]
    fn statistics_are_consistent(items in arb_items(), registry in arb_registry()) {
        let index = rebuild_all(&mut PredicateCompiler::default(), &items, &registry);
        let stats = aggregate(&index, &registry);
        prop_assert_eq!(stats.distribution.total(), index.len());
        prop_assert_eq!(stats.counts_by_trait.len(), registry.enabled_names().count());
        for count in stats.counts_by_trait.values() {
            prop_assert!(*count <= index.len());
        }
        prop_assert_eq!(aggregate(&index, &registry), stats);
    }

    #[test]
    fn signatures_track_their_inputs(items in arb_items(), registry in arb_registry()) {
        prop_assert_eq!(dataset_signature(&items), dataset_signature(&items.clone()));
        let mut grown = items.clone();
        grown.push(castlens_core::model::ContentItem::default());
        prop_assert_ne!(dataset_signature(&items), dataset_signature(&grown));

        let mut toggled = registry.clone();
        let enabled = toggled.is_enabled("t0");
        toggled.set_enabled("t0", !enabled).expect("trait exists");
        prop_assert_ne!(traits_signature(&registry), traits_signature(&toggled));
    }
}

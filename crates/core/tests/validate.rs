use stackcheck_core::validate::{ExpectedChain, ValidationFailure, Verdict};
use stackcheck_core::{validate, CapturedStack, NamedRange, RangeRegistry, RangeSlot, ADDRESS_SIZE};

fn sample_registry() -> RangeRegistry {
    RangeRegistry::new(
        NamedRange::new("caller", 0x1000, 0x1100),
        vec![
            NamedRange::new("target_1", 0x2000, 0x2100),
            NamedRange::new("target_2", 0x3000, 0x3100),
            NamedRange::new("target_3", 0x4000, 0x4100),
            NamedRange::new("target_4", 0x5000, 0x5100),
        ],
    )
    .expect("registry")
}

/// caller -> target_1 -> target_1 -> target_2
fn recursion_chain(registry: &RangeRegistry) -> ExpectedChain {
    ExpectedChain::builder()
        .call(registry.caller())
        .recurse(registry.target(1).unwrap(), 2)
        .call(registry.target(2).unwrap())
        .build()
}

/// One in-range address per expected frame, most recent first, with `offset`
/// into each range.
fn synthetic_capture(chain: &ExpectedChain, offset: u64, extra: &[u64]) -> CapturedStack {
    let mut addresses: Vec<u64> = chain.frames().iter().map(|r| r.start + offset).collect();
    addresses.extend_from_slice(extra);
    CapturedStack::from_addresses(addresses)
}

#[test]
fn builder_stores_frames_most_recent_first() {
    let registry = sample_registry();
    let chain = recursion_chain(&registry);
    let names: Vec<&str> = chain.frames().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["target_2", "target_1", "target_1", "caller"]);
    assert_eq!(chain.to_string(), "caller -> target_1 -> target_1 -> target_2");
    assert_eq!(
        chain,
        ExpectedChain::from_call_order(vec![
            registry.caller().clone(),
            registry.target(1).unwrap().clone(),
            registry.target(1).unwrap().clone(),
            registry.target(2).unwrap().clone(),
        ])
    );
}

#[test]
fn recursion_scenario_passes() {
    let registry = sample_registry();
    let chain = recursion_chain(&registry);
    let captured = CapturedStack::from_addresses(vec![0x3010, 0x2040, 0x2080, 0x1020]);
    assert_eq!(validate(&captured, &chain), Verdict::Pass);
}

#[test]
fn single_mismatch_is_reported_with_bounds() {
    let registry = sample_registry();
    let chain = recursion_chain(&registry);
    // Position 1 should be in target_1 but sits in target_3.
    let captured = CapturedStack::from_addresses(vec![0x3010, 0x4040, 0x2080, 0x1020]);

    let verdict = validate(&captured, &chain);
    assert!(!verdict.is_pass());
    let mismatches = verdict.mismatches();
    assert_eq!(mismatches.len(), 1);
    let m = &mismatches[0];
    assert_eq!(m.position, 1);
    assert_eq!(m.expected, "target_1");
    assert_eq!(m.actual, 0x4040);
    assert_eq!((m.expected_start, m.expected_stop), (0x2000, 0x2100));

    let actual = m.actual_range(&registry).expect("classified");
    assert_eq!(actual.name(), "target_3");
    assert_eq!(actual.slot, RangeSlot::Target(3));
}

#[test]
fn every_mismatch_is_reported_in_position_order() {
    let registry = sample_registry();
    let chain = recursion_chain(&registry);
    let captured = CapturedStack::from_addresses(vec![0x9999, 0x2040, 0x0, 0x5000]);

    let verdict = validate(&captured, &chain);
    let positions: Vec<usize> = verdict.mismatches().iter().map(|m| m.position).collect();
    assert_eq!(positions, vec![0, 2, 3]);
    assert_eq!(
        verdict.failure().unwrap().to_string(),
        "3 position(s) outside their expected range"
    );
    assert!(verdict.mismatches()[2].actual_range(&registry).unwrap().name() == "target_4");
    assert!(verdict.mismatches()[0].actual_range(&registry).is_none());
}

#[test]
fn deeper_captures_pass_for_every_offset() {
    let registry = sample_registry();
    let chain = ExpectedChain::builder()
        .call(registry.caller())
        .recurse(registry.target(1).unwrap(), 2)
        .call(registry.target(2).unwrap())
        .call(registry.target(3).unwrap())
        .call(registry.target(4).unwrap())
        .build();
    let extras: [&[u64]; 3] = [&[], &[0xdead], &[0, u64::MAX, 0x1234, 0x2000]];
    for offset in [0u64, 1, 0x7f, 0xff] {
        for extra in extras {
            let captured = synthetic_capture(&chain, offset, extra);
            assert_eq!(
                validate(&captured, &chain),
                Verdict::Pass,
                "offset {offset:#x}, {} extra frame(s)",
                extra.len()
            );
        }
    }
}

#[test]
fn exact_depth_passes() {
    let registry = sample_registry();
    let chain = recursion_chain(&registry);
    let captured = synthetic_capture(&chain, 0, &[]);
    assert_eq!(captured.entry_count(), chain.len());
    assert!(validate(&captured, &chain).is_pass());
}

#[test]
fn shallow_capture_reports_insufficient_depth_only() {
    let registry = sample_registry();
    let chain = recursion_chain(&registry);
    for have in 1..chain.len() {
        // Addresses are all wrong on purpose; no position check may run.
        let captured = CapturedStack::from_addresses(vec![0; have]);
        let verdict = validate(&captured, &chain);
        assert_eq!(
            verdict.failure(),
            Some(&ValidationFailure::InsufficientDepth { have, need: chain.len() })
        );
        assert!(verdict.mismatches().is_empty());
    }
}

#[test]
fn reported_length_limits_usable_depth() {
    let registry = sample_registry();
    let chain = recursion_chain(&registry);
    let mut captured = synthetic_capture(&chain, 0, &[]);
    captured.length_in_bytes = 3 * ADDRESS_SIZE as i64;
    assert_eq!(
        validate(&captured, &chain).failure(),
        Some(&ValidationFailure::InsufficientDepth { have: 3, need: 4 })
    );
}

#[test]
fn non_positive_length_is_empty_stack() {
    let registry = sample_registry();
    let chains = [ExpectedChain::default(), recursion_chain(&registry)];
    for len in [0i64, -1, -14, i64::MIN] {
        for chain in &chains {
            let captured = CapturedStack::new(vec![0x3010, 0x2040, 0x2080, 0x1020], len);
            assert_eq!(
                validate(&captured, chain).failure(),
                Some(&ValidationFailure::EmptyStack),
                "len {len}"
            );
        }
    }
}

#[test]
fn empty_expectation_passes_any_positive_capture() {
    let captured = CapturedStack::from_addresses(vec![0xdead]);
    assert!(validate(&captured, &ExpectedChain::default()).is_pass());
}

#[test]
fn caller_only_chain_checks_top_entry() {
    let registry = sample_registry();
    let chain = ExpectedChain::builder().call(registry.caller()).build();
    assert!(validate(&CapturedStack::from_addresses(vec![0x1010, 0x7777]), &chain).is_pass());
    assert!(!validate(&CapturedStack::from_addresses(vec![0x2010, 0x1010]), &chain).is_pass());
}

#[test]
fn validate_is_idempotent() {
    let registry = sample_registry();
    let chain = recursion_chain(&registry);
    let captured = CapturedStack::from_addresses(vec![0x3010, 0x4040, 0x2080, 0x1020]);
    let first = validate(&captured, &chain);
    let second = validate(&captured, &chain);
    assert_eq!(first, second);
}

#[test]
fn verdict_serializes_with_failure_details() {
    let registry = sample_registry();
    let chain = recursion_chain(&registry);
    let captured = CapturedStack::from_addresses(vec![0x3010, 0x4040, 0x2080, 0x1020]);
    let json = serde_json::to_value(validate(&captured, &chain)).unwrap();
    assert_eq!(json["verdict"], "fail");
    assert_eq!(json["failure"]["kind"], "mismatch");
    assert_eq!(json["failure"]["mismatches"][0]["expected"], "target_1");

    let pass = serde_json::to_value(Verdict::Pass).unwrap();
    assert_eq!(pass["verdict"], "pass");
}

use super::*;

#[test]
fn mul_div255_rounds_to_nearest() {
    assert_eq!(mul_div255_u8(255, 255), 255);
    assert_eq!(mul_div255_u8(128, 255), 128);
    assert_eq!(mul_div255_u8(0, 200), 0);
    assert_eq!(mul_div255_u8(100, 128), 50);
}

#[test]
fn unpremul_inverts_premul_for_opaque_and_zero_alpha() {
    assert_eq!(unpremul_u8(77, 255), 77);
    assert_eq!(unpremul_u8(0, 0), 0);
    assert_eq!(unpremul_u8(64, 128), 128);
}

#[test]
fn rng_is_deterministic_per_seed() {
    let mut a = Rng64::new(42);
    let mut b = Rng64::new(42);
    let mut c = Rng64::new(43);
    let va: Vec<u64> = (0..8).map(|_| a.next_u64()).collect();
    let vb: Vec<u64> = (0..8).map(|_| b.next_u64()).collect();
    let vc: Vec<u64> = (0..8).map(|_| c.next_u64()).collect();
    assert_eq!(va, vb);
    assert_ne!(va, vc);
}

#[test]
fn rng_range_stays_in_bounds() {
    let mut rng = Rng64::new(7);
    for _ in 0..1000 {
        let v = rng.range(2.0, 4.0);
        assert!((2.0..4.0).contains(&v));
    }
}

use super::*;

#[test]
fn manual_clock_only_moves_forward_on_sleep() {
    let clock = ManualClock::new(5.0);
    clock.sleep_until_ms(2.0);
    assert_eq!(clock.now_ms(), 5.0);
    clock.sleep_until_ms(12.5);
    assert_eq!(clock.now_ms(), 12.5);
    clock.advance(-3.0);
    assert_eq!(clock.now_ms(), 12.5);
    clock.advance(1.5);
    assert_eq!(clock.now_ms(), 14.0);
}

#[test]
fn system_clock_is_monotonic() {
    let clock = SystemClock::new();
    let a = clock.now_ms();
    clock.sleep_until_ms(a + 2.0);
    let b = clock.now_ms();
    assert!(b >= a + 2.0);
    // Past deadlines return immediately.
    clock.sleep_until_ms(0.0);
}

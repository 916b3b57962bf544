use super::*;

const REFRESH: f64 = 16.67;

#[test]
fn steady_sixty_hz_stats() {
    let deltas = vec![16.67; 60];
    let s = summarize(&deltas, REFRESH, DEFAULT_VSYNC_EPSILON_MS).unwrap();
    assert_eq!(s.sample_count, 60);
    assert!((s.avg_fps - 60.0).abs() < 0.1);
    assert!((s.p95_ms - 16.67).abs() < 1e-9);
    assert_eq!(s.long_frames, 0);
    assert_eq!(s.vsync_rate_pct, 100);
}

#[test]
fn one_long_frame_is_counted() {
    let mut deltas = vec![16.67; 59];
    deltas.push(50.0);
    let s = summarize(&deltas, REFRESH, DEFAULT_VSYNC_EPSILON_MS).unwrap();
    assert!((s.long_frame_threshold_ms - 25.005).abs() < 1e-9);
    assert_eq!(s.long_frames, 1);
}

#[test]
fn threshold_has_a_floor() {
    assert_eq!(long_frame_threshold(8.33), 25.0);
    assert_eq!(long_frame_threshold(33.33), 1.5 * 33.33);
}

#[test]
fn percentile_uses_floor_rank() {
    let v: Vec<f64> = (1..=10).map(f64::from).collect();
    // floor(9 * 0.95) = 8 -> 9.0
    assert_eq!(percentile(&v, 0.95), Some(9.0));
    assert_eq!(percentile(&v, 0.0), Some(1.0));
    assert_eq!(percentile(&v, 1.5), Some(10.0));
    assert_eq!(percentile(&[], 0.5), None);
}

#[test]
fn median_takes_upper_middle() {
    assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(3.0));
    assert_eq!(median(&[]), None);
}

#[test]
fn vsync_counts_whole_multiples() {
    // 33.34 is two periods; 25.0 is between; 8.0 snaps to k = 1 and misses.
    let deltas = [16.67, 33.34, 25.0, 8.0];
    assert_eq!(vsync_rate(&deltas, REFRESH, 0.6), Some(50));
    assert_eq!(vsync_rate(&[], REFRESH, 0.6), None);
    assert_eq!(vsync_rate(&[16.0], 0.0, 0.6), None);
}

#[test]
fn empty_window_has_no_stats() {
    assert!(summarize(&[], REFRESH, 0.6).is_none());
}

#[test]
fn recorder_discards_warmup_and_stops_when_closed() {
    let mut r = FrameRecorder::new(1000.0);
    assert!(!r.record(500.0, 16.0));
    assert!(!r.record(1000.0, 16.0));
    assert!(r.record(1016.0, 16.0));
    r.close();
    assert!(!r.record(1032.0, 16.0));
    assert_eq!(r.deltas(), vec![16.0]);
    assert!(r.is_closed());
}

#[test]
fn fps_counter_reports_once_per_window() {
    let mut c = FpsCounter::new(1000.0);
    assert_eq!(c.tick(0.0), None);
    for i in 1..=62 {
        assert_eq!(c.tick(f64::from(i) * 16.0), None);
    }
    // 64 frames over 1008 ms.
    assert_eq!(c.tick(63.0 * 16.0), Some(63));
    assert_eq!(c.fps(), Some(63));
    assert_eq!(c.band(), Some(FpsBand::High));
    c.reset();
    assert_eq!(c.fps(), None);
}

#[test]
fn fps_bands() {
    assert_eq!(FpsBand::classify(50), FpsBand::High);
    assert_eq!(FpsBand::classify(49), FpsBand::Medium);
    assert_eq!(FpsBand::classify(30), FpsBand::Medium);
    assert_eq!(FpsBand::classify(29), FpsBand::Low);
}

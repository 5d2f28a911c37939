mod common;

mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::common::{BLACK, WHITE, engine, pulse_after, stabilize};
    use embassy_time::{Duration, Instant};
    use pov_blade_composer::{
        BitmapSource, ColorDepth, DisplayProfile, SegmentCount, TextPosition, TextSpec,
    };

    const PERIOD: u32 = 1_280_000;

    fn bitmap_rows() -> Vec<u32> {
        let mut rows = vec![0u32; 128 * 2];
        rows[0] = 0xFFFF_FFFF;
        rows[1] = 0xFFFF_FFFF;
        rows
    }

    fn bitmap(rows: &[u32]) -> BitmapSource<'_> {
        BitmapSource {
            rows,
            columns: 2,
            segments: SegmentCount::S128,
            depth: ColorDepth::Bits1,
            tdc_slot: 3,
            palette: &[BLACK, WHITE],
        }
    }

    #[test]
    fn test_profile_ids_ascend() {
        let first = DisplayProfile::empty();
        let second = DisplayProfile::empty();
        assert!(second.id().raw() > first.id().raw());
    }

    #[test]
    fn test_activate_applies_bitmap_geometry() {
        let (mut engine, _rig) = engine(48);
        let rows = bitmap_rows();
        let source = bitmap(&rows);
        let mut profile = DisplayProfile::with_bitmap(&source);

        profile.activate(&mut engine, Instant::from_millis(0));
        assert_eq!(engine.active_profile(), Some(profile.id()));
        assert_eq!(engine.num_segments(), 128);
        assert_eq!(engine.tdc_slot(), 3);
        assert_eq!(engine.segment_buffer().pixel(0, 20), 1);
        assert_eq!(engine.segment_buffer().pixel(1, 20), 0);
        // A fresh activation always re-stabilizes before displaying.
        assert!(!engine.is_synchronized());
    }

    #[test]
    fn test_refresh_of_inactive_profile_is_a_no_op() {
        let (mut engine, _rig) = engine(48);
        let rows = bitmap_rows();
        let source = bitmap(&rows);
        let mut active = DisplayProfile::with_bitmap(&source);

        let texts = [TextSpec {
            text: "HI",
            position: TextPosition::Top,
            top_row: 40,
            color: 1,
            background: 1,
            invert: false,
        }];
        let mut other = DisplayProfile::with_text(&texts);
        other.set_display(SegmentCount::S16, ColorDepth::Bits1, 0, &[BLACK, WHITE]);

        active.activate(&mut engine, Instant::from_millis(0));
        other.refresh(&mut engine);

        // Geometry and ownership stay with the active profile, and the
        // stale profile's text never reached the buffer.
        assert_eq!(engine.active_profile(), Some(active.id()));
        assert_eq!(engine.num_segments(), 128);
        assert!(other.update(&mut engine, Instant::from_millis(1)));
    }

    #[test]
    fn test_activating_another_profile_displaces_the_first() {
        let (mut engine, _rig) = engine(48);
        let rows = bitmap_rows();
        let source = bitmap(&rows);
        let mut first = DisplayProfile::with_bitmap(&source);
        let mut second = DisplayProfile::empty();
        second.set_display(SegmentCount::S32, ColorDepth::Bits2, 0, &[BLACK]);

        first.activate(&mut engine, Instant::from_millis(0));
        second.activate(&mut engine, Instant::from_millis(5));

        assert_eq!(engine.active_profile(), Some(second.id()));
        assert_eq!(engine.num_segments(), 32);
        // The displaced profile reports expired from update().
        assert!(first.update(&mut engine, Instant::from_millis(6)));
        assert!(!second.update(&mut engine, Instant::from_millis(6)));
    }

    #[test]
    fn test_duration_expiry_fires_callback_once() {
        static EXPIRED: AtomicUsize = AtomicUsize::new(0);
        fn on_expire(_: pov_blade_composer::ProfileId) {
            EXPIRED.fetch_add(1, Ordering::Relaxed);
        }

        let (mut engine, _rig) = engine(48);
        let mut profile = DisplayProfile::empty();
        profile.set_display(SegmentCount::S128, ColorDepth::Bits1, 0, &[BLACK, WHITE]);
        profile.set_timing(Some(Duration::from_millis(100)), None, 0);
        profile.set_expire_callback(on_expire);

        profile.activate(&mut engine, Instant::from_millis(0));
        assert!(!profile.update(&mut engine, Instant::from_millis(50)));
        assert_eq!(EXPIRED.load(Ordering::Relaxed), 0);

        assert!(profile.update(&mut engine, Instant::from_millis(100)));
        assert_eq!(EXPIRED.load(Ordering::Relaxed), 1);

        // Later polls stay expired without firing again.
        assert!(profile.update(&mut engine, Instant::from_millis(200)));
        assert_eq!(EXPIRED.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_activation_callback_fires_on_activate_not_refresh() {
        static ACTIVATED: AtomicUsize = AtomicUsize::new(0);
        fn on_activate(_: pov_blade_composer::ProfileId) {
            ACTIVATED.fetch_add(1, Ordering::Relaxed);
        }

        let (mut engine, _rig) = engine(48);
        let mut profile = DisplayProfile::empty();
        profile.set_display(SegmentCount::S128, ColorDepth::Bits1, 0, &[BLACK, WHITE]);
        profile.set_activation_callback(on_activate);

        profile.activate(&mut engine, Instant::from_millis(0));
        assert_eq!(ACTIVATED.load(Ordering::Relaxed), 1);
        profile.refresh(&mut engine);
        assert_eq!(ACTIVATED.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_rotation_stages_pending_tdc_slot() {
        let (mut engine, rig) = engine(48);
        let mut profile = DisplayProfile::empty();
        profile.set_display(SegmentCount::S128, ColorDepth::Bits1, 0, &[BLACK, WHITE]);
        profile.set_timing(None, Some(Duration::from_millis(10)), -1);

        profile.activate(&mut engine, Instant::from_millis(0));
        stabilize(&mut engine, &rig, PERIOD);
        pulse_after(&mut engine, &rig, PERIOD);
        assert_eq!(engine.tdc_slot(), 0);

        // Rotation period not yet elapsed: nothing staged.
        assert!(!profile.update(&mut engine, Instant::from_millis(5)));
        assert_eq!(engine.pending_tdc_slot(), 0);

        // Period elapsed: shift staged but invisible until the pulse.
        assert!(!profile.update(&mut engine, Instant::from_millis(10)));
        assert_eq!(engine.tdc_slot(), 0);
        assert_eq!(engine.pending_tdc_slot(), 127);

        pulse_after(&mut engine, &rig, PERIOD);
        assert_eq!(engine.tdc_slot(), 127);
    }

    #[test]
    fn test_refresh_redraws_without_restarting_duration() {
        let (mut engine, _rig) = engine(48);
        let mut profile = DisplayProfile::empty();
        profile.set_display(SegmentCount::S128, ColorDepth::Bits1, 0, &[BLACK, WHITE]);
        profile.set_timing(Some(Duration::from_millis(100)), None, 0);

        profile.activate(&mut engine, Instant::from_millis(0));
        engine.set_pixel(0, 0, 1);
        profile.refresh(&mut engine);
        // Refresh did not move the expiry deadline.
        assert!(profile.update(&mut engine, Instant::from_millis(100)));
    }
}

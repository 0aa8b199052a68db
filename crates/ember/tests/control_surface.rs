//! End-to-end behaviour of the host control surface.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use ember::render::{synthetic_workload, EngineState, HeadlessBackend};
use ember::{clamp_thread_request, ControlSurface, EngineConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

type Surface = ControlSurface<HeadlessBackend>;

fn frame_tag(text: &str) -> Option<&str> {
    text.lines().next()
}

#[test]
fn test_basic_lifecycle() {
    let surface = Surface::new();
    assert!(surface.initialize(4, 1920, 1080));
    assert_eq!(surface.thread_count(), 4);
    assert_eq!(surface.state(), EngineState::Running);

    for _ in 0..10 {
        surface.update();
        surface.render();
    }

    assert!(!surface.cpu_profile().is_empty());
    assert!(!surface.gpu_profile().is_empty());
    assert_eq!(surface.frames_presented(), 10);

    surface.shutdown();
    assert_eq!(surface.state(), EngineState::Terminated);
    assert!(surface.cpu_profile().is_empty());
    assert!(surface.gpu_profile().is_empty());
    assert_eq!(surface.thread_count(), 0);
}

#[test]
fn test_thread_count_matches_request() {
    for threads in 2..=16 {
        let surface = Surface::new();
        assert!(surface.initialize(threads, 640, 480), "threads = {threads}");
        assert_eq!(surface.thread_count(), threads);
        surface.shutdown();
    }
}

#[test]
fn test_out_of_range_thread_counts() {
    let surface = Surface::new();
    assert!(!surface.initialize(1, 800, 600));
    assert!(!surface.initialize(17, 800, 600));
    assert!(!surface.initialize(-4, 800, 600));
    assert_eq!(surface.thread_count(), 0);

    assert!(surface.initialize(clamp_thread_request(1), 800, 600));
    assert_eq!(surface.thread_count(), 2);
}

#[test]
fn test_double_initialize_keeps_first_instance() {
    let surface = Surface::new();
    assert!(surface.initialize(3, 800, 600));
    surface.render();

    assert!(!surface.initialize(8, 1920, 1080));
    assert_eq!(surface.thread_count(), 3);
    assert_eq!(surface.state(), EngineState::Running);

    surface.render();
    assert_eq!(surface.frames_presented(), 2);
}

#[test]
fn test_bad_resolution_fails() {
    let surface = Surface::new();
    assert!(!surface.initialize(4, 0, 1080));
    assert!(!surface.initialize(4, 1920, -1));
    assert!(!surface.initialize(4, 100_000, 1080));
    assert_eq!(surface.state(), EngineState::Uninitialized);
}

#[test]
fn test_profiles_empty_before_first_frame() {
    let surface = Surface::new();
    assert!(surface.cpu_profile().is_empty());

    assert!(surface.initialize(2, 320, 240));
    assert!(surface.cpu_profile().is_empty());
    assert!(surface.gpu_profile().is_empty());
    assert!(surface.snapshot().frame.is_none());
}

#[test]
fn test_presented_equals_cycles_minus_resets() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let surface = Surface::new();
    assert!(surface.initialize(4, 320, 240));
    surface.set_workload(synthetic_workload(300, 4));

    let cycles = 200;
    let mut resets = 0;
    for _ in 0..cycles {
        if rng.gen_bool(0.2) {
            surface.signal_reset();
            resets += 1;
        }
        surface.update();
        surface.render();
    }

    assert!(resets > 0);
    assert_eq!(surface.frames_presented(), cycles - resets);
}

#[test]
fn test_reset_without_update_skips_render() {
    let surface = Surface::new();
    assert!(surface.initialize(2, 320, 240));

    surface.signal_reset();
    surface.render();
    assert_eq!(surface.frames_presented(), 0);

    surface.render();
    assert_eq!(surface.frames_presented(), 1);
}

#[test]
fn test_reset_wins_over_resize() {
    let surface = Surface::new();
    assert!(surface.initialize(2, 320, 240));
    surface.set_workload(synthetic_workload(20, 1));
    surface.render();

    assert!(surface.resize(640, 480));
    surface.signal_reset();
    surface.update();
    surface.render();
    assert_eq!(surface.frames_presented(), 1);

    surface.update();
    surface.render();
    assert_eq!(surface.frames_presented(), 2);
    let snapshot = surface.snapshot();
    assert_eq!(snapshot.frame, Some(1));
}

#[test]
fn test_runtime_settings_validated() {
    let surface = Surface::new();
    assert!(surface.initialize(2, 320, 240));

    assert!(surface.set_anisotropy(1));
    assert!(surface.set_anisotropy(16));
    assert!(!surface.set_anisotropy(0));
    assert!(!surface.set_anisotropy(17));

    assert!(surface.resize(1280, 720));
    assert!(!surface.resize(0, 720));
    assert!(!surface.resize(-1280, 720));
}

#[test]
fn test_initialize_with_toml_config() {
    let config = EngineConfig::from_toml_str(
        r#"
        render_threads = 6
        width = 1024
        height = 768
        anisotropy = 4
        frames_in_flight = 3
        "#,
    )
    .unwrap();

    let surface = Surface::new();
    assert!(surface.initialize_with(config));
    assert_eq!(surface.thread_count(), 6);
    for _ in 0..5 {
        surface.render();
    }
    assert_eq!(surface.frames_presented(), 5);
}

#[test]
fn test_oversized_recorder_limit_fails_initialize() {
    let config = EngineConfig::from_toml_str(
        r#"
        render_threads = 2
        width = 64
        height = 64

        [recorder]
        initial_commands = 16
        max_commands = 4611686018427387904
        "#,
    )
    .unwrap();

    let surface = Surface::new();
    let initialized = panic::catch_unwind(AssertUnwindSafe(|| surface.initialize_with(config)));
    assert_eq!(initialized.ok(), Some(false));
    assert_eq!(surface.state(), EngineState::Uninitialized);
    assert_eq!(surface.thread_count(), 0);
}

#[test]
fn test_concurrent_readers_see_consistent_snapshots() {
    let surface = Arc::new(Surface::new());
    assert!(surface.initialize(4, 640, 480));
    surface.set_workload(synthetic_workload(2_000, 8));

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let surface = Arc::clone(&surface);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut checked = 0u64;
                while !done.load(Ordering::Acquire) {
                    let snapshot = surface.snapshot();
                    if snapshot.frame.is_some() {
                        assert_eq!(frame_tag(&snapshot.cpu), frame_tag(&snapshot.gpu));
                        checked += 1;
                    }
                    // Queries never block on the frame in flight
                    let _ = surface.thread_count();
                }
                checked
            })
        })
        .collect();

    for _ in 0..100 {
        surface.update();
        surface.render();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(surface.frames_presented(), 100);
    assert_eq!(frame_tag(&surface.cpu_profile()), Some("Frame 99"));
}

#[test]
fn test_shutdown_idempotent_and_final() {
    let surface = Surface::new();
    surface.shutdown();
    assert!(surface.initialize(2, 320, 240));
    surface.render();

    surface.shutdown();
    surface.shutdown();
    surface.update();
    surface.render();

    assert_eq!(surface.state(), EngineState::Terminated);
    assert!(!surface.initialize(2, 320, 240));
    assert!(!surface.set_workload(Vec::new()));
    assert!(surface.snapshot().frame.is_none());
}

#[test]
fn test_reset_raised_from_another_thread() {
    let surface = Arc::new(Surface::new());
    assert!(surface.initialize(2, 320, 240));

    let remote = Arc::clone(&surface);
    thread::spawn(move || remote.signal_reset()).join().unwrap();

    surface.update();
    surface.render();
    surface.update();
    surface.render();
    assert_eq!(surface.frames_presented(), 1);
}

#[test]
fn test_global_surface_is_shared() {
    let a = ControlSurface::global();
    let b = ControlSurface::global();
    assert!(std::ptr::eq(a, b));
}

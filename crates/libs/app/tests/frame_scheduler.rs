mod mock_backend;

use app::{
    AcquireOutcome, FrameConfig, FrameError, FrameStats, FrameStatus, PresentOutcome,
    SurfaceExtent, SwapchainProvider,
};
use mock_backend::{scheduler, surface, try_scheduler, Call, Scripted, IMAGE_COUNT};

const PRESENTED: FrameStatus = FrameStatus::Presented { rebuilt: false };
const PRESENTED_AND_REBUILT: FrameStatus = FrameStatus::Presented { rebuilt: true };

fn is_rebuild(call: &Call) -> bool {
    matches!(call, Call::Rebuild { .. })
}

fn is_present(call: &Call) -> bool {
    matches!(call, Call::Present { .. })
}

#[test]
fn frame_follows_wait_acquire_reset_record_submit_present() {
    let (mut scheduler, state, _) = scheduler(2);
    let surface = surface();

    assert_eq!(scheduler.draw_frame(&surface).unwrap(), PRESENTED);
    assert_eq!(scheduler.draw_frame(&surface).unwrap(), PRESENTED);

    let calls = state.borrow().calls.clone();
    assert_eq!(
        calls,
        vec![
            Call::WaitFence { fence: 0 },
            Call::Acquire { semaphore: 0 },
            Call::ResetFence { fence: 0 },
            Call::Record {
                frame: 0,
                image_index: 0,
                generation: 0
            },
            Call::Update { frame: 0 },
            Call::Submit {
                fence: 0,
                wait: 0,
                signal: 1
            },
            Call::Present {
                image_index: 0,
                wait: 1
            },
            Call::WaitFence { fence: 1 },
            Call::Acquire { semaphore: 2 },
            Call::ResetFence { fence: 1 },
            Call::Record {
                frame: 1,
                image_index: 1,
                generation: 0
            },
            Call::Update { frame: 1 },
            Call::Submit {
                fence: 1,
                wait: 2,
                signal: 3
            },
            Call::Present {
                image_index: 1,
                wait: 3
            },
        ]
    );
}

#[test]
fn steady_state_cycles_two_frames_for_a_thousand_iterations() {
    let (mut scheduler, state, _) = scheduler(2);
    let surface = surface();

    for iteration in 0..1000 {
        assert_eq!(scheduler.current_frame(), iteration % 2);
        assert_eq!(scheduler.draw_frame(&surface).unwrap(), PRESENTED);
    }

    assert_eq!(
        scheduler.stats(),
        FrameStats {
            frames_presented: 1000,
            frames_skipped: 0,
            rebuilds: 0,
        }
    );
    let state = state.borrow();
    assert_eq!(state.count(|c| matches!(c, Call::Submit { .. })), 1000);
    assert_eq!(state.count(|c| *c == Call::WaitIdle), 0);
}

#[test]
fn records_into_the_acquired_image() {
    let (mut scheduler, state, _) = scheduler(2);
    let surface = surface();

    for _ in 0..6 {
        scheduler.draw_frame(&surface).unwrap();
    }

    let recorded = state
        .borrow()
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::Record {
                frame, image_index, ..
            } => Some((*frame, *image_index)),
            _ => None,
        })
        .collect::<Vec<_>>();
    let expected = (0..6)
        .map(|i| (i % 2, i as u32 % IMAGE_COUNT))
        .collect::<Vec<_>>();
    assert_eq!(recorded, expected);
}

#[test]
fn in_flight_frames_never_exceed_the_slot_count() {
    for frames_in_flight in 1..=3 {
        let (mut scheduler, state, _) = scheduler(frames_in_flight);
        let surface = surface();

        for _ in 0..50 {
            scheduler.draw_frame(&surface).unwrap();
            assert!(state.borrow().pending() <= frames_in_flight);
        }

        assert_eq!(state.borrow().max_pending, frames_in_flight);
        assert_eq!(scheduler.frames_in_flight(), frames_in_flight);
    }
}

#[test]
fn out_of_date_acquire_rebuilds_once_and_submits_nothing() {
    let (mut scheduler, state, _) = scheduler(2);
    let surface = surface();
    state
        .borrow_mut()
        .acquire_script
        .insert(3, AcquireOutcome::OutOfDate);

    scheduler.draw_frame(&surface).unwrap();
    scheduler.draw_frame(&surface).unwrap();
    let before = state.borrow().calls.len();

    assert_eq!(scheduler.draw_frame(&surface).unwrap(), FrameStatus::Skipped);
    assert_eq!(scheduler.current_frame(), 0);
    assert_eq!(
        state.borrow().calls[before..].to_vec(),
        vec![
            Call::WaitFence { fence: 0 },
            Call::Acquire { semaphore: 0 },
            Call::WaitIdle,
            Call::Rebuild {
                width: 800,
                height: 600
            },
        ]
    );

    // Next iteration resumes normally on the same slot and the new generation
    assert_eq!(scheduler.draw_frame(&surface).unwrap(), PRESENTED);
    assert_eq!(scheduler.current_frame(), 1);
    assert!(state.borrow().calls.contains(&Call::Record {
        frame: 0,
        image_index: 0,
        generation: 1
    }));
    assert_eq!(
        scheduler.stats(),
        FrameStats {
            frames_presented: 3,
            frames_skipped: 1,
            rebuilds: 1,
        }
    );
}

#[test]
fn suboptimal_present_on_iteration_37_rebuilds_right_after_presenting() {
    let (mut scheduler, state, _) = scheduler(2);
    let surface = surface();
    state
        .borrow_mut()
        .present_script
        .insert(37, Scripted::Present(PresentOutcome::Suboptimal));

    for iteration in 1..=40 {
        let status = scheduler.draw_frame(&surface).unwrap();
        if iteration == 37 {
            assert_eq!(status, PRESENTED_AND_REBUILT);
        } else {
            assert_eq!(status, PRESENTED);
        }
        assert_eq!(scheduler.current_frame(), iteration % 2);
    }

    let state = state.borrow();
    let presents = state.positions(is_present);
    let rebuilds = state.positions(is_rebuild);
    assert_eq!(rebuilds, vec![presents[36] + 2]);
    assert_eq!(state.calls[presents[36] + 1], Call::WaitIdle);
    assert_eq!(scheduler.stats().rebuilds, 1);
}

#[test]
fn suboptimal_acquire_still_draws_and_present_triggers_the_rebuild() {
    let (mut scheduler, state, _) = scheduler(2);
    let surface = surface();
    {
        let mut state = state.borrow_mut();
        state.acquire_script.insert(
            4,
            AcquireOutcome::Acquired {
                image_index: 0,
                suboptimal: true,
            },
        );
        state
            .present_script
            .insert(4, Scripted::Present(PresentOutcome::Suboptimal));
    }

    for _ in 0..3 {
        assert_eq!(scheduler.draw_frame(&surface).unwrap(), PRESENTED);
    }
    let before = state.borrow().calls.len();

    assert_eq!(
        scheduler.draw_frame(&surface).unwrap(),
        PRESENTED_AND_REBUILT
    );

    let state = state.borrow();
    let calls = &state.calls[before..];
    assert!(calls.contains(&Call::Record {
        frame: 1,
        image_index: 0,
        generation: 0
    }));
    let present = calls.iter().position(is_present).unwrap();
    let rebuild = calls.iter().position(is_rebuild).unwrap();
    assert!(rebuild > present);
    assert_eq!(calls[present + 1], Call::WaitIdle);
    assert_eq!(scheduler.stats().frames_skipped, 0);
    assert_eq!(scheduler.stats().rebuilds, 1);
}

#[test]
fn out_of_date_present_is_recovered_by_a_rebuild() {
    let (mut scheduler, state, _) = scheduler(2);
    let surface = surface();
    state
        .borrow_mut()
        .present_script
        .insert(5, Scripted::Present(PresentOutcome::OutOfDate));

    for iteration in 1..=8 {
        let status = scheduler.draw_frame(&surface).unwrap();
        assert_eq!(status == PRESENTED_AND_REBUILT, iteration == 5);
    }

    assert_eq!(scheduler.stats().rebuilds, 1);
    assert_eq!(scheduler.stats().frames_presented, 8);
}

#[test]
fn resize_between_iterations_10_and_11_rebuilds_at_the_end_of_11() {
    let (mut scheduler, state, resize) = scheduler(2);
    let surface = surface();

    for iteration in 1..=15 {
        if iteration == 11 {
            surface.resize(1024, 768);
            resize.raise();
        }

        let status = scheduler.draw_frame(&surface).unwrap();
        if iteration == 11 {
            assert_eq!(status, PRESENTED_AND_REBUILT);
            assert!(!resize.is_raised());
        } else {
            assert_eq!(status, PRESENTED);
        }
    }

    let state = state.borrow();
    let presents = state.positions(is_present);
    assert_eq!(state.positions(is_rebuild), vec![presents[10] + 2]);
    assert_eq!(
        state.calls[presents[10] + 2],
        Call::Rebuild {
            width: 1024,
            height: 768
        }
    );
    assert_eq!(scheduler.swapchain().extent(), SurfaceExtent::new(1024, 768));
}

#[test]
fn zero_area_surface_defers_the_rebuild_until_it_has_a_size() {
    let (mut scheduler, state, resize) = scheduler(2);
    let surface = surface();

    assert_eq!(scheduler.draw_frame(&surface).unwrap(), PRESENTED);

    // Minimized
    surface.resize(0, 0);
    resize.raise();
    assert_eq!(scheduler.draw_frame(&surface).unwrap(), PRESENTED);
    assert!(scheduler.is_rebuild_pending());

    let before = state.borrow().calls.len();
    for _ in 0..5 {
        assert_eq!(scheduler.draw_frame(&surface).unwrap(), FrameStatus::Stalled);
    }
    assert_eq!(state.borrow().calls.len(), before);
    assert_eq!(state.borrow().count(is_rebuild), 0);

    // Restored
    surface.resize(1024, 768);
    assert_eq!(scheduler.draw_frame(&surface).unwrap(), PRESENTED);
    assert!(!scheduler.is_rebuild_pending());

    let state = state.borrow();
    assert_eq!(state.calls[before], Call::WaitIdle);
    assert_eq!(
        state.calls[before + 1],
        Call::Rebuild {
            width: 1024,
            height: 768
        }
    );
    assert!(state.calls.contains(&Call::Record {
        frame: 0,
        image_index: 0,
        generation: 1
    }));
    assert_eq!(scheduler.stats().rebuilds, 1);
}

#[test]
fn out_of_date_acquire_on_a_zero_area_surface_stalls() {
    let (mut scheduler, state, _) = scheduler(2);
    let surface = surface();
    surface.resize(800, 0);
    state
        .borrow_mut()
        .acquire_script
        .insert(1, AcquireOutcome::OutOfDate);

    assert_eq!(scheduler.draw_frame(&surface).unwrap(), FrameStatus::Skipped);
    assert_eq!(scheduler.draw_frame(&surface).unwrap(), FrameStatus::Stalled);
    assert_eq!(state.borrow().count(|c| *c == Call::WaitIdle), 0);
    assert_eq!(state.borrow().count(is_rebuild), 0);

    surface.resize(800, 600);
    assert_eq!(scheduler.draw_frame(&surface).unwrap(), PRESENTED);
    assert_eq!(scheduler.stats().rebuilds, 1);
}

#[test]
fn slot_rotation_is_unaffected_by_rebuilds() {
    let (mut scheduler, state, _) = scheduler(3);
    let surface = surface();
    {
        let mut state = state.borrow_mut();
        state
            .present_script
            .insert(4, Scripted::Present(PresentOutcome::Suboptimal));
        state
            .present_script
            .insert(9, Scripted::Present(PresentOutcome::OutOfDate));
        state.acquire_script.insert(6, AcquireOutcome::OutOfDate);
    }

    let statuses = (0..20)
        .map(|_| scheduler.draw_frame(&surface).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(
        statuses.iter().filter(|s| **s == FrameStatus::Skipped).count(),
        1
    );

    let state = state.borrow();
    let submitted_frames = state
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::Submit { fence, .. } => Some(*fence),
            _ => None,
        })
        .collect::<Vec<_>>();
    let expected = (0..submitted_frames.len())
        .map(|i| i % 3)
        .collect::<Vec<_>>();
    assert_eq!(submitted_frames, expected);

    // Every rebuild happens behind a device idle barrier
    let rebuilds = state.positions(is_rebuild);
    assert_eq!(rebuilds.len(), 3);
    for position in rebuilds {
        assert_eq!(state.calls[position - 1], Call::WaitIdle);
    }
}

#[test]
fn rebuilding_an_unchanged_surface_yields_an_equivalent_generation() {
    let (mut scheduler, _, _) = scheduler(2);
    let surface = surface();
    let initial = *scheduler.swapchain().generation();

    assert!(scheduler.rebuild_swapchain(&surface).unwrap());
    let first = *scheduler.swapchain().generation();
    assert!(scheduler.rebuild_swapchain(&surface).unwrap());
    let second = *scheduler.swapchain().generation();

    for generation in [first, second] {
        assert_eq!(generation.format, initial.format);
        assert_eq!(generation.present_mode, initial.present_mode);
        assert_eq!(generation.extent, initial.extent);
    }
    assert_eq!((first.id, second.id), (1, 2));
    assert_eq!(scheduler.stats().rebuilds, 2);
}

#[test]
fn fence_timeout_is_fatal() {
    let (mut scheduler, state, _) = scheduler(2);
    state.borrow_mut().stuck_fences = true;

    let result = scheduler.draw_frame(&surface());

    assert!(matches!(result, Err(FrameError::FenceTimeout { frame: 0 })));
    assert_eq!(state.borrow().calls, vec![Call::WaitFence { fence: 0 }]);
}

#[test]
fn acquire_timeout_is_fatal_and_leaves_the_fence_signaled() {
    let (mut scheduler, state, _) = scheduler(2);
    state
        .borrow_mut()
        .acquire_script
        .insert(1, AcquireOutcome::TimedOut);

    let result = scheduler.draw_frame(&surface());

    assert!(matches!(result, Err(FrameError::AcquireTimeout { frame: 0 })));
    assert_eq!(
        state.borrow().count(|c| matches!(c, Call::ResetFence { .. })),
        0
    );
}

#[test]
fn backend_errors_propagate_without_advancing() {
    let (mut scheduler, state, _) = scheduler(2);
    let surface = surface();
    state.borrow_mut().present_script.insert(2, Scripted::Fail);

    scheduler.draw_frame(&surface).unwrap();
    let result = scheduler.draw_frame(&surface);

    match result {
        Err(FrameError::Backend(err)) => assert_eq!(err.to_string(), "device lost"),
        other => panic!("expected a backend error, got {other:?}"),
    }
    assert_eq!(scheduler.current_frame(), 1);
    assert_eq!(scheduler.stats().frames_presented, 1);
}

#[test]
fn zero_frames_in_flight_is_rejected_before_allocating() {
    let (result, state, _) = try_scheduler(FrameConfig {
        frames_in_flight: 0,
        ..Default::default()
    });

    assert!(matches!(result, Err(FrameError::InvalidConfig(_))));
    assert!(state.borrow().fences.is_empty());
}

#[test]
fn frame_state_sees_monotonic_elapsed_time() {
    let (mut scheduler, state, _) = scheduler(2);
    let surface = surface();

    for _ in 0..20 {
        scheduler.draw_frame(&surface).unwrap();
    }

    let state = state.borrow();
    assert_eq!(state.elapsed.len(), 20);
    assert!(state.elapsed.windows(2).all(|w| w[0] <= w[1]));
}

//! Commit-handoff properties, observed through an instrumented region and
//! a scripted engine.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use stepline_common::{
    AxisCommand, DEFAULT_PERIOD_CYCLES, GlobalEnable, MotionCommand,
};
use stepline_relay::{
    ALL_AXES_ENABLE_OFFSET, CommandRegion, CommandRelay, PulseEngine, REGION_SIZE, RelayError,
    SEMAPHORE_OFFSET, axis_direction_offset, axis_enabled_offset, axis_period_offset,
};

/// Region that records the order of every write.
#[derive(Default)]
struct RecordingRegion {
    cells: [u32; REGION_SIZE / 4],
    writes: Vec<(usize, u32)>,
    clears: usize,
}

impl CommandRegion for RecordingRegion {
    fn write_u32(&mut self, offset: usize, value: u32) {
        assert!(offset % 4 == 0 && offset + 4 <= REGION_SIZE);
        self.cells[offset / 4] = value;
        self.writes.push((offset, value));
    }

    fn read_u32(&self, offset: usize) -> u32 {
        self.cells[offset / 4]
    }

    fn clear(&mut self) {
        self.cells = [0; REGION_SIZE / 4];
        self.clears += 1;
    }
}

/// Engine that counts starts and stops.
#[derive(Clone, Default)]
struct ScriptedEngine {
    starts: Arc<AtomicU32>,
    stops: Arc<AtomicU32>,
}

impl PulseEngine for ScriptedEngine {
    fn start(&mut self, _program_image: &Path) -> Result<(), RelayError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RelayError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn scenario_command() -> MotionCommand {
    // Axis 0 runs at 5 000 000 cycles forward; the rest sit disabled at
    // the default period.
    let mut cmd = MotionCommand::user_data("scenario");
    cmd.all_axes_enable = GlobalEnable::Enabled;
    cmd.axes[0] = AxisCommand {
        enabled: true,
        direction: true,
        period: 5_000_000,
    };
    for axis in &mut cmd.axes[1..] {
        *axis = AxisCommand {
            enabled: false,
            direction: false,
            period: 50_000,
        };
    }
    cmd
}

#[test]
fn start_clears_region_before_engine_runs() {
    let mut region = RecordingRegion::default();
    region.cells[3] = 99; // stale garbage from a previous life
    let engine = ScriptedEngine::default();

    {
        let relay =
            CommandRelay::start(&mut region, engine.clone(), Path::new("stepper_io.bin")).unwrap();
        assert!(!relay.is_ended());
    }
    assert_eq!(region.clears, 1);
    assert!(region.cells.iter().all(|&c| c == 0));
    assert_eq!(engine.starts.load(Ordering::SeqCst), 1);
    assert_eq!(engine.stops.load(Ordering::SeqCst), 0);
}

#[test]
fn write_order_data_then_semaphore() {
    // Drive the protocol by hand against the recording region so the write
    // log is inspectable.
    let mut region = RecordingRegion::default();
    let engine = ScriptedEngine::default();
    {
        let mut relay =
            CommandRelay::start(&mut region, engine, Path::new("stepper_io.bin")).unwrap();
        relay.apply(&scenario_command()).unwrap();
        relay.apply(&scenario_command()).unwrap();
    }

    // Two batches of 20 writes each.
    assert_eq!(region.writes.len(), 40);
    for batch in region.writes.chunks(20) {
        let (last_offset, last_value) = *batch.last().unwrap();
        assert_eq!(last_offset, SEMAPHORE_OFFSET, "semaphore must be last");
        assert_eq!(last_value, 1);
        // No data offset is written after the semaphore, and the semaphore
        // appears exactly once per batch.
        assert!(
            batch[..batch.len() - 1]
                .iter()
                .all(|(off, _)| *off != SEMAPHORE_OFFSET)
        );
    }
}

#[test]
fn scenario_offsets_match_engine_contract() {
    let mut region = RecordingRegion::default();
    {
        let mut relay = CommandRelay::start(
            &mut region,
            ScriptedEngine::default(),
            Path::new("stepper_io.bin"),
        )
        .unwrap();
        relay.apply(&scenario_command()).unwrap();
    }

    assert_eq!(region.read_u32(ALL_AXES_ENABLE_OFFSET), 1);
    assert_eq!(region.read_u32(axis_enabled_offset(0)), 1);
    assert_eq!(region.read_u32(axis_period_offset(0)), 5_000_000);
    assert_eq!(region.read_u32(axis_direction_offset(0)), 1);
    for axis in 1..6 {
        assert_eq!(region.read_u32(axis_enabled_offset(axis)), 0);
        assert_eq!(region.read_u32(axis_period_offset(axis)), 50_000);
        assert_eq!(region.read_u32(axis_direction_offset(axis)), 0);
    }
    assert_eq!(region.read_u32(SEMAPHORE_OFFSET), 1);
}

#[test]
fn zero_received_period_lands_as_default() {
    let mut region = RecordingRegion::default();
    {
        let mut relay = CommandRelay::start(
            &mut region,
            ScriptedEngine::default(),
            Path::new("stepper_io.bin"),
        )
        .unwrap();
        let mut cmd = scenario_command();
        cmd.axes[3].period = 0;
        relay.apply(&cmd).unwrap();
    }
    assert_eq!(
        region.read_u32(axis_period_offset(3)),
        DEFAULT_PERIOD_CYCLES
    );
}

#[test]
fn sentinel_stops_engine_and_ends_session() {
    let engine = ScriptedEngine::default();
    let mut relay = CommandRelay::start(
        RecordingRegion::default(),
        engine.clone(),
        Path::new("stepper_io.bin"),
    )
    .unwrap();

    let mut cmd = scenario_command();
    cmd.all_axes_enable = GlobalEnable::Shutdown;
    relay.apply(&cmd).unwrap();

    assert!(relay.is_ended());
    assert_eq!(engine.stops.load(Ordering::SeqCst), 1);

    // Subsequent updates are refused.
    let err = relay.apply(&scenario_command()).unwrap_err();
    assert!(matches!(err, RelayError::SessionEnded));
    // And the engine is not stopped twice.
    assert_eq!(engine.stops.load(Ordering::SeqCst), 1);
}

#[test]
fn sentinel_batch_is_still_committed_in_order() {
    let mut region = RecordingRegion::default();
    {
        let mut relay = CommandRelay::start(
            &mut region,
            ScriptedEngine::default(),
            Path::new("stepper_io.bin"),
        )
        .unwrap();
        let mut cmd = scenario_command();
        cmd.all_axes_enable = GlobalEnable::Shutdown;
        relay.apply(&cmd).unwrap();
    }

    // The sentinel value itself reaches the region before the stop.
    assert_eq!(region.read_u32(ALL_AXES_ENABLE_OFFSET), 2);
    let (last_offset, _) = *region.writes.last().unwrap();
    assert_eq!(last_offset, SEMAPHORE_OFFSET);
}

#[test]
fn dropping_relay_leaves_engine_running() {
    let engine = ScriptedEngine::default();
    {
        let _relay = CommandRelay::start(
            RecordingRegion::default(),
            engine.clone(),
            Path::new("stepper_io.bin"),
        )
        .unwrap();
        // Relay goes away without a sentinel.
    }
    // The coprocessor keeps executing the last committed parameters.
    assert_eq!(engine.stops.load(Ordering::SeqCst), 0);
}

// Janus End-to-End Scenarios
//
// Complete typing sequences driven through the event loop with a scripted
// keyboard, a recording output and a manual clock. No hardware required.
//
// Run with: cargo test --test scenarios

use janus_core::{
    Config, Dispatcher, Edge, EventLoop, InputMessage, Key, ManualClock, OutputEvent,
    RecordingSink, ScriptedSource, Timestamp,
};

const ESC: Key = Key(1);
const TAB: Key = Key(15);
const LEFTCTRL: Key = Key(29);
const A: Key = Key(30);
const C: Key = Key(46);
const SPACE: Key = Key(57);
const CAPSLOCK: Key = Key(58);
const LEFTMETA: Key = Key(125);

// =========================================================================
// Test Helpers
// =========================================================================

const CONFIG: &str = r#"
    [general]
    hold_threshold_ms = 200

    [[keys]]
    key = "SPACE"
    secondary = "LEFTCTRL"

    [[keys]]
    key = "TAB"
    secondary = "LEFTMETA"

    [[keys]]
    key = "CAPSLOCK"
    primary = "ESC"
"#;

type TestLoop = EventLoop<ScriptedSource, RecordingSink, ManualClock>;

/// Build a loop from config text and a script of (ms, key, edge)
fn run_script(config: &str, script: &[(u64, Key, Edge)]) -> TestLoop {
    let config = Config::from_toml(config).unwrap();
    let clock = ManualClock::new();

    let mut source = ScriptedSource::new(clock.clone());
    for &(at, key, edge) in script {
        source.key(at, key, edge);
    }

    let dispatcher =
        Dispatcher::with_clock(config.mapping_table().unwrap(), config.hold_threshold, clock.clone());
    let mut event_loop = EventLoop::new(source, RecordingSink::timed(clock), dispatcher);
    event_loop.run().unwrap();
    event_loop
}

fn down(key: Key) -> OutputEvent {
    OutputEvent::new(key, Edge::Down)
}

fn up(key: Key) -> OutputEvent {
    OutputEvent::new(key, Edge::Up)
}

fn at(ms: u64) -> Timestamp {
    Timestamp::from_millis(ms)
}

fn assert_all_idle(event_loop: &TestLoop) {
    for state in event_loop.dispatcher().janus_states() {
        assert!(state.phase().is_idle(), "{} not idle", state);
    }
}

// =========================================================================
// Scenario 1: Quick tap types the primary function
// =========================================================================

#[test]
fn scenario_space_tap_types_space() {
    let event_loop = run_script(CONFIG, &[(0, SPACE, Edge::Down), (50, SPACE, Edge::Up)]);

    let output = event_loop.output();
    assert_eq!(output.events(), vec![down(SPACE), up(SPACE)]);
    assert_eq!(output.events_at(at(50)), vec![down(SPACE), up(SPACE)]);
    assert_all_idle(&event_loop);
}

// =========================================================================
// Scenario 2: Space held while typing a letter acts as Control
// =========================================================================

#[test]
fn scenario_rollover_commits_control_before_letter() {
    let event_loop = run_script(
        CONFIG,
        &[
            (0, SPACE, Edge::Down),
            (50, A, Edge::Down),
            (80, SPACE, Edge::Up),
            (120, A, Edge::Up),
        ],
    );

    let output = event_loop.output();
    assert_eq!(output.events_at(at(50)), vec![down(LEFTCTRL), down(A)]);
    assert_eq!(output.events_at(at(80)), vec![up(LEFTCTRL)]);
    assert_eq!(output.events_at(at(120)), vec![up(A)]);
    assert!(!output.events().contains(&down(SPACE)));
    assert_all_idle(&event_loop);
}

// =========================================================================
// Scenario 3: Holding past the threshold asserts Control on its own
// =========================================================================

#[test]
fn scenario_hold_alone_asserts_control_at_deadline() {
    let event_loop = run_script(
        CONFIG,
        &[
            (0, SPACE, Edge::Down),
            (400, C, Edge::Down),
            (420, C, Edge::Up),
            (600, SPACE, Edge::Up),
        ],
    );

    let output = event_loop.output();
    assert_eq!(output.events_at(at(200)), vec![down(LEFTCTRL)]);
    assert_eq!(output.events_at(at(400)), vec![down(C)]);
    assert_eq!(output.events_at(at(420)), vec![up(C)]);
    assert_eq!(output.events_at(at(600)), vec![up(LEFTCTRL)]);
    assert_eq!(output.events().len(), 4);
}

// =========================================================================
// Scenario 4: Two dual-function keys chorded (Ctrl+Super+A)
// =========================================================================

#[test]
fn scenario_two_janus_keys_chorded() {
    let event_loop = run_script(
        CONFIG,
        &[
            (0, SPACE, Edge::Down),
            (20, TAB, Edge::Down),
            (40, A, Edge::Down),
            (60, A, Edge::Up),
            (80, TAB, Edge::Up),
            (100, SPACE, Edge::Up),
        ],
    );

    assert_eq!(
        event_loop.output().events(),
        vec![
            down(LEFTCTRL),
            down(LEFTMETA),
            down(A),
            up(A),
            up(LEFTMETA),
            up(LEFTCTRL),
        ]
    );
    assert_all_idle(&event_loop);
}

// =========================================================================
// Scenario 5: Caps Lock remapped to Escape, with Control held
// =========================================================================

#[test]
fn scenario_plain_remap_under_held_modifier() {
    let event_loop = run_script(
        CONFIG,
        &[
            (0, CAPSLOCK, Edge::Down),
            (30, CAPSLOCK, Edge::Up),
            (100, SPACE, Edge::Down),
            (150, CAPSLOCK, Edge::Down),
            (170, CAPSLOCK, Edge::Up),
            (190, SPACE, Edge::Up),
        ],
    );

    assert_eq!(
        event_loop.output().events(),
        vec![down(ESC), up(ESC), down(LEFTCTRL), down(ESC), up(ESC), up(LEFTCTRL)]
    );
}

// =========================================================================
// Scenario 6: Key repeat never leaks through
// =========================================================================

#[test]
fn scenario_autorepeat_is_not_forwarded() {
    let event_loop = run_script(
        CONFIG,
        &[
            (0, A, Edge::Down),
            (250, A, Edge::Repeat),
            (280, A, Edge::Repeat),
            (300, A, Edge::Up),
            (400, SPACE, Edge::Down),
            (650, SPACE, Edge::Repeat),
            (700, SPACE, Edge::Up),
        ],
    );

    assert_eq!(
        event_loop.output().events(),
        vec![down(A), up(A), down(LEFTCTRL), up(LEFTCTRL)]
    );
}

// =========================================================================
// Scenario 7: Dropped events while Control is held
// =========================================================================

#[test]
fn scenario_resync_releases_keys_lifted_during_gap() {
    let config = Config::from_toml(CONFIG).unwrap();
    let clock = ManualClock::new();
    let mut source = ScriptedSource::new(clock.clone());
    source
        .key(0, SPACE, Edge::Down)
        .key(50, A, Edge::Down)
        // SPACE and A were lifted and C pressed while events were lost.
        .push(300, InputMessage::Resync(vec![C]))
        .key(350, C, Edge::Up);

    let dispatcher =
        Dispatcher::with_clock(config.mapping_table().unwrap(), config.hold_threshold, clock.clone());
    let mut event_loop = EventLoop::new(source, RecordingSink::timed(clock), dispatcher);
    event_loop.run().unwrap();

    let output = event_loop.output();
    assert_eq!(
        output.events_at(at(300)),
        vec![up(LEFTCTRL), up(A), down(C)]
    );
    assert_eq!(output.events_at(at(350)), vec![up(C)]);
    assert_all_idle(&event_loop);
}

// =========================================================================
// Scenario 8: Shutdown while a modifier is held
// =========================================================================

#[test]
fn scenario_shutdown_leaves_nothing_pressed() {
    let mut event_loop = run_script(CONFIG, &[(0, TAB, Edge::Down), (30, A, Edge::Down)]);
    event_loop.shutdown().unwrap();

    let events = event_loop.output().events();
    for event in events.iter().filter(|e| e.edge == Edge::Down) {
        assert!(events.contains(&up(event.key)), "{} never released", event.key);
    }
    assert_eq!(events.last(), Some(&up(A)));
    assert_all_idle(&event_loop);
}

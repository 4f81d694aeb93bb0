//! Run Engine use case
//!
//! Drives the scripting host and the windowing/rendering collaborators in
//! lockstep: load the entry script, run it, then tick until the window closes.

use crate::config::EngineSettings;
use crate::ports::renderer::SharedRenderer;
use crate::ports::scripting_host::{ScriptHostError, ScriptingHostPort};
use crate::ports::windowing::{SharedWindow, WindowError};
use lua3d_domain::EngineState;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors that abort the engine loop
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine is {actual}, expected {expected}")]
    InvalidState {
        expected: EngineState,
        actual: EngineState,
    },

    #[error("window error: {0}")]
    Window(#[from] WindowError),

    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),

    #[error("script error: {0}")]
    Script(#[from] ScriptHostError),
}

/// Summary of a finished run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineReport {
    /// Number of ticks executed before the window closed.
    pub frames: u64,
    /// Error raised by the entry script body, if any.
    pub script_error: Option<String>,
}

/// The engine loop state machine.
pub struct EngineLoop {
    state: EngineState,
    settings: EngineSettings,
    window: SharedWindow,
    renderer: SharedRenderer,
    host: Option<Box<dyn ScriptingHostPort>>,
}

impl EngineLoop {
    pub fn new(settings: EngineSettings, window: SharedWindow, renderer: SharedRenderer) -> Self {
        Self {
            state: EngineState::Uninitialized,
            settings,
            window,
            renderer,
            host: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// `Uninitialized -> Initialized`.
    ///
    /// Opens the window, primes the renderer and builds the scripting host.
    /// Any failure leaves the engine uninitialized.
    pub fn initialize<F>(&mut self, build_host: F) -> Result<(), EngineError>
    where
        F: FnOnce() -> Result<Box<dyn ScriptingHostPort>, ScriptHostError>,
    {
        self.expect_state(EngineState::Uninitialized)?;

        {
            let mut window = self
                .window
                .lock()
                .map_err(|_| EngineError::LockPoisoned("window"))?;
            window.initialize(
                &self.settings.title,
                self.settings.width,
                self.settings.height,
            )?;
        }

        self.renderer
            .lock()
            .map_err(|_| EngineError::LockPoisoned("renderer"))?
            .set_clear_color(self.settings.clear_color);

        let host = build_host()?;
        self.host = Some(host);
        self.transition(EngineState::Initialized);
        Ok(())
    }

    /// `Initialized -> Running -> Stopped`.
    ///
    /// A load failure of the entry script aborts startup. A runtime error in
    /// its body is logged and the loop still runs, so hooks registered before
    /// the failure keep firing.
    pub fn run(&mut self, entry_script: &Path) -> Result<EngineReport, EngineError> {
        self.expect_state(EngineState::Initialized)?;
        let mut host = self
            .host
            .take()
            .ok_or(EngineError::InvalidState {
                expected: EngineState::Initialized,
                actual: self.state,
            })?;

        if let Err(e) = host.load_script(entry_script) {
            self.host = Some(host);
            return Err(e.into());
        }
        self.transition(EngineState::Running);

        let mut report = EngineReport::default();
        if let Err(e) = host.execute() {
            error!("Failed to execute {}: {}", entry_script.display(), e);
            report.script_error = Some(e.to_string());
        }

        let result = self.tick_until_closed(host.as_mut(), &mut report);

        self.transition(EngineState::Stopped);
        host.shutdown();
        info!(frames = report.frames, "Engine stopped");

        result.map(|_| report)
    }

    fn tick_until_closed(
        &self,
        host: &mut dyn ScriptingHostPort,
        report: &mut EngineReport,
    ) -> Result<(), EngineError> {
        let budget = self.settings.frame_budget();
        let mut last_tick = Instant::now();

        while self.is_window_open()? {
            let tick_start = Instant::now();

            let events = self
                .window
                .lock()
                .map_err(|_| EngineError::LockPoisoned("window"))?
                .pump_messages();
            for event in &events {
                host.dispatch_key_event(event);
            }

            let delta = tick_start.duration_since(last_tick).as_secs_f64();
            last_tick = tick_start;
            host.run_pre_render(delta);

            self.present()?;
            report.frames += 1;

            if let Some(budget) = budget {
                let elapsed = tick_start.elapsed();
                if elapsed < budget {
                    std::thread::sleep(budget - elapsed);
                }
            }
        }
        Ok(())
    }

    fn present(&self) -> Result<(), EngineError> {
        let mut renderer = self
            .renderer
            .lock()
            .map_err(|_| EngineError::LockPoisoned("renderer"))?;
        renderer.begin_frame();
        renderer.clear();
        renderer.end_frame();
        Ok(())
    }

    fn is_window_open(&self) -> Result<bool, EngineError> {
        Ok(self
            .window
            .lock()
            .map_err(|_| EngineError::LockPoisoned("window"))?
            .is_window_open())
    }

    fn expect_state(&self, expected: EngineState) -> Result<(), EngineError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    fn transition(&mut self, next: EngineState) {
        debug_assert!(self.state.can_transition_to(next));
        debug!("Engine {} -> {}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::renderer::RendererPort;
    use crate::ports::windowing::WindowingPort;
    use lua3d_domain::{Color, Geometry, KeyEvent, LightIndex, LightProperties};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    type CallLog = Arc<Mutex<Vec<String>>>;

    struct TestWindow {
        log: CallLog,
        ticks_left: u32,
        events: VecDeque<Vec<KeyEvent>>,
        fail_init: bool,
    }

    impl WindowingPort for TestWindow {
        fn initialize(&mut self, title: &str, width: u32, height: u32) -> Result<(), WindowError> {
            if self.fail_init {
                return Err(WindowError::Creation("no display".into()));
            }
            self.log
                .lock()
                .unwrap()
                .push(format!("window.init {} {}x{}", title, width, height));
            Ok(())
        }

        fn is_window_open(&self) -> bool {
            self.ticks_left > 0
        }

        fn pump_messages(&mut self) -> Vec<KeyEvent> {
            self.log.lock().unwrap().push("pump".into());
            self.ticks_left -= 1;
            self.events.pop_front().unwrap_or_default()
        }
    }

    struct TestRenderer {
        log: CallLog,
    }

    impl RendererPort for TestRenderer {
        fn begin_frame(&mut self) {
            self.log.lock().unwrap().push("begin".into());
        }

        fn clear(&mut self) {
            self.log.lock().unwrap().push("clear".into());
        }

        fn end_frame(&mut self) {
            self.log.lock().unwrap().push("end".into());
        }

        fn set_clear_color(&mut self, _color: Color) {
            self.log.lock().unwrap().push("clear_color".into());
        }

        fn draw_geometry(&mut self, _geometry: Geometry) {}

        fn set_light(&mut self, _index: LightIndex, _properties: LightProperties) {}

        fn enable_lighting(&mut self, _enabled: bool) {}
    }

    struct TestHost {
        log: CallLog,
        fail_load: bool,
        fail_execute: bool,
    }

    impl ScriptingHostPort for TestHost {
        fn load_script(&mut self, path: &Path) -> Result<(), ScriptHostError> {
            if self.fail_load {
                return Err(ScriptHostError::SourceNotFound {
                    path: path.to_path_buf(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            self.log.lock().unwrap().push("load".into());
            Ok(())
        }

        fn execute(&mut self) -> Result<(), ScriptHostError> {
            self.log.lock().unwrap().push("execute".into());
            if self.fail_execute {
                return Err(ScriptHostError::Runtime("boom".into()));
            }
            Ok(())
        }

        fn dispatch_key_event(&mut self, event: &KeyEvent) {
            self.log
                .lock()
                .unwrap()
                .push(format!("key {} {}", event.key(), event.action()));
        }

        fn run_pre_render(&mut self, _delta_seconds: f64) {
            self.log.lock().unwrap().push("hook".into());
        }

        fn shutdown(&mut self) {
            self.log.lock().unwrap().push("shutdown".into());
        }
    }

    struct Fixture {
        log: CallLog,
        engine: EngineLoop,
    }

    fn fixture(ticks: u32, events: Vec<Vec<KeyEvent>>, fail_window: bool) -> Fixture {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let window: SharedWindow = Arc::new(Mutex::new(TestWindow {
            log: Arc::clone(&log),
            ticks_left: ticks,
            events: events.into(),
            fail_init: fail_window,
        }));
        let renderer: SharedRenderer = Arc::new(Mutex::new(TestRenderer {
            log: Arc::clone(&log),
        }));
        let settings = EngineSettings::new("test", 320, 240);
        Fixture {
            log,
            engine: EngineLoop::new(settings, window, renderer),
        }
    }

    fn host(log: &CallLog, fail_load: bool, fail_execute: bool) -> Box<dyn ScriptingHostPort> {
        Box::new(TestHost {
            log: Arc::clone(log),
            fail_load,
            fail_execute,
        })
    }

    #[test]
    fn test_initialize_transitions_state() {
        let mut f = fixture(0, vec![], false);
        assert_eq!(f.engine.state(), EngineState::Uninitialized);

        let log = Arc::clone(&f.log);
        f.engine.initialize(|| Ok(host(&log, false, false))).unwrap();

        assert_eq!(f.engine.state(), EngineState::Initialized);
        let calls = f.log.lock().unwrap().clone();
        assert_eq!(calls, vec!["window.init test 320x240", "clear_color"]);
    }

    #[test]
    fn test_window_failure_aborts_startup() {
        let mut f = fixture(0, vec![], true);
        let log = Arc::clone(&f.log);
        let result = f.engine.initialize(|| Ok(host(&log, false, false)));

        assert!(matches!(result, Err(EngineError::Window(_))));
        assert_eq!(f.engine.state(), EngineState::Uninitialized);
    }

    #[test]
    fn test_host_failure_aborts_startup() {
        let mut f = fixture(0, vec![], false);
        let result = f
            .engine
            .initialize(|| Err(ScriptHostError::HostInit("no memory".into())));

        assert!(matches!(result, Err(EngineError::Script(_))));
        assert_eq!(f.engine.state(), EngineState::Uninitialized);
    }

    #[test]
    fn test_run_requires_initialization() {
        let mut f = fixture(1, vec![], false);
        let result = f.engine.run(Path::new("main.lua"));
        assert!(matches!(
            result,
            Err(EngineError::InvalidState {
                expected: EngineState::Initialized,
                actual: EngineState::Uninitialized,
            })
        ));
    }

    #[test]
    fn test_tick_order() {
        let events = vec![vec![KeyEvent::press("a")], vec![]];
        let mut f = fixture(2, events, false);
        let log = Arc::clone(&f.log);
        f.engine.initialize(|| Ok(host(&log, false, false))).unwrap();
        f.log.lock().unwrap().clear();

        let report = f.engine.run(Path::new("main.lua")).unwrap();

        assert_eq!(report.frames, 2);
        assert_eq!(report.script_error, None);
        assert_eq!(f.engine.state(), EngineState::Stopped);
        let calls = f.log.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "load", "execute", "pump", "key a press", "hook", "begin", "clear", "end", "pump",
                "hook", "begin", "clear", "end", "shutdown",
            ]
        );
    }

    #[test]
    fn test_load_failure_is_fatal() {
        let mut f = fixture(3, vec![], false);
        let log = Arc::clone(&f.log);
        f.engine.initialize(|| Ok(host(&log, true, false))).unwrap();

        let result = f.engine.run(Path::new("missing.lua"));

        assert!(matches!(
            result,
            Err(EngineError::Script(ScriptHostError::SourceNotFound { .. }))
        ));
        assert_eq!(f.engine.state(), EngineState::Initialized);
        assert!(!f.log.lock().unwrap().iter().any(|c| c == "pump"));
    }

    #[test]
    fn test_runtime_error_keeps_ticking() {
        let mut f = fixture(1, vec![], false);
        let log = Arc::clone(&f.log);
        f.engine.initialize(|| Ok(host(&log, false, true))).unwrap();

        let report = f.engine.run(Path::new("main.lua")).unwrap();

        assert_eq!(report.frames, 1);
        assert!(report.script_error.unwrap().contains("boom"));
        assert_eq!(f.engine.state(), EngineState::Stopped);
    }

    #[test]
    fn test_closed_window_runs_no_ticks() {
        let mut f = fixture(0, vec![], false);
        let log = Arc::clone(&f.log);
        f.engine.initialize(|| Ok(host(&log, false, false))).unwrap();

        let report = f.engine.run(Path::new("main.lua")).unwrap();

        assert_eq!(report.frames, 0);
        assert_eq!(f.engine.state(), EngineState::Stopped);
    }
}

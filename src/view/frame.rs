use super::GraphView;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
    Destroyed,
}

/// What the host should do after a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    /// A simulation tick ran; positions may have changed.
    pub simulated: bool,
    /// The host should schedule another frame.
    pub reschedule: bool,
}

/// Drives one simulation tick per rendered frame while running.
///
/// Once destroyed the loop never ticks or reschedules again, so a host
/// tearing down its view cannot leave a frame callback behind.
#[derive(Debug)]
pub struct FrameLoop {
    state: LoopState,
    frames: u64,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Stopped,
            frames: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn start(&mut self) {
        if self.state == LoopState::Stopped {
            self.state = LoopState::Running;
        }
    }

    pub fn destroy(&mut self) {
        self.state = LoopState::Destroyed;
    }

    pub fn frame(&mut self, view: &mut GraphView) -> FrameOutcome {
        if self.state != LoopState::Running {
            return FrameOutcome::default();
        }
        self.frames += 1;
        FrameOutcome {
            simulated: view.step(),
            reschedule: true,
        }
    }
}

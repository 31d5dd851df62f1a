use hexarp_shared::{ClockSource, HostTransport};

/// Change of run state detected at a block or clock-message boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportEdge {
    None,
    Started,
    Stopped,
}

/// Run state of the engine and the inputs that decide it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransportState {
    pub is_playing: bool,
    /// Play requested from the control side (standalone play button).
    pub play_requested: bool,
    /// Last Start/Continue vs Stop seen on the external clock.
    pub external_running: bool,
}

impl TransportState {
    /// Whether the engine should be running this block.
    pub fn wants_play(&self, source: ClockSource, host: &HostTransport) -> bool {
        match source {
            ClockSource::External => self.external_running,
            ClockSource::Daw | ClockSource::Internal => host.is_playing || self.play_requested,
        }
    }

    pub fn update(&mut self, playing: bool) -> TransportEdge {
        let edge = match (self.is_playing, playing) {
            (false, true) => TransportEdge::Started,
            (true, false) => TransportEdge::Stopped,
            _ => TransportEdge::None,
        };
        self.is_playing = playing;
        edge
    }

    /// Drop every reason to run. Returns true if the engine was playing.
    pub fn halt(&mut self) -> bool {
        self.play_requested = false;
        self.external_running = false;
        self.update(false) == TransportEdge::Stopped
    }
}

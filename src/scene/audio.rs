use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::errors::Result;
use crate::scene::events::AudioEvent;
use crate::scene::listeners::{Callback, ListenerId, Listeners};
use crate::scene::node::{NodeCore, NodeKind, SceneGraphNode};
use crate::settings::LockPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Running,
    Paused,
}

#[derive(Debug, Default)]
struct AudioState {
    playback: PlaybackState,
    changed: bool,
}

/// Sound emitter placed in the tree. Sample delivery belongs to the audio
/// backend; the node only carries the transport state.
pub struct AudioSource {
    core: NodeCore,
    self_ref: Weak<AudioSource>,
    state: RwLock<AudioState>,
    listeners: Listeners<Callback<AudioEvent>>,
}

impl AudioSource {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_policy(None, LockPolicy::global())
    }

    #[must_use]
    pub fn with_name(name: &str) -> Arc<Self> {
        Self::with_policy(Some(name), LockPolicy::global())
    }

    #[must_use]
    pub fn with_policy(name: Option<&str>, policy: LockPolicy) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            core: NodeCore::new(NodeKind::AudioSource, name, policy),
            self_ref: self_ref.clone(),
            state: RwLock::new(AudioState::default()),
            listeners: Listeners::new(),
        })
    }

    #[must_use]
    pub fn playback_state(&self) -> PlaybackState {
        self.run_as_reader(|| self.state.read().playback)
    }

    pub fn start(&self) -> Result<()> {
        self.transition(PlaybackState::Running)
    }

    pub fn stop(&self) -> Result<()> {
        self.transition(PlaybackState::Stopped)
    }

    pub fn pause(&self) -> Result<()> {
        self.transition(PlaybackState::Paused)
    }

    fn transition(&self, next: PlaybackState) -> Result<()> {
        self.check_writable()?;
        self.run_as_writer(|| {
            let mut state = self.state.write();
            if state.playback != next {
                state.playback = next;
                state.changed = true;
            }
        })
    }

    pub fn add_audio_listener(
        &self,
        listener: impl Fn(&AudioEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.listeners.add(Arc::new(listener))
    }

    pub fn remove_audio_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl SceneGraphNode for AudioSource {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn writing_finished(&self) {
        let state = {
            let mut guard = self.state.write();
            if !std::mem::take(&mut guard.changed) {
                return;
            }
            guard.playback
        };
        let Some(source) = self.self_ref.upgrade() else {
            return;
        };
        let event = AudioEvent { source, state };
        self.listeners.notify(&self.core, |listener| listener(&event));
    }
}

impl fmt::Debug for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSource")
            .field("core", &self.core)
            .field("playback", &self.state.read().playback)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_transition_is_not_a_change() {
        let audio = AudioSource::new();
        let states = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&states);
        audio.add_audio_listener(move |e| sink.lock().push(e.state));

        audio.start().unwrap();
        audio.start().unwrap();
        audio.pause().unwrap();

        assert_eq!(*states.lock(), vec![PlaybackState::Running, PlaybackState::Paused]);
    }
}

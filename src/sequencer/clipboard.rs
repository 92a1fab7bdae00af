// Single-track copy/paste. One global clipboard; pasting overwrites both the
// steps and the source. No implicit history checkpoint.

use log::debug;

use super::Sequencer;
use crate::pipeline::project::{InstrumentSource, Track};
use crate::shared::{NUM_TRACKS, SequencerEvent};

#[derive(Clone, Debug, PartialEq)]
pub(super) struct Clipboard {
    track: Track,
    source: InstrumentSource,
}

impl Sequencer {
    pub fn copy_track(&mut self, track: usize) -> bool {
        let Some(copied) = self.track(track).cloned() else {
            return false;
        };
        self.clipboard = Some(Clipboard {
            track: copied,
            source: self.track_source(track),
        });
        debug!("copied track {}", track + 1);
        true
    }

    pub fn paste_track(&mut self, track: usize) -> bool {
        if track >= NUM_TRACKS {
            return false;
        }
        let Some(clip) = self.clipboard.as_ref() else {
            debug!("no track in clipboard");
            return false;
        };
        let (steps, source) = (clip.track.clone(), clip.source);
        let slot = self.current_slot;
        self.slots[slot].tracks[track] = steps;
        self.routing[track].source = source;
        debug!("pasted to track {}", track + 1);
        self.notify(SequencerEvent::PatternChanged);
        true
    }

    pub fn has_clipboard(&self) -> bool {
        self.clipboard.is_some()
    }
}

/// Fire-and-forget feedback events emitted by the app shell. The core hands
/// out outcomes; whoever owns the sink decides what a cue sounds or looks
/// like. Nothing flows back.
#[derive(Debug, Clone, PartialEq)]
pub enum Cue {
    KeyCorrect(char),
    KeyError,
    RoundComplete,
    BadgeEarned(String),
}

pub trait FeedbackSink {
    fn cue(&mut self, cue: Cue);
}

/// Swallows every cue; used headless and as a safe default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FeedbackSink for NullSink {
    fn cue(&mut self, _cue: Cue) {}
}

/// Collects cues for inspection in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub cues: Vec<Cue>,
}

impl FeedbackSink for RecordingSink {
    fn cue(&mut self, cue: Cue) {
        self.cues.push(cue);
    }
}

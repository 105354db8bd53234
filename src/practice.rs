use std::fmt;
use std::time::{Duration, SystemTime};

use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::generator::{CharSource, CharacterGenerator, Finger, FingerDrill, PracticeMode};
use crate::round::ERROR_FLASH_MS;

pub const DEFAULT_SEQUENCE_LENGTH: usize = 5;
pub const DEFAULT_RHYTHM_INTERVAL_MS: u64 = 1000;

/// How practice targets are presented.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum_macros::Display, Serialize, Deserialize,
)]
pub enum DisplayMode {
    /// One character at a time, regenerated on every correct keystroke.
    Single,
    /// A short run of characters, advanced positionally.
    Sequence,
    /// The target advances on a fixed timer regardless of correctness.
    Rhythm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeSettings {
    pub mode: PracticeMode,
    pub display_mode: DisplayMode,
    /// Multiplier applied to the rhythm interval; 2.0 advances twice as fast.
    pub speed: f64,
    pub show_keyboard: bool,
    pub sound_enabled: bool,
    pub particles_enabled: bool,
    pub sequence_length: usize,
    pub rhythm_interval_ms: u64,
    pub drill: Option<Finger>,
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            mode: PracticeMode::Letters,
            display_mode: DisplayMode::Single,
            speed: 1.0,
            show_keyboard: true,
            sound_enabled: true,
            particles_enabled: true,
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            rhythm_interval_ms: DEFAULT_RHYTHM_INTERVAL_MS,
            drill: None,
        }
    }
}

impl PracticeSettings {
    fn rhythm_interval(&self) -> Duration {
        let speed = if self.speed > 0.0 { self.speed } else { 1.0 };
        Duration::from_millis((self.rhythm_interval_ms as f64 / speed).max(1.0) as u64)
    }

    fn make_source(&self) -> Box<dyn CharSource> {
        match self.drill {
            Some(finger) => Box::new(FingerDrill::new(finger)),
            None => Box::new(CharacterGenerator::new(self.mode)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharCount {
    pub correct: usize,
    pub total: usize,
}

/// Rolling statistics for one practice session.
///
/// The breakdown keeps insertion order on purpose: problematic keys are
/// reported in the order a character was first seen, not by severity.
#[derive(Debug, Clone)]
pub struct PracticeStats {
    pub chars_typed: usize,
    pub correct_chars: usize,
    pub wpm: u32,
    pub accuracy: f64,
    pub session_secs: f64,
    pub streak: usize,
    pub best_streak: usize,
    breakdown: Vec<(char, CharCount)>,
}

impl Default for PracticeStats {
    fn default() -> Self {
        Self {
            chars_typed: 0,
            correct_chars: 0,
            wpm: 0,
            accuracy: 100.0,
            session_secs: 0.0,
            streak: 0,
            best_streak: 0,
            breakdown: Vec::new(),
        }
    }
}

impl PracticeStats {
    pub fn breakdown(&self) -> impl Iterator<Item = (char, CharCount)> + '_ {
        self.breakdown.iter().copied()
    }

    pub fn counts_for(&self, c: char) -> CharCount {
        self.breakdown
            .iter()
            .find(|(k, _)| *k == c)
            .map(|(_, v)| *v)
            .unwrap_or_default()
    }

    fn record(&mut self, c: char, correct: bool) {
        let entry = match self.breakdown.iter_mut().find(|(k, _)| *k == c) {
            Some((_, counts)) => counts,
            None => {
                self.breakdown.push((c, CharCount::default()));
                &mut self.breakdown.last_mut().unwrap().1
            }
        };
        entry.total += 1;
        if correct {
            entry.correct += 1;
        }
    }
}

/// One row of the character-frequency report.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterFrequency {
    pub character: char,
    /// Share of all keystrokes this character received, in percent.
    pub share: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencePosition {
    Completed,
    Current,
    Upcoming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeOutcome {
    Ignored,
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionActiveError;

impl fmt::Display for SessionActiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "settings cannot change while a practice session is active")
    }
}

impl std::error::Error for SessionActiveError {}

/// Open-ended drilling session: presents one character (or sequence) at a
/// time and tracks rolling per-character accuracy with no fixed end.
pub struct PracticeSession {
    settings: PracticeSettings,
    stats: PracticeStats,
    active: bool,
    current: Option<char>,
    sequence: Vec<char>,
    sequence_index: usize,
    source: Box<dyn CharSource>,
    started_at: Option<SystemTime>,
    rhythm_due: Option<SystemTime>,
    flash_until: Option<SystemTime>,
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("settings", &self.settings)
            .field("active", &self.active)
            .field("current", &self.current)
            .field("sequence", &self.sequence)
            .field("sequence_index", &self.sequence_index)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl PracticeSession {
    pub fn new(settings: PracticeSettings) -> Self {
        let source = settings.make_source();
        Self::with_source(settings, source)
    }

    /// Builds a session around an arbitrary character source; tests use this
    /// to inject deterministic targets.
    pub fn with_source(settings: PracticeSettings, source: Box<dyn CharSource>) -> Self {
        Self {
            settings,
            stats: PracticeStats::default(),
            active: false,
            current: None,
            sequence: Vec::new(),
            sequence_index: 0,
            source,
            started_at: None,
            rhythm_due: None,
            flash_until: None,
        }
    }

    pub fn settings(&self) -> &PracticeSettings {
        &self.settings
    }

    /// Replaces the settings and rebuilds the character source. Rejected
    /// while a session is active because it invalidates in-flight exercises.
    pub fn update_settings(&mut self, settings: PracticeSettings) -> Result<(), SessionActiveError> {
        if self.active {
            return Err(SessionActiveError);
        }
        self.source = settings.make_source();
        self.settings = settings;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn stats(&self) -> &PracticeStats {
        &self.stats
    }

    pub fn current_char(&self) -> Option<char> {
        self.current
    }

    pub fn start(&mut self, now: SystemTime) {
        self.stats = PracticeStats::default();
        self.active = true;
        self.started_at = Some(now);
        self.flash_until = None;
        self.advance_target();

        self.rhythm_due = match self.settings.display_mode {
            DisplayMode::Rhythm => Some(now + self.settings.rhythm_interval()),
            _ => None,
        };
    }

    /// Halts the session, freezing the final stats in place.
    pub fn stop(&mut self, now: SystemTime) {
        if self.active {
            self.refresh_timed_stats(now);
        }
        self.active = false;
        self.started_at = None;
        self.rhythm_due = None;
        self.flash_until = None;
    }

    pub fn reset(&mut self, now: SystemTime) {
        self.stop(now);
        self.stats = PracticeStats::default();
        self.current = None;
        self.sequence.clear();
        self.sequence_index = 0;
    }

    /// Advances session time and, in rhythm mode, steps past due targets.
    pub fn on_tick(&mut self, now: SystemTime) {
        if !self.active {
            return;
        }

        self.refresh_timed_stats(now);

        while let Some(due) = self.rhythm_due {
            if now < due {
                break;
            }
            self.advance_target();
            self.rhythm_due = Some(due + self.settings.rhythm_interval());
        }
    }

    /// Feed one keystroke against the current target.
    pub fn submit(&mut self, key: char, now: SystemTime) -> PracticeOutcome {
        if !self.active {
            return PracticeOutcome::Ignored;
        }
        let Some(target) = self.current else {
            return PracticeOutcome::Ignored;
        };

        self.stats.chars_typed += 1;
        let correct = key == target;
        self.stats.record(target, correct);

        if correct {
            self.stats.correct_chars += 1;
            self.stats.streak += 1;
            self.stats.best_streak = self.stats.best_streak.max(self.stats.streak);
        } else {
            self.stats.streak = 0;
            self.flash_until = Some(now + Duration::from_millis(ERROR_FLASH_MS));
        }

        self.stats.accuracy =
            self.stats.correct_chars as f64 / self.stats.chars_typed as f64 * 100.0;

        if correct {
            match self.settings.display_mode {
                DisplayMode::Sequence => {
                    if self.sequence_index + 1 < self.sequence.len() {
                        self.sequence_index += 1;
                        self.current = Some(self.sequence[self.sequence_index]);
                    } else {
                        self.advance_target();
                    }
                }
                DisplayMode::Single => self.advance_target(),
                // Rhythm targets move on the timer only
                DisplayMode::Rhythm => {}
            }
            PracticeOutcome::Correct
        } else {
            PracticeOutcome::Incorrect
        }
    }

    pub fn error_flash(&self, now: SystemTime) -> bool {
        self.flash_until.is_some_and(|until| now < until)
    }

    /// Characters with at least 5 attempts and under 70% accuracy, in the
    /// order they were first seen, capped at 5 entries.
    pub fn problematic_keys(&self) -> Vec<char> {
        self.stats
            .breakdown
            .iter()
            .filter(|(_, counts)| {
                counts.total >= 5 && (counts.correct as f64 / counts.total as f64) < 0.7
            })
            .map(|(c, _)| *c)
            .take(5)
            .collect()
    }

    /// Per-character keystroke share and accuracy, most frequent first.
    pub fn character_frequency(&self) -> Vec<CharacterFrequency> {
        let total: usize = self.stats.breakdown.iter().map(|(_, c)| c.total).sum();
        self.stats
            .breakdown
            .iter()
            .map(|(character, counts)| CharacterFrequency {
                character: *character,
                share: if total > 0 {
                    counts.total as f64 / total as f64 * 100.0
                } else {
                    0.0
                },
                accuracy: if counts.total > 0 {
                    counts.correct as f64 / counts.total as f64 * 100.0
                } else {
                    100.0
                },
            })
            .sorted_by(|a, b| b.share.partial_cmp(&a.share).unwrap_or(std::cmp::Ordering::Equal))
            .collect()
    }

    /// Sequence-mode view: each position with its progress marker. Empty in
    /// the other display modes.
    pub fn sequence_display(&self) -> Vec<(char, SequencePosition)> {
        if self.settings.display_mode != DisplayMode::Sequence {
            return Vec::new();
        }
        self.sequence
            .iter()
            .enumerate()
            .map(|(idx, c)| {
                let position = match idx.cmp(&self.sequence_index) {
                    std::cmp::Ordering::Less => SequencePosition::Completed,
                    std::cmp::Ordering::Equal => SequencePosition::Current,
                    std::cmp::Ordering::Greater => SequencePosition::Upcoming,
                };
                (*c, position)
            })
            .collect()
    }

    fn refresh_timed_stats(&mut self, now: SystemTime) {
        if let Some(start) = self.started_at {
            self.stats.session_secs = now.duration_since(start).unwrap_or_default().as_secs_f64();
        }
        self.stats.wpm = if self.stats.chars_typed > 0 && self.stats.session_secs > 0.0 {
            (self.stats.correct_chars as f64 / 5.0 / (self.stats.session_secs / 60.0)).round()
                as u32
        } else {
            0
        };
    }

    fn advance_target(&mut self) {
        if self.settings.display_mode == DisplayMode::Sequence {
            self.sequence = self.source.next_sequence(self.settings.sequence_length);
            self.sequence_index = 0;
            self.current = self.sequence.first().copied();
        } else {
            self.current = Some(self.source.next_char());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cycles through a fixed list of characters forever.
    struct FixedSource {
        chars: Vec<char>,
        index: usize,
    }

    impl FixedSource {
        fn new(chars: &str) -> Self {
            Self {
                chars: chars.chars().collect(),
                index: 0,
            }
        }
    }

    impl CharSource for FixedSource {
        fn next_char(&mut self) -> char {
            let c = self.chars[self.index % self.chars.len()];
            self.index += 1;
            c
        }
    }

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(2_000_000)
    }

    fn session_with(settings: PracticeSettings, chars: &str) -> PracticeSession {
        PracticeSession::with_source(settings, Box::new(FixedSource::new(chars)))
    }

    #[test]
    fn test_submit_ignored_before_start() {
        let mut session = session_with(PracticeSettings::default(), "e");
        assert_eq!(session.submit('e', now()), PracticeOutcome::Ignored);
        assert_eq!(session.stats().chars_typed, 0);
    }

    #[test]
    fn test_single_mode_advances_on_correct_only() {
        let mut session = session_with(PracticeSettings::default(), "ab");
        session.start(now());
        assert_eq!(session.current_char(), Some('a'));

        assert_eq!(session.submit('x', now()), PracticeOutcome::Incorrect);
        assert_eq!(session.current_char(), Some('a'));

        assert_eq!(session.submit('a', now()), PracticeOutcome::Correct);
        assert_eq!(session.current_char(), Some('b'));
    }

    #[test]
    fn test_streak_resets_on_mismatch_but_best_is_monotonic() {
        let mut session = session_with(PracticeSettings::default(), "e");
        session.start(now());

        for _ in 0..4 {
            session.submit('e', now());
        }
        assert_eq!(session.stats().streak, 4);
        assert_eq!(session.stats().best_streak, 4);

        session.submit('x', now());
        assert_eq!(session.stats().streak, 0);
        assert_eq!(session.stats().best_streak, 4);

        session.submit('e', now());
        assert_eq!(session.stats().streak, 1);
        assert_eq!(session.stats().best_streak, 4);
    }

    #[test]
    fn test_accuracy_recomputed_per_keystroke() {
        let mut session = session_with(PracticeSettings::default(), "e");
        session.start(now());

        session.submit('e', now());
        assert_eq!(session.stats().accuracy, 100.0);

        session.submit('x', now());
        assert_eq!(session.stats().accuracy, 50.0);
    }

    #[test]
    fn test_problematic_key_after_five_misses() {
        // Source always demands 'e'; the user keeps hitting 't'
        let mut session = session_with(PracticeSettings::default(), "e");
        session.start(now());

        for _ in 0..5 {
            session.submit('t', now());
        }

        assert_eq!(session.stats().counts_for('e'), CharCount { correct: 0, total: 5 });
        assert_eq!(session.problematic_keys(), vec!['e']);
    }

    #[test]
    fn test_problematic_key_requires_five_attempts() {
        let mut session = session_with(PracticeSettings::default(), "e");
        session.start(now());

        // 0/4 is below 70% but under the sample-size cutoff
        for _ in 0..4 {
            session.submit('t', now());
        }
        assert!(session.problematic_keys().is_empty());

        session.submit('t', now());
        assert_eq!(session.problematic_keys(), vec!['e']);
    }

    #[test]
    fn test_three_of_five_is_problematic() {
        let mut session = session_with(PracticeSettings::default(), "e");
        session.start(now());

        for key in ['e', 'e', 'e', 'x', 'x'] {
            session.submit(key, now());
        }
        // 3 correct, 5 total attempts on 'e': 60% < 70%
        assert_eq!(session.stats().counts_for('e'), CharCount { correct: 3, total: 5 });
        assert_eq!(session.problematic_keys(), vec!['e']);
    }

    #[test]
    fn test_problematic_keys_capped_at_five_in_insertion_order() {
        let settings = PracticeSettings {
            display_mode: DisplayMode::Rhythm,
            ..Default::default()
        };
        let mut session = session_with(settings, "abcdefg");
        session.start(now());

        // Miss every target five times, advancing via the rhythm timer
        let mut t = now();
        for _ in 0..7 {
            for _ in 0..5 {
                session.submit('!', t);
            }
            t += Duration::from_millis(DEFAULT_RHYTHM_INTERVAL_MS);
            session.on_tick(t);
        }

        assert_eq!(session.problematic_keys(), vec!['a', 'b', 'c', 'd', 'e']);
    }

    #[test]
    fn test_sequence_mode_advances_positionally() {
        let settings = PracticeSettings {
            display_mode: DisplayMode::Sequence,
            sequence_length: 3,
            ..Default::default()
        };
        let mut session = session_with(settings, "abcdef");
        session.start(now());

        assert_eq!(
            session.sequence_display(),
            vec![
                ('a', SequencePosition::Current),
                ('b', SequencePosition::Upcoming),
                ('c', SequencePosition::Upcoming),
            ]
        );

        session.submit('a', now());
        session.submit('b', now());
        assert_eq!(
            session.sequence_display(),
            vec![
                ('a', SequencePosition::Completed),
                ('b', SequencePosition::Completed),
                ('c', SequencePosition::Current),
            ]
        );

        // Exhausting the run generates a brand-new sequence
        session.submit('c', now());
        assert_eq!(session.current_char(), Some('d'));
        assert_eq!(session.sequence_display()[0], ('d', SequencePosition::Current));
    }

    #[test]
    fn test_rhythm_mode_ignores_correct_advance() {
        let settings = PracticeSettings {
            display_mode: DisplayMode::Rhythm,
            ..Default::default()
        };
        let mut session = session_with(settings, "ab");
        session.start(now());
        assert_eq!(session.current_char(), Some('a'));

        session.submit('a', now());
        assert_eq!(session.current_char(), Some('a'));

        // The timer, not the keystroke, moves the target
        session.on_tick(now() + Duration::from_millis(1000));
        assert_eq!(session.current_char(), Some('b'));
    }

    #[test]
    fn test_rhythm_interval_respects_speed() {
        let settings = PracticeSettings {
            display_mode: DisplayMode::Rhythm,
            speed: 2.0,
            ..Default::default()
        };
        let mut session = session_with(settings, "ab");
        session.start(now());

        session.on_tick(now() + Duration::from_millis(499));
        assert_eq!(session.current_char(), Some('a'));
        session.on_tick(now() + Duration::from_millis(500));
        assert_eq!(session.current_char(), Some('b'));
    }

    #[test]
    fn test_live_wpm_requires_keystrokes() {
        let mut session = session_with(PracticeSettings::default(), "e");
        session.start(now());

        session.on_tick(now() + Duration::from_secs(10));
        assert_eq!(session.stats().wpm, 0);

        for _ in 0..10 {
            session.submit('e', now());
        }
        session.on_tick(now() + Duration::from_secs(60));
        // 10 correct chars in 60s: round(10 / 5 / 1) = 2
        assert_eq!(session.stats().wpm, 2);
    }

    #[test]
    fn test_stop_freezes_stats() {
        let mut session = session_with(PracticeSettings::default(), "e");
        session.start(now());
        session.submit('e', now());
        session.stop(now() + Duration::from_secs(30));

        assert!(!session.is_active());
        assert_eq!(session.stats().session_secs, 30.0);
        assert_eq!(session.stats().chars_typed, 1);

        // Ticks after stop change nothing
        session.on_tick(now() + Duration::from_secs(90));
        assert_eq!(session.stats().session_secs, 30.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = session_with(PracticeSettings::default(), "e");
        session.start(now());
        session.submit('e', now());
        session.submit('x', now());
        session.reset(now());

        assert!(!session.is_active());
        assert_eq!(session.stats().chars_typed, 0);
        assert_eq!(session.stats().best_streak, 0);
        assert_eq!(session.current_char(), None);
        assert!(session.problematic_keys().is_empty());
    }

    #[test]
    fn test_settings_locked_while_active() {
        let mut session = session_with(PracticeSettings::default(), "e");
        session.start(now());

        let result = session.update_settings(PracticeSettings {
            mode: PracticeMode::German,
            ..Default::default()
        });
        assert_eq!(result, Err(SessionActiveError));

        session.stop(now());
        assert!(session
            .update_settings(PracticeSettings {
                mode: PracticeMode::German,
                ..Default::default()
            })
            .is_ok());
        assert_eq!(session.settings().mode, PracticeMode::German);
    }

    #[test]
    fn test_error_flash_rearm() {
        let mut session = session_with(PracticeSettings::default(), "e");
        session.start(now());

        session.submit('x', now());
        assert!(session.error_flash(now() + Duration::from_millis(150)));

        session.submit('x', now() + Duration::from_millis(150));
        assert!(session.error_flash(now() + Duration::from_millis(340)));
        assert!(!session.error_flash(now() + Duration::from_millis(350)));
    }

    #[test]
    fn test_character_frequency_sorted_by_share() {
        let settings = PracticeSettings {
            display_mode: DisplayMode::Rhythm,
            ..Default::default()
        };
        let mut session = session_with(settings, "ab");
        session.start(now());

        // Three attempts on 'a' (one correct), then one on 'b'
        session.submit('a', now());
        session.submit('x', now());
        session.submit('x', now());
        session.on_tick(now() + Duration::from_millis(1000));
        session.submit('b', now());

        let report = session.character_frequency();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].character, 'a');
        assert_eq!(report[0].share, 75.0);
        assert!((report[0].accuracy - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(report[1].character, 'b');
        assert_eq!(report[1].share, 25.0);
        assert_eq!(report[1].accuracy, 100.0);
    }
}

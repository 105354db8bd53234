use std::fmt;
use std::time::{Duration, SystemTime};

use crate::corpus::Difficulty;

/// How long a mistyped key tints the target text.
pub const ERROR_FLASH_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    Waiting,
    Typing,
    Finished,
}

/// Keystroke as delivered by the presentation layer. Backspace is modeled
/// explicitly because the round must ignore it rather than never see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    Correct,
    Incorrect,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundError {
    EmptyTarget,
}

impl fmt::Display for RoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundError::EmptyTarget => write!(f, "cannot start a round with an empty target text"),
        }
    }
}

impl std::error::Error for RoundError {}

/// One timed round against a fixed target text.
///
/// The typed buffer is always a correct prefix of the target: mismatches
/// bump the error counter without advancing the cursor, and there is no
/// correction support. All time-dependent operations take the current
/// instant from the caller so tests can drive a fake clock.
#[derive(Debug)]
pub struct TypingRound {
    status: RoundStatus,
    difficulty: Difficulty,
    target: String,
    typed: String,
    errors: usize,
    total_keystrokes: usize,
    started_at: Option<SystemTime>,
    elapsed_secs: f64,
    flash_until: Option<SystemTime>,
}

impl TypingRound {
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            status: RoundStatus::Waiting,
            difficulty,
            target: String::new(),
            typed: String::new(),
            errors: 0,
            total_keystrokes: 0,
            started_at: None,
            elapsed_secs: 0.0,
            flash_until: None,
        }
    }

    /// Begins a fresh round. A round already in flight is discarded, never
    /// merged into the new one.
    pub fn start(&mut self, target: impl Into<String>, now: SystemTime) -> Result<(), RoundError> {
        let target = target.into();
        if target.is_empty() {
            return Err(RoundError::EmptyTarget);
        }

        self.status = RoundStatus::Typing;
        self.target = target;
        self.typed.clear();
        self.errors = 0;
        self.total_keystrokes = 0;
        self.started_at = Some(now);
        self.elapsed_secs = 0.0;
        self.flash_until = None;
        Ok(())
    }

    pub fn reset(&mut self) {
        let difficulty = self.difficulty;
        *self = TypingRound::new(difficulty);
    }

    /// Feed one keystroke. No-op unless the round is in the typing state;
    /// backspace is ignored by design (the cursor never retreats).
    pub fn submit(&mut self, key: Key, now: SystemTime) -> KeyOutcome {
        if self.status != RoundStatus::Typing {
            return KeyOutcome::Ignored;
        }

        let c = match key {
            Key::Char(c) => c,
            Key::Backspace => return KeyOutcome::Ignored,
        };

        let Some(expected) = self.next_char() else {
            return KeyOutcome::Ignored;
        };

        self.total_keystrokes += 1;

        if c != expected {
            self.errors += 1;
            // Re-arm rather than stack: a new error replaces the deadline
            self.flash_until = Some(now + Duration::from_millis(ERROR_FLASH_MS));
            return KeyOutcome::Incorrect;
        }

        self.typed.push(c);

        if self.typed.chars().count() == self.target.chars().count() {
            self.elapsed_secs = self.elapsed_since_start(now);
            self.status = RoundStatus::Finished;
            self.started_at = None;
            self.flash_until = None;
            return KeyOutcome::Finished;
        }

        KeyOutcome::Correct
    }

    /// Advances the wall clock. Elapsed time only moves while typing.
    pub fn on_tick(&mut self, now: SystemTime) {
        if self.status == RoundStatus::Typing {
            self.elapsed_secs = self.elapsed_since_start(now);
        }
    }

    fn elapsed_since_start(&self, now: SystemTime) -> f64 {
        self.started_at
            .map(|start| now.duration_since(start).unwrap_or_default().as_secs_f64())
            .unwrap_or(self.elapsed_secs)
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    /// The character the user has to type next, if any.
    pub fn next_char(&self) -> Option<char> {
        self.target.chars().nth(self.typed.chars().count())
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn total_keystrokes(&self) -> usize {
        self.total_keystrokes
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn error_flash(&self, now: SystemTime) -> bool {
        self.flash_until.is_some_and(|until| now < until)
    }

    /// Words per minute over the typed prefix, zero before the clock moves.
    pub fn wpm(&self) -> u32 {
        if self.elapsed_secs > 0.0 {
            (self.typed.chars().count() as f64 / 5.0 / (self.elapsed_secs / 60.0)).round() as u32
        } else {
            0
        }
    }

    /// Share of keystrokes that matched, as a percentage. 100 before the
    /// first keystroke.
    pub fn accuracy(&self) -> f64 {
        if self.total_keystrokes > 0 {
            (self.total_keystrokes - self.errors) as f64 / self.total_keystrokes as f64 * 100.0
        } else {
            100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000)
    }

    fn started(target: &str) -> TypingRound {
        let mut round = TypingRound::new(Difficulty::Beginner);
        round.start(target, now()).unwrap();
        round
    }

    #[test]
    fn test_new_round_is_waiting() {
        let round = TypingRound::new(Difficulty::Beginner);
        assert_eq!(round.status(), RoundStatus::Waiting);
        assert_eq!(round.wpm(), 0);
        assert_eq!(round.accuracy(), 100.0);
    }

    #[test]
    fn test_start_rejects_empty_target() {
        let mut round = TypingRound::new(Difficulty::Beginner);
        assert_matches!(round.start("", now()), Err(RoundError::EmptyTarget));
        assert_eq!(round.status(), RoundStatus::Waiting);
    }

    #[test]
    fn test_scenario_ab_with_one_error() {
        let mut round = started("ab");

        assert_eq!(round.submit(Key::Char('a'), now()), KeyOutcome::Correct);
        assert_eq!(round.submit(Key::Char('x'), now()), KeyOutcome::Incorrect);
        assert_eq!(round.submit(Key::Char('b'), now()), KeyOutcome::Finished);

        assert_eq!(round.typed(), "ab");
        assert_eq!(round.errors(), 1);
        assert_eq!(round.total_keystrokes(), 3);
        assert_eq!(round.status(), RoundStatus::Finished);
        assert!((round.accuracy() - 2.0 / 3.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_typed_is_always_a_correct_prefix() {
        let mut round = started("haus");
        for key in ['h', 'q', 'a', 'a', 'u', 'u'] {
            round.submit(Key::Char(key), now());
            assert!(round.target().starts_with(round.typed()));
        }
        assert_eq!(round.typed(), "hau");
    }

    #[test]
    fn test_backspace_is_ignored() {
        let mut round = started("ab");
        round.submit(Key::Char('a'), now());
        round.submit(Key::Backspace, now());

        assert_eq!(round.typed(), "a");
        assert_eq!(round.total_keystrokes(), 1);
        assert_eq!(round.errors(), 0);
    }

    #[test]
    fn test_submit_ignored_while_waiting_and_finished() {
        let mut round = TypingRound::new(Difficulty::Beginner);
        assert_eq!(round.submit(Key::Char('a'), now()), KeyOutcome::Ignored);

        round.start("a", now()).unwrap();
        round.submit(Key::Char('a'), now());
        assert_eq!(round.status(), RoundStatus::Finished);
        assert_eq!(round.submit(Key::Char('a'), now()), KeyOutcome::Ignored);
        assert_eq!(round.total_keystrokes(), 1);
    }

    #[test]
    fn test_wpm_is_zero_before_clock_moves() {
        let mut round = started("abc");
        round.submit(Key::Char('a'), now());
        assert_eq!(round.elapsed_secs(), 0.0);
        assert_eq!(round.wpm(), 0);
    }

    #[test]
    fn test_wpm_after_one_minute() {
        let mut round = started("der ball rollt schnell und weit");
        for c in "der ball rollt schnell und weit".chars() {
            round.submit(Key::Char(c), now() + Duration::from_secs(60));
        }
        // 31 chars in 60s: round(31 / 5 / 1) = 6
        assert_eq!(round.status(), RoundStatus::Finished);
        assert_eq!(round.elapsed_secs(), 60.0);
        assert_eq!(round.wpm(), 6);
    }

    #[test]
    fn test_elapsed_only_advances_while_typing() {
        let mut round = started("ab");
        round.on_tick(now() + Duration::from_secs(2));
        assert_eq!(round.elapsed_secs(), 2.0);

        round.submit(Key::Char('a'), now() + Duration::from_secs(3));
        round.submit(Key::Char('b'), now() + Duration::from_secs(4));
        assert_eq!(round.elapsed_secs(), 4.0);

        // Ticks after completion leave the frozen value untouched
        round.on_tick(now() + Duration::from_secs(60));
        assert_eq!(round.elapsed_secs(), 4.0);
    }

    #[test]
    fn test_error_flash_arms_and_expires() {
        let mut round = started("ab");
        assert!(!round.error_flash(now()));

        round.submit(Key::Char('x'), now());
        assert!(round.error_flash(now()));
        assert!(round.error_flash(now() + Duration::from_millis(199)));
        assert!(!round.error_flash(now() + Duration::from_millis(200)));
    }

    #[test]
    fn test_new_error_rearms_flash_instead_of_stacking() {
        let mut round = started("ab");
        round.submit(Key::Char('x'), now());
        round.submit(Key::Char('y'), now() + Duration::from_millis(150));

        // 150ms + 200ms: the second error owns the deadline
        assert!(round.error_flash(now() + Duration::from_millis(349)));
        assert!(!round.error_flash(now() + Duration::from_millis(350)));
    }

    #[test]
    fn test_completion_clears_flash() {
        let mut round = started("a");
        round.submit(Key::Char('x'), now());
        round.submit(Key::Char('a'), now());
        assert!(!round.error_flash(now()));
    }

    #[test]
    fn test_accuracy_bounds() {
        let mut round = started("a");
        for _ in 0..50 {
            round.submit(Key::Char('z'), now());
        }
        let accuracy = round.accuracy();
        assert!((0.0..=100.0).contains(&accuracy));

        round.submit(Key::Char('a'), now());
        assert!(round.accuracy() > 0.0);
        assert!(round.accuracy() <= 100.0);
    }

    #[test]
    fn test_accuracy_is_exactly_100_without_errors() {
        let mut round = started("ab");
        round.submit(Key::Char('a'), now());
        assert_eq!(round.accuracy(), 100.0);
    }

    #[test]
    fn test_restart_discards_previous_round() {
        let mut round = started("abc");
        round.submit(Key::Char('a'), now());
        round.submit(Key::Char('x'), now());

        round.start("neu", now()).unwrap();
        assert_eq!(round.typed(), "");
        assert_eq!(round.errors(), 0);
        assert_eq!(round.total_keystrokes(), 0);
        assert_eq!(round.status(), RoundStatus::Typing);
    }

    #[test]
    fn test_reset_returns_to_waiting() {
        let mut round = started("ab");
        round.submit(Key::Char('a'), now());
        round.reset();

        assert_eq!(round.status(), RoundStatus::Waiting);
        assert_eq!(round.target(), "");
        assert_eq!(round.typed(), "");
        assert_eq!(round.difficulty(), Difficulty::Beginner);
    }

    #[test]
    fn test_umlaut_targets_match_by_char() {
        let mut round = started("über");
        assert_eq!(round.next_char(), Some('ü'));
        assert_eq!(round.submit(Key::Char('ü'), now()), KeyOutcome::Correct);
        assert_eq!(round.typed(), "ü");
    }

    #[test]
    fn test_finishes_only_by_typing_full_target() {
        let mut round = started("ab");
        round.on_tick(now() + Duration::from_secs(3600));
        assert_eq!(round.status(), RoundStatus::Typing);

        round.submit(Key::Char('a'), now());
        assert_eq!(round.status(), RoundStatus::Typing);
        round.submit(Key::Char('b'), now());
        assert_eq!(round.status(), RoundStatus::Finished);
    }
}

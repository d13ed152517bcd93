use std::collections::VecDeque;

use tonminer_core::constants::{ADMIN_TAP_COUNT, ADMIN_TAP_WINDOW_MS};
use tonminer_core::error::MinerError;
use tonminer_core::types::{elapsed_ms, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapOutcome {
    /// Taps currently inside the window.
    Counting(usize),
    PromptOpened,
}

/// Hidden admin switch: five taps on the logo inside a rolling two-second
/// window open a passcode prompt; the right passcode unlocks admin mode until
/// the session ends.
///
/// This is a capability toggle for a single-device demo, not a security
/// boundary. The passcode is a shared constant and nothing here is persisted.
#[derive(Debug)]
pub struct AdminGate {
    passcode: String,
    taps: VecDeque<Timestamp>,
    prompt_open: bool,
    unlocked: bool,
}

impl AdminGate {
    pub fn new(passcode: impl Into<String>) -> Self {
        Self {
            passcode: passcode.into(),
            taps: VecDeque::with_capacity(ADMIN_TAP_COUNT),
            prompt_open: false,
            unlocked: false,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn is_prompt_open(&self) -> bool {
        self.prompt_open
    }

    pub fn tap(&mut self, now: Timestamp) -> TapOutcome {
        while let Some(&first) = self.taps.front() {
            if elapsed_ms(first, now) >= ADMIN_TAP_WINDOW_MS || first > now {
                self.taps.pop_front();
            } else {
                break;
            }
        }
        self.taps.push_back(now);
        if self.taps.len() >= ADMIN_TAP_COUNT {
            self.taps.clear();
            self.prompt_open = true;
            return TapOutcome::PromptOpened;
        }
        TapOutcome::Counting(self.taps.len())
    }

    /// Check `input` against the passcode. A wrong entry leaves the prompt
    /// open for another try.
    pub fn verify(&mut self, input: &str) -> Result<(), MinerError> {
        if !self.prompt_open {
            return Err(MinerError::PasscodePromptClosed);
        }
        if input != self.passcode {
            return Err(MinerError::InvalidPasscode);
        }
        self.prompt_open = false;
        self.unlocked = true;
        Ok(())
    }

    pub fn close_prompt(&mut self) {
        self.prompt_open = false;
    }

    /// Back to the locked state a fresh session starts in.
    pub fn lock(&mut self) {
        self.taps.clear();
        self.prompt_open = false;
        self.unlocked = false;
    }
}

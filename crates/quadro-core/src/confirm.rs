use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::config::Config;

// Shared gate in front of destructive operations; cancelling leaves no side
// effects. The GUI's modal dialog becomes a terminal prompt here.
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> anyhow::Result<bool>;
}

pub struct TermConfirm;

impl Confirm for TermConfirm {
    fn confirm(&mut self, message: &str) -> anyhow::Result<bool> {
        let mut out = io::stdout().lock();
        write!(out, "{message} [y/N] ")?;
        out.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        let yes = matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes");
        debug!(yes, "confirmation prompt answered");
        Ok(yes)
    }
}

pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, message: &str) -> anyhow::Result<bool> {
        debug!(message, "confirmation bypassed");
        Ok(true)
    }
}

pub fn from_config(cfg: &Config, assume_yes: bool) -> Box<dyn Confirm> {
    if assume_yes || !cfg.get_bool("confirm").unwrap_or(true) {
        Box::new(AssumeYes)
    } else {
        Box::new(TermConfirm)
    }
}

#[cfg(test)]
pub struct ScriptedConfirm {
    pub answer: bool,
    pub asked: usize,
}

#[cfg(test)]
impl ScriptedConfirm {
    pub fn new(answer: bool) -> Self {
        Self { answer, asked: 0 }
    }
}

#[cfg(test)]
impl Confirm for ScriptedConfirm {
    fn confirm(&mut self, _message: &str) -> anyhow::Result<bool> {
        self.asked += 1;
        Ok(self.answer)
    }
}

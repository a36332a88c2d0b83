//! Deciding whether a proposal is applied.
//!
//! The engine asks a [`ChangeAuthority`] once per proposal and blocks until
//! it answers. Non-interactive callers pass [`AutoApply`] or [`RejectAll`];
//! any `FnMut(&Proposal) -> ChangeDecision` closure works as well.

use crate::reconcile::Proposal;
use serde::Serialize;
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeDecision {
    Approved,
    Rejected,
}

pub trait ChangeAuthority {
    fn decide(&mut self, proposal: &Proposal) -> ChangeDecision;
}

impl<F> ChangeAuthority for F
where
    F: FnMut(&Proposal) -> ChangeDecision,
{
    fn decide(&mut self, proposal: &Proposal) -> ChangeDecision {
        self(proposal)
    }
}

/// Approves everything without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApply;

impl ChangeAuthority for AutoApply {
    fn decide(&mut self, _proposal: &Proposal) -> ChangeDecision {
        ChangeDecision::Approved
    }
}

/// Rejects everything without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectAll;

impl ChangeAuthority for RejectAll {
    fn decide(&mut self, _proposal: &Proposal) -> ChangeDecision {
        ChangeDecision::Rejected
    }
}

/// Shows original and suggested text and asks for a yes/no answer.
///
/// An empty answer approves. End of input or a read error rejects, so a
/// closed or non-interactive stdin never applies anything.
#[derive(Debug)]
pub struct Interactive<R, W> {
    input: R,
    output: W,
}

impl Interactive<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Interactive<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn present(&mut self, proposal: &Proposal) -> io::Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "--- unit {}: original", proposal.unit_index)?;
        writeln!(self.output, "{}", proposal.original.trim_end())?;
        writeln!(self.output, "+++ unit {}: suggested", proposal.unit_index)?;
        writeln!(self.output, "{}", proposal.revised.trim_end())?;
        Ok(())
    }

    fn ask(&mut self) -> io::Result<Option<String>> {
        write!(self.output, "Apply this change? [Y/n] ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

impl<R: BufRead, W: Write> ChangeAuthority for Interactive<R, W> {
    fn decide(&mut self, proposal: &Proposal) -> ChangeDecision {
        if let Err(e) = self.present(proposal) {
            log::warn!("Cannot show unit {}: {}", proposal.unit_index, e);
            return ChangeDecision::Rejected;
        }
        loop {
            match self.ask() {
                Ok(Some(answer)) => {
                    if let Some(decision) = parse_answer(&answer) {
                        return decision;
                    }
                    let _ = writeln!(self.output, "Please answer y or n.");
                }
                Ok(None) => {
                    log::warn!(
                        "No answer for unit {}; change rejected",
                        proposal.unit_index
                    );
                    return ChangeDecision::Rejected;
                }
                Err(e) => {
                    log::warn!(
                        "Failed to read answer for unit {}: {}",
                        proposal.unit_index,
                        e
                    );
                    return ChangeDecision::Rejected;
                }
            }
        }
    }
}

fn parse_answer(answer: &str) -> Option<ChangeDecision> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" | "y" | "yes" => Some(ChangeDecision::Approved),
        "n" | "no" => Some(ChangeDecision::Rejected),
        _ => None,
    }
}

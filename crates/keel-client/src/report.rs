//! Parsing of the post-push report-status stream.

use crate::{ClientError, Result};
use std::collections::BTreeMap;

/// The outcome of a single ref update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefUpdateResult {
    /// The remote accepted the update.
    Accepted,
    /// The remote rejected the update for the given reason.
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingUnpack,
    RefStatuses,
    Done,
}

/// State machine over the report-status lines a remote sends after a push.
///
/// Feed one status line per [`handle_packet`](Self::handle_packet) call and
/// the terminator sentinel (`None`) when the stream ends, then call
/// [`check`](Self::check) for the overall outcome.
#[derive(Debug)]
pub struct ReportStatusParser {
    state: State,
    unpack_error: Option<String>,
    outcomes: Vec<(String, RefUpdateResult)>,
}

impl ReportStatusParser {
    /// Creates a parser awaiting the unpack status line.
    pub fn new() -> Self {
        Self {
            state: State::AwaitingUnpack,
            unpack_error: None,
            outcomes: Vec::new(),
        }
    }

    /// Consumes one status line, or the terminator sentinel when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] on a line after the terminator or
    /// a line outside the status grammar.
    pub fn handle_packet(&mut self, packet: Option<&[u8]>) -> Result<()> {
        if self.state == State::Done {
            return Err(ClientError::Protocol(
                "status report already terminated".to_string(),
            ));
        }
        let Some(packet) = packet else {
            self.state = State::Done;
            return Ok(());
        };
        let line = std::str::from_utf8(packet)
            .map_err(|_| ClientError::Protocol("status line is not valid text".to_string()))?
            .trim_end_matches('\n');
        match self.state {
            State::AwaitingUnpack => {
                if line == "unpack ok" {
                    self.unpack_error = None;
                } else if let Some(reason) = line.strip_prefix("unpack ") {
                    self.unpack_error = Some(reason.to_string());
                } else {
                    return Err(ClientError::Protocol(format!(
                        "expected unpack status, got: {line}"
                    )));
                }
                self.state = State::RefStatuses;
                Ok(())
            }
            State::RefStatuses => {
                if let Some(rest) = line.strip_prefix("ok ") {
                    self.outcomes
                        .push((rest.to_string(), RefUpdateResult::Accepted));
                    Ok(())
                } else if let Some(rest) = line.strip_prefix("ng ") {
                    let (refname, reason) = rest
                        .split_once(' ')
                        .ok_or_else(|| {
                            ClientError::Protocol(format!("malformed ref status: {line}"))
                        })?;
                    self.outcomes.push((
                        refname.to_string(),
                        RefUpdateResult::Rejected(reason.to_string()),
                    ));
                    Ok(())
                } else {
                    Err(ClientError::Protocol(format!(
                        "malformed ref status: {line}"
                    )))
                }
            }
            State::Done => unreachable!("handled above"),
        }
    }

    /// Per-ref outcomes in the order the remote reported them.
    pub fn outcomes(&self) -> &[(String, RefUpdateResult)] {
        &self.outcomes
    }

    /// Evaluates the terminal outcome of the push.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] when called before the terminator
    /// sentinel arrived, [`ClientError::SendPack`] when the remote
    /// rejected the unpack (taking priority over ref outcomes), and
    /// [`ClientError::UpdateRefs`] when specific refs were rejected.
    pub fn check(&self) -> Result<()> {
        if self.state != State::Done {
            return Err(ClientError::Protocol(
                "status report not terminated".to_string(),
            ));
        }
        if let Some(reason) = &self.unpack_error {
            return Err(ClientError::SendPack(reason.clone()));
        }
        let reasons: BTreeMap<String, String> = self
            .outcomes
            .iter()
            .filter_map(|(refname, outcome)| match outcome {
                RefUpdateResult::Rejected(reason) => Some((refname.clone(), reason.clone())),
                RefUpdateResult::Accepted => None,
            })
            .collect();
        if !reasons.is_empty() {
            return Err(ClientError::UpdateRefs { reasons });
        }
        Ok(())
    }
}

impl Default for ReportStatusParser {
    fn default() -> Self {
        Self::new()
    }
}

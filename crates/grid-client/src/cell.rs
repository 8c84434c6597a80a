//! Per-cell edit state machine
//!
//! Each editable cell moves through `Viewing → Editing → Pending` and either
//! back to `Viewing` (server confirmed) or through `Reverting` (server
//! rejected). The machine is pure: it never touches the network or a clock.
//! The synchronizer drives it and decides what to render.
//!
//! Every commit draws a fresh [`Ticket`]. Only a response carrying the latest
//! ticket is applied; older responses never change what the cell shows. An
//! older write that the server did accept still becomes the value a later
//! failure restores, since that is what the server now holds.

use crate::error::ClientError;
use grid_model::{EditableField, EntityId};
use std::fmt;

/// Identifies one editable cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    /// Row the cell belongs to
    pub row: EntityId,
    /// Column being edited
    pub field: EditableField,
}

impl CellKey {
    /// Key for a row's field
    #[inline]
    #[must_use]
    pub fn new(row: EntityId, field: EditableField) -> Self {
        Self { row, field }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.row, self.field)
    }
}

/// Where an edit stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStatus {
    /// Editor open
    Editing,
    /// Committed, awaiting the server
    Pending,
    /// Rejected; showing the error before restoring
    Reverting,
}

/// Speculative edit overlaid on a cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    /// Target cell
    pub key: CellKey,
    /// Value to restore on failure
    pub original_value: String,
    /// Value the user typed
    pub candidate_value: String,
    /// Current status
    pub status: EditStatus,
}

/// Coarse state, for callers and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellPhase {
    /// Showing the confirmed value
    Viewing,
    /// Editor open
    Editing,
    /// Showing a speculative value
    Pending,
    /// Showing or recovering from a failure
    Reverting,
}

/// Commit sequence number, unique per cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

/// What the cell should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellDisplay {
    /// Plain value; `speculative` while the server has not confirmed it
    Value {
        /// Displayed text
        text: String,
        /// Awaiting confirmation
        speculative: bool,
    },
    /// Input control with the current draft
    Input {
        /// Draft text
        draft: String,
    },
    /// Error indicator in place of the value
    Failed {
        /// Error text
        message: String,
    },
    /// Original value restored, indicator still visible
    Restored {
        /// Restored text
        text: String,
        /// Error text
        message: String,
    },
}

/// Result of committing the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitDecision {
    /// Nothing changed; no request
    Unchanged,
    /// Send `value` under `ticket`
    Dispatch {
        /// Ticket the response must carry
        ticket: Ticket,
        /// Candidate value to write
        value: String,
        /// In-flight request this one replaces
        superseded: Option<Ticket>,
    },
}

/// How a response was absorbed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Server confirmed the latest commit
    Committed,
    /// Server rejected the latest commit; the cell is reverting
    Failed,
    /// Response belonged to an older commit and was dropped
    Stale,
    /// Response confirmed an older commit; it only moves the revert target
    Settled,
}

/// Response outcome fed into [`CellMachine::resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Server's value for the field after the write
    Confirmed(String),
    /// Error indicator text
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RevertStage {
    ShowingError,
    Restored,
}

#[derive(Debug, Clone)]
enum State {
    Viewing,
    Editing {
        edit: PendingEdit,
        /// Value shown when the editor opened
        base: String,
    },
    Pending {
        edit: PendingEdit,
    },
    Reverting {
        edit: PendingEdit,
        message: String,
        stage: RevertStage,
        ticket: Ticket,
    },
}

#[derive(Debug, Clone)]
struct InFlight {
    ticket: Ticket,
    candidate: String,
}

/// State machine for one cell
#[derive(Debug, Clone)]
pub struct CellMachine {
    key: CellKey,
    state: State,
    issued: u64,
    in_flight: Option<InFlight>,
    /// Newest ticket the server has confirmed
    settled: Ticket,
}

/// Whether two cell texts denote the same value
///
/// Numeric texts compare numerically (`120` equals `120.00`); anything else
/// compares trimmed.
#[must_use]
pub fn same_value(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) if x.is_finite() && y.is_finite() => (x - y).abs() < 1e-9,
        _ => a == b,
    }
}

impl CellMachine {
    /// Idle machine
    #[must_use]
    pub fn new(key: CellKey) -> Self {
        Self {
            key,
            state: State::Viewing,
            issued: 0,
            in_flight: None,
            settled: Ticket(0),
        }
    }

    /// Cell this machine drives
    #[inline]
    #[must_use]
    pub fn key(&self) -> CellKey {
        self.key
    }

    /// Coarse state
    #[must_use]
    pub fn phase(&self) -> CellPhase {
        match self.state {
            State::Viewing => CellPhase::Viewing,
            State::Editing { .. } => CellPhase::Editing,
            State::Pending { .. } => CellPhase::Pending,
            State::Reverting { .. } => CellPhase::Reverting,
        }
    }

    /// Viewing with nothing in flight
    #[inline]
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Viewing) && self.in_flight.is_none()
    }

    /// Whether `ticket` is the request this cell is waiting on
    #[inline]
    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.in_flight.as_ref().is_some_and(|f| f.ticket == ticket)
    }

    /// The overlay, if any
    #[must_use]
    pub fn pending_edit(&self) -> Option<&PendingEdit> {
        match &self.state {
            State::Viewing => None,
            State::Editing { edit, .. } | State::Pending { edit } | State::Reverting { edit, .. } => {
                Some(edit)
            }
        }
    }

    /// Value that should feed subtotal and totals instead of the confirmed one
    #[must_use]
    pub fn speculative_value(&self) -> Option<&str> {
        match &self.state {
            State::Pending { edit }
            | State::Reverting {
                edit,
                stage: RevertStage::ShowingError,
                ..
            } => Some(&edit.candidate_value),
            State::Editing { .. } => self.in_flight.as_ref().map(|f| f.candidate.as_str()),
            _ => None,
        }
    }

    /// Render given the confirmed value
    #[must_use]
    pub fn display(&self, authoritative: &str) -> CellDisplay {
        match &self.state {
            State::Viewing => CellDisplay::Value {
                text: authoritative.to_string(),
                speculative: false,
            },
            State::Editing { edit, .. } => CellDisplay::Input {
                draft: edit.candidate_value.clone(),
            },
            State::Pending { edit } => CellDisplay::Value {
                text: edit.candidate_value.clone(),
                speculative: true,
            },
            State::Reverting {
                message,
                stage: RevertStage::ShowingError,
                ..
            } => CellDisplay::Failed {
                message: message.clone(),
            },
            State::Reverting {
                edit,
                message,
                stage: RevertStage::Restored,
                ..
            } => CellDisplay::Restored {
                text: edit.original_value.clone(),
                message: message.clone(),
            },
        }
    }

    /// Open the editor; returns the initial draft
    ///
    /// Allowed while a commit is pending: the open editor starts from the
    /// speculative value and a later commit supersedes the in-flight one.
    ///
    /// # Errors
    /// `CellBusy` while the cell is reverting
    pub fn begin(&mut self, authoritative: &str) -> Result<String, ClientError> {
        let (original, base) = match &self.state {
            State::Viewing => (authoritative.to_string(), authoritative.to_string()),
            State::Editing { edit, .. } => return Ok(edit.candidate_value.clone()),
            State::Pending { edit } => (edit.original_value.clone(), edit.candidate_value.clone()),
            State::Reverting { .. } => return Err(ClientError::CellBusy(self.key)),
        };
        self.state = State::Editing {
            edit: PendingEdit {
                key: self.key,
                original_value: original,
                candidate_value: base.clone(),
                status: EditStatus::Editing,
            },
            base: base.clone(),
        };
        Ok(base)
    }

    /// Replace the draft
    ///
    /// # Errors
    /// `NotEditing` unless the editor is open
    pub fn set_draft(&mut self, text: &str) -> Result<(), ClientError> {
        match &mut self.state {
            State::Editing { edit, .. } => {
                edit.candidate_value = text.to_string();
                Ok(())
            }
            _ => Err(ClientError::NotEditing(self.key)),
        }
    }

    /// Close the editor without sending anything
    ///
    /// # Errors
    /// `NotEditing` unless the editor is open
    pub fn cancel(&mut self) -> Result<(), ClientError> {
        match &self.state {
            State::Editing { edit, .. } => {
                let original = edit.original_value.clone();
                self.settle_editor(original);
                Ok(())
            }
            _ => Err(ClientError::NotEditing(self.key)),
        }
    }

    /// Close the editor, keeping the draft if it differs from what was shown
    ///
    /// # Errors
    /// `NotEditing` unless the editor is open
    pub fn commit(&mut self) -> Result<CommitDecision, ClientError> {
        let State::Editing { edit, base } = &self.state else {
            return Err(ClientError::NotEditing(self.key));
        };
        if same_value(&edit.candidate_value, base) {
            let original = edit.original_value.clone();
            self.settle_editor(original);
            return Ok(CommitDecision::Unchanged);
        }

        let mut edit = edit.clone();
        edit.status = EditStatus::Pending;
        self.issued += 1;
        let ticket = Ticket(self.issued);
        let superseded = self
            .in_flight
            .replace(InFlight {
                ticket,
                candidate: edit.candidate_value.clone(),
            })
            .map(|f| f.ticket);
        let value = edit.candidate_value.clone();
        self.state = State::Pending { edit };
        Ok(CommitDecision::Dispatch {
            ticket,
            value,
            superseded,
        })
    }

    /// Leave the editor for whatever the in-flight request implies
    fn settle_editor(&mut self, original: String) {
        self.state = match &self.in_flight {
            Some(flight) => State::Pending {
                edit: PendingEdit {
                    key: self.key,
                    original_value: original,
                    candidate_value: flight.candidate.clone(),
                    status: EditStatus::Pending,
                },
            },
            None => State::Viewing,
        };
    }

    /// Absorb a response
    ///
    /// A rejection while the editor is open discards the draft: every failure
    /// puts the cell into `Reverting`. A confirmation of a superseded commit
    /// newer than anything confirmed so far is [`Resolution::Settled`].
    pub fn resolve(&mut self, ticket: Ticket, outcome: Outcome) -> Resolution {
        if !self.is_current(ticket) {
            let newer = ticket > self.settled && ticket.0 <= self.issued;
            return match outcome {
                Outcome::Confirmed(confirmed) if newer => {
                    self.settled = ticket;
                    self.retarget(confirmed);
                    Resolution::Settled
                }
                _ => Resolution::Stale,
            };
        }
        let Some(flight) = self.in_flight.take() else {
            return Resolution::Stale;
        };

        match outcome {
            Outcome::Confirmed(confirmed) => {
                self.settled = ticket;
                if let State::Editing { edit, .. } = &mut self.state {
                    edit.original_value = confirmed;
                } else {
                    self.state = State::Viewing;
                }
                Resolution::Committed
            }
            Outcome::Rejected(message) => {
                let original = match &self.state {
                    State::Editing { edit, .. } | State::Pending { edit } => {
                        edit.original_value.clone()
                    }
                    State::Reverting { edit, .. } => edit.original_value.clone(),
                    State::Viewing => String::new(),
                };
                self.state = State::Reverting {
                    edit: PendingEdit {
                        key: self.key,
                        original_value: original,
                        candidate_value: flight.candidate,
                        status: EditStatus::Reverting,
                    },
                    message,
                    stage: RevertStage::ShowingError,
                    ticket,
                };
                Resolution::Failed
            }
        }
    }

    /// Point the overlay's revert target at a value the server now holds
    fn retarget(&mut self, confirmed: String) {
        match &mut self.state {
            State::Editing { edit, .. }
            | State::Pending { edit }
            | State::Reverting { edit, .. } => edit.original_value = confirmed,
            State::Viewing => {}
        }
    }

    /// First revert step: put the original value back, keep the indicator
    ///
    /// Returns `false` if the cell has moved on since `ticket` failed.
    pub fn restore(&mut self, ticket: Ticket) -> bool {
        match &mut self.state {
            State::Reverting {
                stage,
                ticket: failed,
                ..
            } if *failed == ticket && *stage == RevertStage::ShowingError => {
                *stage = RevertStage::Restored;
                true
            }
            _ => false,
        }
    }

    /// Second revert step: clear the indicator
    pub fn clear(&mut self, ticket: Ticket) -> bool {
        let failed_here =
            matches!(&self.state, State::Reverting { ticket: failed, .. } if *failed == ticket);
        if failed_here {
            self.state = State::Viewing;
        }
        failed_here
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key() -> CellKey {
        CellKey::new(EntityId(1), EditableField::Price)
    }

    fn dispatch(machine: &mut CellMachine, shown: &str, value: &str) -> Ticket {
        machine.begin(shown).unwrap();
        machine.set_draft(value).unwrap();
        match machine.commit().unwrap() {
            CommitDecision::Dispatch { ticket, .. } => ticket,
            CommitDecision::Unchanged => panic!("expected a dispatch"),
        }
    }

    #[test]
    fn unchanged_commit_sends_nothing() {
        let mut machine = CellMachine::new(key());
        machine.begin("120.00").unwrap();
        machine.set_draft("120").unwrap();
        assert_eq!(machine.commit().unwrap(), CommitDecision::Unchanged);
        assert_eq!(machine.phase(), CellPhase::Viewing);
    }

    #[test]
    fn cancel_returns_to_viewing() {
        let mut machine = CellMachine::new(key());
        machine.begin("120.00").unwrap();
        machine.set_draft("5").unwrap();
        machine.cancel().unwrap();
        assert!(machine.is_idle());
        assert_eq!(
            machine.display("120.00"),
            CellDisplay::Value {
                text: "120.00".to_string(),
                speculative: false
            }
        );
    }

    #[test]
    fn commit_shows_speculative_value() {
        let mut machine = CellMachine::new(key());
        let ticket = dispatch(&mut machine, "120.00", "150.00");
        assert_eq!(ticket, Ticket(1));
        assert_eq!(machine.speculative_value(), Some("150.00"));
        let edit = machine.pending_edit().unwrap();
        assert_eq!(edit.original_value, "120.00");
        assert_eq!(edit.status, EditStatus::Pending);
    }

    #[test]
    fn confirmation_returns_to_viewing() {
        let mut machine = CellMachine::new(key());
        let ticket = dispatch(&mut machine, "120.00", "150");
        assert_eq!(
            machine.resolve(ticket, Outcome::Confirmed("150.00".to_string())),
            Resolution::Committed
        );
        assert!(machine.is_idle());
        assert_eq!(machine.speculative_value(), None);
    }

    #[test]
    fn superseded_response_is_stale() {
        let mut machine = CellMachine::new(key());
        let first = dispatch(&mut machine, "120.00", "130.00");
        machine.begin("120.00").unwrap();
        machine.set_draft("140.00").unwrap();
        let CommitDecision::Dispatch {
            ticket: second,
            superseded,
            ..
        } = machine.commit().unwrap()
        else {
            panic!("expected a dispatch");
        };
        assert_eq!(superseded, Some(first));
        assert_eq!(machine.pending_edit().unwrap().original_value, "120.00");

        assert_eq!(
            machine.resolve(first, Outcome::Rejected("boom".to_string())),
            Resolution::Stale
        );
        assert_eq!(machine.phase(), CellPhase::Pending);
        assert_eq!(
            machine.resolve(second, Outcome::Confirmed("140.00".to_string())),
            Resolution::Committed
        );
    }

    #[test]
    fn accepted_older_write_becomes_the_revert_target() {
        let mut machine = CellMachine::new(key());
        let first = dispatch(&mut machine, "120.00", "130.00");
        let second = dispatch(&mut machine, "120.00", "999");

        assert_eq!(
            machine.resolve(first, Outcome::Confirmed("130.00".to_string())),
            Resolution::Settled
        );
        assert_eq!(
            machine.display("130.00"),
            CellDisplay::Value {
                text: "999".to_string(),
                speculative: true
            }
        );
        assert_eq!(
            machine.resolve(second, Outcome::Rejected("server error".to_string())),
            Resolution::Failed
        );
        assert!(machine.restore(second));
        assert_eq!(
            machine.display("130.00"),
            CellDisplay::Restored {
                text: "130.00".to_string(),
                message: "server error".to_string()
            }
        );
    }

    #[test]
    fn older_confirmation_after_newer_one_is_stale() {
        let mut machine = CellMachine::new(key());
        let first = dispatch(&mut machine, "120.00", "130.00");
        let second = dispatch(&mut machine, "120.00", "140.00");
        assert_eq!(
            machine.resolve(second, Outcome::Confirmed("140.00".to_string())),
            Resolution::Committed
        );
        assert_eq!(
            machine.resolve(first, Outcome::Confirmed("130.00".to_string())),
            Resolution::Stale
        );
        assert!(machine.is_idle());
    }

    #[test]
    fn rejection_walks_through_revert_stages() {
        let mut machine = CellMachine::new(key());
        let ticket = dispatch(&mut machine, "120.00", "999");
        assert_eq!(
            machine.resolve(ticket, Outcome::Rejected("server error".to_string())),
            Resolution::Failed
        );
        assert_eq!(
            machine.display("120.00"),
            CellDisplay::Failed {
                message: "server error".to_string()
            }
        );
        assert_eq!(machine.speculative_value(), Some("999"));
        assert_eq!(machine.begin("120.00"), Err(ClientError::CellBusy(key())));

        assert!(machine.restore(ticket));
        assert_eq!(machine.speculative_value(), None);
        assert_eq!(
            machine.display("120.00"),
            CellDisplay::Restored {
                text: "120.00".to_string(),
                message: "server error".to_string()
            }
        );
        assert!(machine.clear(ticket));
        assert!(machine.is_idle());
    }

    #[test]
    fn rejection_discards_open_editor() {
        let mut machine = CellMachine::new(key());
        let ticket = dispatch(&mut machine, "120.00", "999");
        assert_eq!(machine.begin("120.00").unwrap(), "999");
        machine.set_draft("125").unwrap();
        assert_eq!(
            machine.resolve(ticket, Outcome::Rejected("nope".to_string())),
            Resolution::Failed
        );
        assert_eq!(machine.phase(), CellPhase::Reverting);
        assert_eq!(machine.pending_edit().unwrap().candidate_value, "999");
    }

    #[test]
    fn confirmation_while_editing_keeps_editor() {
        let mut machine = CellMachine::new(key());
        let ticket = dispatch(&mut machine, "120.00", "150");
        machine.begin("120.00").unwrap();
        assert_eq!(
            machine.resolve(ticket, Outcome::Confirmed("150.00".to_string())),
            Resolution::Committed
        );
        assert_eq!(machine.phase(), CellPhase::Editing);
        assert_eq!(machine.pending_edit().unwrap().original_value, "150.00");
        machine.cancel().unwrap();
        assert!(machine.is_idle());
    }

    #[test]
    fn same_value_compares_numbers_numerically() {
        assert!(same_value("120", "120.00"));
        assert!(same_value(" 3 ", "3"));
        assert!(!same_value("abc", "120.00"));
        assert!(same_value("abc", "abc"));
    }
}

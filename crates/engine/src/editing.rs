//! In-place cell editor state machine.
//!
//! `Viewing -> Editing -> (Committed | Cancelled) -> Viewing`. Every editing
//! session carries an id and ends exactly once: a late blur or a repeated
//! commit for a session that already ended is a no-op.
//!
//! The editor never writes to the table itself. Ending a session yields an
//! `EditOutcome` which the caller applies through `GridState::commit_text`.

use gridcrm_core::{CellKey, RowId};

pub type SessionId = u64;

/// Keys the editor reacts to. Anything else is the host's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Committed { session: SessionId, cell: CellKey, value: String },
    Cancelled { session: SessionId, cell: CellKey },
}

impl EditOutcome {
    pub fn cell(&self) -> &CellKey {
        match self {
            EditOutcome::Committed { cell, .. } | EditOutcome::Cancelled { cell, .. } => cell,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub id: SessionId,
    pub cell: CellKey,
    /// Raw value when the session started (restored on cancel by simply not writing)
    pub original: String,
    pub value: String,
    /// Byte offset into `value`, always on a char boundary
    pub cursor: usize,
    /// An IME composition is in progress; Enter belongs to the IME
    pub composing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditorState {
    #[default]
    Viewing,
    Editing(EditSession),
}

#[derive(Debug, Default)]
pub struct CellEditor {
    state: EditorState,
    next_session: SessionId,
}

impl CellEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditorState::Editing(_))
    }

    pub fn session(&self) -> Option<&EditSession> {
        match &self.state {
            EditorState::Editing(s) => Some(s),
            EditorState::Viewing => None,
        }
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session().map(|s| s.id)
    }

    pub fn cell(&self) -> Option<&CellKey> {
        self.session().map(|s| &s.cell)
    }

    pub fn value(&self) -> Option<&str> {
        self.session().map(|s| s.value.as_str())
    }

    /// Start editing `cell` with its current raw text, caret at the end
    /// (double-activation, or Enter on a selected cell).
    ///
    /// If another cell is being edited, that session is committed first and
    /// its outcome returned. Beginning on the cell already being edited is a
    /// no-op.
    pub fn begin(&mut self, cell: CellKey, current_raw: &str) -> Option<EditOutcome> {
        self.start(cell, current_raw.to_string(), current_raw.to_string())
    }

    /// Feed a key. `selected` is the single selected cell, if exactly one is.
    ///
    /// While viewing: the first printable character starts a session seeded
    /// with that character (prior content is overwritten), Enter starts one
    /// with the current content. While editing: text keys edit the buffer,
    /// Enter commits unless an IME composition is pending, Escape cancels.
    pub fn handle_key(&mut self, selected: Option<&CellKey>, key: EditKey, current_raw: &str) -> Option<EditOutcome> {
        let EditorState::Editing(session) = &mut self.state else {
            let cell = selected?.clone();
            return match key {
                EditKey::Char(c) if !c.is_control() => self.start(cell, current_raw.to_string(), c.to_string()),
                EditKey::Enter => self.begin(cell, current_raw),
                _ => None,
            };
        };

        match key {
            EditKey::Char(c) => {
                session.value.insert(session.cursor, c);
                session.cursor += c.len_utf8();
            }
            EditKey::Backspace => {
                if let Some(prev) = prev_boundary(&session.value, session.cursor) {
                    session.value.replace_range(prev..session.cursor, "");
                    session.cursor = prev;
                }
            }
            EditKey::Delete => {
                if let Some(next) = next_boundary(&session.value, session.cursor) {
                    session.value.replace_range(session.cursor..next, "");
                }
            }
            EditKey::Left => {
                if let Some(prev) = prev_boundary(&session.value, session.cursor) {
                    session.cursor = prev;
                }
            }
            EditKey::Right => {
                if let Some(next) = next_boundary(&session.value, session.cursor) {
                    session.cursor = next;
                }
            }
            EditKey::Home => session.cursor = 0,
            EditKey::End => session.cursor = session.value.len(),
            EditKey::Enter => {
                if session.composing {
                    return None;
                }
                return self.commit();
            }
            EditKey::Escape => return self.cancel(),
        }
        None
    }

    /// IME composition started or ended.
    pub fn set_composing(&mut self, composing: bool) {
        if let EditorState::Editing(session) = &mut self.state {
            session.composing = composing;
        }
    }

    /// Replace the whole buffer (e.g. text pasted into the editor), caret at the end.
    pub fn set_value(&mut self, value: &str) {
        if let EditorState::Editing(session) = &mut self.state {
            session.value = value.to_string();
            session.cursor = session.value.len();
        }
    }

    pub fn commit(&mut self) -> Option<EditOutcome> {
        match std::mem::take(&mut self.state) {
            EditorState::Editing(s) => Some(EditOutcome::Committed { session: s.id, cell: s.cell, value: s.value }),
            EditorState::Viewing => None,
        }
    }

    pub fn cancel(&mut self) -> Option<EditOutcome> {
        match std::mem::take(&mut self.state) {
            EditorState::Editing(s) => Some(EditOutcome::Cancelled { session: s.id, cell: s.cell }),
            EditorState::Viewing => None,
        }
    }

    /// Focus left the editor.
    pub fn blur(&mut self) -> Option<EditOutcome> {
        self.commit()
    }

    /// Commit only if `session` is still the live one.
    pub fn commit_session(&mut self, session: SessionId) -> Option<EditOutcome> {
        if self.session_id() == Some(session) {
            self.commit()
        } else {
            None
        }
    }

    /// Blur delivered for `session`; ignored if that session already ended.
    pub fn blur_session(&mut self, session: SessionId) -> Option<EditOutcome> {
        self.commit_session(session)
    }

    /// Selection moved to `cell`. Mid-edit on a different cell commits.
    pub fn select_other(&mut self, cell: &CellKey) -> Option<EditOutcome> {
        match self.cell() {
            Some(current) if current != cell => self.commit(),
            _ => None,
        }
    }

    pub fn rewrite_row_id(&mut self, from: &RowId, to: &RowId) {
        if let EditorState::Editing(session) = &mut self.state {
            if &session.cell.row == from {
                session.cell.row = to.clone();
            }
        }
    }

    /// Put back a session whose commit was rejected, replacing whatever
    /// took its place. The draft and caret are kept.
    pub fn restore(&mut self, session: EditSession) {
        self.state = EditorState::Editing(session);
    }

    /// Drop a session whose row vanished. Nothing is committed.
    pub fn discard_if_row(&mut self, row: &RowId) {
        if self.cell().is_some_and(|c| &c.row == row) {
            self.state = EditorState::Viewing;
        }
    }

    fn start(&mut self, cell: CellKey, original: String, value: String) -> Option<EditOutcome> {
        if self.cell() == Some(&cell) {
            return None;
        }
        let previous = self.commit();
        self.next_session += 1;
        self.state = EditorState::Editing(EditSession {
            id: self.next_session,
            cell,
            original,
            cursor: value.len(),
            value,
            composing: false,
        });
        previous
    }
}

fn prev_boundary(s: &str, cursor: usize) -> Option<usize> {
    s[..cursor].char_indices().next_back().map(|(i, _)| i)
}

fn next_boundary(s: &str, cursor: usize) -> Option<usize> {
    s[cursor..].chars().next().map(|c| cursor + c.len_utf8())
}

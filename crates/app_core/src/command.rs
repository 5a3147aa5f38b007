//! Board commands as data
//!
//! Front ends that route user actions through a queue build [`Command`]s and
//! hand them to [`Board::execute`]. Sync commands are async and live on
//! `AppState` instead.

use crate::{AppError, Board, FileId, NewFile, Rating, ReferenceId, StatusFilter, Step};
use serde::Serialize;

/// Synchronous board command
#[derive(Debug, Clone)]
pub enum Command {
    // File commands
    Upload(Vec<NewFile>),
    DeleteFile(FileId),
    SetAssociation {
        files: Vec<FileId>,
        reference: Option<ReferenceId>,
    },
    SetRating {
        files: Vec<FileId>,
        rating: Rating,
    },

    // Reference commands
    AddReferences(Vec<String>),
    DeleteReference(ReferenceId),
    Reorder {
        dragged: FileId,
        target: FileId,
    },

    // Selection commands
    Select(FileId),
    RangeSelect(FileId),
    Step(Step),
    SelectAll,
    ClearSelection,

    // View commands
    SetStatusFilter(StatusFilter),
    FocusReference(ReferenceId),
    ToggleRatingFilter(Rating),
    ToggleSortOrder,
    ResetView,
}

impl Command {
    /// Stable identifier for logs
    pub fn id(&self) -> &'static str {
        match self {
            Command::Upload(_) => "file.upload",
            Command::DeleteFile(_) => "file.delete",
            Command::SetAssociation { .. } => "file.associate",
            Command::SetRating { .. } => "file.rate",
            Command::AddReferences(_) => "reference.add",
            Command::DeleteReference(_) => "reference.delete",
            Command::Reorder { .. } => "reference.reorder",
            Command::Select(_) => "select.toggle",
            Command::RangeSelect(_) => "select.range",
            Command::Step(_) => "select.step",
            Command::SelectAll => "select.all",
            Command::ClearSelection => "select.clear",
            Command::SetStatusFilter(_) => "view.status",
            Command::FocusReference(_) => "view.focus_reference",
            Command::ToggleRatingFilter(_) => "view.rating",
            Command::ToggleSortOrder => "view.sort_order",
            Command::ResetView => "view.reset",
        }
    }
}

/// What a command did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CommandOutput {
    Files(Vec<FileId>),
    References(Vec<ReferenceId>),
    /// Number of files changed
    Changed(usize),
    /// The command was ignored in the current mode
    Ignored,
    Done,
}

impl Board {
    /// Run one command under the caller's write lock
    pub fn execute(&mut self, cmd: Command) -> Result<CommandOutput, AppError> {
        tracing::debug!("Executing command: {}", cmd.id());

        let output = match cmd {
            Command::Upload(files) => CommandOutput::Files(self.upload(files)),
            Command::DeleteFile(id) => {
                self.delete_file(id)?;
                CommandOutput::Done
            }
            Command::SetAssociation { files, reference } => {
                CommandOutput::Changed(self.set_association(&files, reference)?)
            }
            Command::SetRating { files, rating } => CommandOutput::Changed(self.set_rating(&files, rating)),
            Command::AddReferences(texts) => CommandOutput::References(self.add_references(texts)),
            Command::DeleteReference(id) => {
                self.delete_reference(id)?;
                CommandOutput::Done
            }
            Command::Reorder { dragged, target } => done_if(self.reorder(dragged, target)),
            Command::Select(id) => done_if(self.select(id)),
            Command::RangeSelect(id) => done_if(self.range_select(id)),
            Command::Step(direction) => match self.step(direction) {
                Some(id) => CommandOutput::Files(vec![id]),
                None => CommandOutput::Ignored,
            },
            Command::SelectAll => done_if(self.select_all_visible()),
            Command::ClearSelection => {
                self.clear_selection();
                CommandOutput::Done
            }
            Command::SetStatusFilter(status) => {
                self.set_status_filter(status);
                CommandOutput::Done
            }
            Command::FocusReference(id) => {
                self.focus_reference(id)?;
                CommandOutput::Done
            }
            Command::ToggleRatingFilter(rating) => {
                self.toggle_rating_filter(rating);
                CommandOutput::Done
            }
            Command::ToggleSortOrder => {
                self.toggle_sort_order();
                CommandOutput::Done
            }
            Command::ResetView => {
                self.reset_view();
                CommandOutput::Done
            }
        };

        Ok(output)
    }
}

fn done_if(applied: bool) -> CommandOutput {
    if applied {
        CommandOutput::Done
    } else {
        CommandOutput::Ignored
    }
}

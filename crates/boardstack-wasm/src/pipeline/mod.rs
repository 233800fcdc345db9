//! Tick-driven import pipeline.
//!
//! [`ImportSession`] owns every intermediate of one import, [`advance`] runs
//! one stage of it, and [`Pipeline`] is the thin driver a host calls once per
//! tick.

pub mod progress;
pub mod session;
pub mod stage;

pub use progress::{ImportSummary, Progress};
pub use session::{ImportSession, InputFile, ParseCounters};
pub use stage::{advance, Stage};

use tracing::info;

use crate::config::ImportSettings;
use crate::solid::BoardMesh;

/// Drives one [`ImportSession`] tick by tick.
#[derive(Debug)]
pub struct Pipeline {
    session: ImportSession,
}

impl Pipeline {
    /// A pipeline with no files yet.
    pub fn new(settings: ImportSettings) -> Self {
        Self {
            session: ImportSession::new(Vec::new(), settings),
        }
    }

    /// Queue a file. Returns `false` once the first tick has run.
    pub fn add_file(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> bool {
        self.session.add_file(InputFile::new(name, bytes))
    }

    /// Run exactly one stage and report where the import stands.
    pub fn tick(&mut self) -> Progress {
        advance(&mut self.session);
        Progress::of(&self.session)
    }

    /// Progress without running anything.
    pub fn progress(&self) -> Progress {
        Progress::of(&self.session)
    }

    /// Whether a terminal stage was reached.
    pub const fn is_done(&self) -> bool {
        self.session.is_done()
    }

    /// The underlying session.
    pub const fn session(&self) -> &ImportSession {
        &self.session
    }

    /// The merged board, once finished.
    pub const fn board(&self) -> Option<&BoardMesh> {
        self.session.board()
    }

    /// Totals so far.
    pub fn summary(&self) -> ImportSummary {
        ImportSummary::of(&self.session)
    }

    /// Tick until a terminal stage is reached.
    pub fn run(&mut self) -> ImportSummary {
        while !self.is_done() {
            self.tick();
        }
        let summary = self.summary();
        info!(
            stage = ?summary.stage,
            vertices = summary.vertex_count,
            triangles = summary.triangle_count,
            warnings = summary.warnings.len(),
            "import ended"
        );
        summary
    }
}

/// Import `files` in one call.
///
/// Returns the summary and, when the import finished, the merged board.
pub fn run_to_completion(
    files: Vec<InputFile>,
    settings: ImportSettings,
) -> (ImportSummary, Option<BoardMesh>) {
    let mut pipeline = Pipeline {
        session: ImportSession::new(files, settings),
    };
    let summary = pipeline.run();
    (summary, pipeline.session.take_board())
}

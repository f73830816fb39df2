pub mod error;

use engine::ResultSink;
use model::ExamResult;
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::{fs, sync::Mutex};

/// Entries together with the entry a history view has selected.
#[derive(Clone, Debug, Default)]
struct Ledger {
    entries: Vec<ExamResult>,
    selected: Option<String>,
}

impl Ledger {
    fn reconcile(&mut self) {
        self.selected = reconcile(&self.entries, self.selected.as_deref()).map(String::from);
    }
}

/// Finished exams, newest first. Optionally mirrored to a JSON file after every change.
///
/// Mutations are applied to a copy first. The copy only replaces the live entries once it has
/// been written out, so a failed write leaves the history exactly as it was.
pub struct History {
    ledger: Mutex<Ledger>,
    path: Option<PathBuf>,
}

impl Default for History {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl History {
    pub fn in_memory() -> Self {
        Self { ledger: Mutex::default(), path: None }
    }

    /// Loads the history stored at `path`. A missing file is an empty history.
    pub async fn open(path: impl Into<PathBuf>) -> error::Result<Self> {
        let path = path.into();
        let entries = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        log::info!("Loaded {} past exams from {}.", entries.len(), path.display());
        let mut ledger = Ledger { entries, selected: None };
        ledger.reconcile();
        Ok(Self { ledger: Mutex::new(ledger), path: Some(path) })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, entries: &[ExamResult]) -> error::Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        // Write next to the target first so that a crash never leaves half a file behind.
        let bytes = serde_json::to_vec_pretty(entries)?;
        let staging = path.with_extension("tmp");
        fs::write(&staging, bytes).await?;
        fs::rename(&staging, path).await?;
        Ok(())
    }

    /// Persists `next` and makes it the live ledger.
    async fn commit(&self, live: &mut Ledger, mut next: Ledger) -> error::Result<()> {
        next.reconcile();
        if let Err(err) = self.persist(&next.entries).await {
            log::error!("History was not changed: {err}");
            return Err(err);
        }
        *live = next;
        Ok(())
    }

    pub async fn record(&self, result: ExamResult) -> error::Result<()> {
        let mut live = self.ledger.lock().await;
        let mut next = live.clone();
        next.entries.insert(0, result);
        self.commit(&mut live, next).await
    }

    pub async fn entries(&self) -> Vec<ExamResult> {
        self.ledger.lock().await.entries.clone()
    }

    pub async fn len(&self) -> usize {
        self.ledger.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ledger.lock().await.entries.is_empty()
    }

    pub async fn get(&self, id: &str) -> Option<ExamResult> {
        self.ledger.lock().await.entries.iter().find(|entry| entry.id == id).cloned()
    }

    pub async fn remove(&self, id: &str) -> error::Result<ExamResult> {
        let mut live = self.ledger.lock().await;
        let index = live.entries.iter().position(|entry| entry.id == id).ok_or(error::Error::NotFound)?;
        let mut next = live.clone();
        let removed = next.entries.remove(index);
        self.commit(&mut live, next).await?;
        Ok(removed)
    }

    pub async fn clear(&self) -> error::Result<()> {
        let mut live = self.ledger.lock().await;
        self.commit(&mut live, Ledger::default()).await
    }

    /// Id of the entry a history view should show.
    pub async fn selected_id(&self) -> Option<String> {
        self.ledger.lock().await.selected.clone()
    }

    pub async fn selected(&self) -> Option<ExamResult> {
        let ledger = self.ledger.lock().await;
        let id = ledger.selected.as_deref()?;
        ledger.entries.iter().find(|entry| entry.id == id).cloned()
    }

    /// Selects an entry for viewing. The selection is not persisted.
    pub async fn select(&self, id: &str) -> error::Result<()> {
        let mut ledger = self.ledger.lock().await;
        if !ledger.entries.iter().any(|entry| entry.id == id) {
            return Err(error::Error::NotFound);
        }
        ledger.selected = Some(String::from(id));
        Ok(())
    }
}

impl ResultSink for History {
    async fn store(&self, result: &ExamResult) -> anyhow::Result<()> {
        self.record(result.clone()).await?;
        Ok(())
    }
}

/// Which entry a history view should show after `entries` changed: the previous selection
/// while it still exists, otherwise the newest entry.
pub fn reconcile<'a>(entries: &'a [ExamResult], selected: Option<&str>) -> Option<&'a str> {
    selected
        .and_then(|id| entries.iter().find(|entry| entry.id == id))
        .or_else(|| entries.first())
        .map(|entry| entry.id.as_str())
}

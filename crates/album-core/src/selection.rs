//! Pending selection of images awaiting upload.

use crate::models::{PendingUpload, SelectedFile, UploadId};
use crate::{Error, Result};

/// Owns the pending uploads until they are handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct SelectionManager {
    max_selection: usize,
    items: Vec<PendingUpload>,
    input_generation: u64,
}

impl SelectionManager {
    #[must_use]
    pub const fn new(max_selection: usize) -> Self {
        Self {
            max_selection,
            items: Vec::new(),
            input_generation: 0,
        }
    }

    pub fn items(&self) -> &[PendingUpload] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub const fn max_selection(&self) -> usize {
        self.max_selection
    }

    /// Token a host uses to key its file input.
    ///
    /// Changes whenever items are removed so the input can be recreated and
    /// the same file picked again.
    pub const fn input_generation(&self) -> u64 {
        self.input_generation
    }

    /// Append newly chosen files, dropping any beyond the selection limit.
    ///
    /// Returns the number of files accepted.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = SelectedFile>) -> usize {
        let capacity = self.max_selection.saturating_sub(self.items.len());
        let before = self.items.len();
        let mut offered = 0usize;

        for file in files {
            offered += 1;
            if offered <= capacity {
                self.items.push(PendingUpload::from(file));
            }
        }

        let accepted = self.items.len() - before;
        if accepted < offered {
            tracing::debug!(
                "Selection limit {} reached, dropped {} of {} files",
                self.max_selection,
                offered - accepted,
                offered
            );
        }
        accepted
    }

    pub fn get(&self, id: UploadId) -> Option<&PendingUpload> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Replace the caption of one pending item.
    pub fn set_caption(&mut self, id: UploadId, caption: impl Into<String>) -> Result<()> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| Error::NotFound(format!("pending upload {id}")))?;
        item.caption = caption.into();
        Ok(())
    }

    /// Remove one pending item, returning it when present.
    pub fn remove_item(&mut self, id: UploadId) -> Option<PendingUpload> {
        let index = self.items.iter().position(|item| item.id == id)?;
        self.reset_input();
        Some(self.items.remove(index))
    }

    pub fn clear_all(&mut self) {
        self.items.clear();
        self.reset_input();
    }

    /// Hand every pending item over, leaving the selection empty.
    pub fn take_all(&mut self) -> Vec<PendingUpload> {
        self.reset_input();
        std::mem::take(&mut self.items)
    }

    fn reset_input(&mut self) {
        self.input_generation = self.input_generation.wrapping_add(1);
    }
}

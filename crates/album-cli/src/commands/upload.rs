use std::path::PathBuf;

use album_core::{AppState, Notice};
use serde::Serialize;

use crate::commands::common::{print_notices, read_selected_file};
use crate::error::CliError;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UploadedItem {
    pub file_name: String,
    pub key: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct FailedItem {
    pub file_name: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct UploadSummary {
    pub uploaded: Vec<UploadedItem>,
    pub failed: Vec<FailedItem>,
    pub skipped: usize,
    pub notices: Vec<Notice>,
}

/// Select `files`, caption them by position and upload the batch.
pub async fn upload_files(
    state: &mut AppState,
    files: &[PathBuf],
    captions: &[String],
) -> Result<UploadSummary, CliError> {
    if captions.len() > files.len() {
        return Err(CliError::TooManyCaptions {
            captions: captions.len(),
            files: files.len(),
        });
    }

    let selected = files
        .iter()
        .map(|path| read_selected_file(path))
        .collect::<Result<Vec<_>, _>>()?;

    let accepted = state.select_files(selected);
    let skipped = files.len() - accepted;
    if skipped > 0 {
        tracing::warn!(
            skipped,
            limit = state.config().max_selection,
            "Selection limit reached"
        );
    }

    let ids = state
        .selection()
        .items()
        .iter()
        .map(|item| item.id)
        .collect::<Vec<_>>();
    for (id, caption) in ids.into_iter().zip(captions) {
        state.set_caption(id, caption.as_str())?;
    }

    let report = state.submit().await;
    let mut summary = UploadSummary {
        skipped,
        ..UploadSummary::default()
    };
    for outcome in report.outcomes {
        match outcome.result {
            Ok(object) => summary.uploaded.push(UploadedItem {
                file_name: outcome.file_name,
                key: object.key,
            }),
            Err(error) => summary.failed.push(FailedItem {
                file_name: outcome.file_name,
                error: error.to_string(),
            }),
        }
    }
    summary.notices = state.drain_notices();
    Ok(summary)
}

pub async fn run_upload(
    state: &mut AppState,
    files: &[PathBuf],
    captions: &[String],
    as_json: bool,
) -> Result<(), CliError> {
    let summary = upload_files(state, files, captions).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    for item in &summary.uploaded {
        println!("Uploaded {} -> {}", item.file_name, item.key);
    }
    for item in &summary.failed {
        eprintln!("Failed {}: {}", item.file_name, item.error);
    }
    if summary.skipped > 0 {
        eprintln!("Skipped {} files over the selection limit", summary.skipped);
    }
    print_notices(&summary.notices);

    Ok(())
}

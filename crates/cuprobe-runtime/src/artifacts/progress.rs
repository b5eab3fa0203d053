//! Terminal progress bars for bundle downloads.

use std::sync::Mutex;

use cuprobe_core::ArtifactId;
use indicatif::{ProgressBar, ProgressStyle};

use super::DownloadProgress;

const TEMPLATE: &str =
    "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})";

/// Progress callback that draws one bar per artifact on stderr.
pub fn terminal_progress() -> DownloadProgress {
    let current: Mutex<Option<(String, ProgressBar)>> = Mutex::new(None);

    Box::new(move |artifact: &ArtifactId, downloaded: u64, total: u64| {
        let Ok(mut current) = current.lock() else {
            return;
        };
        let slug = artifact.slug();
        let stale = current.as_ref().is_none_or(|(active, _)| *active != slug);
        if stale {
            if let Some((_, bar)) = current.take() {
                bar.finish();
            }
            *current = Some((slug.clone(), new_bar(&slug, total)));
        }

        if let Some((_, bar)) = current.as_ref() {
            bar.set_position(downloaded);
            if total > 0 && downloaded >= total {
                bar.finish_with_message(format!("{slug} done"));
            }
        }
    })
}

fn new_bar(slug: &str, total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
        bar.set_style(style.progress_chars("█▓░"));
    }
    bar.set_message(slug.to_string());
    bar
}

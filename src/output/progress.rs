use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{notice, success};

/// Spinner shown while a folder tree is being walked.
pub struct WalkProgress {
    pb: ProgressBar,
}

impl WalkProgress {
    pub fn start() -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("  {msg} {spinner}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(notice("Collecting jobs").to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish(self, job_count: usize) {
        self.pb
            .finish_with_message(success(format!("Found {job_count} jobs ✓")).to_string());
    }

    pub fn abandon(self) {
        self.pb.abandon();
    }
}

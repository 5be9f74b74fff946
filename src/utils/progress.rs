use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::fmt;

/// Pipeline phases that report progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Extract,
    Load,
}

impl Stage {
    fn label(&self) -> &'static str {
        match self {
            Stage::Fetch => "Fetching",
            Stage::Extract => "Extracting",
            Stage::Load => "Loading",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn stage_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:>10.cyan.bold} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}

/// Progress bar for one stage; hidden when output is not wanted
#[derive(Clone)]
pub struct StageProgress {
    bar: ProgressBar,
}

impl StageProgress {
    pub fn new(stage: Stage, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(0)
        } else {
            ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden())
        };
        bar.set_style(stage_style());
        bar.set_prefix(stage.label());
        Self { bar }
    }

    pub fn hidden(stage: Stage) -> Self {
        Self::new(stage, false)
    }

    pub fn set_length(&self, len: u64) {
        self.bar.set_length(len);
    }

    pub fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.bar.set_message(msg.into());
    }

    pub fn finish(&self, msg: &str) {
        self.bar.finish_with_message(msg.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_progress_still_counts() {
        let progress = StageProgress::hidden(Stage::Load);
        progress.set_length(3);
        progress.inc(2);
        assert_eq!(progress.position(), 2);
        progress.finish("done");
    }
}

//! Chapter lookup for the loaded audiobook

use earshot_core::{AppError, Chapter, Result, Validator};

/// Seconds into a chapter after which "previous chapter" restarts the current one
pub const RESTART_CHAPTER_THRESHOLD: f64 = 3.0;

/// Sorted, non-overlapping chapters of one audiobook
///
/// Gaps between chapters are allowed; a position inside a gap maps to no chapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterIndex {
    chapters: Vec<Chapter>,
}

impl ChapterIndex {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index, sorting by start time and rejecting overlaps
    pub fn build(mut chapters: Vec<Chapter>) -> Result<Self> {
        for chapter in &chapters {
            if let Err(errors) = chapter.validate() {
                return Err(AppError::InvalidChapters {
                    reason: errors.join("; "),
                });
            }
        }

        chapters.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        for pair in chapters.windows(2) {
            if pair[1].start_time < pair[0].end_time() {
                return Err(AppError::InvalidChapters {
                    reason: format!(
                        "'{}' ({:.1}s-{:.1}s) overlaps '{}' starting at {:.1}s",
                        pair[0].title,
                        pair[0].start_time,
                        pair[0].end_time(),
                        pair[1].title,
                        pair[1].start_time
                    ),
                });
            }
        }

        Ok(Self { chapters })
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Chapter> {
        self.chapters.get(index)
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Index of the chapter whose `[start, end)` contains `position`
    pub fn index_at(&self, position: f64) -> Option<usize> {
        // Sorted and non-overlapping: the candidate is the last chapter starting at or before `position`.
        let candidate = self
            .chapters
            .partition_point(|ch| ch.start_time <= position)
            .checked_sub(1)?;

        self.chapters[candidate]
            .contains(position)
            .then_some(candidate)
    }

    /// Start of the next chapter after `position`
    pub fn next_start(&self, position: f64) -> Option<f64> {
        self.chapters
            .iter()
            .map(|ch| ch.start_time)
            .find(|&start| start > position)
    }

    /// Target for "previous chapter": the current chapter's start when more than
    /// [`RESTART_CHAPTER_THRESHOLD`] seconds into it, else the preceding chapter's start
    pub fn previous_start(&self, position: f64) -> Option<f64> {
        let before: Vec<&Chapter> = self
            .chapters
            .iter()
            .filter(|ch| ch.start_time <= position)
            .collect();

        match before.as_slice() {
            [] => None,
            [.., previous, current] => {
                if position - current.start_time > RESTART_CHAPTER_THRESHOLD {
                    Some(current.start_time)
                } else {
                    Some(previous.start_time)
                }
            }
            [only] => Some(only.start_time),
        }
    }

    /// Formatted chapter info (e.g., "3/15")
    pub fn progress_label(&self, current: Option<usize>) -> String {
        match (current, self.len()) {
            (_, 0) => "No chapters".to_string(),
            (Some(idx), count) => format!("{}/{}", idx + 1, count),
            (None, count) => format!("-/{}", count),
        }
    }
}

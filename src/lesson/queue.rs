//! Ordered lesson queue with an explicit current position.
//!
//! The invariant (non-empty, `current < len`, identifiers unique) is checked
//! on every mutation.  A mutation that would break it is rejected and the
//! queue is left untouched.

use std::collections::HashSet;

use thiserror::Error;

use super::Lesson;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("a lesson queue cannot be empty")]
    Empty,

    #[error("duplicate lesson id in queue: {0}")]
    DuplicateId(String),

    #[error("lesson index {index} out of range (queue length {len})")]
    OutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone)]
pub struct LessonQueue {
    lessons: Vec<Lesson>,
    current: usize,
}

impl LessonQueue {
    /// Build a queue positioned on its first lesson.
    pub fn new(lessons: Vec<Lesson>) -> Result<Self, QueueError> {
        check(&lessons, 0)?;
        Ok(Self {
            lessons,
            current: 0,
        })
    }

    pub fn current(&self) -> &Lesson {
        &self.lessons[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    /// Move to `(current + 1) mod len` and return the new current lesson.
    pub fn advance(&mut self) -> &Lesson {
        self.current = (self.current + 1) % self.lessons.len();
        self.current()
    }

    /// Move to `current - 1`.  Returns `None` (and stays put) at index 0.
    pub fn retreat(&mut self) -> Option<&Lesson> {
        if self.current == 0 {
            return None;
        }
        self.current -= 1;
        Some(self.current())
    }

    /// Jump to `index`.
    pub fn select(&mut self, index: usize) -> Result<&Lesson, QueueError> {
        check(&self.lessons, index)?;
        self.current = index;
        Ok(self.current())
    }

    /// Append a lesson and return its index.  The current position is kept.
    pub fn push(&mut self, lesson: Lesson) -> Result<usize, QueueError> {
        if self.lessons.iter().any(|l| l.id == lesson.id) {
            return Err(QueueError::DuplicateId(lesson.id));
        }
        self.lessons.push(lesson);
        Ok(self.lessons.len() - 1)
    }

    /// Replace the whole queue and move to its first lesson.
    pub fn replace(&mut self, lessons: Vec<Lesson>) -> Result<&Lesson, QueueError> {
        check(&lessons, 0)?;
        self.lessons = lessons;
        self.current = 0;
        Ok(self.current())
    }
}

fn check(lessons: &[Lesson], index: usize) -> Result<(), QueueError> {
    if lessons.is_empty() {
        return Err(QueueError::Empty);
    }
    if index >= lessons.len() {
        return Err(QueueError::OutOfRange {
            index,
            len: lessons.len(),
        });
    }
    let mut seen = HashSet::with_capacity(lessons.len());
    for l in lessons {
        if !seen.insert(l.id.as_str()) {
            return Err(QueueError::DuplicateId(l.id.clone()));
        }
    }
    Ok(())
}

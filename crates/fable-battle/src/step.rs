//! Deferred battle steps.
//!
//! Actions resolve over several frames. Each visible beat (a lunge, a damage
//! application, a caption) is queued as a [`Step`] and the owner drains one
//! entry per tick with [`advance`].

use std::collections::VecDeque;
use std::fmt;

/// Closure run once against the context.
pub type Immediate<C> = Box<dyn FnOnce(&mut C)>;

/// Closure driven by progress in `0.0..=1.0`.
pub type Animate<C> = Box<dyn FnMut(&mut C, f32)>;

/// A step spread over time.
pub struct TimedStep<C> {
    label: Option<String>,
    duration: f32,
    elapsed: f32,
    apply: Animate<C>,
}

impl<C> TimedStep<C> {
    /// Creates a timed step lasting `duration` seconds.
    #[must_use]
    pub fn new(duration: f32, apply: impl FnMut(&mut C, f32) + 'static) -> Self {
        Self {
            label: None,
            duration: duration.max(0.0),
            elapsed: 0.0,
            apply: Box::new(apply),
        }
    }

    /// Set a caption shown while the step runs.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Caption, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Progress in `0.0..=1.0`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        }
    }

    /// Whether the step has run its course.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Advances by `dt` seconds and applies the new progress.
    pub fn tick(&mut self, ctx: &mut C, dt: f32) {
        self.elapsed += dt.max(0.0);
        let progress = self.progress();
        (self.apply)(ctx, progress);
    }
}

/// One queued step.
pub enum Step<C> {
    /// Runs once, then leaves the queue.
    Immediate(Immediate<C>),
    /// Runs every tick until its duration has elapsed.
    Timed(TimedStep<C>),
}

impl<C> Step<C> {
    /// Immediate step.
    pub fn immediate(run: impl FnOnce(&mut C) + 'static) -> Self {
        Self::Immediate(Box::new(run))
    }

    /// Timed step.
    pub fn timed(duration: f32, apply: impl FnMut(&mut C, f32) + 'static) -> Self {
        Self::Timed(TimedStep::new(duration, apply))
    }

    /// A caption held on screen for `duration` seconds.
    pub fn caption(text: impl Into<String>, duration: f32) -> Self {
        Self::Timed(TimedStep::new(duration, |_, _| {}).with_label(text))
    }

    /// Caption, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Immediate(_) => None,
            Self::Timed(step) => step.label(),
        }
    }
}

impl<C> fmt::Debug for Step<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(_) => f.write_str("Immediate"),
            Self::Timed(step) => f
                .debug_struct("Timed")
                .field("label", &step.label)
                .field("duration", &step.duration)
                .field("elapsed", &step.elapsed)
                .finish(),
        }
    }
}

/// FIFO of pending steps.
pub struct StepQueue<C> {
    steps: VecDeque<Step<C>>,
}

impl<C> Default for StepQueue<C> {
    fn default() -> Self {
        Self {
            steps: VecDeque::new(),
        }
    }
}

impl<C> fmt::Debug for StepQueue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.steps.iter()).finish()
    }
}

impl<C> StepQueue<C> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    pub fn push(&mut self, step: Step<C>) {
        self.steps.push_back(step);
    }

    /// Puts a step back at the head.
    pub fn push_front(&mut self, step: Step<C>) {
        self.steps.push_front(step);
    }

    /// Takes the head.
    pub fn pop_front(&mut self) -> Option<Step<C>> {
        self.steps.pop_front()
    }

    /// Pending steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Caption of the head step.
    #[must_use]
    pub fn front_label(&self) -> Option<&str> {
        self.steps.front().and_then(Step::label)
    }

    /// Drops every pending step.
    pub fn clear(&mut self) {
        self.steps.clear();
    }
}

/// Owner of a [`StepQueue`] over itself.
pub trait Sequenced: Sized {
    /// The queue.
    fn steps(&mut self) -> &mut StepQueue<Self>;
}

/// Processes the head of `ctx`'s queue.
///
/// An immediate step runs and is removed. A timed step advances by `dt` and
/// stays at the head until done. Steps queued while running land behind
/// whatever is already pending. Returns whether a step was processed.
pub fn advance<C: Sequenced>(ctx: &mut C, dt: f32) -> bool {
    let Some(step) = ctx.steps().pop_front() else {
        return false;
    };
    match step {
        Step::Immediate(run) => run(ctx),
        Step::Timed(mut timed) => {
            timed.tick(ctx, dt);
            if !timed.is_done() {
                ctx.steps().push_front(Step::Timed(timed));
            }
        },
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log {
        queue: StepQueue<Log>,
        entries: Vec<String>,
    }

    impl Sequenced for Log {
        fn steps(&mut self) -> &mut StepQueue<Self> {
            &mut self.queue
        }
    }

    #[test]
    fn test_one_entry_per_tick() {
        let mut log = Log::default();
        log.queue.push(Step::immediate(|l: &mut Log| l.entries.push("a".into())));
        log.queue.push(Step::immediate(|l: &mut Log| l.entries.push("b".into())));

        assert!(advance(&mut log, 0.1));
        assert_eq!(log.entries, vec!["a"]);
        assert!(advance(&mut log, 0.1));
        assert_eq!(log.entries, vec!["a", "b"]);
        assert!(!advance(&mut log, 0.1));
    }

    #[test]
    fn test_timed_step_holds_head_until_done() {
        let mut log = Log::default();
        log.queue.push(Step::timed(1.0, |l: &mut Log, p| {
            l.entries.push(format!("{p:.1}"));
        }));
        log.queue.push(Step::immediate(|l: &mut Log| l.entries.push("after".into())));

        advance(&mut log, 0.5);
        assert_eq!(log.queue.len(), 2);
        advance(&mut log, 0.5);
        assert_eq!(log.queue.len(), 1);
        advance(&mut log, 0.5);
        assert_eq!(log.entries, vec!["0.5", "1.0", "after"]);
    }

    #[test]
    fn test_steps_queued_while_running_go_last() {
        let mut log = Log::default();
        log.queue.push(Step::immediate(|l: &mut Log| {
            l.queue.push(Step::immediate(|l: &mut Log| l.entries.push("late".into())));
        }));
        log.queue.push(Step::immediate(|l: &mut Log| l.entries.push("early".into())));

        while advance(&mut log, 0.0) {}
        assert_eq!(log.entries, vec!["early", "late"]);
    }

    #[test]
    fn test_caption_labels_front() {
        let mut log = Log::default();
        log.queue.push(Step::caption("Victory!", 1.0));
        assert_eq!(log.queue.front_label(), Some("Victory!"));
        advance(&mut log, 2.0);
        assert!(log.queue.is_empty());
    }
}

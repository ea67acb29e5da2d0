//! Context stack - mark/release scopes with exit actions
//!
//! Design: A stack of frames above a permanent base frame:
//! - `mark` pushes an empty frame
//! - `release` pops the top frame and runs its exit actions, newest first
//! - Releasing at the base frame does nothing
//!
//! Objects created inside a scope are not freed by `release`; a caller that
//! wants that registers an exit action which erases them.

use crate::logging::log_context;
use crate::runtime::Runtime;

/// Deferred action run when its frame is released
pub type ExitAction = Box<dyn FnOnce(&mut Runtime) + Send>;

#[derive(Default)]
struct Frame {
    on_exit: Vec<ExitAction>,
}

pub struct ContextStack {
    frames: Vec<Frame>,
}

impl ContextStack {
    /// Stack holding only the base frame
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    /// Number of frames above the base
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    fn push(&mut self) -> usize {
        self.frames.push(Frame::default());
        self.depth()
    }

    /// Exit actions of the popped frame, or `None` at the base
    fn pop(&mut self) -> Option<Vec<ExitAction>> {
        if self.frames.len() == 1 {
            return None;
        }
        self.frames.pop().map(|frame| frame.on_exit)
    }

    fn register(&mut self, action: ExitAction) {
        if let Some(frame) = self.frames.last_mut() {
            frame.on_exit.push(action);
        }
    }
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Open a new scope; returns the new depth
    pub fn mark(&mut self) -> usize {
        let depth = self.contexts.push();
        log_context("mark", depth);
        depth
    }

    /// Close the innermost scope, running its exit actions
    ///
    /// Returns `false` when only the base frame remains.
    pub fn release(&mut self) -> bool {
        let Some(actions) = self.contexts.pop() else {
            return false;
        };
        for action in actions.into_iter().rev() {
            action(self);
        }
        log_context("release", self.contexts.depth());
        true
    }

    /// Run `action` when the current scope is released
    pub fn on_exit<F>(&mut self, action: F)
    where
        F: FnOnce(&mut Runtime) + Send + 'static,
    {
        self.contexts.register(Box::new(action));
    }

    pub fn context_depth(&self) -> usize {
        self.contexts.depth()
    }
}

//! Call-scoped variable storage
//!
//! A [`ContextStack`] holds one frame per nested logical call plus a flat
//! global map shared by every frame of the chain. Frame-local values shadow
//! globals; popping a frame restores whatever it shadowed.
//!
//! The stack is a plain value: cloning it is how a child call chain inherits
//! a snapshot of its parent (see [`crate::chain`]).

use serde_json::Value;
use std::collections::HashMap;

pub type Frame = HashMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextStack {
    frames: Option<Vec<Frame>>,
    globals: Option<HashMap<String, Value>>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an empty frame, creating the stack on first use.
    pub fn push_frame(&mut self) {
        self.frames.get_or_insert_with(Vec::new).push(Frame::new());
    }

    /// Drop the top frame. No-op on an empty or absent stack; the stack
    /// becomes absent again once its last frame is gone.
    pub fn pop_frame(&mut self) {
        if let Some(frames) = self.frames.as_mut() {
            frames.pop();
            if frames.is_empty() {
                self.frames = None;
            }
        }
    }

    /// Write into the top frame, pushing one first if there is none.
    pub fn set_frame_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let frames = self.frames.get_or_insert_with(Vec::new);
        if frames.is_empty() {
            frames.push(Frame::new());
        }
        if let Some(top) = frames.last_mut() {
            top.insert(name.into(), value.into());
        }
    }

    pub fn set_global_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.globals
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
    }

    /// Value from the top frame only.
    pub fn get_frame_variable(&self, name: &str) -> Option<&Value> {
        self.top_frame()?.get(name)
    }

    pub fn get_global_variable(&self, name: &str) -> Option<&Value> {
        self.globals.as_ref()?.get(name)
    }

    /// Top frame first, then globals.
    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.get_frame_variable(name)
            .or_else(|| self.get_global_variable(name))
    }

    /// Empty the top frame without popping it.
    pub fn clear_frame(&mut self) {
        if let Some(top) = self.frames.as_mut().and_then(|f| f.last_mut()) {
            top.clear();
        }
    }

    pub fn clear_global(&mut self) {
        self.globals = None;
    }

    pub fn top_frame(&self) -> Option<&Frame> {
        self.frames.as_ref()?.last()
    }

    pub fn globals(&self) -> Option<&HashMap<String, Value>> {
        self.globals.as_ref()
    }

    /// Number of frames currently pushed.
    pub fn depth(&self) -> usize {
        self.frames.as_ref().map(Vec::len).unwrap_or(0)
    }

    /// True when neither frames nor globals have been created.
    pub fn is_absent(&self) -> bool {
        self.frames.is_none() && self.globals.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_shadows_global() {
        let mut stack = ContextStack::new();
        stack.set_global_variable("n", "a");
        stack.push_frame();
        stack.set_frame_variable("n", "b");
        assert_eq!(stack.get_variable("n"), Some(&json!("b")));

        stack.pop_frame();
        assert_eq!(stack.get_variable("n"), Some(&json!("a")));
    }

    #[test]
    fn test_nested_frames_restore_outer() {
        let mut stack = ContextStack::new();
        stack.push_frame();
        stack.set_frame_variable("k", 1);
        stack.push_frame();
        assert_eq!(stack.get_frame_variable("k"), None);
        stack.set_frame_variable("k", 2);
        assert_eq!(stack.get_variable("k"), Some(&json!(2)));
        stack.pop_frame();
        assert_eq!(stack.get_variable("k"), Some(&json!(1)));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_pop_empty_is_noop() {
        let mut stack = ContextStack::new();
        stack.pop_frame();
        stack.pop_frame();
        assert!(stack.is_absent());

        stack.push_frame();
        stack.pop_frame();
        stack.pop_frame();
        assert!(stack.is_absent());
    }

    #[test]
    fn test_set_without_frame_creates_one() {
        let mut stack = ContextStack::new();
        stack.set_frame_variable("k", "v");
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.get_frame_variable("k"), Some(&json!("v")));
    }

    #[test]
    fn test_clear() {
        let mut stack = ContextStack::new();
        stack.set_global_variable("g", 1);
        stack.set_frame_variable("f", 2);
        stack.clear_frame();
        assert_eq!(stack.get_variable("f"), None);
        assert_eq!(stack.depth(), 1);

        stack.clear_global();
        assert_eq!(stack.get_variable("g"), None);
        assert!(stack.globals().is_none());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut parent = ContextStack::new();
        parent.set_frame_variable("k", "parent");
        let mut child = parent.clone();
        child.set_frame_variable("k", "child");
        assert_eq!(parent.get_variable("k"), Some(&json!("parent")));
    }
}

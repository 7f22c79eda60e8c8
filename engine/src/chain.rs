//! Chain-local current context
//!
//! Each logical call chain (one inbound request, one job, ...) runs inside a
//! [`scope`] owning its own [`ContextStack`]. Unrelated chains never observe
//! each other's frames or globals. Work spawned on behalf of a chain through
//! [`spawn_inherited`] starts with a clone of the parent's stack taken at spawn
//! time; its writes stay in the child.
//!
//! The free functions below operate on the current chain. Reads outside any
//! chain return `None`; writes report [`OplogError::NoActiveChain`].

use crate::context::ContextStack;
use oplog_shared::{OplogError, Result};
use serde_json::Value;
use std::cell::RefCell;
use std::future::Future;
use tokio::task::JoinHandle;

tokio::task_local! {
    static CHAIN: RefCell<ContextStack>;
}

/// Run `fut` as a call chain starting from `stack`.
pub async fn scope<F: Future>(stack: ContextStack, fut: F) -> F::Output {
    CHAIN.scope(RefCell::new(stack), fut).await
}

/// Synchronous variant of [`scope`].
pub fn sync_scope<R>(stack: ContextStack, f: impl FnOnce() -> R) -> R {
    CHAIN.sync_scope(RefCell::new(stack), f)
}

/// Spawn `fut` on the runtime as a child of the current chain.
///
/// Outside any chain the child starts from an empty stack.
pub fn spawn_inherited<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let inherited = snapshot().unwrap_or_default();
    tokio::spawn(CHAIN.scope(RefCell::new(inherited), fut))
}

pub fn is_active() -> bool {
    CHAIN.try_with(|_| ()).is_ok()
}

/// Clone of the current chain's stack.
pub fn snapshot() -> Option<ContextStack> {
    CHAIN.try_with(|c| c.borrow().clone()).ok()
}

fn with_stack<R>(f: impl FnOnce(&mut ContextStack) -> R) -> Result<R> {
    CHAIN
        .try_with(|c| f(&mut c.borrow_mut()))
        .map_err(|_| OplogError::NoActiveChain)
}

pub fn push_frame() -> Result<()> {
    with_stack(|s| s.push_frame())
}

/// Pop the top frame of the current chain. No-op outside a chain.
pub fn pop_frame() {
    let _ = with_stack(|s| s.pop_frame());
}

pub fn set_frame_variable(name: impl Into<String>, value: impl Into<Value>) -> Result<()> {
    with_stack(|s| s.set_frame_variable(name, value))
}

pub fn set_global_variable(name: impl Into<String>, value: impl Into<Value>) -> Result<()> {
    with_stack(|s| s.set_global_variable(name, value))
}

pub fn get_frame_variable(name: &str) -> Option<Value> {
    with_stack(|s| s.get_frame_variable(name).cloned()).ok().flatten()
}

pub fn get_variable(name: &str) -> Option<Value> {
    with_stack(|s| s.get_variable(name).cloned()).ok().flatten()
}

pub fn clear_frame() {
    let _ = with_stack(|s| s.clear_frame());
}

pub fn clear_global() {
    let _ = with_stack(|s| s.clear_global());
}

/// Pops the frame it pushed when dropped, including on unwind.
#[must_use = "the frame is popped as soon as the guard is dropped"]
pub struct FrameGuard {
    _private: (),
}

impl FrameGuard {
    pub fn push() -> Result<Self> {
        push_frame()?;
        Ok(Self { _private: () })
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        pop_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outside_chain() {
        assert!(!is_active());
        assert!(matches!(
            set_frame_variable("k", 1),
            Err(OplogError::NoActiveChain)
        ));
        assert_eq!(get_variable("k"), None);
        pop_frame();
    }

    #[test]
    fn test_sync_scope_shadowing() {
        sync_scope(ContextStack::new(), || {
            set_global_variable("n", "a").unwrap();
            push_frame().unwrap();
            set_frame_variable("n", "b").unwrap();
            assert_eq!(get_variable("n"), Some(json!("b")));
            pop_frame();
            assert_eq!(get_variable("n"), Some(json!("a")));
            pop_frame();
            assert_eq!(get_frame_variable("n"), None);
        });
    }

    #[test]
    fn test_frame_guard_pops() {
        sync_scope(ContextStack::new(), || {
            {
                let _guard = FrameGuard::push().unwrap();
                set_frame_variable("k", "v").unwrap();
                assert_eq!(snapshot().unwrap().depth(), 1);
            }
            assert_eq!(snapshot().unwrap().depth(), 0);
            assert_eq!(get_variable("k"), None);
        });
    }

    #[tokio::test]
    async fn test_child_inherits_snapshot() {
        scope(ContextStack::new(), async {
            set_global_variable("traceId", "t-1").unwrap();
            set_frame_variable("k", "parent").unwrap();

            let child = spawn_inherited(async {
                let seen = get_variable("k");
                set_frame_variable("k", "child").unwrap();
                (seen, get_variable("traceId"))
            });
            let (seen, trace) = child.await.unwrap();

            assert_eq!(seen, Some(json!("parent")));
            assert_eq!(trace, Some(json!("t-1")));
            assert_eq!(get_variable("k"), Some(json!("parent")));
        })
        .await;
    }
}

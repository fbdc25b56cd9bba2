//! Execution-scoped tenant context
//!
//! Each logical operation (one HTTP request, one background job) runs inside
//! a scope that owns a single tenant slot:
//! - Async work: [`TenantContext::scope`] binds a task-local slot to a future.
//!   The slot is dropped with the future, so completion, error, panic and
//!   cancellation all discard it. Spawned tasks start without a slot.
//! - Blocking work: [`TenantContext::sync_scope`] binds a thread-local slot to
//!   a closure and restores the previous state on exit, including unwinds.
//!
//! Outside any scope the context is read-only and empty.

use crate::error::{Result, TenantError};
use crate::id::TenantId;
use std::cell::RefCell;
use std::future::Future;

tokio::task_local! {
    static TASK_TENANT: RefCell<Option<TenantId>>;
}

thread_local! {
    // Outer `None`: no synchronous scope is active on this thread.
    static THREAD_TENANT: RefCell<Option<Option<TenantId>>> = const { RefCell::new(None) };
}

/// Handle for the current execution unit's tenant slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantContext;

impl TenantContext {
    /// Run `fut` with a fresh, empty tenant slot.
    pub fn scope<F>(fut: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        TASK_TENANT.scope(RefCell::new(None), fut)
    }

    /// Run `fut` with the slot already holding `tenant`.
    pub fn scope_with<F>(tenant: TenantId, fut: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        TASK_TENANT.scope(RefCell::new(Some(tenant)), fut)
    }

    /// Run `f` with a fresh, empty tenant slot.
    ///
    /// Inside a task scope this shadows the task slot for the duration of
    /// `f`; otherwise it uses a thread-local slot. Either way the enclosing
    /// slot is restored when `f` returns or unwinds.
    pub fn sync_scope<R>(f: impl FnOnce() -> R) -> R {
        if TASK_TENANT.try_with(|_| ()).is_ok() {
            return TASK_TENANT.sync_scope(RefCell::new(None), f);
        }

        let previous = THREAD_TENANT.with(|slot| slot.replace(Some(None)));
        let _restore = RestoreOnDrop { previous };
        f()
    }

    /// Store `identifier` for the current execution unit.
    pub fn set(identifier: &str) -> Result<()> {
        let tenant = TenantId::new(identifier)?;
        Self::set_tenant(tenant)
    }

    pub fn set_tenant(tenant: TenantId) -> Result<()> {
        tracing::trace!("Setting tenant context to {}", tenant);
        with_slot(|slot| *slot = Some(tenant)).ok_or(TenantError::NoScope)
    }

    pub fn get() -> Option<TenantId> {
        with_slot(|slot| slot.clone()).flatten()
    }

    /// Idempotent; a no-op outside any scope.
    pub fn clear() {
        with_slot(|slot| *slot = None);
    }

    pub fn is_scoped() -> bool {
        with_slot(|_| ()).is_some()
    }
}

/// Apply `f` to the innermost active slot. The task scope wins over a thread
/// scope because a task may hop threads between polls.
fn with_slot<R>(f: impl FnOnce(&mut Option<TenantId>) -> R) -> Option<R> {
    if TASK_TENANT.try_with(|_| ()).is_ok() {
        return TASK_TENANT.try_with(|cell| f(&mut *cell.borrow_mut())).ok();
    }
    THREAD_TENANT
        .try_with(|slot| slot.borrow_mut().as_mut().map(f))
        .ok()
        .flatten()
}

struct RestoreOnDrop {
    previous: Option<Option<TenantId>>,
}

impl Drop for RestoreOnDrop {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // Thread-local may already be torn down during thread exit.
        let _ = THREAD_TENANT.try_with(|slot| *slot.borrow_mut() = previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_set_then_get_in_same_scope() {
        TenantContext::scope(async {
            TenantContext::set("tenant_1").unwrap();
            assert_eq!(TenantContext::get().unwrap().as_str(), "tenant_1");
            tokio::task::yield_now().await;
            assert_eq!(TenantContext::get().unwrap().as_str(), "tenant_1");
        })
        .await;
    }

    #[tokio::test]
    async fn test_get_is_empty_before_set_and_after_clear() {
        TenantContext::scope(async {
            assert!(TenantContext::get().is_none());
            TenantContext::set("tenant_2").unwrap();
            TenantContext::clear();
            assert!(TenantContext::get().is_none());
            TenantContext::clear();
            assert!(TenantContext::get().is_none());
        })
        .await;
    }

    #[tokio::test]
    async fn test_blank_identifier_is_rejected() {
        TenantContext::scope(async {
            TenantContext::set("tenant_1").unwrap();
            let err = TenantContext::set("   ").unwrap_err();
            assert!(matches!(err, TenantError::InvalidArgument(_)));
            // Previous value survives a rejected set
            assert_eq!(TenantContext::get().unwrap().as_str(), "tenant_1");
        })
        .await;
    }

    #[test]
    fn test_outside_scope_is_empty_and_read_only() {
        assert!(!TenantContext::is_scoped());
        assert!(TenantContext::get().is_none());
        assert_eq!(TenantContext::set("tenant_1"), Err(TenantError::NoScope));
        TenantContext::clear();
        assert!(TenantContext::get().is_none());
    }

    #[tokio::test]
    async fn test_scope_with_prepopulates_slot() {
        let tenant = TenantId::new("tenant_3").unwrap();
        let seen = TenantContext::scope_with(tenant.clone(), async { TenantContext::get() }).await;
        assert_eq!(seen, Some(tenant));
        assert!(TenantContext::get().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_never_observe_each_other() {
        let mut handles = Vec::new();
        for i in 0..64 {
            handles.push(tokio::spawn(TenantContext::scope(async move {
                let own = format!("tenant_{}", i);
                TenantContext::set(&own).unwrap();
                for _ in 0..20 {
                    tokio::task::yield_now().await;
                    assert_eq!(TenantContext::get().unwrap().as_str(), own);
                }
                TenantContext::clear();
                TenantContext::get()
            })));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_spawned_task_does_not_inherit_tenant() {
        TenantContext::scope(async {
            TenantContext::set("tenant_1").unwrap();
            let inherited =
                tokio::spawn(async { (TenantContext::is_scoped(), TenantContext::get()) })
                    .await
                    .unwrap();
            assert_eq!(inherited, (false, None));
        })
        .await;
    }

    #[tokio::test]
    async fn test_cancelled_scope_leaves_nothing_behind() {
        let request = TenantContext::scope(async {
            TenantContext::set("tenant_1").unwrap();
            std::future::pending::<()>().await;
        });

        let result = tokio::time::timeout(Duration::from_millis(10), request).await;
        assert!(result.is_err());
        assert!(!TenantContext::is_scoped());
        assert!(TenantContext::get().is_none());
    }

    #[test]
    fn test_sync_scope_set_get_clear() {
        TenantContext::sync_scope(|| {
            assert!(TenantContext::is_scoped());
            TenantContext::set("tenant_1").unwrap();
            assert_eq!(TenantContext::get().unwrap().as_str(), "tenant_1");
            TenantContext::clear();
            TenantContext::clear();
            assert!(TenantContext::get().is_none());
        });
        assert!(!TenantContext::is_scoped());
    }

    #[test]
    fn test_sync_scope_threads_are_isolated() {
        let threads: Vec<_> = (0..16)
            .map(|i| {
                std::thread::spawn(move || {
                    TenantContext::sync_scope(|| {
                        let own = format!("tenant_{}", i);
                        TenantContext::set(&own).unwrap();
                        for _ in 0..100 {
                            std::thread::yield_now();
                            assert_eq!(TenantContext::get().unwrap().as_str(), own);
                        }
                    })
                })
            })
            .collect();

        for thread in threads {
            thread.join().unwrap();
        }
    }

    #[test]
    fn test_nested_sync_scope_restores_outer_tenant() {
        TenantContext::sync_scope(|| {
            TenantContext::set("outer").unwrap();
            TenantContext::sync_scope(|| {
                assert!(TenantContext::get().is_none());
                TenantContext::set("inner").unwrap();
            });
            assert_eq!(TenantContext::get().unwrap().as_str(), "outer");
        });
    }

    #[tokio::test]
    async fn test_sync_scope_inside_task_scope_does_not_leak() {
        TenantContext::scope(async {
            TenantContext::set("tenant_a").unwrap();

            TenantContext::sync_scope(|| {
                assert!(TenantContext::is_scoped());
                assert!(TenantContext::get().is_none());
                TenantContext::set("tenant_b").unwrap();
                assert_eq!(TenantContext::get().unwrap().as_str(), "tenant_b");
            });

            assert_eq!(TenantContext::get().unwrap().as_str(), "tenant_a");
            tokio::task::yield_now().await;
            assert_eq!(TenantContext::get().unwrap().as_str(), "tenant_a");
        })
        .await;
    }

    #[tokio::test]
    async fn test_sync_scope_inside_task_scope_restores_on_panic() {
        TenantContext::scope(async {
            TenantContext::set("tenant_a").unwrap();

            let result = std::panic::catch_unwind(|| {
                TenantContext::sync_scope(|| {
                    TenantContext::set("tenant_b").unwrap();
                    panic!("job failed");
                })
            });

            assert!(result.is_err());
            assert_eq!(TenantContext::get().unwrap().as_str(), "tenant_a");
        })
        .await;
    }

    #[test]
    fn test_sync_scope_is_cleaned_up_on_panic() {
        let result = std::panic::catch_unwind(|| {
            TenantContext::sync_scope(|| {
                TenantContext::set("tenant_1").unwrap();
                panic!("request failed");
            })
        });

        assert!(result.is_err());
        assert!(!TenantContext::is_scoped());
        assert!(TenantContext::get().is_none());
    }
}

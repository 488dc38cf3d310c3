//! Cooperative execution engine.
//!
//! A user-space network stack runs one loop: it polls its tasks, lets the
//! protocol layer push readiness, and goes around again. The default runtime
//! is that loop on top of a `LocalPool`: every time the future being driven
//! is still pending, the epoll table is ticked so parked waits re-check their
//! deadlines, and the loop turns again.
//!
//! The loop never parks the thread: while something is pending it keeps one
//! core busy, as the main loop of a polling network stack does.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::future::{BoxFuture, LocalBoxFuture};
use futures_executor::{LocalPool, LocalSpawner};
use futures_util::task::{LocalSpawn as _, Spawn as _};

use crate::driver::Epoll;

/// The Runtime for driving the application.
pub trait Runtime {
    /// The value for spawning tasks.
    type Spawner: Spawner;

    /// Create the instance of `Spawner`.
    fn spawner(&self) -> Self::Spawner;

    /// Run a future and wait for its result.
    fn exec<Fut>(&mut self, fut: Fut) -> Fut::Output
    where
        Fut: Future;
}

impl<T: ?Sized> Runtime for &mut T
where
    T: Runtime,
{
    type Spawner = T::Spawner;

    #[inline]
    fn spawner(&self) -> Self::Spawner {
        (**self).spawner()
    }

    #[inline]
    fn exec<Fut>(&mut self, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        (**self).exec(fut)
    }
}

/// The value for spawning tasks.
pub trait Spawner {
    /// Spawn a task.
    fn spawn(&mut self, fut: BoxFuture<'static, ()>) -> anyhow::Result<()>;

    /// Spawn a task onto the current thread.
    fn spawn_local(&mut self, fut: LocalBoxFuture<'static, ()>) -> anyhow::Result<()>;

    /// Spawn a task which may block the running thread.
    fn block(&mut self, f: Box<dyn FnOnce() + Send + 'static>) -> anyhow::Result<()>;
}

impl<T: ?Sized> Spawner for &mut T
where
    T: Spawner,
{
    #[inline]
    fn spawn(&mut self, fut: BoxFuture<'static, ()>) -> anyhow::Result<()> {
        (**self).spawn(fut)
    }

    #[inline]
    fn spawn_local(&mut self, fut: LocalBoxFuture<'static, ()>) -> anyhow::Result<()> {
        (**self).spawn_local(fut)
    }

    #[inline]
    fn block(&mut self, f: Box<dyn FnOnce() + Send + 'static>) -> anyhow::Result<()> {
        (**self).block(f)
    }
}

/// Runtime driving the process-wide epoll table.
pub fn default() -> impl Runtime {
    with_epoll(crate::global::handle())
}

/// Runtime driving `epoll`.
pub fn with_epoll(epoll: Epoll) -> impl Runtime {
    DefaultRuntime {
        pool: LocalPool::new(),
        epoll,
    }
}

struct DefaultRuntime {
    pool: LocalPool,
    epoll: Epoll,
}

struct DefaultSpawner {
    spawner: LocalSpawner,
}

impl Runtime for DefaultRuntime {
    type Spawner = DefaultSpawner;

    #[inline]
    fn spawner(&self) -> Self::Spawner {
        DefaultSpawner {
            spawner: self.pool.spawner(),
        }
    }

    fn exec<Fut>(&mut self, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        let epoll = self.epoll.clone();
        self.pool.run_until(MainLoop {
            fut: Box::pin(fut),
            epoll,
        })
    }
}

impl Spawner for DefaultSpawner {
    fn spawn(&mut self, fut: BoxFuture<'static, ()>) -> anyhow::Result<()> {
        self.spawner.spawn_obj(fut.into()).map_err(Into::into)
    }

    fn spawn_local(&mut self, fut: LocalBoxFuture<'static, ()>) -> anyhow::Result<()> {
        self.spawner.spawn_local_obj(fut.into()).map_err(Into::into)
    }

    fn block(&mut self, f: Box<dyn FnOnce() + Send + 'static>) -> anyhow::Result<()> {
        self.spawn_local(Box::pin(async move { f() }))
    }
}

// Polls `fut`; while it is pending, ticks `epoll` and asks to be polled again.
// The self-wake keeps `LocalPool` from sleeping, so an unbounded wait spins.
struct MainLoop<Fut> {
    fut: Pin<Box<Fut>>,
    epoll: Epoll,
}

impl<Fut: Future> Future for MainLoop<Fut> {
    type Output = Fut::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Poll::Ready(out) = self.fut.as_mut().poll(cx) {
            return Poll::Ready(out);
        }
        self.epoll.tick();
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

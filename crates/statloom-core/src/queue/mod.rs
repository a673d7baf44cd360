//! Queue - ワーカープールに渡すジョブの FIFO
//!
//! ジョブは引数なしの async クロージャ。キューはジョブの中身を知らない。
//! 永続化はしない（プロセスが落ちれば積まれていたジョブは失われる）。

mod memory;

use std::future::Future;
use std::pin::Pin;

pub use memory::JobQueue;

/// Future produced by a job when it starts.
pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A queued unit of work.
pub type Job = Box<dyn FnOnce() -> JobFuture + Send + 'static>;

/// Box a closure into a [`Job`].
pub fn job<F, Fut>(f: F) -> Job
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(move || Box::pin(f()) as JobFuture)
}

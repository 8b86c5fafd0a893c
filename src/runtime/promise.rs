//! Promise Implementation
//!
//! A single-threaded shared future. Every holder of a [`Promise`] observes the
//! same settlement; the [`Resolver`] half settles it exactly once. Reactions
//! registered with [`Promise::on_settled`] run synchronously, in registration
//! order, in the turn that settles the promise. The promise also implements
//! [`Future`] so it can be awaited from any single-threaded executor.

use crate::error::{Error, Result};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Promise state
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PromiseState {
    /// Promise is pending - not yet settled
    Pending,
    /// Promise is fulfilled with a value
    Fulfilled,
    /// Promise is rejected with an error
    Rejected,
}

type Reaction<T> = Box<dyn FnOnce(&Result<T>)>;

struct PromiseInternal<T> {
    result: Option<Result<T>>,
    reactions: Vec<Reaction<T>>,
    wakers: Vec<Waker>,
}

/// Shared handle to an eventually-settled result
pub struct Promise<T> {
    inner: Rc<RefCell<PromiseInternal<T>>>,
}

/// Settling half of a [`Promise`]
pub struct Resolver<T> {
    inner: Rc<RefCell<PromiseInternal<T>>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Promise<T> {
    /// Create a pending promise together with its resolver
    pub fn pending() -> (Promise<T>, Resolver<T>) {
        let inner = Rc::new(RefCell::new(PromiseInternal {
            result: None,
            reactions: Vec::new(),
            wakers: Vec::new(),
        }));
        (
            Promise {
                inner: Rc::clone(&inner),
            },
            Resolver { inner },
        )
    }

    /// Create an already fulfilled promise
    pub fn resolved(value: T) -> Self {
        let (promise, resolver) = Self::pending();
        resolver.resolve(value);
        promise
    }

    /// Create an already rejected promise
    pub fn rejected(error: Error) -> Self {
        let (promise, resolver) = Self::pending();
        resolver.reject(error);
        promise
    }

    pub fn state(&self) -> PromiseState {
        match &self.inner.borrow().result {
            None => PromiseState::Pending,
            Some(Ok(_)) => PromiseState::Fulfilled,
            Some(Err(_)) => PromiseState::Rejected,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == PromiseState::Pending
    }

    /// The settled result, if any
    pub fn result(&self) -> Option<Result<T>> {
        self.inner.borrow().result.clone()
    }

    /// Whether both handles share the same underlying promise
    pub fn ptr_eq(&self, other: &Promise<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run `reaction` once the promise settles (immediately if it already has)
    pub fn on_settled<F>(&self, reaction: F)
    where
        F: FnOnce(&Result<T>) + 'static,
    {
        {
            let mut p = self.inner.borrow_mut();
            if p.result.is_none() {
                p.reactions.push(Box::new(reaction));
                return;
            }
        }
        let settled = self.inner.borrow().result.clone();
        if let Some(result) = settled {
            reaction(&result);
        }
    }

    /// Derive a promise settling with `f` applied to the fulfillment value.
    /// Rejections pass through unchanged.
    pub fn map<U, F>(&self, f: F) -> Promise<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<U> + 'static,
    {
        let (mapped, resolver) = Promise::pending();
        self.on_settled(move |result| {
            resolver.settle(result.clone().and_then(f));
        });
        mapped
    }
}

impl Promise<()> {
    /// Fulfilled once every input is fulfilled; rejected with the first rejection
    pub fn all(promises: Vec<Promise<()>>) -> Promise<()> {
        if promises.is_empty() {
            return Promise::resolved(());
        }
        let (all, resolver) = Promise::pending();
        let remaining = Rc::new(Cell::new(promises.len()));
        for promise in promises {
            let resolver = resolver.clone();
            let remaining = Rc::clone(&remaining);
            promise.on_settled(move |result| match result {
                Ok(()) => {
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        resolver.resolve(());
                    }
                }
                Err(e) => {
                    resolver.reject(e.clone());
                }
            });
        }
        all
    }
}

impl<T: Clone + 'static> Resolver<T> {
    /// Fulfill the promise. Returns false if it was already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Reject the promise. Returns false if it was already settled.
    pub fn reject(&self, error: Error) -> bool {
        self.settle(Err(error))
    }

    pub fn settle(&self, result: Result<T>) -> bool {
        let (reactions, wakers) = {
            let mut p = self.inner.borrow_mut();
            if p.result.is_some() {
                return false;
            }
            p.result = Some(result.clone());
            (
                std::mem::take(&mut p.reactions),
                std::mem::take(&mut p.wakers),
            )
        };

        for reaction in reactions {
            reaction(&result);
        }
        for waker in wakers {
            waker.wake();
        }
        true
    }

    pub fn is_settled(&self) -> bool {
        self.inner.borrow().result.is_some()
    }
}

impl<T: Clone + 'static> Future for Promise<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut p = self.inner.borrow_mut();
        if let Some(result) = &p.result {
            return Poll::Ready(result.clone());
        }
        if !p.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            p.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.inner.borrow();
        let state = match &p.result {
            None => PromiseState::Pending,
            Some(Ok(_)) => PromiseState::Fulfilled,
            Some(Err(_)) => PromiseState::Rejected,
        };
        f.debug_struct("Promise")
            .field("state", &state)
            .field("reactions", &p.reactions.len())
            .finish()
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("settled", &self.inner.borrow().result.is_some())
            .finish()
    }
}

//! Windowed collection driven by opening and closing streams.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use crate::error::RxError;
use crate::observable::{shared_fn, Observable};
use crate::observer::Observer;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, SubscriptionLike, TeardownLogic};

type Buffer<T> = Rc<RefCell<Vec<T>>>;

struct BufferToggleState<T> {
  // FIFO by opening; concurrent windows may overlap.
  buffers: Vec<Buffer<T>>,
}

struct BufferClose<T> {
  dest: Subscriber<Vec<T>>,
  state: Rc<RefCell<BufferToggleState<T>>>,
  buffer: Buffer<T>,
  slot: Rc<RefCell<Option<Subscription>>>,
}

impl<T: 'static> BufferClose<T> {
  fn close(&mut self) {
    let found = {
      let mut state = self.state.borrow_mut();
      state
        .buffers
        .iter()
        .position(|b| Rc::ptr_eq(b, &self.buffer))
        .map(|i| state.buffers.remove(i))
    };
    if let Some(sub) = self.slot.borrow_mut().take() {
      sub.unsubscribe();
    }
    // Absent means the source already flushed this buffer.
    if let Some(buffer) = found {
      self.dest.next(mem::take(&mut buffer.borrow_mut()));
    }
  }
}

impl<T: 'static, C> Observer<C> for BufferClose<T> {
  fn next(&mut self, _value: C) {
    self.close();
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    self.close();
  }
}

struct OpeningObserver<T, O, C, F> {
  dest: Subscriber<Vec<T>>,
  state: Rc<RefCell<BufferToggleState<T>>>,
  closing_selector: Rc<RefCell<F>>,
  _marker: std::marker::PhantomData<(O, C)>,
}

impl<T, O, C, F> Observer<O> for OpeningObserver<T, O, C, F>
where
  T: 'static,
  O: 'static,
  C: 'static,
  F: FnMut(&O) -> Observable<C>,
{
  fn next(&mut self, opening: O) {
    let closing = (self.closing_selector.borrow_mut())(&opening);
    let buffer: Buffer<T> = Rc::new(RefCell::new(Vec::new()));
    self.state.borrow_mut().buffers.push(buffer.clone());

    let slot = Rc::new(RefCell::new(None));
    let observer = BufferClose {
      dest: self.dest.clone(),
      state: self.state.clone(),
      buffer,
      slot: slot.clone(),
    };
    let up = Subscriber::from_observer(observer);
    *slot.borrow_mut() = Some(up.subscription().clone());
    self.dest.subscription().add(up.subscription().clone());
    closing.subscribe_subscriber(up);
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    // No more windows will open; windows already open keep collecting.
  }
}

struct SourceObserver<T> {
  dest: Subscriber<Vec<T>>,
  state: Rc<RefCell<BufferToggleState<T>>>,
}

impl<T: Clone + 'static> Observer<T> for SourceObserver<T> {
  fn next(&mut self, value: T) {
    let buffers = self.state.borrow().buffers.clone();
    for buffer in buffers {
      buffer.borrow_mut().push(value.clone());
    }
  }

  fn error(&mut self, err: RxError) {
    self.dest.error(err);
  }

  fn complete(&mut self) {
    // Open windows flush in opening order before the completion.
    let buffers = mem::take(&mut self.state.borrow_mut().buffers);
    for buffer in buffers {
      self.dest.next(mem::take(&mut buffer.borrow_mut()));
    }
    self.dest.complete();
  }
}

impl<T: Clone + 'static> Observable<T> {
  /// Collects source values into one buffer per `openings` emission; each
  /// buffer is emitted when its own closing stream (from
  /// `closing_selector`) first fires or completes. Buffers may overlap.
  pub fn buffer_toggle<O, C, F>(
    self,
    openings: Observable<O>,
    closing_selector: F,
  ) -> Observable<Vec<T>>
  where
    O: 'static,
    C: 'static,
    F: FnMut(&O) -> Observable<C> + 'static,
  {
    let closing_selector = shared_fn(closing_selector);
    Observable::new(move |sub| {
      let state = Rc::new(RefCell::new(BufferToggleState { buffers: Vec::new() }));
      let opening_observer = OpeningObserver {
        dest: sub.clone(),
        state: state.clone(),
        closing_selector: closing_selector.clone(),
        _marker: std::marker::PhantomData,
      };
      openings.chain(sub.subscription(), opening_observer);

      let source_observer = SourceObserver { dest: sub.clone(), state };
      self.chain(sub.subscription(), source_observer);
      TeardownLogic::None
    })
  }
}

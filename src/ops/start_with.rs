use crate::observable::Observable;
use crate::subscription::TeardownLogic;

impl<T: Clone + 'static> Observable<T> {
  /// Prepends `values` before the source's own emissions.
  pub fn start_with(self, values: Vec<T>) -> Observable<T> {
    Observable::new(move |sub| {
      for value in values.clone() {
        if sub.is_closed() {
          break;
        }
        sub.next(value);
      }
      if !sub.is_closed() {
        self.chain(sub.subscription(), sub.clone());
      }
      TeardownLogic::None
    })
  }
}

#[cfg(test)]
mod tests {
  use crate::observable::from_iter;
  use std::cell::RefCell;
  use std::rc::Rc;

  #[test]
  fn prefix_comes_before_the_source() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    from_iter(vec![3, 4])
      .start_with(vec![1, 2])
      .subscribe(move |v| sink.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![1, 2, 3, 4]);
  }

  #[test]
  fn take_can_stop_inside_the_prefix() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    from_iter(vec![3, 4])
      .start_with(vec![1, 2])
      .take(1)
      .subscribe(move |v| sink.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![1]);
  }
}

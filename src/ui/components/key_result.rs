/// Outcome of offering a key or mouse event to a component.
///
/// Components never call back into their parent; they report what happened
/// and let the parent decide whether to act or keep routing the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Event was consumed, nothing for the parent to do
  Handled,
  /// Event was consumed and produced something the parent should see
  Event(T),
  /// Event was not consumed, parent should try the next handler
  NotHandled,
}

impl<T> KeyResult<T> {
  pub fn is_handled(&self) -> bool {
    !matches!(self, KeyResult::NotHandled)
  }

  /// Convert the carried event, keeping Handled/NotHandled as they are
  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> KeyResult<U> {
    match self {
      KeyResult::Handled => KeyResult::Handled,
      KeyResult::Event(e) => KeyResult::Event(f(e)),
      KeyResult::NotHandled => KeyResult::NotHandled,
    }
  }
}

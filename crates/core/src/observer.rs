/// Watches the callbacks of an optimization run.
///
/// The driver shows every evaluated point, every gradient, and every callback
/// failure to one observer on the coordinating process. The observer sees the
/// data by reference and may answer with an action for the callback in
/// progress; `None` leaves the fail flag the engine receives untouched.
///
/// A closure `FnMut(&E) -> Option<A>` is an observer, and so is `()`, which
/// ignores everything.
pub trait Observer<E, A> {
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}

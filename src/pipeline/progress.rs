//! Progress sink for long-running operations.

/// Optional callback ticked once per unit of work (one spectrum, or one
/// solver iteration). It is called synchronously from the hot loop, so it
/// must be cheap and must not block.
pub struct Progress<'a>(Option<&'a mut dyn FnMut()>);

impl<'a> Progress<'a> {
    pub fn none() -> Self {
        Progress(None)
    }

    pub fn new(f: &'a mut dyn FnMut()) -> Self {
        Progress(Some(f))
    }

    #[inline]
    pub fn tick(&mut self) {
        if let Some(f) = &mut self.0 {
            f();
        }
    }
}

impl Default for Progress<'_> {
    fn default() -> Self {
        Self::none()
    }
}

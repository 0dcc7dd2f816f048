//! Disposer list for listener registrations.

/// Release callbacks run in reverse registration order, once, on
/// [`Subscriptions::release`] or on drop.
#[derive(Default)]
pub struct Subscriptions {
    disposers: Vec<Box<dyn FnOnce()>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, dispose: impl FnOnce() + 'static) {
        self.disposers.push(Box::new(dispose));
    }

    pub fn len(&self) -> usize {
        self.disposers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disposers.is_empty()
    }

    pub fn release(&mut self) {
        while let Some(dispose) = self.disposers.pop() {
            dispose();
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriptions").field("live", &self.disposers.len()).finish()
    }
}

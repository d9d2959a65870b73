/// This is basically like the arrayvec crate, except crappier, only the subset I need and
/// therefore without unsafe Rust.
#[derive(Debug)]
pub(crate) struct ArrayVec<T: Copy, const CAP: usize> {
    content: [T; CAP],
    len: usize,
}

impl<T: Copy, const CAP: usize> ArrayVec<T, CAP> {
    pub(crate) fn new(filler_item: T) -> Self {
        // filler_item is there to avoid usage of MaybeUninit, and can literally be anything at
        // all.
        ArrayVec {
            content: [filler_item; CAP],
            len: 0,
        }
    }

    /// Pushing onto a full vector is a logic error; the item is dropped.
    pub(crate) fn push(&mut self, item: T) {
        debug_assert!(self.len < CAP);
        if let Some(slot) = self.content.get_mut(self.len) {
            *slot = item;
            self.len += 1;
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn as_slice(&self) -> &[T] {
        &self.content[..self.len]
    }

    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }
}

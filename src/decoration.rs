//! Per-node metadata chains.
//!
//! The tree never looks inside a decoration. External passes push their own
//! payload types onto a node and read them back by type.

use std::any::Any;
use std::fmt;

/// One link of a decoration chain: a type-erased payload plus the link that
/// was attached before it.
pub struct Decoration {
    payload: Box<dyn Any>,
    next: Option<Box<Decoration>>,
}

impl Decoration {
    pub fn new<T: Any>(payload: T) -> Self {
        Self {
            payload: Box::new(payload),
            next: None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    pub fn next(&self) -> Option<&Decoration> {
        self.next.as_deref()
    }

    /// Walk this link and every older one, most recent first.
    pub fn iter(&self) -> Chain<'_> {
        Chain { cur: Some(self) }
    }

    /// Most recently attached payload of type `T`.
    pub fn find<T: Any>(&self) -> Option<&T> {
        self.iter().find_map(|link| link.downcast_ref::<T>())
    }

    /// Make `self` the new head in front of `head`.
    pub(crate) fn push_onto(mut self: Box<Self>, head: Option<Box<Decoration>>) -> Box<Self> {
        self.next = head;
        self
    }
}

impl Drop for Decoration {
    // Unlink iteratively so a long chain cannot exhaust the stack.
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut link) = next {
            next = link.next.take();
        }
    }
}

impl fmt::Debug for Decoration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoration")
            .field("chain_len", &self.iter().count())
            .finish()
    }
}

pub struct Chain<'a> {
    cur: Option<&'a Decoration>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Decoration;

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.cur?;
        self.cur = link.next();
        Some(link)
    }
}

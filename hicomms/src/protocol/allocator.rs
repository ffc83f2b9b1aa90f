use core::ops::Deref;

use crate::message::Message;

/// Storage for a single decoded message
///
/// The slot is released when the `MsgPtr` returned by `alloc` is dropped.
#[derive(Default)]
pub struct InPlaceAllocator {
    slot: Option<Message>,
}

impl InPlaceAllocator {
    pub const fn new() -> Self {
        Self { slot: None }
    }

    pub fn is_allocated(&self) -> bool {
        self.slot.is_some()
    }

    /// Stores `msg` in the slot.
    ///
    /// The slot must be free. A leaked `MsgPtr` keeps it occupied; release builds overwrite it.
    pub fn alloc(&mut self, msg: Message) -> MsgPtr<'_> {
        debug_assert!(self.slot.is_none(), "message slot is still occupied");
        self.slot = Some(msg);
        MsgPtr {
            slot: &mut self.slot,
        }
    }
}

/// Owning handle of an allocated message
pub struct MsgPtr<'a> {
    slot: &'a mut Option<Message>,
}

impl Deref for MsgPtr<'_> {
    type Target = Message;

    fn deref(&self) -> &Message {
        unwrap!(self.slot.as_ref())
    }
}

impl Drop for MsgPtr<'_> {
    fn drop(&mut self) {
        self.slot.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Heartbeat;

    #[test]
    fn test_slot_released_on_drop() {
        let mut allocator = InPlaceAllocator::new();
        let ptr = allocator.alloc(Heartbeat { seq_num: 3 }.into());
        assert_eq!(*ptr, Message::Heartbeat(Heartbeat { seq_num: 3 }));
        drop(ptr);
        assert!(!allocator.is_allocated());

        let ptr = allocator.alloc(Heartbeat { seq_num: 4 }.into());
        assert_eq!(ptr.id(), crate::core::MsgId::Heartbeat);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn test_leaked_handle() {
        let mut allocator = InPlaceAllocator::new();
        core::mem::forget(allocator.alloc(Heartbeat { seq_num: 1 }.into()));
        let _ptr = allocator.alloc(Heartbeat { seq_num: 2 }.into());
    }
}

use crate::conn::Connection;

/// Fixed-size set of connections indexed by creation order.
///
/// A slot is empty until the connection for its index is created. Closing
/// the pool empties every slot, so closing it again is a no-op.
#[derive(Debug)]
pub struct ConnectionPool<C> {
    slots: Vec<Option<C>>,
}

impl<C> ConnectionPool<C> {
    /// Constructs a new pool with `size` empty slots.
    pub fn new(size: usize) -> Self {
        Self { slots: (0..size).map(|_| None).collect() }
    }

    /// Returns the total number of slots.
    #[inline]
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of slots holding a connection.
    #[inline]
    pub fn num_populated(&self) -> usize {
        self.slots.iter().filter(|v| v.is_some()).count()
    }

    /// Returns `true` if every slot holds a connection.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Puts the connection into the slot at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds or the slot is already populated.
    pub fn insert(&mut self, idx: usize, conn: C) {
        let slot = &mut self.slots[idx];
        assert!(slot.is_none(), "slot {idx} is already populated");
        *slot = Some(conn);
    }

    /// Returns the connection at `idx`, if populated.
    #[cfg(test)]
    pub fn get(&self, idx: usize) -> Option<&C> {
        self.slots.get(idx).and_then(Option::as_ref)
    }
}

impl<C> From<Vec<Option<C>>> for ConnectionPool<C> {
    #[inline]
    fn from(slots: Vec<Option<C>>) -> Self {
        Self { slots }
    }
}

impl<C> ConnectionPool<C>
where
    C: Connection,
{
    /// Closes every populated slot and returns the number of connections
    /// released.
    ///
    /// Failures to close gracefully are logged and still counted, because the
    /// underlying socket is dropped either way.
    pub async fn close(&mut self) -> usize {
        let mut num_closed = 0;

        for (idx, slot) in self.slots.iter_mut().enumerate() {
            let Some(conn) = slot.take() else {
                continue;
            };

            if let Err(err) = conn.close().await {
                log::warn!("failed to close connection #{idx}: {err}");
            }
            num_closed += 1;
        }

        num_closed
    }
}

use std::cell::Cell;
use std::rc::Rc;

use crate::error::ViewError;

use super::Surface;

#[derive(Debug)]
struct Slot {
    name: Surface,
    holder: Cell<Option<Surface>>,
    cells: Cell<(u16, u16)>,
}

/// A terminal region a renderer draws into.
///
/// At most one renderer holds a container at a time. Holding is expressed by a
/// [`ContainerLease`]; dropping the lease releases the container.
#[derive(Debug, Clone)]
pub struct Container {
    slot: Rc<Slot>,
}

impl Container {
    pub fn new(name: Surface, cols: u16, rows: u16) -> Self {
        Self {
            slot: Rc::new(Slot {
                name,
                holder: Cell::new(None),
                cells: Cell::new((cols, rows)),
            }),
        }
    }

    pub fn name(&self) -> Surface {
        self.slot.name
    }

    pub fn holder(&self) -> Option<Surface> {
        self.slot.holder.get()
    }

    /// Current size in character cells (cols, rows)
    pub fn cells(&self) -> (u16, u16) {
        self.slot.cells.get()
    }

    pub fn resize(&self, cols: u16, rows: u16) {
        self.slot.cells.set((cols, rows));
    }

    /// Attach `renderer` to this container.
    pub fn acquire(&self, renderer: Surface) -> Result<ContainerLease, ViewError> {
        if let Some(holder) = self.slot.holder.get() {
            return Err(ViewError::ContainerBusy {
                container: self.slot.name,
                holder,
            });
        }
        self.slot.holder.set(Some(renderer));
        Ok(ContainerLease {
            slot: Rc::clone(&self.slot),
        })
    }
}

/// Exclusive hold on a [`Container`], released on drop.
#[derive(Debug)]
pub struct ContainerLease {
    slot: Rc<Slot>,
}

impl ContainerLease {
    pub fn cells(&self) -> (u16, u16) {
        self.slot.cells.get()
    }
}

impl Drop for ContainerLease {
    fn drop(&mut self) {
        self.slot.holder.set(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let container = Container::new(Surface::Globe, 80, 24);
        let lease = container.acquire(Surface::Globe).unwrap();
        assert_eq!(container.holder(), Some(Surface::Globe));

        let err = container.acquire(Surface::Map).unwrap_err();
        assert_eq!(
            err,
            ViewError::ContainerBusy {
                container: Surface::Globe,
                holder: Surface::Globe
            }
        );

        drop(lease);
        assert_eq!(container.holder(), None);
        assert!(container.acquire(Surface::Map).is_ok());
    }

    #[test]
    fn test_lease_sees_resize() {
        let container = Container::new(Surface::Map, 10, 10);
        let lease = container.acquire(Surface::Map).unwrap();
        container.resize(40, 12);
        assert_eq!(lease.cells(), (40, 12));
    }
}

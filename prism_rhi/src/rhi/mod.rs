/// Render hardware interface: swapchain, sync primitives and the device traits they drive

mod types;
mod sync_primitive;
mod device;
mod deletion_queue;
mod swap_chain;
pub mod surface;

#[cfg(test)]
pub mod mock_device;

pub use types::*;
pub use sync_primitive::{SyncBackend, SyncPrimitive};
pub use device::{CommandList, Device, Display, DisplayInfo, FramePacer, Queue, Window};
pub use deletion_queue::{DeletionQueue, PendingDeletion};
pub use swap_chain::{SwapChain, SwapChainStats};

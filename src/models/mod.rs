// Domain models: node/pod usage and the published snapshot

mod node;
mod pod;
mod quantity;
mod snapshot;

pub use node::NodeUsage;
pub use pod::{ContainerUsage, PodUsage};
pub use quantity::Quantity;
pub use snapshot::{Snapshot, now_millis};

//! Resolution of `depends_on` transformation chains into frame matrices.

mod coordinate_system;
mod frame;
mod record;
mod resolver;

pub use coordinate_system::{angle_between, coordinate_systems, CoordinateSystem};
pub use frame::{clean_link_name, ChainLink, FrameMap, ResolvedFrame};
pub use record::{resolve_reference, RecordId, TransformRecord, CHAIN_END};
pub use resolver::{resolve_frames, FrameLink, TransformResolver};

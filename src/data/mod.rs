pub mod container;
pub mod map;
pub mod reference;
pub mod regions;
pub mod units;

pub use map::{Component, SpectralMap};
pub use reference::ReferenceSpectrum;
pub use regions::Region;
pub use units::AxisUnit;

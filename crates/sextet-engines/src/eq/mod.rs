//! Filter and EQ engines.

pub mod comb_resonator;
pub mod console;
pub mod envelope_filter;
pub mod formant;
pub mod ladder;
pub mod parametric;
pub mod svf;

pub use comb_resonator::CombResonator;
pub use console::VintageConsoleEq;
pub use envelope_filter::EnvelopeFilter;
pub use formant::{FormantFilter, VocalFormantFilter};
pub use ladder::LadderFilter;
pub use parametric::ParametricEq;
pub use svf::SvfFilter;

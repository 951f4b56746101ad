//! Engine catalogue and factory.
//!
//! This crate owns the authoritative mapping from numeric engine ids to
//! engines: id `0` is the passthrough, ids `1..=56` are the effect
//! catalogue, grouped into seven categories. The mapping is stable across
//! releases — an id's meaning never changes — and the parameter-name
//! arrays in [`CATALOG`] are the same statics the engines themselves
//! report, so name-keyed preset parameters resolve against one source of
//! truth.
//!
//! # Example
//!
//! ```rust
//! use sextet_core::Engine;
//! use sextet_registry::{EngineId, catalog_entry, create};
//!
//! let id = EngineId::new(39).unwrap(); // Plate Reverb
//! let info = catalog_entry(id);
//! assert_eq!(info.name, "Plate Reverb");
//! assert_eq!(info.params.len(), 6);
//!
//! let mut engine = create(id, 48000.0);
//! engine.prepare(48000.0, 512);
//! ```

use sextet_core::Engine;
use sextet_engines::{
    delay::{BucketBrigadeDelay, BufferRepeat, DigitalDelay, MagneticDrumEcho, TapeEcho},
    distortion::{
        BitCrusher, HarmonicExciter, KStyleOverdrive, MuffFuzz, MultibandSaturator,
        RodentDistortion, VintageTubePreamp, WaveFolder,
    },
    dynamics::{
        ClassicCompressor, DynamicEq, MasteringLimiter, NoiseGate, TransientShaper,
        VintageOptoCompressor,
    },
    eq::{
        CombResonator, EnvelopeFilter, FormantFilter, LadderFilter, ParametricEq, SvfFilter,
        VintageConsoleEq, VocalFormantFilter,
    },
    modulation::{
        AnalogPhaser, ClassicTremolo, DetuneDoubler, DigitalChorus, FrequencyShifter,
        HarmonicTremolo, IntelligentHarmonizer, PitchShifter, ResonantChorus, RingModulator,
        RotarySpeaker,
    },
    passthrough::Passthrough,
    reverb::{ConvolutionReverb, GatedReverb, PlateReverb, ShimmerReverb, SpringReverb},
    spatial::{
        ChaosGenerator, DimensionExpander, FeedbackNetwork, GranularCloud, PhasedVocoder,
        SpectralFreeze, SpectralGate, StereoImager, StereoWidener,
    },
    utility::{GainUtility, MidSideProcessor, MonoMaker, PhaseAlign},
};
use sextet_engines::{
    delay as d, distortion as dist, dynamics as dyn_, eq, modulation as m, reverb as rv,
    spatial as sp, utility as u,
};

/// Number of engines in the catalogue.
pub const ENGINE_COUNT: usize = 57;

/// Stable numeric engine identifier in `[0, 56]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineId(u8);

impl EngineId {
    /// The passthrough engine.
    pub const PASSTHROUGH: EngineId = EngineId(0);

    /// Construct from a raw id; `None` outside `[0, 56]`.
    pub fn new(raw: u8) -> Option<Self> {
        (usize::from(raw) < ENGINE_COUNT).then_some(Self(raw))
    }

    /// The raw numeric id.
    pub fn raw(self) -> u8 {
        self.0
    }

    /// Iterate every valid id in ascending order.
    pub fn all() -> impl Iterator<Item = EngineId> {
        (0..ENGINE_COUNT as u8).map(EngineId)
    }
}

impl core::fmt::Display for EngineId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Algorithmic family of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineCategory {
    /// No processing (id 0).
    None,
    /// Level-dependent gain stages.
    Dynamics,
    /// Filters and equalizers.
    FiltersEq,
    /// Nonlinear waveshaping.
    Distortion,
    /// LFO- and pitch-based movement.
    Modulation,
    /// Delay networks and reverberators.
    ReverbDelay,
    /// Stereo-field and spectral processors.
    Spatial,
    /// Transparent tools.
    Utility,
}

impl EngineCategory {
    /// Human-readable category name.
    pub const fn name(&self) -> &'static str {
        match self {
            EngineCategory::None => "None",
            EngineCategory::Dynamics => "Dynamics",
            EngineCategory::FiltersEq => "Filters/EQ",
            EngineCategory::Distortion => "Distortion",
            EngineCategory::Modulation => "Modulation",
            EngineCategory::ReverbDelay => "Reverb/Delay",
            EngineCategory::Spatial => "Spatial",
            EngineCategory::Utility => "Utility",
        }
    }
}

/// One catalogue row: the stable interchange record for an engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineInfo {
    /// Stable numeric id.
    pub id: u8,
    /// Display name, identical to the engine's `name()`.
    pub name: &'static str,
    /// Algorithmic family.
    pub category: EngineCategory,
    /// Parameter names in index order; `len()` is the parameter count.
    pub params: &'static [&'static str],
}

/// The authoritative catalogue, indexed by id.
pub static CATALOG: [EngineInfo; ENGINE_COUNT] = {
    use EngineCategory as C;
    [
        EngineInfo { id: 0, name: "Passthrough", category: C::None, params: &[] },
        EngineInfo { id: 1, name: "Vintage Opto Compressor", category: C::Dynamics, params: dyn_::opto::PARAMS },
        EngineInfo { id: 2, name: "Classic Compressor", category: C::Dynamics, params: dyn_::vca::PARAMS },
        EngineInfo { id: 3, name: "Transient Shaper", category: C::Dynamics, params: dyn_::transient::PARAMS },
        EngineInfo { id: 4, name: "Noise Gate", category: C::Dynamics, params: dyn_::gate::PARAMS },
        EngineInfo { id: 5, name: "Mastering Limiter", category: C::Dynamics, params: dyn_::limiter::PARAMS },
        EngineInfo { id: 6, name: "Dynamic EQ", category: C::Dynamics, params: dyn_::dynamic_eq::PARAMS },
        EngineInfo { id: 7, name: "Parametric EQ", category: C::FiltersEq, params: eq::parametric::PARAMS },
        EngineInfo { id: 8, name: "Vintage Console EQ", category: C::FiltersEq, params: eq::console::PARAMS },
        EngineInfo { id: 9, name: "Ladder Filter", category: C::FiltersEq, params: eq::ladder::PARAMS },
        EngineInfo { id: 10, name: "State-Variable Filter", category: C::FiltersEq, params: eq::svf::PARAMS },
        EngineInfo { id: 11, name: "Formant Filter", category: C::FiltersEq, params: eq::formant::FORMANT_PARAMS },
        EngineInfo { id: 12, name: "Envelope Filter", category: C::FiltersEq, params: eq::envelope_filter::PARAMS },
        EngineInfo { id: 13, name: "Comb Resonator", category: C::FiltersEq, params: eq::comb_resonator::PARAMS },
        EngineInfo { id: 14, name: "Vocal Formant Filter", category: C::FiltersEq, params: eq::formant::VOCAL_PARAMS },
        EngineInfo { id: 15, name: "Vintage Tube Preamp", category: C::Distortion, params: dist::tube::PARAMS },
        EngineInfo { id: 16, name: "Wave Folder", category: C::Distortion, params: dist::folder::PARAMS },
        EngineInfo { id: 17, name: "Harmonic Exciter", category: C::Distortion, params: dist::exciter::PARAMS },
        EngineInfo { id: 18, name: "Bit Crusher", category: C::Distortion, params: dist::bitcrusher::PARAMS },
        EngineInfo { id: 19, name: "Multiband Saturator", category: C::Distortion, params: dist::multiband::PARAMS },
        EngineInfo { id: 20, name: "Muff Fuzz", category: C::Distortion, params: dist::pedals::MUFF_PARAMS },
        EngineInfo { id: 21, name: "Rodent Distortion", category: C::Distortion, params: dist::pedals::RODENT_PARAMS },
        EngineInfo { id: 22, name: "K-Style Overdrive", category: C::Distortion, params: dist::pedals::KSTYLE_PARAMS },
        EngineInfo { id: 23, name: "Digital Chorus", category: C::Modulation, params: m::chorus::DIGITAL_PARAMS },
        EngineInfo { id: 24, name: "Resonant Chorus", category: C::Modulation, params: m::chorus::RESONANT_PARAMS },
        EngineInfo { id: 25, name: "Analog Phaser", category: C::Modulation, params: m::phaser::PARAMS },
        EngineInfo { id: 26, name: "Ring Modulator", category: C::Modulation, params: m::ring::RING_PARAMS },
        EngineInfo { id: 27, name: "Frequency Shifter", category: C::Modulation, params: m::ring::SHIFTER_PARAMS },
        EngineInfo { id: 28, name: "Harmonic Tremolo", category: C::Modulation, params: m::tremolo::HARMONIC_PARAMS },
        EngineInfo { id: 29, name: "Classic Tremolo", category: C::Modulation, params: m::tremolo::CLASSIC_PARAMS },
        EngineInfo { id: 30, name: "Rotary Speaker", category: C::Modulation, params: m::rotary::PARAMS },
        EngineInfo { id: 31, name: "Pitch Shifter", category: C::Modulation, params: m::pitch::PITCH_PARAMS },
        EngineInfo { id: 32, name: "Detune Doubler", category: C::Modulation, params: m::pitch::DETUNE_PARAMS },
        EngineInfo { id: 33, name: "Intelligent Harmonizer", category: C::Modulation, params: m::pitch::HARMONIZER_PARAMS },
        EngineInfo { id: 34, name: "Tape Echo", category: C::ReverbDelay, params: d::tape::PARAMS },
        EngineInfo { id: 35, name: "Digital Delay", category: C::ReverbDelay, params: d::digital::PARAMS },
        EngineInfo { id: 36, name: "Magnetic Drum Echo", category: C::ReverbDelay, params: d::drum::PARAMS },
        EngineInfo { id: 37, name: "Bucket-Brigade Delay", category: C::ReverbDelay, params: d::bbd::PARAMS },
        EngineInfo { id: 38, name: "Buffer Repeat", category: C::ReverbDelay, params: d::repeat::PARAMS },
        EngineInfo { id: 39, name: "Plate Reverb", category: C::ReverbDelay, params: rv::plate::PARAMS },
        EngineInfo { id: 40, name: "Spring Reverb", category: C::ReverbDelay, params: rv::spring::PARAMS },
        EngineInfo { id: 41, name: "Convolution Reverb", category: C::ReverbDelay, params: rv::convolution::PARAMS },
        EngineInfo { id: 42, name: "Shimmer Reverb", category: C::ReverbDelay, params: rv::shimmer::PARAMS },
        EngineInfo { id: 43, name: "Gated Reverb", category: C::ReverbDelay, params: rv::gated::PARAMS },
        EngineInfo { id: 44, name: "Stereo Widener", category: C::Spatial, params: sp::width::WIDENER_PARAMS },
        EngineInfo { id: 45, name: "Stereo Imager", category: C::Spatial, params: sp::width::IMAGER_PARAMS },
        EngineInfo { id: 46, name: "Dimension Expander", category: C::Spatial, params: sp::width::DIMENSION_PARAMS },
        EngineInfo { id: 47, name: "Spectral Freeze", category: C::Spatial, params: sp::freeze::PARAMS },
        EngineInfo { id: 48, name: "Spectral Gate", category: C::Spatial, params: sp::gate::PARAMS },
        EngineInfo { id: 49, name: "Phased Vocoder", category: C::Spatial, params: sp::vocoder::PARAMS },
        EngineInfo { id: 50, name: "Granular Cloud", category: C::Spatial, params: sp::granular::PARAMS },
        EngineInfo { id: 51, name: "Chaos Generator", category: C::Spatial, params: sp::chaos::PARAMS },
        EngineInfo { id: 52, name: "Feedback Network", category: C::Spatial, params: sp::network::PARAMS },
        EngineInfo { id: 53, name: "Mid-Side Processor", category: C::Utility, params: u::mid_side::PARAMS },
        EngineInfo { id: 54, name: "Gain Utility", category: C::Utility, params: u::gain::PARAMS },
        EngineInfo { id: 55, name: "Mono Maker", category: C::Utility, params: u::mono::PARAMS },
        EngineInfo { id: 56, name: "Phase Align", category: C::Utility, params: u::phase::PARAMS },
    ]
};

/// Catalogue row for a valid id.
pub fn catalog_entry(id: EngineId) -> &'static EngineInfo {
    &CATALOG[usize::from(id.raw())]
}

/// Catalogue row for a raw id, if in range.
pub fn catalog_entry_raw(raw: u8) -> Option<&'static EngineInfo> {
    CATALOG.get(usize::from(raw))
}

/// Look up a parameter index by name for the given engine, matching
/// case-insensitively and ignoring spaces, dashes, and underscores.
pub fn find_param_by_name(id: EngineId, name: &str) -> Option<usize> {
    let fold = |s: &str| -> String {
        s.chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-' | '/' | '&'))
            .flat_map(char::to_lowercase)
            .collect()
    };
    let wanted = fold(name);
    catalog_entry(id)
        .params
        .iter()
        .position(|p| fold(p) == wanted)
}

/// Construct a fresh engine for `id`.
///
/// Never returns null-equivalents: an out-of-range raw id falls back to
/// the passthrough engine with a warning, which keeps slot code free of
/// id-validity branches. Allocation happens here — call from the control
/// thread only.
pub fn create(id: EngineId, sample_rate: f32) -> Box<dyn Engine + Send> {
    match id.raw() {
        0 => Box::new(Passthrough::new(sample_rate)),
        1 => Box::new(VintageOptoCompressor::new(sample_rate)),
        2 => Box::new(ClassicCompressor::new(sample_rate)),
        3 => Box::new(TransientShaper::new(sample_rate)),
        4 => Box::new(NoiseGate::new(sample_rate)),
        5 => Box::new(MasteringLimiter::new(sample_rate)),
        6 => Box::new(DynamicEq::new(sample_rate)),
        7 => Box::new(ParametricEq::new(sample_rate)),
        8 => Box::new(VintageConsoleEq::new(sample_rate)),
        9 => Box::new(LadderFilter::new(sample_rate)),
        10 => Box::new(SvfFilter::new(sample_rate)),
        11 => Box::new(FormantFilter::new(sample_rate)),
        12 => Box::new(EnvelopeFilter::new(sample_rate)),
        13 => Box::new(CombResonator::new(sample_rate)),
        14 => Box::new(VocalFormantFilter::new(sample_rate)),
        15 => Box::new(VintageTubePreamp::new(sample_rate)),
        16 => Box::new(WaveFolder::new(sample_rate)),
        17 => Box::new(HarmonicExciter::new(sample_rate)),
        18 => Box::new(BitCrusher::new(sample_rate)),
        19 => Box::new(MultibandSaturator::new(sample_rate)),
        20 => Box::new(MuffFuzz::new(sample_rate)),
        21 => Box::new(RodentDistortion::new(sample_rate)),
        22 => Box::new(KStyleOverdrive::new(sample_rate)),
        23 => Box::new(DigitalChorus::new(sample_rate)),
        24 => Box::new(ResonantChorus::new(sample_rate)),
        25 => Box::new(AnalogPhaser::new(sample_rate)),
        26 => Box::new(RingModulator::new(sample_rate)),
        27 => Box::new(FrequencyShifter::new(sample_rate)),
        28 => Box::new(HarmonicTremolo::new(sample_rate)),
        29 => Box::new(ClassicTremolo::new(sample_rate)),
        30 => Box::new(RotarySpeaker::new(sample_rate)),
        31 => Box::new(PitchShifter::new(sample_rate)),
        32 => Box::new(DetuneDoubler::new(sample_rate)),
        33 => Box::new(IntelligentHarmonizer::new(sample_rate)),
        34 => Box::new(TapeEcho::new(sample_rate)),
        35 => Box::new(DigitalDelay::new(sample_rate)),
        36 => Box::new(MagneticDrumEcho::new(sample_rate)),
        37 => Box::new(BucketBrigadeDelay::new(sample_rate)),
        38 => Box::new(BufferRepeat::new(sample_rate)),
        39 => Box::new(PlateReverb::new(sample_rate)),
        40 => Box::new(SpringReverb::new(sample_rate)),
        41 => Box::new(ConvolutionReverb::new(sample_rate)),
        42 => Box::new(ShimmerReverb::new(sample_rate)),
        43 => Box::new(GatedReverb::new(sample_rate)),
        44 => Box::new(StereoWidener::new(sample_rate)),
        45 => Box::new(StereoImager::new(sample_rate)),
        46 => Box::new(DimensionExpander::new(sample_rate)),
        47 => Box::new(SpectralFreeze::new(sample_rate)),
        48 => Box::new(SpectralGate::new(sample_rate)),
        49 => Box::new(PhasedVocoder::new(sample_rate)),
        50 => Box::new(GranularCloud::new(sample_rate)),
        51 => Box::new(ChaosGenerator::new(sample_rate)),
        52 => Box::new(FeedbackNetwork::new(sample_rate)),
        53 => Box::new(MidSideProcessor::new(sample_rate)),
        54 => Box::new(GainUtility::new(sample_rate)),
        55 => Box::new(MonoMaker::new(sample_rate)),
        56 => Box::new(PhaseAlign::new(sample_rate)),
        raw => {
            // `EngineId::new` makes this unreachable in practice, but the
            // fallback keeps the contract: never null, never panic.
            tracing::warn!(id = raw, "unknown engine id, substituting passthrough");
            Box::new(Passthrough::new(sample_rate))
        }
    }
}

/// Construct from a raw id, substituting passthrough (with a warning) for
/// out-of-range values.
pub fn create_raw(raw: u8, sample_rate: f32) -> Box<dyn Engine + Send> {
    match EngineId::new(raw) {
        Some(id) => create(id, sample_rate),
        None => {
            tracing::warn!(id = raw, "engine id out of range, substituting passthrough");
            Box::new(Passthrough::new(sample_rate))
        }
    }
}
